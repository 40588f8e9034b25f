//! Report renderer: banner, probability chart and PDF document.
//!
//! One renderer covers every output surface; `ReportOptions` picks which
//! parts are produced. Rendering is a pure function of the evaluation and
//! the timestamp passed in.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::adapters::PdfWriter;
use crate::domain::{format_measurement, DocumentBlock, ReportDocument, RiskTier};
use crate::ports::DocumentWriter;
use crate::{Evaluation, GlucoriskError, Result};

pub const REPORT_TITLE: &str = "Diabetes Risk Assessment Report";
/// File name without extension; the writer supplies the extension.
pub const REPORT_STEM: &str = "Diabetes_Risk_Report";
pub const DISCLAIMER: &str = "This prediction is generated using a machine learning model and should not replace professional medical consultation.";
pub const CHART_Y_LABEL: &str = "Probability (%)";
pub const NOT_AT_RISK_LABEL: &str = "Not At Risk";
pub const AT_RISK_LABEL: &str = "At Risk";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Which outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub banner: bool,
    pub chart: bool,
    pub document: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            banner: true,
            chart: true,
            document: true,
        }
    }
}

impl ReportOptions {
    /// Nothing enabled.
    #[must_use]
    pub fn none() -> Self {
        Self {
            banner: false,
            chart: false,
            document: false,
        }
    }

    /// Parse a comma-separated list such as `banner,chart`.
    ///
    /// # Errors
    /// Returns `Config` for an unknown output name.
    pub fn parse(list: &str) -> Result<Self> {
        let mut options = Self::none();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "banner" => options.banner = true,
                "chart" => options.chart = true,
                "document" | "pdf" => options.document = true,
                other => {
                    return Err(GlucoriskError::Config(format!(
                        "unknown report output '{other}' (expected banner, chart or document)"
                    )))
                }
            }
        }
        Ok(options)
    }
}

/// Inline result message, colored by tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub tier: RiskTier,
    pub message: String,
    pub percentage: f64,
    /// Probability of the predicted class, in percent
    pub confidence: f64,
    pub color: (u8, u8, u8),
}

impl Banner {
    /// One-line rendering, e.g. `High Risk of Diabetes: 71.82%`.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}: {:.2}%", self.message, self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartBar {
    pub label: &'static str,
    /// Percentage on a 0-100 scale
    pub value: f64,
    pub color: (u8, u8, u8),
}

/// Two-bar class probability chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityChart {
    pub y_label: &'static str,
    pub bars: [ChartBar; 2],
}

/// Encoded document ready for download.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentArtifact {
    pub filename: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// The enabled outputs for one evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedReport {
    pub banner: Option<Banner>,
    pub chart: Option<ProbabilityChart>,
    pub document: Option<DocumentArtifact>,
}

pub struct ReportRenderer<W: DocumentWriter = PdfWriter> {
    writer: W,
    options: ReportOptions,
}

impl ReportRenderer<PdfWriter> {
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Self::with_writer(PdfWriter::new(), options)
    }
}

impl<W: DocumentWriter> ReportRenderer<W> {
    #[must_use]
    pub fn with_writer(writer: W, options: ReportOptions) -> Self {
        Self { writer, options }
    }

    /// Produce every enabled output.
    ///
    /// # Errors
    /// Returns `Report` if the document cannot be encoded.
    pub fn render(&self, evaluation: &Evaluation, generated_at: DateTime<Utc>) -> Result<RenderedReport> {
        let document = if self.options.document {
            Some(self.render_document(evaluation, generated_at)?)
        } else {
            None
        };

        Ok(RenderedReport {
            banner: self.options.banner.then(|| banner(evaluation)),
            chart: self.options.chart.then(|| chart(evaluation)),
            document,
        })
    }

    /// Encode the document regardless of the `document` toggle.
    ///
    /// # Errors
    /// Returns `Report` if the writer fails.
    pub fn render_document(
        &self,
        evaluation: &Evaluation,
        generated_at: DateTime<Utc>,
    ) -> Result<DocumentArtifact> {
        let document = build_document(evaluation, generated_at);
        let bytes = self.writer.write(&document)?;
        Ok(DocumentArtifact {
            filename: format!("{REPORT_STEM}.{}", self.writer.file_extension()),
            media_type: self.writer.media_type(),
            bytes,
        })
    }
}

#[must_use]
pub fn banner(evaluation: &Evaluation) -> Banner {
    let assessment = &evaluation.assessment;
    Banner {
        tier: assessment.tier,
        message: assessment.label.clone(),
        percentage: assessment.percentage,
        confidence: evaluation.prediction.confidence() * 100.0,
        color: assessment.tier.color(),
    }
}

#[must_use]
pub fn chart(evaluation: &Evaluation) -> ProbabilityChart {
    let prediction = &evaluation.prediction;
    ProbabilityChart {
        y_label: CHART_Y_LABEL,
        bars: [
            ChartBar {
                label: NOT_AT_RISK_LABEL,
                value: prediction.probability_negative * 100.0,
                color: RiskTier::Low.color(),
            },
            ChartBar {
                label: AT_RISK_LABEL,
                value: prediction.probability_positive * 100.0,
                color: RiskTier::High.color(),
            },
        ],
    }
}

/// Lay out the printable report.
#[must_use]
pub fn build_document(evaluation: &Evaluation, generated_at: DateTime<Utc>) -> ReportDocument {
    let mut doc = ReportDocument::new(REPORT_TITLE);
    doc.push(DocumentBlock::Title(REPORT_TITLE.to_string()))
        .push(DocumentBlock::Text(format!(
            "Generated: {}",
            generated_at.format(TIMESTAMP_FORMAT)
        )))
        .push(DocumentBlock::Heading("Patient Measurements".to_string()));

    for (feature, value) in evaluation.features.iter() {
        doc.push(DocumentBlock::Field {
            label: feature.label().to_string(),
            value: format_measurement(value),
        });
    }

    let assessment = &evaluation.assessment;
    let prediction = &evaluation.prediction;
    doc.push(DocumentBlock::Heading("Assessment".to_string()))
        .push(DocumentBlock::Field {
            label: "Risk Tier".to_string(),
            value: assessment.label.clone(),
        })
        .push(DocumentBlock::Field {
            label: "Probability of Diabetes".to_string(),
            value: format!("{:.2}%", assessment.percentage),
        })
        .push(DocumentBlock::Field {
            label: "Model Confidence".to_string(),
            value: format!("{:.2}%", prediction.confidence() * 100.0),
        })
        .push(DocumentBlock::Text(assessment.tier.description().to_string()))
        .push(DocumentBlock::Heading(CHART_Y_LABEL.to_string()));

    for bar in chart(evaluation).bars {
        doc.push(DocumentBlock::Bar {
            label: bar.label.to_string(),
            percent: bar.value,
            color: bar.color,
        });
    }

    doc.push(DocumentBlock::Spacer)
        .push(DocumentBlock::Notice(DISCLAIMER.to_string()));
    doc
}

/// Write a document into `dir` under its suggested filename.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place only once fully written. On failure the temporary
/// file is removed.
///
/// # Errors
/// Returns `Report` if the file cannot be written or persisted.
pub fn export_document(artifact: &DocumentArtifact, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(&artifact.filename);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        GlucoriskError::Report(format!("Cannot create file in {}: {e}", dir.display()))
    })?;
    tmp.write_all(&artifact.bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| GlucoriskError::Report(format!("Cannot write report: {e}")))?;
    tmp.persist(&target)
        .map_err(|e| GlucoriskError::Report(format!("Cannot save {}: {}", target.display(), e.error)))?;

    tracing::info!(bytes = artifact.bytes.len(), "Report exported");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, PredictionResult, RiskAssessment};
    use chrono::TimeZone;

    fn evaluation(p1: f64) -> Evaluation {
        let prediction = PredictionResult::new(p1 >= 0.5, 1.0 - p1, p1).expect("Should be valid");
        Evaluation {
            features: FeatureVector::from_slice(&[6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0])
                .expect("Should build"),
            assessment: RiskAssessment::from_prediction(&prediction),
            prediction,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("Should be a valid timestamp")
    }

    #[test]
    fn test_render_all_outputs() {
        let rendered = ReportRenderer::new(ReportOptions::default())
            .render(&evaluation(0.75), at(0))
            .expect("Should render");

        let banner = rendered.banner.expect("Should have banner");
        assert_eq!(banner.tier, RiskTier::High);
        assert_eq!(banner.text(), "High Risk of Diabetes: 75.00%");
        assert_eq!(banner.color, RiskTier::High.color());

        let document = rendered.document.expect("Should have document");
        assert_eq!(document.filename, "Diabetes_Risk_Report.pdf");
        assert_eq!(document.media_type, "application/pdf");
        assert!(document.bytes.starts_with(b"%PDF-"));
        assert!(rendered.chart.is_some());
    }

    #[test]
    fn test_chart_values() {
        let chart = chart(&evaluation(0.25));
        assert_eq!(chart.y_label, "Probability (%)");
        assert_eq!(chart.bars[0].label, "Not At Risk");
        assert_eq!(chart.bars[0].value, 75.0);
        assert_eq!(chart.bars[1].label, "At Risk");
        assert_eq!(chart.bars[1].value, 25.0);
    }

    #[test]
    fn test_toggles_are_independent() {
        let options = ReportOptions {
            banner: false,
            chart: true,
            document: false,
        };
        let rendered = ReportRenderer::new(options)
            .render(&evaluation(0.4), at(0))
            .expect("Should render");
        assert!(rendered.banner.is_none());
        assert!(rendered.chart.is_some());
        assert!(rendered.document.is_none());

        let rendered = ReportRenderer::new(ReportOptions::none())
            .render(&evaluation(0.4), at(0))
            .expect("Should render");
        assert_eq!(rendered, RenderedReport::default());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(
            ReportOptions::parse("banner, chart").expect("Should parse"),
            ReportOptions {
                banner: true,
                chart: true,
                document: false,
            }
        );
        assert_eq!(
            ReportOptions::parse("banner,chart,document").expect("Should parse"),
            ReportOptions::default()
        );
        assert!(matches!(
            ReportOptions::parse("banner,sparkline"),
            Err(GlucoriskError::Config(_))
        ));
    }

    #[test]
    fn test_document_is_idempotent() {
        let renderer = ReportRenderer::new(ReportOptions::default());
        let a = renderer
            .render_document(&evaluation(0.6), at(0))
            .expect("Should render");
        let b = renderer
            .render_document(&evaluation(0.6), at(0))
            .expect("Should render");
        assert_eq!(a, b);
    }

    #[test]
    fn test_document_differs_only_in_timestamp() {
        let renderer = ReportRenderer::new(ReportOptions::default());
        let first = renderer
            .render_document(&evaluation(0.6), at(0))
            .expect("Should render");
        let later = renderer
            .render_document(&evaluation(0.6), at(3_600))
            .expect("Should render");
        assert_ne!(first.bytes, later.bytes);

        let stamp_a = at(0).format(TIMESTAMP_FORMAT).to_string();
        let stamp_b = at(3_600).format(TIMESTAMP_FORMAT).to_string();
        let patched = String::from_utf8_lossy(&first.bytes).replace(&stamp_a, &stamp_b);
        assert_eq!(patched.as_bytes(), String::from_utf8_lossy(&later.bytes).as_bytes());
    }

    #[test]
    fn test_document_contents() {
        let doc = build_document(&evaluation(0.7182), at(0));
        assert_eq!(doc.title, REPORT_TITLE);
        assert!(doc.blocks.contains(&DocumentBlock::Field {
            label: "Glucose Level".to_string(),
            value: "148".to_string(),
        }));
        assert!(doc.blocks.contains(&DocumentBlock::Field {
            label: "Diabetes Pedigree Function".to_string(),
            value: "0.627".to_string(),
        }));
        assert!(doc.blocks.contains(&DocumentBlock::Field {
            label: "Probability of Diabetes".to_string(),
            value: "71.82%".to_string(),
        }));
        assert_eq!(
            doc.blocks.last(),
            Some(&DocumentBlock::Notice(DISCLAIMER.to_string()))
        );
    }

    #[test]
    fn test_export_document() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let artifact = ReportRenderer::new(ReportOptions::default())
            .render_document(&evaluation(0.2), at(0))
            .expect("Should render");

        let path = export_document(&artifact, dir.path()).expect("Should export");
        assert_eq!(path, dir.path().join("Diabetes_Risk_Report.pdf"));
        assert_eq!(std::fs::read(&path).expect("Should read"), artifact.bytes);

        // Only the final file remains.
        let entries = std::fs::read_dir(dir.path()).expect("Should list").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let artifact = DocumentArtifact {
            filename: "Diabetes_Risk_Report.pdf".to_string(),
            media_type: "application/pdf",
            bytes: b"%PDF-1.4".to_vec(),
        };
        let err = export_document(&artifact, &dir.path().join("missing"))
            .expect_err("Should fail");
        assert!(matches!(err, GlucoriskError::Report(_)));
    }

    #[test]
    fn test_failed_persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let artifact = ReportRenderer::new(ReportOptions::default())
            .render_document(&evaluation(0.2), at(0))
            .expect("Should render");
        // A directory already holds the report name, so the final rename fails.
        std::fs::create_dir(dir.path().join(&artifact.filename)).expect("Should create dir");

        let err = export_document(&artifact, dir.path()).expect_err("Should fail");
        assert!(matches!(err, GlucoriskError::Report(_)));

        let entries: Vec<String> = std::fs::read_dir(dir.path())
            .expect("Should list")
            .map(|e| e.expect("Should read entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![artifact.filename.clone()]);
        assert!(dir.path().join(&artifact.filename).is_dir());
    }

    #[test]
    fn test_huge_measurement_stays_compact() {
        let prediction = PredictionResult::new(true, 0.1, 0.9).expect("Should be valid");
        let evaluation = Evaluation {
            features: FeatureVector::from_slice(&[6.0, 1e300, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0])
                .expect("Should build"),
            assessment: RiskAssessment::from_prediction(&prediction),
            prediction,
        };

        let doc = build_document(&evaluation, at(0));
        let glucose = doc
            .blocks
            .iter()
            .find_map(|block| match block {
                DocumentBlock::Field { label, value } if label == "Glucose Level" => Some(value.clone()),
                _ => None,
            })
            .expect("Should list glucose");
        assert_eq!(glucose, "1e300");

        let bytes = ReportRenderer::new(ReportOptions::default())
            .render_document(&evaluation, at(0))
            .expect("Should render")
            .bytes;
        assert!(String::from_utf8_lossy(&bytes).contains("(1e300) Tj"));
    }
}
