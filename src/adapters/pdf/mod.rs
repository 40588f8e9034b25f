//! PDF adapter: Implementation of DocumentWriter producing PDF 1.4.
//!
//! Writes text-only documents with the standard Helvetica fonts plus filled
//! rectangles for bars. No fonts are embedded and no creation date or
//! document ID is written, so the same document always encodes to the same
//! bytes.
//!
//! # Layout
//!
//! Blocks are stacked top to bottom on A4 pages. A block that does not fit
//! on the current page starts a new one.

use std::fmt::Write as _;

use crate::domain::{DocumentBlock, ReportDocument};
use crate::ports::DocumentWriter;
use crate::{GlucoriskError, Result};

/// A4 in points.
const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 56.0;

/// Horizontal offset of field values and bar tracks.
const VALUE_COLUMN: f64 = 230.0;
const TEXT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const VALUE_WIDTH: f64 = TEXT_WIDTH - VALUE_COLUMN;
const BAR_TRACK_WIDTH: f64 = 220.0;
const BAR_HEIGHT: f64 = 12.0;

const BLACK: (u8, u8, u8) = (17, 24, 39);
const MUTED: (u8, u8, u8) = (100, 116, 139);
const TRACK: (u8, u8, u8) = (203, 213, 225);

/// Writer for PDF documents.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter;

impl PdfWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentWriter for PdfWriter {
    fn media_type(&self) -> &'static str {
        "application/pdf"
    }

    fn file_extension(&self) -> &'static str {
        "pdf"
    }

    fn write(&self, document: &ReportDocument) -> Result<Vec<u8>> {
        let pages = layout(document)?;
        Ok(serialize(&document.title, &pages))
    }
}

/// The two standard fonts used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

/// Advance widths in 1/1000 em for ASCII 32..=126, from the Adobe
/// Helvetica AFM files.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            Self::Regular => &HELVETICA_WIDTHS,
            Self::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Rendered width in points. Characters outside printable ASCII are
    /// measured as the `?` they are written as.
    fn text_width(self, text: &str, size: f64) -> f64 {
        let widths = self.widths();
        let units: u32 = text
            .chars()
            .map(|c| {
                let c = if c.is_ascii() && !c.is_ascii_control() { c } else { '?' };
                u32::from(widths[c as usize - 32])
            })
            .sum();
        f64::from(units) * size / 1000.0
    }
}

/// Escape a string for a PDF literal. Non-ASCII characters are replaced
/// since the standard fonts only cover WinAnsi.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap to `max_width` points. A word wider than a whole
/// line is split between characters.
fn wrap(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let fits = |line: &str| font.text_width(line, size) <= max_width;

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn rgb(color: (u8, u8, u8)) -> String {
    format!(
        "{:.3} {:.3} {:.3}",
        f64::from(color.0) / 255.0,
        f64::from(color.1) / 255.0,
        f64::from(color.2) / 255.0
    )
}

/// Content stream under construction for one page.
struct PageBuilder {
    pages: Vec<String>,
    current: String,
    cursor: f64,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Reserve `height` points, breaking the page if needed. Returns the
    /// baseline for the reserved band.
    fn reserve(&mut self, height: f64) -> f64 {
        if self.cursor - height < MARGIN && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
        self.cursor -= height;
        self.cursor
    }

    fn text(&mut self, font: Font, size: f64, color: (u8, u8, u8), x: f64, y: f64, text: &str) -> Result<()> {
        writeln!(
            self.current,
            "BT /{} {size:.1} Tf {} rg {x:.2} {y:.2} Td ({}) Tj ET",
            font.resource(),
            rgb(color),
            escape_text(text)
        )
        .map_err(|e| GlucoriskError::Report(format!("PDF layout failed: {e}")))
    }

    fn rect(&mut self, color: (u8, u8, u8), x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        writeln!(
            self.current,
            "{} rg {x:.2} {y:.2} {w:.2} {h:.2} re f",
            rgb(color)
        )
        .map_err(|e| GlucoriskError::Report(format!("PDF layout failed: {e}")))
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Lay out every block into per-page content streams.
fn layout(document: &ReportDocument) -> Result<Vec<String>> {
    let mut page = PageBuilder::new();

    for block in &document.blocks {
        match block {
            DocumentBlock::Title(text) => {
                for line in wrap(text, Font::Bold, 20.0, TEXT_WIDTH) {
                    let y = page.reserve(28.0);
                    page.text(Font::Bold, 20.0, BLACK, MARGIN, y, &line)?;
                }
            }
            DocumentBlock::Heading(text) => {
                page.reserve(8.0);
                for line in wrap(text, Font::Bold, 13.0, TEXT_WIDTH) {
                    let y = page.reserve(18.0);
                    page.text(Font::Bold, 13.0, BLACK, MARGIN, y, &line)?;
                }
            }
            DocumentBlock::Text(text) => {
                for line in wrap(text, Font::Regular, 11.0, TEXT_WIDTH) {
                    let y = page.reserve(15.0);
                    page.text(Font::Regular, 11.0, BLACK, MARGIN, y, &line)?;
                }
            }
            DocumentBlock::Field { label, value } => {
                let y = page.reserve(16.0);
                page.text(Font::Regular, 11.0, MUTED, MARGIN, y, label)?;
                let mut y = y;
                for (i, line) in wrap(value, Font::Bold, 11.0, VALUE_WIDTH).iter().enumerate() {
                    if i > 0 {
                        y = page.reserve(14.0);
                    }
                    page.text(Font::Bold, 11.0, BLACK, MARGIN + VALUE_COLUMN, y, line)?;
                }
            }
            DocumentBlock::Bar {
                label,
                percent,
                color,
            } => {
                let y = page.reserve(20.0);
                let fill = BAR_TRACK_WIDTH * percent.clamp(0.0, 100.0) / 100.0;
                let x = MARGIN + VALUE_COLUMN;
                page.text(Font::Regular, 11.0, BLACK, MARGIN, y, label)?;
                page.rect(TRACK, x, y - 2.0, BAR_TRACK_WIDTH, BAR_HEIGHT)?;
                page.rect(*color, x, y - 2.0, fill, BAR_HEIGHT)?;
                page.text(
                    Font::Bold,
                    11.0,
                    BLACK,
                    x + BAR_TRACK_WIDTH + 8.0,
                    y,
                    &format!("{percent:.2}%"),
                )?;
            }
            DocumentBlock::Notice(text) => {
                for line in wrap(text, Font::Regular, 9.0, TEXT_WIDTH) {
                    let y = page.reserve(12.0);
                    page.text(Font::Regular, 9.0, MUTED, MARGIN, y, &line)?;
                }
            }
            DocumentBlock::Spacer => {
                page.reserve(10.0);
            }
        }
    }

    Ok(page.finish())
}

/// Fixed object numbers; pages start after these.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_REGULAR_ID: usize = 3;
const FONT_BOLD_ID: usize = 4;
const INFO_ID: usize = 5;
const FIRST_PAGE_ID: usize = 6;

/// Assemble objects, cross-reference table and trailer.
fn serialize(title: &str, pages: &[String]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| FIRST_PAGE_ID + 2 * i).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects: Vec<String> = vec![
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
        format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Title ({}) /Producer (glucorisk) >>",
            escape_text(title)
        ),
    ];

    for (content, page_id) in pages.iter().zip(&page_ids) {
        objects.push(format!(
            "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
             /Resources << /Font << /{} {FONT_REGULAR_ID} 0 R /{} {FONT_BOLD_ID} 0 R >> >> \
             /Contents {} 0 R >>",
            Font::Regular.resource(),
            Font::Bold.resource(),
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ));
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.extend_from_slice(xref.as_bytes());
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R /Info {INFO_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> ReportDocument {
        let mut doc = ReportDocument::new("Sample (Report)");
        doc.push(DocumentBlock::Title("Sample (Report)".into()))
            .push(DocumentBlock::Field {
                label: "Glucose Level".into(),
                value: "148".into(),
            })
            .push(DocumentBlock::Bar {
                label: "At Risk".into(),
                percent: 71.82,
                color: (244, 63, 94),
            })
            .push(DocumentBlock::Notice("Footnote".into()));
        doc
    }

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_pdf_structure() {
        let bytes = PdfWriter::new().write(&sample_document()).expect("Should write");
        let text = as_text(&bytes);

        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("(Sample \\(Report\\)) Tj"));
        assert!(text.contains("(148) Tj"));
        assert!(text.contains("(71.82%) Tj"));
        assert_eq!(text.matches("/Type /Page /Parent").count(), 1);
    }

    #[test]
    fn test_startxref_points_at_xref_table() {
        let bytes = PdfWriter::new().write(&sample_document()).expect("Should write");
        let text = as_text(&bytes);

        let tail = text.rsplit("startxref\n").next().expect("startxref present");
        let offset: usize = tail
            .lines()
            .next()
            .and_then(|l| l.trim().parse().ok())
            .expect("numeric offset");
        assert!(bytes[offset..].starts_with(b"xref\n"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = PdfWriter::new().write(&sample_document()).expect("Should write");
        let text = as_text(&bytes);

        let xref = text.split("xref\n").nth(1).expect("xref table");
        let entries: Vec<usize> = xref
            .lines()
            .skip(2) // header and free entry
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().expect("offset"))
            .collect();
        assert!(!entries.is_empty());
        for (i, offset) in entries.iter().enumerate() {
            let header = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(header.as_bytes()));
        }
    }

    #[test]
    fn test_deterministic_output() {
        let writer = PdfWriter::new();
        let a = writer.write(&sample_document()).expect("Should write");
        let b = writer.write(&sample_document()).expect("Should write");
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_documents_paginate() {
        let mut doc = ReportDocument::new("Long");
        for i in 0..120 {
            doc.push(DocumentBlock::Field {
                label: format!("Row {i}"),
                value: i.to_string(),
            });
        }
        let bytes = PdfWriter::new().write(&doc).expect("Should write");
        let text = as_text(&bytes);

        let pages = text.matches("/Type /Page /Parent").count();
        assert!(pages >= 3, "expected several pages, got {pages}");
        assert!(text.contains(&format!("/Count {pages}")));
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let bytes = PdfWriter::new()
            .write(&ReportDocument::new("Empty"))
            .expect("Should write");
        assert_eq!(as_text(&bytes).matches("/Type /Page /Parent").count(), 1);
    }

    #[test]
    fn test_escape_and_wrap() {
        assert_eq!(escape_text(r"a\b(c)"), r"a\\b\(c\)");
        assert_eq!(escape_text("µg"), "?g");

        let lines = wrap(&"word ".repeat(60), Font::Regular, 11.0, TEXT_WIDTH);
        assert!(lines.len() > 1);
        assert!(lines
            .iter()
            .all(|l| Font::Regular.text_width(l, 11.0) <= TEXT_WIDTH));
        assert_eq!(lines.join(" "), "word ".repeat(60).trim_end());
    }

    #[test]
    fn test_glyph_metrics() {
        // "Wi" is 944 + 222 units in Helvetica, 944 + 278 in Helvetica-Bold.
        assert!((Font::Regular.text_width("Wi", 10.0) - 11.66).abs() < 1e-9);
        assert!((Font::Bold.text_width("Wi", 10.0) - 12.22).abs() < 1e-9);
        assert_eq!(
            Font::Regular.text_width("µ", 10.0),
            Font::Regular.text_width("?", 10.0)
        );
    }

    #[test]
    fn test_long_field_value_wraps_inside_value_column() {
        let digits = "1".repeat(301);
        let lines = wrap(&digits, Font::Bold, 11.0, VALUE_WIDTH);
        assert!(lines.len() > 1);
        assert!(lines
            .iter()
            .all(|l| Font::Bold.text_width(l, 11.0) <= VALUE_WIDTH));
        assert_eq!(lines.concat(), digits);

        let mut doc = ReportDocument::new("Wide");
        doc.push(DocumentBlock::Field {
            label: "Glucose Level".into(),
            value: digits,
        });
        let text = as_text(&PdfWriter::new().write(&doc).expect("Should write"));
        let drawn = text.matches(" Tj ET").count();
        assert_eq!(drawn, 1 + lines.len());
    }
}
