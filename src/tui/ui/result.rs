//! Result view: banner, probability gauge, class chart and input summary.

use std::path::PathBuf;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::application::{ProbabilityChart, RenderedReport};
use crate::domain::{format_measurement, FeatureVector};
use crate::tui::styles::MedicalTheme;
use crate::Evaluation;

/// Outcome of the last document export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Saved(PathBuf),
    Failed(String),
}

/// Result screen state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    #[default]
    Empty,
    /// Full probabilistic result
    Scored {
        evaluation: Evaluation,
        report: RenderedReport,
        export: Option<ExportStatus>,
    },
    /// Classifier without probabilities: hard label only
    LabelOnly {
        features: FeatureVector,
        predicted_class: bool,
    },
    Error {
        message: String,
    },
}

pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_result_header(f, chunks[0]);
    match state {
        ResultState::Empty => render_message(f, chunks[1], "No assessment yet", false),
        ResultState::Scored {
            evaluation, report, ..
        } => render_scored(f, chunks[1], evaluation, report),
        ResultState::LabelOnly {
            features,
            predicted_class,
        } => render_label_only(f, chunks[1], features, *predicted_class),
        ResultState::Error { message } => render_message(f, chunks[1], message, true),
    }
    render_result_footer(f, chunks[2], state);
}

fn render_result_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Assessment Result", MedicalTheme::title()),
        Span::styled(" │ Logistic risk model", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_scored(f: &mut Frame, area: Rect, evaluation: &Evaluation, report: &RenderedReport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if report.banner.is_some() { 4 } else { 0 }),
            Constraint::Length(3), // Gauge
            Constraint::Min(0),    // Chart + inputs
        ])
        .split(area);

    if let Some(banner) = &report.banner {
        let text = vec![
            Line::from(Span::styled(
                format!(" {} ", banner.text()),
                MedicalTheme::banner(banner.color),
            )),
            Line::from(Span::styled(
                format!(
                    "{} (confidence {:.2}%)",
                    banner.tier.description(),
                    banner.confidence
                ),
                MedicalTheme::text_secondary(),
            )),
        ];
        let widget = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM).border_style(MedicalTheme::border()));
        f.render_widget(widget, chunks[0]);
    }

    let assessment = &evaluation.assessment;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    " Probability of Diabetes ",
                    MedicalTheme::text_secondary(),
                ))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::risk_tier(assessment.tier))
        .ratio(evaluation.prediction.probability_positive.clamp(0.0, 1.0))
        .label(format!("{:.2}% │ {}", assessment.percentage, assessment.tier));
    f.render_widget(gauge, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    match &report.chart {
        Some(chart) => render_chart(f, body[0], chart),
        None => render_message(f, body[0], "Chart output disabled", false),
    }
    render_inputs(f, body[1], &evaluation.features);
}

fn render_chart(f: &mut Frame, area: Rect, chart: &ProbabilityChart) {
    // Hundredths of a percent keep two decimals in the u64 bar values.
    let bars: Vec<Bar> = chart
        .bars
        .iter()
        .map(|bar| {
            Bar::default()
                .value((bar.value * 100.0).round() as u64)
                .text_value(format!("{:.2}%", bar.value))
                .label(Line::from(bar.label))
                .style(Style::default().fg(MedicalTheme::rgb(bar.color)))
                .value_style(MedicalTheme::banner(bar.color))
        })
        .collect();

    let widget = BarChart::default()
        .block(
            Block::default()
                .title(Span::styled(format!(" {} ", chart.y_label), MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .data(BarGroup::default().bars(&bars))
        .max(10_000)
        .bar_width(14)
        .bar_gap(4);
    f.render_widget(widget, area);
}

fn render_inputs(f: &mut Frame, area: Rect, features: &FeatureVector) {
    let lines: Vec<Line> = features
        .iter()
        .map(|(feature, value)| {
            Line::from(vec![
                Span::styled(format!("{:<28}", feature.label()), MedicalTheme::text_secondary()),
                Span::styled(format_measurement(value), MedicalTheme::text()),
            ])
        })
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(" Measurements ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(widget, area);
}

fn render_label_only(f: &mut Frame, area: Rect, features: &FeatureVector, predicted_class: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let (label, style) = if predicted_class {
        ("At Risk of Diabetes", MedicalTheme::danger())
    } else {
        ("Not At Risk of Diabetes", MedicalTheme::success())
    };

    let text = vec![
        Line::from(Span::styled(label, style.add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(
            "This model provides no probabilities, so no risk tier or report is available.",
            MedicalTheme::text_muted(),
        )),
    ];
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(MedicalTheme::border()));
    f.render_widget(widget, chunks[0]);

    render_inputs(f, chunks[1], features);
}

fn render_message(f: &mut Frame, area: Rect, message: &str, is_error: bool) {
    let (title, border) = if is_error {
        (Span::styled("! Error", MedicalTheme::danger()), MedicalTheme::danger())
    } else {
        (Span::raw(""), MedicalTheme::border())
    };

    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(title),
        Line::from(""),
        Line::from(Span::styled(message, MedicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(border));

    f.render_widget(content, area);
}

fn render_result_footer(f: &mut Frame, area: Rect, state: &ResultState) {
    let mut spans = Vec::new();

    if let ResultState::Scored { report, export, .. } = state {
        match export {
            Some(ExportStatus::Saved(path)) => spans.push(Span::styled(
                format!("Saved {} ", path.display()),
                MedicalTheme::success(),
            )),
            Some(ExportStatus::Failed(message)) => spans.push(Span::styled(
                format!("! {message} "),
                MedicalTheme::danger(),
            )),
            None => {}
        }
        if report.document.is_some() {
            spans.push(Span::styled("[D] ", MedicalTheme::key_hint()));
            spans.push(Span::styled("Download PDF ", MedicalTheme::key_desc()));
        }
    }

    spans.extend([
        Span::styled("[N] ", MedicalTheme::key_hint()),
        Span::styled("New Assessment ", MedicalTheme::key_desc()),
        Span::styled("[Esc] ", MedicalTheme::key_hint()),
        Span::styled("Back", MedicalTheme::key_desc()),
    ]);

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}
