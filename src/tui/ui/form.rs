//! Measurement input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{Feature, FeatureInput};
use crate::tui::styles::MedicalTheme;

/// One text field bound to a measurement.
#[derive(Debug, Clone)]
pub struct FormField {
    pub feature: Feature,
    pub value: String,
}

/// Form state
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            fields: Feature::ALL
                .into_iter()
                .map(|feature| FormField {
                    feature,
                    value: String::new(),
                })
                .collect(),
            selected_field: 0,
            error_message: None,
        }
    }
}

/// Sample patient in canonical order.
const SAMPLE: [&str; 8] = ["6", "148", "72", "35", "0", "33.6", "0.627", "50"];

impl FormState {
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    pub fn input_char(&mut self, c: char) {
        if c.is_ascii_digit() || c == '.' || c == '-' {
            self.fields[self.selected_field].value.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].value.pop();
    }

    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.zeroize();
    }

    /// Wipe every field buffer.
    pub fn clear_sensitive(&mut self) {
        for field in self.fields.iter_mut() {
            field.value.zeroize();
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Parse every field. Blank fields stay missing.
    ///
    /// # Errors
    /// Returns the message of the first field that fails to parse.
    pub fn to_feature_input(&self) -> Result<FeatureInput, String> {
        let mut input = FeatureInput::new();
        for field in &self.fields {
            let value =
                FeatureInput::parse_field(field.feature, &field.value).map_err(|e| e.to_string())?;
            input.set(field.feature, value);
        }
        Ok(input)
    }

    pub fn load_sample_data(&mut self) {
        for (field, value) in self.fields.iter_mut().zip(SAMPLE) {
            field.value = value.to_string();
        }
        self.error_message = None;
    }
}

/// Render the measurement form
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Fields
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Diabetes Risk Assessment", MedicalTheme::title()),
        Span::styled(
            " │ Enter the patient's measurements (blank = 0)",
            MedicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (MedicalTheme::border_focused(), MedicalTheme::focused())
        } else {
            (MedicalTheme::border(), MedicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.feature.label()), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.feature.hint(), MedicalTheme::text_muted())
        } else {
            Span::styled(field.value.as_str(), MedicalTheme::text())
        };

        let cursor = if is_selected {
            Span::styled("▌", MedicalTheme::cursor())
        } else {
            Span::raw("")
        };

        let content = Paragraph::new(Line::from(vec![Span::raw(" "), value_display, cursor]))
            .block(block);

        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled(err.clone(), MedicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", MedicalTheme::key_hint()),
            Span::styled("Navigate ", MedicalTheme::key_desc()),
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Predict ", MedicalTheme::key_desc()),
            Span::styled("[S] ", MedicalTheme::key_hint()),
            Span::styled("Sample Data ", MedicalTheme::key_desc()),
            Span::styled("[Del] ", MedicalTheme::key_hint()),
            Span::styled("Clear Field ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_follow_canonical_order() {
        let state = FormState::default();
        let order: Vec<Feature> = state.fields.iter().map(|f| f.feature).collect();
        assert_eq!(order, Feature::ALL.to_vec());
    }

    #[test]
    fn test_blank_fields_are_missing() {
        let mut state = FormState::default();
        state.fields[1].value = "120".into();

        let input = state.to_feature_input().expect("Should parse");
        assert_eq!(input.get(Feature::Glucose), Some(120.0));
        assert_eq!(input.get(Feature::Age), None);
    }

    #[test]
    fn test_invalid_field_reports_label() {
        let mut state = FormState::default();
        state.fields[5].value = "3..1".into();

        let err = state.to_feature_input().expect_err("Should reject");
        assert!(err.contains("BMI"));
    }

    #[test]
    fn test_negative_value_rejected() {
        let mut state = FormState::default();
        state.selected_field = 7;
        for c in "-4".chars() {
            state.input_char(c);
        }
        let err = state.to_feature_input().expect_err("Should reject");
        assert!(err.contains("Age"));
    }

    #[test]
    fn test_input_editing() {
        let mut state = FormState::default();
        state.input_char('1');
        state.input_char('x');
        state.input_char('2');
        assert_eq!(state.fields[0].value, "12");

        state.delete_char();
        assert_eq!(state.fields[0].value, "1");

        state.clear_field();
        assert!(state.fields[0].value.is_empty());

        state.prev_field();
        assert_eq!(state.selected_field, 7);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_sample_and_clear() {
        let mut state = FormState::default();
        state.load_sample_data();
        let input = state.to_feature_input().expect("Should parse");
        assert_eq!(input.get(Feature::DiabetesPedigreeFunction), Some(0.627));

        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| f.value.is_empty()));
        assert_eq!(state.selected_field, 0);
    }
}
