//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Scoring and report export, synchronously on each keypress

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::ArtifactLoader;
use crate::application::{export_document, ReportRenderer, RiskEngine};
use crate::config::AppConfig;
use crate::GlucoriskError;

use super::ui::{
    form::{render_form, FormState},
    render_disclaimer,
    result::{render_result, ExportStatus, ResultState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,

    /// Built once at startup, never mutated
    engine: RiskEngine,
    renderer: ReportRenderer,
    report_dir: PathBuf,

    form_state: FormState,
    result_state: ResultState,

    /// Set when an error means the deployment is broken; ends the session
    fatal: Option<String>,
}

impl App {
    /// Load and verify the model artifacts named by `config`.
    ///
    /// # Errors
    /// Returns error if the artifacts are missing, corrupt, unsigned while a
    /// trusted key is configured, or disagree with the feature layout.
    pub fn new(config: AppConfig) -> Result<Self> {
        let loader = match &config.trusted_key_b64 {
            Some(key) => ArtifactLoader::with_trusted_key_b64(key)?,
            None => ArtifactLoader::new(),
        };

        let artifacts = loader.load(&config.model_dir).map_err(|e| {
            anyhow!(
                "Failed to load model from {:?}: {}. Set GLUCORISK_MODEL_PATH to a directory containing scaler.json, model.json and manifest.json.",
                config.model_dir,
                e
            )
        })?;
        let engine = RiskEngine::from_artifacts(artifacts)?;

        Ok(Self::with_dependencies(
            engine,
            ReportRenderer::new(config.outputs),
            config.report_dir,
        ))
    }

    /// Create the application from pre-built parts.
    #[must_use]
    pub fn with_dependencies(engine: RiskEngine, renderer: ReportRenderer, report_dir: PathBuf) -> Self {
        Self {
            screen: Screen::Form,
            should_quit: false,
            engine,
            renderer,
            report_dir,
            form_state: FormState::default(),
            result_state: ResultState::default(),
            fatal: None,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Form => render_form(f, chunks[0], &self.form_state),
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        match self.fatal.take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Form => self.handle_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.form_state.prev_field();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.form_state.next_field();
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.form_state.load_sample_data();
            }
            KeyCode::Char(c) => {
                self.form_state.input_char(c);
            }
            KeyCode::Backspace => {
                self.form_state.delete_char();
            }
            KeyCode::Delete => {
                self.form_state.clear_field();
            }
            KeyCode::Enter => {
                self.submit_form();
            }
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.screen = Screen::Form;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form_state = FormState::default();
                self.result_state = ResultState::Empty;
                self.screen = Screen::Form;
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.export_report();
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let features = match self
            .form_state
            .to_feature_input()
            .and_then(|input| self.engine.assemble(&input).map_err(|e| e.to_string()))
        {
            Ok(features) => features,
            Err(message) => {
                self.form_state.error_message = Some(message);
                return;
            }
        };

        let outcome = self.engine.evaluate(&features).and_then(|evaluation| {
            let report = self.renderer.render(&evaluation, Utc::now())?;
            Ok(ResultState::Scored {
                evaluation,
                report,
                export: None,
            })
        });

        let outcome = match outcome {
            Err(GlucoriskError::Capability(reason)) => {
                tracing::warn!("Falling back to hard label: {}", reason);
                self.engine
                    .classify_only(&features)
                    .map(|predicted_class| ResultState::LabelOnly {
                        features,
                        predicted_class,
                    })
            }
            other => other,
        };

        match outcome {
            Ok(state) => self.result_state = state,
            Err(e) => self.fail(e),
        }
        self.screen = Screen::Result;
        self.form_state.clear_sensitive();
    }

    /// Show a request-scoped error; anything else ends the session.
    fn fail(&mut self, err: GlucoriskError) {
        if err.is_request_scoped() {
            tracing::warn!("Request failed: {}", err);
            self.result_state = ResultState::Error {
                message: err.to_string(),
            };
        } else {
            tracing::error!("Unrecoverable error: {}", err);
            self.fatal = Some(err.to_string());
            self.should_quit = true;
        }
    }

    fn export_report(&mut self) {
        let ResultState::Scored { report, export, .. } = &mut self.result_state else {
            return;
        };
        let Some(document) = &report.document else {
            return;
        };

        *export = Some(match export_document(document, &self.report_dir) {
            Ok(path) => ExportStatus::Saved(path),
            Err(e) => {
                tracing::error!("Report export failed: {}", e);
                ExportStatus::Failed(e.to_string())
            }
        });
    }
}
