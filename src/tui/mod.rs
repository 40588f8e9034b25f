//! TUI module: Terminal User Interface using Ratatui.
//!
//! Two screens:
//! - Measurement form
//! - Result view with banner, probability chart and PDF export

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
