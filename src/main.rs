//! Glucorisk: Diabetes risk assessment
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glucorisk::adapters::sanitize::SanitizingMakeWriter;
use glucorisk::tui::App;
use glucorisk::AppConfig;

fn main() -> Result<()> {
    // Logs on the terminal would corrupt the TUI, so an interactive session
    // logs to a file and a non-interactive one to stdout.
    let log_mode = std::env::var("GLUCORISK_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("GLUCORISK_LOG_FILE").unwrap_or_else(|_| "glucorisk.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Glucorisk...");

    let config = AppConfig::from_env()?;
    let mut app = App::new(config)?;
    app.run()?;

    tracing::info!("Glucorisk shutdown complete.");
    Ok(())
}
