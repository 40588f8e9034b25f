//! # Glucorisk
//!
//! Diabetes risk assessment from eight clinical measurements.
//!
//! A pre-fitted standard scaler and linear classifier (exported as JSON
//! artifacts) turn a patient's measurements into a positive-class
//! probability, which is bucketed into a fixed Low / Medium / High tier and
//! rendered as a banner, a probability chart and a PDF report.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (feature vectors, predictions, risk tiers, documents)
//! - `ports`: Trait definitions for the scaler, classifier and document writer
//! - `adapters`: Concrete implementations (JSON artifacts, PDF writer, log redaction)
//! - `application`: The scoring pipeline and report renderer
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use application::{Evaluation, ReportOptions, ReportRenderer, RiskEngine};
pub use config::AppConfig;
pub use domain::{Feature, FeatureInput, FeatureVector, PredictionResult, RiskAssessment, RiskTier};

/// Result type for Glucorisk operations
pub type Result<T> = std::result::Result<T, GlucoriskError>;

/// Main error type for Glucorisk
#[derive(Debug, thiserror::Error)]
pub enum GlucoriskError {
    /// Artifact missing, unreadable, corrupt or failing its integrity check.
    #[error("Model artifact error: {0}")]
    ModelArtifact(String),

    /// Vector arity disagreement between pipeline stages.
    #[error("Dimension mismatch in {stage}: expected {expected} features, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The classifier cannot produce the output the caller asked for.
    #[error("Classifier capability missing: {0}")]
    Capability(String),

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GlucoriskError {
    /// Whether the error only affects the current request.
    ///
    /// Request-scoped failures are shown to the user; everything else means
    /// the deployment itself is broken.
    #[must_use]
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::Capability(_) | Self::Report(_) | Self::Io(_)
        )
    }
}
