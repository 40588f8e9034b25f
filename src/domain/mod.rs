//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O. Everything here is
//! created per request and never mutated after construction.

mod assessment;
mod document;
mod features;

pub use assessment::{
    round2, PredictionResult, RiskAssessment, RiskTier, HIGH_RISK_FROM_PERCENT,
    MEDIUM_RISK_FROM_PERCENT, PROBABILITY_TOLERANCE,
};
pub use document::{DocumentBlock, ReportDocument};
pub use features::{
    check_feature_layout, format_measurement, Feature, FeatureInput, FeatureVector, ScaledVector,
    FEATURE_COUNT, FEATURE_NAMES,
};
