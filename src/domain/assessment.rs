//! Prediction and risk tier types.
//!
//! Represents the output of the diabetes classifier and its interpretation.

use crate::{GlucoriskError, Result};

/// Tier boundaries on the positive-class percentage. Intervals are
/// closed-open: a boundary value belongs to the higher tier.
pub const MEDIUM_RISK_FROM_PERCENT: f64 = 30.0;
pub const HIGH_RISK_FROM_PERCENT: f64 = 70.0;

/// Allowed deviation of `p0 + p1` from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Risk tier for diabetes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    /// Below 30%
    Low,
    /// 30% up to (not including) 70%
    Medium,
    /// 70% and above
    High,
}

impl RiskTier {
    /// Map a percentage (already rounded to two decimals) to a tier.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < MEDIUM_RISK_FROM_PERCENT {
            Self::Low
        } else if percentage < HIGH_RISK_FROM_PERCENT {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Short label used in banners and reports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk of Diabetes",
            Self::Medium => "Moderate Risk of Diabetes",
            Self::High => "High Risk of Diabetes",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "No significant indicators in the supplied measurements",
            Self::Medium => "Some indicators present - follow-up recommended",
            Self::High => "Strong indicators present - consultation advised",
        }
    }

    /// Get the associated color (RGB) for banners, bars and documents.
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129),     // Emerald (#10B981)
            Self::Medium => (251, 191, 36),  // Amber (#FBBF24)
            Self::High => (244, 63, 94),     // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Result of the classifier (before interpretation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    /// Hard label from the classifier (true = at risk)
    pub predicted_class: bool,

    /// Probability of class 1
    pub probability_positive: f64,

    /// Probability of class 0
    pub probability_negative: f64,
}

impl PredictionResult {
    /// Create a result from the classifier's label and probability pair.
    ///
    /// # Errors
    /// Returns `ModelArtifact` if the probabilities are not a valid
    /// distribution; that can only come from a broken model.
    pub fn new(predicted_class: bool, probability_negative: f64, probability_positive: f64) -> Result<Self> {
        let in_range = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !in_range(probability_negative) || !in_range(probability_positive) {
            return Err(GlucoriskError::ModelArtifact(format!(
                "classifier returned probabilities outside [0, 1]: ({probability_negative}, {probability_positive})"
            )));
        }
        if (probability_negative + probability_positive - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(GlucoriskError::ModelArtifact(format!(
                "classifier probabilities do not sum to 1: ({probability_negative}, {probability_positive})"
            )));
        }

        Ok(Self {
            predicted_class,
            probability_positive,
            probability_negative,
        })
    }

    /// Probability of the predicted class.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        if self.predicted_class {
            self.probability_positive
        } else {
            self.probability_negative
        }
    }

    /// Positive-class probability as a percentage rounded to 2 decimals.
    #[must_use]
    pub fn percentage_positive(&self) -> f64 {
        round2(self.probability_positive * 100.0)
    }
}

/// Interpreted risk for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub tier: RiskTier,

    /// Positive-class percentage, rounded to two decimals
    pub percentage: f64,

    pub label: String,
}

impl RiskAssessment {
    /// Derive the assessment from a prediction using the fixed tier table.
    #[must_use]
    pub fn from_prediction(prediction: &PredictionResult) -> Self {
        let percentage = prediction.percentage_positive();
        let tier = RiskTier::from_percentage(percentage);
        Self {
            tier,
            percentage,
            label: tier.label().to_string(),
        }
    }
}
