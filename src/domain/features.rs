//! Feature vector types for diabetes risk prediction.
//!
//! Based on the Pima Indians Diabetes dataset measurements. The scaler and
//! classifier artifacts were fitted on this exact column order.

use crate::{GlucoriskError, Result};

/// Number of measurements the model consumes.
pub const FEATURE_COUNT: usize = 8;

/// Canonical feature order shared by the form, the assembler and the
/// artifact loader.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "pregnancies",
    "glucose",
    "blood_pressure",
    "skin_thickness",
    "insulin",
    "bmi",
    "diabetes_pedigree_function",
    "age",
];

/// Check that a fitted stage uses the canonical feature layout.
///
/// # Errors
/// Returns `DimensionMismatch` for a different count and `ModelArtifact`
/// for the right count in a different order.
pub fn check_feature_layout(stage: &'static str, names: &[String]) -> Result<()> {
    if names.len() != FEATURE_COUNT {
        return Err(GlucoriskError::DimensionMismatch {
            stage,
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }
    for (i, (found, expected)) in names.iter().zip(FEATURE_NAMES).enumerate() {
        if found != expected {
            return Err(GlucoriskError::ModelArtifact(format!(
                "{stage}: feature order mismatch at position {i}: expected {expected}, found {found}"
            )));
        }
    }
    Ok(())
}

/// One of the eight clinical measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Number of times pregnant
    Pregnancies,
    /// Plasma glucose concentration (2h oral glucose tolerance test)
    Glucose,
    /// Diastolic blood pressure (mm Hg)
    BloodPressure,
    /// Triceps skin fold thickness (mm)
    SkinThickness,
    /// 2-hour serum insulin (mu U/ml)
    Insulin,
    /// Body mass index (kg/m^2)
    Bmi,
    /// Diabetes pedigree function
    DiabetesPedigreeFunction,
    /// Age in years
    Age,
}

impl Feature {
    /// All features in canonical order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Pregnancies,
        Feature::Glucose,
        Feature::BloodPressure,
        Feature::SkinThickness,
        Feature::Insulin,
        Feature::Bmi,
        Feature::DiabetesPedigreeFunction,
        Feature::Age,
    ];

    /// Position in the canonical vector.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Machine name, as stored in the artifacts.
    #[must_use]
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pregnancies => "Pregnancies",
            Self::Glucose => "Glucose Level",
            Self::BloodPressure => "Blood Pressure",
            Self::SkinThickness => "Skin Thickness",
            Self::Insulin => "Insulin Level",
            Self::Bmi => "BMI",
            Self::DiabetesPedigreeFunction => "Diabetes Pedigree Function",
            Self::Age => "Age",
        }
    }

    /// Unit hint for input forms.
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            Self::Pregnancies => "count",
            Self::Glucose => "mg/dL (2h OGTT)",
            Self::BloodPressure => "mmHg (diastolic)",
            Self::SkinThickness => "mm (triceps fold)",
            Self::Insulin => "mu U/ml (2h serum)",
            Self::Bmi => "kg/m^2",
            Self::DiabetesPedigreeFunction => "score",
            Self::Age => "years",
        }
    }

    /// Look up a feature by its machine name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw measurements as collected from the user. Missing values stay `None`
/// until assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureInput {
    values: [Option<f64>; FEATURE_COUNT],
}

impl FeatureInput {
    /// Create an input with every measurement missing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.values[feature.index()] = Some(value);
        self
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        self.values[feature.index()] = value;
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    /// Build an input from `(name, value)` pairs.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown feature name.
    pub fn from_named<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<f64>)>,
    {
        let mut input = Self::new();
        for (name, value) in pairs {
            let feature = Feature::from_name(name).ok_or_else(|| GlucoriskError::InvalidInput {
                field: name.to_string(),
                reason: "unknown measurement".to_string(),
            })?;
            input.set(feature, value);
        }
        Ok(input)
    }

    /// Parse one text field. Blank text is a missing value.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the text is not a number or the number is
    /// negative or non-finite.
    pub fn parse_field(feature: Feature, raw: &str) -> Result<Option<f64>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value: f64 = trimmed.parse().map_err(|_| GlucoriskError::InvalidInput {
            field: feature.label().to_string(),
            reason: "not a number".to_string(),
        })?;
        check_measurement(feature, value)?;
        Ok(Some(value))
    }
}

fn check_measurement(feature: Feature, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(GlucoriskError::InvalidInput {
            field: feature.label().to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(GlucoriskError::InvalidInput {
            field: feature.label().to_string(),
            reason: format!("must be non-negative (got {value})"),
        });
    }
    Ok(())
}

/// Eight measurements in canonical order. Every value is finite and
/// non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Assemble a vector from user input. Missing measurements become 0.0.
    ///
    /// No clinical range checks are applied.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a negative or non-finite measurement.
    pub fn assemble(input: &FeatureInput) -> Result<Self> {
        let mut values = [0.0; FEATURE_COUNT];
        for feature in Feature::ALL {
            let value = input.get(feature).unwrap_or(0.0);
            check_measurement(feature, value)?;
            values[feature.index()] = value;
        }
        Ok(Self { values })
    }

    /// Build a vector from a slice in canonical order.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the slice is not 8 long, or
    /// `InvalidInput` for a negative or non-finite value.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(GlucoriskError::DimensionMismatch {
                stage: "feature vector",
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        let mut input = FeatureInput::new();
        for (feature, value) in Feature::ALL.into_iter().zip(values) {
            input.set(feature, Some(*value));
        }
        Self::assemble(&input)
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Iterate `(feature, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.values[f.index()]))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Magnitudes outside `[PLAIN_MIN, PLAIN_MAX)` are printed in exponent form.
const PLAIN_MAX: f64 = 1e9;
const PLAIN_MIN: f64 = 1e-4;

/// Display form of a measurement, at most 24 characters for any finite
/// value.
#[must_use]
pub fn format_measurement(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && !(PLAIN_MIN..PLAIN_MAX).contains(&magnitude) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Output of the scaling transform. Arity follows the scaler; values are
/// unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledVector {
    values: Vec<f64>,
}

impl ScaledVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
