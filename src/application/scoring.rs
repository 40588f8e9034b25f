//! Scoring pipeline: assemble, scale, classify, interpret.
//!
//! The engine is built once at startup from the loaded artifacts and is
//! immutable afterwards. Every call builds its own vectors and results.

use std::sync::Arc;

use crate::adapters::{LinearClassifierArtifact, LoadedArtifacts, StandardScalerArtifact};
use crate::domain::{
    check_feature_layout, FeatureInput, FeatureVector, PredictionResult, RiskAssessment,
    ScaledVector,
};
use crate::ports::{Classifier, Scaler};
use crate::{GlucoriskError, Result};

/// Everything produced by one scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub assessment: RiskAssessment,
}

/// Scaler and classifier pair, checked against the canonical feature
/// layout.
pub struct RiskEngine<S = StandardScalerArtifact, C = LinearClassifierArtifact>
where
    S: Scaler,
    C: Classifier,
{
    scaler: Arc<S>,
    classifier: Arc<C>,
}

impl<S: Scaler, C: Classifier> Clone for RiskEngine<S, C> {
    fn clone(&self) -> Self {
        Self {
            scaler: Arc::clone(&self.scaler),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<S: Scaler, C: Classifier> RiskEngine<S, C> {
    /// Build an engine after checking that both stages agree with the
    /// canonical feature layout.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` for a width disagreement and
    /// `ModelArtifact` for an order disagreement.
    pub fn new(scaler: Arc<S>, classifier: Arc<C>) -> Result<Self> {
        check_feature_layout("scaler", scaler.feature_names())?;
        check_feature_layout("classifier", classifier.feature_names())?;

        Ok(Self { scaler, classifier })
    }

    /// Turn raw input into a canonical vector.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a negative or non-finite value.
    pub fn assemble(&self, input: &FeatureInput) -> Result<FeatureVector> {
        FeatureVector::assemble(input)
    }

    /// Apply the fitted scaler.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the scaler output width is not 8.
    pub fn scale(&self, features: &FeatureVector) -> Result<ScaledVector> {
        let scaled = self.scaler.transform(features)?;
        if scaled.len() != features.len() {
            return Err(GlucoriskError::DimensionMismatch {
                stage: "scaler",
                expected: features.len(),
                actual: scaled.len(),
            });
        }
        Ok(scaled)
    }

    /// Classify a scaled vector and return the probability pair.
    ///
    /// # Errors
    /// - `DimensionMismatch` if the classifier width differs from the input
    /// - `Capability` if the classifier has no probabilistic output
    /// - `ModelArtifact` if the probabilities are not a distribution
    pub fn score(&self, scaled: &ScaledVector) -> Result<PredictionResult> {
        self.check_classifier_width(scaled)?;

        let predicted_class = self.classifier.predict(scaled)?;
        let (p0, p1) = self.classifier.predict_probabilities(scaled)?.ok_or_else(|| {
            GlucoriskError::Capability(
                "classifier provides only hard labels, risk tiers need probabilities".to_string(),
            )
        })?;

        PredictionResult::new(predicted_class, p0, p1)
    }

    /// Full pass from an assembled vector to an interpreted assessment.
    ///
    /// # Errors
    /// See [`RiskEngine::scale`] and [`RiskEngine::score`].
    pub fn evaluate(&self, features: &FeatureVector) -> Result<Evaluation> {
        let scaled = self.scale(features)?;
        let prediction = self.score(&scaled)?;
        let assessment = RiskAssessment::from_prediction(&prediction);

        tracing::info!(
            tier = %assessment.tier,
            predicted_class = prediction.predicted_class,
            "Scored risk assessment"
        );

        Ok(Evaluation {
            features: *features,
            prediction,
            assessment,
        })
    }

    /// Assemble and evaluate in one call.
    ///
    /// # Errors
    /// `InvalidInput` for bad input, otherwise see [`RiskEngine::evaluate`].
    pub fn predict(&self, input: &FeatureInput) -> Result<Evaluation> {
        let features = self.assemble(input)?;
        self.evaluate(&features)
    }

    /// Hard label only, for classifiers without probabilities.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` on a width disagreement.
    pub fn classify_only(&self, features: &FeatureVector) -> Result<bool> {
        let scaled = self.scale(features)?;
        self.check_classifier_width(&scaled)?;
        let label = self.classifier.predict(&scaled)?;
        tracing::info!(predicted_class = label, "Classified without probabilities");
        Ok(label)
    }

    fn check_classifier_width(&self, scaled: &ScaledVector) -> Result<()> {
        let expected = self.classifier.n_features();
        if expected != scaled.len() {
            return Err(GlucoriskError::DimensionMismatch {
                stage: "classifier",
                expected,
                actual: scaled.len(),
            });
        }
        Ok(())
    }
}

impl RiskEngine {
    /// Build the engine from a verified model directory.
    ///
    /// # Errors
    /// See [`RiskEngine::new`].
    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Result<Self> {
        Self::new(Arc::new(artifacts.scaler), Arc::new(artifacts.classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ArtifactLoader, ClassifierKind};
    use crate::domain::{Feature, RiskTier, FEATURE_COUNT, FEATURE_NAMES, PROBABILITY_TOLERANCE};
    use std::path::Path;

    fn bundled_engine() -> RiskEngine {
        let artifacts = ArtifactLoader::new()
            .load(Path::new("models"))
            .expect("Should load bundled models");
        RiskEngine::from_artifacts(artifacts).expect("Should build engine")
    }

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn identity_scaler() -> StandardScalerArtifact {
        StandardScalerArtifact {
            feature_names: names(),
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }

    fn linear(kind: ClassifierKind) -> LinearClassifierArtifact {
        LinearClassifierArtifact {
            kind,
            feature_names: names(),
            coefficients: vec![0.125; FEATURE_COUNT],
            intercept: -1.0,
        }
    }

    fn positive_input() -> FeatureInput {
        FeatureInput::from_named([
            ("pregnancies", Some(6.0)),
            ("glucose", Some(148.0)),
            ("blood_pressure", Some(72.0)),
            ("skin_thickness", Some(35.0)),
            ("insulin", Some(0.0)),
            ("bmi", Some(33.6)),
            ("diabetes_pedigree_function", Some(0.627)),
            ("age", Some(50.0)),
        ])
        .expect("Should build input")
    }

    fn negative_input() -> FeatureInput {
        FeatureInput::new()
            .with(Feature::Pregnancies, 1.0)
            .with(Feature::Glucose, 85.0)
            .with(Feature::BloodPressure, 66.0)
            .with(Feature::SkinThickness, 29.0)
            .with(Feature::Insulin, 0.0)
            .with(Feature::Bmi, 26.6)
            .with(Feature::DiabetesPedigreeFunction, 0.351)
            .with(Feature::Age, 31.0)
    }

    #[test]
    fn test_positive_case() {
        let engine = bundled_engine();
        let evaluation = engine.predict(&positive_input()).expect("Should score");

        assert!(evaluation.prediction.predicted_class);
        assert_eq!(
            evaluation.assessment.tier,
            RiskTier::from_percentage(evaluation.prediction.percentage_positive())
        );
        assert_eq!(
            evaluation.assessment.percentage,
            evaluation.prediction.percentage_positive()
        );
        assert_eq!(evaluation.assessment.label, evaluation.assessment.tier.label());
    }

    #[test]
    fn test_negative_case() {
        let engine = bundled_engine();
        let evaluation = engine.predict(&negative_input()).expect("Should score");

        assert!(!evaluation.prediction.predicted_class);
        assert!(evaluation.prediction.probability_positive < 0.3);
        assert_eq!(evaluation.assessment.tier, RiskTier::Low);
    }

    #[test]
    fn test_deterministic() {
        let engine = bundled_engine();
        let a = engine.predict(&positive_input()).expect("Should score");
        let b = engine.predict(&positive_input()).expect("Should score");
        assert_eq!(a, b);
    }

    #[test]
    fn test_probabilities_normalized() {
        let engine = bundled_engine();
        for input in [positive_input(), negative_input(), FeatureInput::new()] {
            let p = engine.predict(&input).expect("Should score").prediction;
            let sum = p.probability_negative + p.probability_positive;
            assert!((sum - 1.0).abs() <= PROBABILITY_TOLERANCE);
        }
    }

    #[test]
    fn test_missing_inputs_score_as_zero() {
        let engine = bundled_engine();
        let blank = engine.predict(&FeatureInput::new()).expect("Should score");
        let zeros = engine
            .evaluate(&FeatureVector::from_slice(&[0.0; FEATURE_COUNT]).expect("Should build"))
            .expect("Should score");
        assert_eq!(blank, zeros);
    }

    #[test]
    fn test_scaled_arity_preserved() {
        let engine = bundled_engine();
        let features = engine.assemble(&positive_input()).expect("Should assemble");
        let scaled = engine.scale(&features).expect("Should scale");
        assert_eq!(scaled.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let engine = bundled_engine();
        let input = positive_input().with(Feature::Glucose, -1.0);
        let err = engine.predict(&input).expect_err("Should reject");
        assert!(matches!(err, GlucoriskError::InvalidInput { .. }));
    }

    #[test]
    fn test_svc_capability_error_and_label_path() {
        let engine = RiskEngine::new(
            Arc::new(identity_scaler()),
            Arc::new(linear(ClassifierKind::LinearSvc)),
        )
        .expect("Should build engine");

        let features = FeatureVector::from_slice(&[1.0; FEATURE_COUNT]).expect("Should build");
        let err = engine.evaluate(&features).expect_err("Should need probabilities");
        assert!(matches!(err, GlucoriskError::Capability(_)));

        // 8 * 0.125 * 2 - 1 = 1 > 0
        let features = FeatureVector::from_slice(&[2.0; FEATURE_COUNT]).expect("Should build");
        assert!(engine.classify_only(&features).expect("Should classify"));
    }

    #[test]
    fn test_logistic_engine_matches_sigmoid() {
        let engine = RiskEngine::new(
            Arc::new(identity_scaler()),
            Arc::new(linear(ClassifierKind::LogisticRegression)),
        )
        .expect("Should build engine");

        let features = FeatureVector::from_slice(&[1.0; FEATURE_COUNT]).expect("Should build");
        let evaluation = engine.evaluate(&features).expect("Should score");
        assert_eq!(evaluation.prediction.probability_positive, 0.5);
        assert_eq!(evaluation.assessment.percentage, 50.0);
        assert_eq!(evaluation.assessment.tier, RiskTier::Medium);
    }

    #[test]
    fn test_layout_checked_at_construction() {
        let mut short = identity_scaler();
        short.feature_names.pop();
        short.mean.pop();
        short.scale.pop();
        let err = RiskEngine::new(
            Arc::new(short),
            Arc::new(linear(ClassifierKind::LogisticRegression)),
        )
        .err()
        .expect("Should reject");
        assert!(matches!(
            err,
            GlucoriskError::DimensionMismatch {
                stage: "scaler",
                expected: 8,
                actual: 7
            }
        ));

        let mut swapped = linear(ClassifierKind::LogisticRegression);
        swapped.feature_names.swap(0, 1);
        let err = RiskEngine::new(Arc::new(identity_scaler()), Arc::new(swapped))
            .err()
            .expect("Should reject");
        assert!(matches!(err, GlucoriskError::ModelArtifact(_)));
    }

    /// Classifier whose reported width disagrees with its input.
    struct WideClassifier {
        names: Vec<String>,
    }

    impl Classifier for WideClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn n_features(&self) -> usize {
            9
        }

        fn predict(&self, _x: &ScaledVector) -> Result<bool> {
            Ok(false)
        }

        fn predict_probabilities(&self, _x: &ScaledVector) -> Result<Option<(f64, f64)>> {
            Ok(Some((1.0, 0.0)))
        }
    }

    #[test]
    fn test_classifier_width_mismatch() {
        let engine = RiskEngine::new(
            Arc::new(identity_scaler()),
            Arc::new(WideClassifier { names: names() }),
        )
        .expect("Should build engine");

        let features = FeatureVector::from_slice(&[1.0; FEATURE_COUNT]).expect("Should build");
        let err = engine.evaluate(&features).expect_err("Should reject");
        assert!(matches!(
            err,
            GlucoriskError::DimensionMismatch {
                stage: "classifier",
                expected: 9,
                actual: 8
            }
        ));
    }
}
