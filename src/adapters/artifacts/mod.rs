//! Artifact adapter: JSON exports of the pre-fitted scaler and classifier.
//!
//! A model directory contains:
//! - `scaler.json`: standard scaler statistics (`mean`, `scale`)
//! - `model.json`: linear classifier weights
//! - `manifest.json`: SHA-256 digest of every artifact file
//! - `model.sig` (optional): Ed25519 signature over `manifest.json`
//!
//! # Security
//!
//! - Every artifact actually loaded MUST be bound by the manifest
//! - A digest mismatch is reported as a corrupt artifact
//! - When a trusted verifying key is configured, the signature is mandatory
//!
//! Artifacts are loaded once at startup and are read-only afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{check_feature_layout, FeatureVector, ScaledVector};
use crate::ports::{Classifier, Scaler};
use crate::{GlucoriskError, Result};

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Files a manifest must bind.
pub const BOUND_FILES: [&str; 2] = [SCALER_FILE, MODEL_FILE];

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn artifact_error(msg: impl Into<String>) -> GlucoriskError {
    GlucoriskError::ModelArtifact(msg.into())
}

fn check_parameters(name: &str, what: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(artifact_error(format!(
            "{name}: {what} has {} entries but feature_names has {expected}",
            values.len()
        )));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(artifact_error(format!(
            "{name}: {what}[{i}] is not a finite number"
        )));
    }
    Ok(())
}

/// Pre-fitted standard scaler: `(x - mean) / scale` per feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScalerArtifact {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScalerArtifact {
    /// Internal consistency checks.
    ///
    /// # Errors
    /// Returns `ModelArtifact` on length mismatches, non-finite values or a
    /// zero scale.
    pub fn validate(&self) -> Result<()> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(artifact_error(format!("{SCALER_FILE}: no features")));
        }
        check_parameters(SCALER_FILE, "mean", &self.mean, n)?;
        check_parameters(SCALER_FILE, "scale", &self.scale, n)?;
        if let Some(i) = self.scale.iter().position(|s| *s == 0.0) {
            return Err(artifact_error(format!("{SCALER_FILE}: scale[{i}] is zero")));
        }
        Ok(())
    }
}

impl Scaler for StandardScalerArtifact {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, features: &FeatureVector) -> Result<ScaledVector> {
        if features.len() != self.n_features() {
            return Err(GlucoriskError::DimensionMismatch {
                stage: "scaler",
                expected: self.n_features(),
                actual: features.len(),
            });
        }

        let values = features
            .as_array()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();
        Ok(ScaledVector::new(values))
    }
}

/// Kind of linear classifier, which decides whether probabilities exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// `p1 = sigmoid(w . x + b)`
    LogisticRegression,
    /// Margin classifier; hard labels only
    LinearSvc,
}

/// Pre-fitted linear classifier over scaled features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifierArtifact {
    pub kind: ClassifierKind,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearClassifierArtifact {
    /// Internal consistency checks.
    ///
    /// # Errors
    /// Returns `ModelArtifact` on length mismatches or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(artifact_error(format!("{MODEL_FILE}: no features")));
        }
        check_parameters(MODEL_FILE, "coefficients", &self.coefficients, n)?;
        if !self.intercept.is_finite() {
            return Err(artifact_error(format!("{MODEL_FILE}: intercept is not finite")));
        }
        Ok(())
    }

    /// Signed distance from the decision boundary: `w . x + b`.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the input width is wrong.
    pub fn decision_function(&self, x: &ScaledVector) -> Result<f64> {
        if x.len() != self.coefficients.len() {
            return Err(GlucoriskError::DimensionMismatch {
                stage: "classifier",
                expected: self.coefficients.len(),
                actual: x.len(),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(x.as_slice())
            .map(|(w, v)| w * v)
            .sum();
        Ok(dot + self.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LinearClassifierArtifact {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, x: &ScaledVector) -> Result<bool> {
        Ok(self.decision_function(x)? > 0.0)
    }

    fn predict_probabilities(&self, x: &ScaledVector) -> Result<Option<(f64, f64)>> {
        let z = self.decision_function(x)?;
        match self.kind {
            ClassifierKind::LogisticRegression => {
                let p1 = sigmoid(z);
                Ok(Some((1.0 - p1, p1)))
            }
            ClassifierKind::LinearSvc => Ok(None),
        }
    }
}

/// SHA-256 digests of the artifact files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash every bound artifact present in `dir`.
    ///
    /// # Errors
    /// Returns `ModelArtifact` if a bound file is missing or unreadable.
    pub fn for_directory(dir: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        for name in BOUND_FILES {
            let path = dir.join(name);
            let bytes = fs::read(&path)
                .map_err(|e| artifact_error(format!("Failed to read {}: {e}", path.display())))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            files,
        })
    }

    /// Canonical encoding; these are the bytes that get signed.
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Scaler and classifier as loaded from one model directory.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub scaler: StandardScalerArtifact,
    pub classifier: LinearClassifierArtifact,
    /// Digest of `manifest.json`, for logging and display
    pub manifest_sha256: String,
    /// Whether `model.sig` was verified against a trusted key
    pub signature_verified: bool,
}

/// Loads and verifies a model directory.
#[derive(Debug, Clone, Default)]
pub struct ArtifactLoader {
    trusted_key: Option<VerifyingKey>,
}

impl ArtifactLoader {
    /// Loader that checks manifest digests but not signatures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that additionally requires a valid `model.sig`.
    #[must_use]
    pub fn with_trusted_key(key: VerifyingKey) -> Self {
        Self {
            trusted_key: Some(key),
        }
    }

    /// # Errors
    /// Returns `Config` if the key is not a base64-encoded 32-byte Ed25519
    /// public key.
    pub fn with_trusted_key_b64(b64: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|_| GlucoriskError::Config("Invalid trusted key base64".into()))?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            GlucoriskError::Config("Invalid trusted key length (expected 32 bytes)".into())
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| GlucoriskError::Config("Invalid Ed25519 verifying key".into()))?;
        Ok(Self::with_trusted_key(key))
    }

    /// Load, verify and validate the artifacts in `model_dir`.
    ///
    /// # Errors
    /// Returns `ModelArtifact` for missing, unreadable, corrupt, unsigned or
    /// reordered artifacts and `DimensionMismatch` if an artifact was fitted
    /// on a different number of features.
    pub fn load(&self, model_dir: &Path) -> Result<LoadedArtifacts> {
        if !model_dir.is_dir() {
            return Err(artifact_error(format!(
                "Model directory not found: {}",
                model_dir.display()
            )));
        }

        let manifest_path = model_dir.join(MANIFEST_FILE);
        let manifest_bytes = fs::read(&manifest_path).map_err(|e| {
            artifact_error(format!("Failed to read {}: {e}", manifest_path.display()))
        })?;
        let signature_verified = self.verify_signature(model_dir, &manifest_bytes)?;

        let manifest: ArtifactManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| artifact_error(format!("Invalid {MANIFEST_FILE} format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(artifact_error(format!(
                "Unsupported manifest version {} (expected {MANIFEST_VERSION})",
                manifest.version
            )));
        }

        let scaler: StandardScalerArtifact =
            parse_bound(model_dir, &manifest, SCALER_FILE)?;
        scaler.validate()?;
        check_feature_layout("scaler artifact", &scaler.feature_names)?;

        let classifier: LinearClassifierArtifact =
            parse_bound(model_dir, &manifest, MODEL_FILE)?;
        classifier.validate()?;
        check_feature_layout("classifier artifact", &classifier.feature_names)?;

        let manifest_sha256 = sha256_hex(&manifest_bytes);
        tracing::info!(
            "Loaded artifacts from {:?} (classifier={:?}, n_features={}, manifest={}, signed={})",
            model_dir,
            classifier.kind,
            classifier.n_features(),
            &manifest_sha256[..12],
            signature_verified
        );

        Ok(LoadedArtifacts {
            scaler,
            classifier,
            manifest_sha256,
            signature_verified,
        })
    }

    /// Returns whether a signature was checked.
    fn verify_signature(&self, model_dir: &Path, manifest_bytes: &[u8]) -> Result<bool> {
        let sig_path = model_dir.join(SIGNATURE_FILE);

        let Some(key) = &self.trusted_key else {
            if sig_path.exists() {
                tracing::warn!(
                    "{SIGNATURE_FILE} present but no trusted key configured; signature not checked"
                );
            }
            return Ok(false);
        };

        if !sig_path.exists() {
            tracing::error!("Artifact signature not found at {:?}", sig_path);
            return Err(artifact_error(format!(
                "{SIGNATURE_FILE} is required when a trusted key is configured"
            )));
        }

        let sig_bytes = fs::read(&sig_path)
            .map_err(|e| artifact_error(format!("Failed to read signature: {e}")))?;
        let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            artifact_error(format!(
                "Invalid signature length: {} (expected 64 bytes)",
                sig_bytes.len()
            ))
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        key.verify(manifest_bytes, &signature)
            .map_err(|_| artifact_error("Invalid artifact signature"))?;
        Ok(true)
    }
}

/// Read a file bound by the manifest, check its digest and parse it.
fn parse_bound<T>(dir: &Path, manifest: &ArtifactManifest, name: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let expected = manifest
        .files
        .get(name)
        .ok_or_else(|| artifact_error(format!("{MANIFEST_FILE} does not bind {name}")))?;

    let path = dir.join(name);
    let bytes = fs::read(&path)
        .map_err(|e| artifact_error(format!("Failed to read {}: {e}", path.display())))?;

    if !constant_time_eq_str(&sha256_hex(&bytes), &expected.to_ascii_lowercase()) {
        return Err(artifact_error(format!(
            "Checksum mismatch for {name}: file is corrupt or was modified"
        )));
    }

    serde_json::from_slice(&bytes).map_err(|e| artifact_error(format!("Invalid {name}: {e}")))
}
