//! Runtime configuration from `GLUCORISK_*` environment variables.

use std::path::PathBuf;

use crate::application::ReportOptions;
use crate::{GlucoriskError, Result};

pub const DEFAULT_MODEL_PATH: &str = "models";

/// Immutable settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding `scaler.json`, `model.json` and `manifest.json`
    pub model_dir: PathBuf,
    /// Where exported reports are written
    pub report_dir: PathBuf,
    pub outputs: ReportOptions,
    /// Base64 Ed25519 verifying key; when present the artifact signature is
    /// mandatory
    pub trusted_key_b64: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_PATH),
            report_dir: PathBuf::from("."),
            outputs: ReportOptions::default(),
            trusted_key_b64: None,
        }
    }
}

impl AppConfig {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns `Config` if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    ///
    /// # Errors
    /// Returns `Config` if a variable is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let outputs = match get("GLUCORISK_OUTPUTS") {
            Some(list) => {
                let parsed = ReportOptions::parse(&list)?;
                if parsed == ReportOptions::none() {
                    return Err(GlucoriskError::Config(
                        "GLUCORISK_OUTPUTS enables no output".to_string(),
                    ));
                }
                parsed
            }
            None => defaults.outputs,
        };

        Ok(Self {
            model_dir: get("GLUCORISK_MODEL_PATH").map_or(defaults.model_dir, PathBuf::from),
            report_dir: get("GLUCORISK_REPORT_DIR").map_or(defaults.report_dir, PathBuf::from),
            outputs,
            trusted_key_b64: get("GLUCORISK_TRUSTED_KEY_B64"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).expect("Should build");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GLUCORISK_MODEL_PATH", "/opt/models"),
            ("GLUCORISK_REPORT_DIR", "/tmp/reports"),
            ("GLUCORISK_OUTPUTS", "banner,document"),
            ("GLUCORISK_TRUSTED_KEY_B64", " abc= "),
        ]))
        .expect("Should build");

        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert!(config.outputs.banner && config.outputs.document);
        assert!(!config.outputs.chart);
        assert_eq!(config.trusted_key_b64.as_deref(), Some("abc="));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GLUCORISK_MODEL_PATH", "  "),
            ("GLUCORISK_TRUSTED_KEY_B64", ""),
        ]))
        .expect("Should build");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_bad_outputs_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("GLUCORISK_OUTPUTS", "banner,gif")]))
            .expect_err("Should reject");
        assert!(matches!(err, GlucoriskError::Config(_)));

        let err = AppConfig::from_lookup(lookup(&[("GLUCORISK_OUTPUTS", ",")]))
            .expect_err("Should reject");
        assert!(matches!(err, GlucoriskError::Config(_)));
    }
}
