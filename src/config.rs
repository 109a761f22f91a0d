//! Engine configuration
//!
//! Every section is optional; missing sections fall back to the built-in
//! tables. Loaded from `cogwatch.toml` (or `COGWATCH_CONFIG`) with
//! environment overrides applied on top.

use crate::error::AssessError;
use crate::history::DEFAULT_HISTORY_WINDOW;
use crate::rules::{Lexicon, RuleSet};
use crate::templates::{DialogueTemplates, ReportTemplates};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cogwatch.toml";

/// Runtime knobs that are not rule tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Number of prior assessments kept per patient
    pub history_window: usize,
    /// Fixed seed for reproducible confidence and phrase picks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            seed: None,
        }
    }
}

/// Full engine configuration: settings plus every lookup table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub rules: RuleSet,
    pub lexicon: Lexicon,
    pub report: ReportTemplates,
    pub dialogue: DialogueTemplates,
}

impl EngineConfig {
    /// Load from `COGWATCH_CONFIG` or `cogwatch.toml`, falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load() -> Result<Self, AssessError> {
        let path =
            std::env::var("COGWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_toml_str(&std::fs::read_to_string(&path)?)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file and apply environment overrides
    pub fn from_path(path: &Path) -> Result<Self, AssessError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without validation or overrides
    pub fn from_toml_str(content: &str) -> Result<Self, AssessError> {
        toml::from_str(content).map_err(|e| AssessError::ConfigError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, AssessError> {
        toml::to_string_pretty(self).map_err(|e| AssessError::ConfigError(e.to_string()))
    }

    /// Apply `COGWATCH_SEED` and `COGWATCH_HISTORY_WINDOW`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("COGWATCH_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.engine.seed = Some(seed),
                Err(_) => tracing::warn!("Ignoring invalid COGWATCH_SEED={}", raw),
            }
        }

        if let Some(raw) = lookup("COGWATCH_HISTORY_WINDOW") {
            match raw.trim().parse::<usize>() {
                Ok(window) if window > 0 => self.engine.history_window = window,
                _ => tracing::warn!("Ignoring invalid COGWATCH_HISTORY_WINDOW={}", raw),
            }
        }
    }

    /// Check every table invariant
    pub fn validate(&self) -> Result<(), AssessError> {
        if self.engine.history_window == 0 {
            return Err(AssessError::ConfigError(
                "history_window must be at least 1".to_string(),
            ));
        }
        self.rules.validate()?;
        self.lexicon.validate()?;
        self.report.validate()?;
        self.dialogue.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dimension;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [engine]
            seed = 42

            [dialogue]
            question_bank = ["What did you have for breakfast?"]
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.seed, Some(42));
        assert_eq!(config.engine.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.dialogue.question_bank.len(), 1);
        assert_eq!(config.dialogue.acknowledgments.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default();
        let text = config.to_toml_string().unwrap();
        let back = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_custom_rules_validated() {
        let config = EngineConfig::from_toml_str(
            r#"
            [rules]
            noise_floor = 0.1

            [[rules.dimensions]]
            dimension = "memory"
            weight = 0.6
            phrases = [{ pattern = "forgot", score = 0.5 }]

            [[rules.severity_bins]]
            category = "normal"
            lower = 0.0
            upper = 1.0
            inclusive_upper = true
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.dimensions[0].dimension, Dimension::Memory);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn test_empty_lexicon_keyword_rejected() {
        let config = EngineConfig::from_toml_str(
            r#"
            [lexicon]
            memory_issue_keywords = ["忘了", ""]
            "#,
        )
        .unwrap();

        assert_eq!(config.lexicon.pronouns, Lexicon::default().pronouns);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AssessError::InvalidRules(_)));
        assert!(err.to_string().contains("memory_issue_keywords"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml_str("[engine\nseed = ").unwrap_err();
        assert!(matches!(err, AssessError::ConfigError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("COGWATCH_SEED", "7"), ("COGWATCH_HISTORY_WINDOW", "12")]);
        let mut config = EngineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.engine.seed, Some(7));
        assert_eq!(config.engine.history_window, 12);
    }

    #[test]
    fn test_invalid_env_overrides_ignored() {
        let env: HashMap<&str, &str> =
            HashMap::from([("COGWATCH_SEED", "abc"), ("COGWATCH_HISTORY_WINDOW", "0")]);
        let mut config = EngineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.engine, EngineSettings::default());
    }
}
