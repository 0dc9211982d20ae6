use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Hard ceiling for the exhaustive subset search (2^n subsets).
pub const MAX_EXHAUSTIVE_CAP: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// All thresholds the matchers and the duplicate detector use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub tolerance: ToleranceConfig,
    pub windows: WindowConfig,
    pub search: SearchConfig,
    pub duplicates: DuplicateConfig,
    pub patterns: PatternConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Residual at or below this is an exact hit (high confidence).
    pub epsilon_cents: i64,
    /// Fraction of the target accepted as medium confidence.
    pub relative: f64,
    /// Flat allowance for card billing, which rounds foreign fees.
    pub card_allowance_cents: i64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            epsilon_cents: 5,
            relative: 0.02,
            card_allowance_cents: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub processor_days: u32,
    pub transfer_days: u32,
    /// How far back card purchases may precede the settlement charge.
    pub card_billing_days: u32,
    /// How far card purchases may post after the settlement charge.
    pub card_grace_days: u32,
    pub order_days: u32,
    /// Multiplier applied to every window for residual suggestions.
    pub extension_factor: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            processor_days: 3,
            transfer_days: 2,
            card_billing_days: 45,
            card_grace_days: 0,
            order_days: 5,
            extension_factor: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Pools larger than this never reach the exhaustive search.
    pub max_exhaustive_candidates: usize,
    pub max_suggestion_candidates: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_exhaustive_candidates: 8,
            max_suggestion_candidates: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Characters of normalized description kept in the grouping key.
    pub fragment_len: usize,
    /// Fragments at least this similar share a group.
    pub similarity: f32,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            fragment_len: 24,
            similarity: 0.9,
        }
    }
}

/// Case-insensitive regexes per classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub processor: Vec<String>,
    pub card: Vec<String>,
    pub transfer: Vec<String>,
    pub merchant: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }
        Self {
            processor: owned(&[r"paypal", r"\bpp\.\d+", r"stripe", r"klarna", r"sumup"]),
            card: owned(&[
                r"american express",
                r"\bamex\b",
                r"kreditkarte",
                r"credit card",
                r"mastercard",
                r"visa card",
                r"card statement",
            ]),
            transfer: owned(&[
                r"umbuchung",
                r"internal transfer",
                r"transfer (to|from) savings",
                r"tagesgeld",
            ]),
            merchant: owned(&[r"amazon", r"\bamzn\b", r"ebay", r"etsy", r"zalando"]),
        }
    }
}

impl MatchConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Range checks. Patterns are checked when the classifier compiles them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tolerance;
        if t.epsilon_cents < 0 {
            return Err(out_of_range("tolerance.epsilon_cents", "must not be negative"));
        }
        if t.card_allowance_cents < 0 {
            return Err(out_of_range("tolerance.card_allowance_cents", "must not be negative"));
        }
        if !(0.0..1.0).contains(&t.relative) {
            return Err(out_of_range("tolerance.relative", "must be in [0, 1)"));
        }
        if self.windows.extension_factor == 0 {
            return Err(out_of_range("windows.extension_factor", "must be at least 1"));
        }
        if self.search.max_exhaustive_candidates > MAX_EXHAUSTIVE_CAP {
            return Err(out_of_range(
                "search.max_exhaustive_candidates",
                &format!("must be at most {MAX_EXHAUSTIVE_CAP}"),
            ));
        }
        if self.search.max_suggestion_candidates == 0 {
            return Err(out_of_range("search.max_suggestion_candidates", "must be at least 1"));
        }
        if self.duplicates.fragment_len == 0 {
            return Err(out_of_range("duplicates.fragment_len", "must be at least 1"));
        }
        if !(self.duplicates.similarity > 0.0 && self.duplicates.similarity <= 1.0) {
            return Err(out_of_range("duplicates.similarity", "must be in (0, 1]"));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tolerance.epsilon_cents, 5);
        assert_eq!(config.windows.card_billing_days, 45);
        assert_eq!(config.search.max_exhaustive_candidates, 8);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = MatchConfig::from_toml(
            r#"
            [windows]
            processor_days = 5

            [search]
            max_exhaustive_candidates = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.windows.processor_days, 5);
        assert_eq!(config.windows.transfer_days, 2);
        assert_eq!(config.search.max_exhaustive_candidates, 4);
        assert_eq!(config.tolerance, ToleranceConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(MatchConfig::from_toml("").unwrap(), MatchConfig::default());
    }

    #[test]
    fn patterns_replace_defaults() {
        let config = MatchConfig::from_toml(
            r#"
            [patterns]
            processor = ["mollie"]
            "#,
        )
        .unwrap();
        assert_eq!(config.patterns.processor, vec!["mollie".to_string()]);
        assert!(!config.patterns.card.is_empty());
    }

    #[test]
    fn rejects_oversized_exhaustive_cap() {
        let err = MatchConfig::from_toml("[search]\nmax_exhaustive_candidates = 30\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { field: "search.max_exhaustive_candidates", .. }
        ));
    }

    #[test]
    fn rejects_relative_tolerance_of_one() {
        let err = MatchConfig::from_toml("[tolerance]\nrelative = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "tolerance.relative", .. }));
    }

    #[test]
    fn rejects_zero_extension_factor() {
        let err = MatchConfig::from_toml("[windows]\nextension_factor = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            MatchConfig::from_toml("[tolerance\nepsilon_cents = 5"),
            Err(ConfigError::Parse(_))
        ));
    }
}
