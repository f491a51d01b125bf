//! Tunables for a synthesis run.
//!
//! Every knob has a default so an empty `tocsmith.toml` (or none at all) is a
//! valid configuration. Sections mirror the pipeline stages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TocError;
use crate::numbering::AmbiguityPolicy;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "tocsmith.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    pub readiness: ReadinessConfig,
    pub scan: ScanConfig,
    pub numbering: NumberingConfig,
    pub build: BuildConfig,
    pub anchor: AnchorConfig,
}

impl TocConfig {
    /// Parse a TOML document, filling every missing key with its default.
    pub fn from_toml_str(contents: &str) -> Result<Self, TocError> {
        Ok(toml::from_str(contents)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Ceiling after which the gate gives up and proceeds best-effort.
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Minimum normalized text length for the container to count as meaningful.
    pub min_text_chars: usize,
    /// Texts that mean "not loaded yet" when they are the only content.
    pub placeholders: Vec<String>,
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin the scheduler.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            poll_interval_ms: 100,
            min_text_chars: 3,
            placeholders: vec![
                "loading".to_string(),
                "loading...".to_string(),
                "please wait".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// CSS selector of the content container. `None` scans the whole document.
    pub selector: Option<String>,
    /// Additional tags retained as `TagKind::Other` candidates (e.g. `li`).
    pub extra_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub ambiguity: AmbiguityPolicy,
    /// Accept plain whitespace after Roman and letter markers ("A Intro").
    pub marker_whitespace_separator: bool,
    pub max_decimal_segments: usize,
    /// Largest accepted decimal segment; keeps years and quantities out.
    pub max_ordinal: u32,
    /// Largest accepted Roman marker; keeps acronyms like "CV." or "DC:" out.
    pub max_roman: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            ambiguity: AmbiguityPolicy::default(),
            marker_whitespace_separator: false,
            max_decimal_segments: 6,
            max_ordinal: 999,
            max_roman: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub max_label_chars: usize,
    /// Nest unnumbered headings by level instead of the flat fallback list.
    pub heading_outline: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_label_chars: 50,
            heading_outline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub max_len: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self { max_len: 40 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = TocConfig::from_toml_str("").unwrap();
        assert_eq!(config, TocConfig::default());
        assert_eq!(config.build.max_label_chars, 50);
        assert_eq!(config.readiness.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_overrides_only_given_keys() {
        let config = TocConfig::from_toml_str(
            r#"
            [readiness]
            timeout_ms = 1500

            [numbering]
            ambiguity = "prefer-roman"

            [scan]
            extra_tags = ["li"]
            "#,
        )
        .unwrap();

        assert_eq!(config.readiness.timeout_ms, 1500);
        assert_eq!(config.readiness.poll_interval_ms, 100);
        assert_eq!(config.numbering.ambiguity, AmbiguityPolicy::PreferRoman);
        assert_eq!(config.scan.extra_tags, vec!["li".to_string()]);
        assert_eq!(config.anchor.max_len, 40);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TocConfig::from_toml_str("[readiness]\ntimeout_ms = \"soon\"");
        assert!(matches!(result, Err(TocError::Config(_))));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = ReadinessConfig {
            poll_interval_ms: 0,
            ..ReadinessConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
