//! Configuration loading and command-line overrides.

use std::path::{Path, PathBuf};

use tocsmith_core::config::DEFAULT_CONFIG_FILE;
use tocsmith_core::numbering::AmbiguityPolicy;
use tocsmith_core::TocConfig;

use crate::prelude::*;

/// Flags shared by every command that reads a document.
#[derive(Debug, Clone, clap::Args)]
pub struct SourceOptions {
    /// Local HTML file or http(s) URL
    #[clap(env = "TOCSMITH_SOURCE")]
    pub source: String,

    /// CSS selector of the content container
    #[arg(long, env = "TOCSMITH_SELECTOR")]
    pub selector: Option<String>,

    /// Readiness ceiling in milliseconds
    #[arg(long, env = "TOCSMITH_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Readiness poll interval in milliseconds
    #[arg(long, env = "TOCSMITH_POLL_MS")]
    pub poll_ms: Option<u64>,

    /// Build the tree from heading levels instead of falling back to a flat list
    #[arg(long, env = "TOCSMITH_HEADING_OUTLINE")]
    pub heading_outline: bool,

    /// How to read single-character markers such as "I." or "C."
    #[arg(long, env = "TOCSMITH_AMBIGUITY")]
    pub ambiguity: Option<Ambiguity>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Ambiguity {
    Contextual,
    PreferRoman,
    PreferLetter,
}

impl From<Ambiguity> for AmbiguityPolicy {
    fn from(value: Ambiguity) -> Self {
        match value {
            Ambiguity::Contextual => AmbiguityPolicy::Contextual,
            Ambiguity::PreferRoman => AmbiguityPolicy::PreferRoman,
            Ambiguity::PreferLetter => AmbiguityPolicy::PreferLetter,
        }
    }
}

impl SourceOptions {
    /// Load the config file and apply the flags on top of it.
    pub fn resolve(&self, config_path: Option<&Path>) -> Result<TocConfig> {
        let mut config = load_config(config_path)?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut TocConfig) {
        if let Some(selector) = &self.selector {
            config.scan.selector = Some(selector.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.readiness.timeout_ms = timeout_ms;
        }
        if let Some(poll_ms) = self.poll_ms {
            config.readiness.poll_interval_ms = poll_ms;
        }
        if self.heading_outline {
            config.build.heading_outline = true;
        }
        if let Some(ambiguity) = self.ambiguity {
            config.numbering.ambiguity = ambiguity.into();
        }
    }
}

/// Read `path`, or `tocsmith.toml` in the working directory when present.
pub fn load_config(path: Option<&Path>) -> Result<TocConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                log::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                return Ok(TocConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = TocConfig::from_toml_str(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    log::debug!("loaded config from {}", path.display());
    Ok(config)
}
