//! # Extractor Configuration
//!
//! One immutable configuration object, built once at startup and passed by
//! reference to every stage of the pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AspectraError, Result};
use crate::scheme::CategoryDef;

/// How colorized output marks a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// ANSI color escapes, one color per category.
    #[default]
    Ansi,
    /// Inline tags such as `<TASK>…</TASK>`.
    Tags,
}

/// Configuration for the aspect extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Declared categories in display order.
    pub categories: Vec<CategoryDef>,
    /// Minimum length ratio (shorter / longer) for a prefix or suffix to
    /// count as a duplicate of a longer aspect.
    pub min_overlap: f32,
    /// Whether categories without aspects still appear in the output.
    pub emit_empty_categories: bool,
    /// Whether unbalanced brackets and quotes in an aspect get completed.
    pub balance_punctuation: bool,
    /// Whether the first letter of an aspect is upper-cased.
    pub capitalize: bool,
    /// Marker style of the colorized rendering.
    pub marker: MarkerStyle,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            categories: CategoryDef::defaults(),
            min_overlap: 0.5,
            emit_empty_categories: false,
            balance_punctuation: true,
            capitalize: true,
            marker: MarkerStyle::Ansi,
        }
    }
}

impl ExtractorConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the declared categories.
    pub fn with_categories(mut self, categories: Vec<CategoryDef>) -> Self {
        self.categories = categories;
        self
    }

    /// Set the minimum prefix/suffix overlap for deduplication.
    pub fn with_min_overlap(mut self, ratio: f32) -> Self {
        self.min_overlap = ratio.clamp(0.0, 1.0);
        self
    }

    /// Emit every declared category, even those without aspects.
    pub fn with_empty_categories(mut self, enabled: bool) -> Self {
        self.emit_empty_categories = enabled;
        self
    }

    /// Enable or disable bracket balancing.
    pub fn with_balance_punctuation(mut self, enabled: bool) -> Self {
        self.balance_punctuation = enabled;
        self
    }

    /// Enable or disable capitalization.
    pub fn with_capitalize(mut self, enabled: bool) -> Self {
        self.capitalize = enabled;
        self
    }

    /// Set the colorized marker style.
    pub fn with_marker(mut self, marker: MarkerStyle) -> Self {
        self.marker = marker;
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::Json` for malformed JSON and
    /// `AspectraError::InvalidConfig` if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// See [`ExtractorConfig::from_json_str`]; I/O failures are
    /// `AspectraError::Io`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading extractor config");
        Self::from_json_str(&content)
    }

    /// Checks value ranges. Category definitions are checked when the tag
    /// scheme is built.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidConfig` if `min_overlap` is outside
    /// `[0, 1]` or not a number.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_overlap) {
            return Err(AspectraError::InvalidConfig(format!(
                "min_overlap must be within [0, 1], got {}",
                self.min_overlap
            )));
        }
        Ok(())
    }
}
