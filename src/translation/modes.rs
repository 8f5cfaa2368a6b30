/*!
 * Quality mode presets.
 *
 * A mode bundles analysis, evaluation method, iteration budget and
 * threshold. Explicit options override the preset values.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::TranslationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Single pass, no evaluation
    Fast,
    #[default]
    Balanced,
    /// Analysis plus MQM refinement
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeConfig {
    pub enable_analysis: bool,
    pub use_mqm: bool,
    pub max_iterations: u32,
    /// 0 disables the threshold check
    pub quality_threshold: f64,
}

impl ModeConfig {
    /// True when evaluation can be skipped after the first translation
    pub fn skips_evaluation(&self) -> bool {
        self.max_iterations <= 1 && self.quality_threshold <= 0.0
    }
}

/// Explicit values layered over a mode preset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModeOverrides {
    pub enable_analysis: Option<bool>,
    pub use_mqm: Option<bool>,
    pub max_iterations: Option<u32>,
    pub quality_threshold: Option<f64>,
}

impl QualityMode {
    pub fn preset(&self) -> ModeConfig {
        match self {
            QualityMode::Fast => ModeConfig {
                enable_analysis: false,
                use_mqm: false,
                max_iterations: 1,
                quality_threshold: 0.0,
            },
            QualityMode::Balanced => ModeConfig {
                enable_analysis: false,
                use_mqm: true,
                max_iterations: 2,
                quality_threshold: 75.0,
            },
            QualityMode::Quality => ModeConfig {
                enable_analysis: true,
                use_mqm: true,
                max_iterations: 4,
                quality_threshold: 85.0,
            },
        }
    }

    pub fn resolve(&self, overrides: &ModeOverrides) -> ModeConfig {
        let preset = self.preset();
        ModeConfig {
            enable_analysis: overrides.enable_analysis.unwrap_or(preset.enable_analysis),
            use_mqm: overrides.use_mqm.unwrap_or(preset.use_mqm),
            max_iterations: overrides.max_iterations.unwrap_or(preset.max_iterations),
            quality_threshold: overrides.quality_threshold.unwrap_or(preset.quality_threshold),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMode::Fast => "fast",
            QualityMode::Balanced => "balanced",
            QualityMode::Quality => "quality",
        }
    }
}

impl fmt::Display for QualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityMode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(QualityMode::Fast),
            "balanced" => Ok(QualityMode::Balanced),
            "quality" => Ok(QualityMode::Quality),
            other => Err(TranslationError::Unknown(format!(
                "Unknown mode '{}' (expected fast, balanced or quality)",
                other
            ))),
        }
    }
}
