/*!
 * Rubric-based quality evaluation.
 *
 * The model returns a 0-100 score split into accuracy (40), fluency (25),
 * glossary (20) and format (15) plus a list of issues.
 */

use serde::{Deserialize, Serialize};

use crate::translation::parsing::parse_embedded_json;

/// Score used when the evaluation response cannot be parsed
pub const FALLBACK_SCORE: f64 = 75.0;

pub const PARSE_FAILURE_ISSUE: &str = "Failed to parse quality evaluation response";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub fluency: f64,
    #[serde(default)]
    pub glossary: f64,
    #[serde(default)]
    pub format: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleEvaluation {
    pub score: f64,
    #[serde(default)]
    pub breakdown: QualityBreakdown,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl SimpleEvaluation {
    /// Neutral result standing in for an unparsable response
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            breakdown: QualityBreakdown {
                accuracy: 30.0,
                fluency: 20.0,
                glossary: 15.0,
                format: 10.0,
            },
            issues: vec![PARSE_FAILURE_ISSUE.to_string()],
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.issues.len() == 1 && self.issues[0] == PARSE_FAILURE_ISSUE
    }
}

/// Parse a rubric evaluation, degrading to [`SimpleEvaluation::fallback`]
pub fn parse_simple_evaluation(response: &str) -> SimpleEvaluation {
    parse_embedded_json::<SimpleEvaluation>(response)
        .map(|mut evaluation| {
            evaluation.score = evaluation.score.clamp(0.0, 100.0);
            evaluation
        })
        .unwrap_or_else(SimpleEvaluation::fallback)
}
