/*!
 * Translation quality evaluation.
 *
 * Two evaluators share one result type:
 * - **Simple**: a 0-100 rubric score with free-text issues
 * - **MQM**: severity-weighted error annotations that drive targeted fixes
 *
 * Both degrade to a neutral score of 75 when the model's answer cannot be
 * parsed, so an evaluation never fails a translation.
 */

pub mod mqm;
pub mod simple;

pub use mqm::{
    calculate_mqm_breakdown, calculate_mqm_score, format_mqm_errors_for_prompt, parse_mqm_response,
    MqmBreakdown, MqmError, MqmErrorType, MqmEvaluation, MqmSeverity,
};
pub use simple::{parse_simple_evaluation, QualityBreakdown, SimpleEvaluation};

use serde::Serialize;

/// Outcome of one evaluation call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum QualityEvaluation {
    Simple(SimpleEvaluation),
    Mqm(MqmEvaluation),
}

impl QualityEvaluation {
    pub fn score(&self) -> f64 {
        match self {
            QualityEvaluation::Simple(e) => e.score,
            QualityEvaluation::Mqm(e) => e.score,
        }
    }

    pub fn issues(&self) -> Vec<String> {
        match self {
            QualityEvaluation::Simple(e) => e.issues.clone(),
            QualityEvaluation::Mqm(e) => e.issues(),
        }
    }

    /// MQM errors to fix, if this evaluation produced any
    pub fn mqm_errors(&self) -> Option<&[MqmError]> {
        match self {
            QualityEvaluation::Mqm(e) if !e.errors.is_empty() => Some(&e.errors),
            _ => None,
        }
    }
}
