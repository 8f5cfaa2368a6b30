/*!
 * MQM (Multidimensional Quality Metrics) evaluation.
 *
 * Each error is annotated with a category and a severity; the score is
 * `max(0, 100 - Σ weight)` with weights minor = 1, major = 5, critical = 25.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::translation::parsing::parse_embedded_json;

/// Score used when the evaluation response cannot be parsed
pub const FALLBACK_SCORE: f64 = 75.0;

/// MQM error category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MqmErrorType {
    Mistranslation,
    Omission,
    Addition,
    Untranslated,
    Grammar,
    Spelling,
    Register,
    Inconsistency,
    Awkward,
    Unidiomatic,
    /// A category the model invented; kept verbatim
    Other(String),
}

impl MqmErrorType {
    pub fn as_str(&self) -> &str {
        match self {
            MqmErrorType::Mistranslation => "accuracy/mistranslation",
            MqmErrorType::Omission => "accuracy/omission",
            MqmErrorType::Addition => "accuracy/addition",
            MqmErrorType::Untranslated => "accuracy/untranslated",
            MqmErrorType::Grammar => "fluency/grammar",
            MqmErrorType::Spelling => "fluency/spelling",
            MqmErrorType::Register => "fluency/register",
            MqmErrorType::Inconsistency => "fluency/inconsistency",
            MqmErrorType::Awkward => "style/awkward",
            MqmErrorType::Unidiomatic => "style/unidiomatic",
            MqmErrorType::Other(raw) => raw,
        }
    }

    /// Top-level dimension: "accuracy", "fluency" or "style"
    pub fn category(&self) -> &str {
        self.as_str().split('/').next().unwrap_or("")
    }
}

impl From<String> for MqmErrorType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "accuracy/mistranslation" => MqmErrorType::Mistranslation,
            "accuracy/omission" => MqmErrorType::Omission,
            "accuracy/addition" => MqmErrorType::Addition,
            "accuracy/untranslated" => MqmErrorType::Untranslated,
            "fluency/grammar" => MqmErrorType::Grammar,
            "fluency/spelling" => MqmErrorType::Spelling,
            "fluency/register" => MqmErrorType::Register,
            "fluency/inconsistency" => MqmErrorType::Inconsistency,
            "style/awkward" => MqmErrorType::Awkward,
            "style/unidiomatic" => MqmErrorType::Unidiomatic,
            _ => MqmErrorType::Other(raw),
        }
    }
}

impl From<MqmErrorType> for String {
    fn from(error_type: MqmErrorType) -> Self {
        error_type.as_str().to_string()
    }
}

impl fmt::Display for MqmErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MqmSeverity {
    Minor,
    Major,
    Critical,
}

impl MqmSeverity {
    pub fn weight(&self) -> f64 {
        match self {
            MqmSeverity::Minor => 1.0,
            MqmSeverity::Major => 5.0,
            MqmSeverity::Critical => 25.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MqmSeverity::Minor => "MINOR",
            MqmSeverity::Major => "MAJOR",
            MqmSeverity::Critical => "CRITICAL",
        }
    }
}

impl TryFrom<String> for MqmSeverity {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.trim().to_lowercase().as_str() {
            "minor" => Ok(MqmSeverity::Minor),
            "major" => Ok(MqmSeverity::Major),
            "critical" => Ok(MqmSeverity::Critical),
            _ => Err(format!("unknown MQM severity: {}", raw)),
        }
    }
}

/// A single annotated error in a translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqmError {
    #[serde(rename = "type")]
    pub error_type: MqmErrorType,
    pub severity: MqmSeverity,
    /// Affected text in the translation
    #[serde(default)]
    pub span: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_span: Option<String>,
}

/// Error counts per dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqmBreakdown {
    pub accuracy: usize,
    pub fluency: usize,
    pub style: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqmEvaluation {
    pub errors: Vec<MqmError>,
    pub score: f64,
    pub summary: String,
    pub breakdown: MqmBreakdown,
}

impl MqmEvaluation {
    /// Neutral result with no errors
    pub fn fallback(summary: &str) -> Self {
        Self {
            errors: Vec::new(),
            score: FALLBACK_SCORE,
            summary: summary.to_string(),
            breakdown: MqmBreakdown::default(),
        }
    }

    /// Issues in `type: span` form
    pub fn issues(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.error_type, e.span))
            .collect()
    }
}

pub fn calculate_mqm_score(errors: &[MqmError]) -> f64 {
    let penalty: f64 = errors.iter().map(|e| e.severity.weight()).sum();
    (100.0 - penalty).max(0.0)
}

pub fn calculate_mqm_breakdown(errors: &[MqmError]) -> MqmBreakdown {
    let count = |category: &str| errors.iter().filter(|e| e.error_type.category() == category).count();
    MqmBreakdown {
        accuracy: count("accuracy"),
        fluency: count("fluency"),
        style: count("style"),
    }
}

#[derive(Debug, Deserialize)]
struct RawMqmResponse {
    /// Parsed one by one so a malformed entry drops only itself
    #[serde(default)]
    errors: Vec<Value>,
    score: Option<f64>,
    #[serde(default)]
    summary: String,
}

/// Parse an MQM response.
///
/// The score always comes from the listed errors; a score the model
/// reports itself is ignored.
pub fn parse_mqm_response(response: &str) -> Option<MqmEvaluation> {
    let raw: RawMqmResponse = parse_embedded_json(response)?;

    let errors: Vec<MqmError> = raw
        .errors
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<MqmError>(value) {
            Ok(error) => Some(error),
            Err(e) => {
                log::debug!("Skipping malformed MQM error: {}", e);
                None
            }
        })
        .collect();

    let score = calculate_mqm_score(&errors);
    if let Some(reported) = raw.score.filter(|reported| (reported - score).abs() > f64::EPSILON) {
        log::debug!("Model reported MQM score {} but its errors add up to {}", reported, score);
    }

    Some(MqmEvaluation {
        breakdown: calculate_mqm_breakdown(&errors),
        errors,
        score,
        summary: raw.summary,
    })
}

/// Render errors as a numbered fix list
pub fn format_mqm_errors_for_prompt(errors: &[MqmError]) -> String {
    if errors.is_empty() {
        return "No errors identified.".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut item = format!(
                "{}. [{}] {}\n   Text: \"{}\"\n   Fix: \"{}\"",
                i + 1,
                e.severity.label(),
                e.error_type,
                e.span,
                e.suggestion
            );
            if let Some(reason) = &e.explanation {
                item.push_str(&format!("\n   Reason: {}", reason));
            }
            item
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
