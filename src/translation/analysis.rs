/*!
 * Pre-translation analysis.
 *
 * An optional first pass asks the model for key terms, ambiguous phrases,
 * spans to keep verbatim and the content domain. The result is folded into
 * the translation prompt. Any failure yields an empty analysis.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parsing::parse_embedded_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTerm {
    pub term: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_translation: Option<String>,
    #[serde(default)]
    pub from_glossary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousPhrase {
    pub phrase: String,
    #[serde(default)]
    pub interpretations: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentDomain {
    Technical,
    Marketing,
    Legal,
    Medical,
    #[default]
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    Formal,
    Informal,
    #[default]
    #[serde(other)]
    Neutral,
}

impl fmt::Display for ContentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentDomain::Technical => "technical",
            ContentDomain::Marketing => "marketing",
            ContentDomain::Legal => "legal",
            ContentDomain::Medical => "medical",
            ContentDomain::General => "general",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::Formal => "formal",
            Register::Informal => "informal",
            Register::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreTranslationAnalysis {
    #[serde(default)]
    pub key_terms: Vec<AnalyzedTerm>,
    #[serde(default)]
    pub ambiguous_phrases: Vec<AmbiguousPhrase>,
    #[serde(default)]
    pub preserve_exact: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub domain: ContentDomain,
    #[serde(default)]
    pub register_recommendation: Register,
}

impl PreTranslationAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Render as a prompt section
    pub fn format_for_prompt(&self) -> String {
        let mut sections = Vec::new();

        if !self.key_terms.is_empty() {
            let terms: Vec<String> = self
                .key_terms
                .iter()
                .map(|t| {
                    let translation = t
                        .suggested_translation
                        .as_deref()
                        .map(|s| format!(" → {}", s))
                        .unwrap_or_default();
                    let origin = if t.from_glossary { " (glossary)" } else { "" };
                    format!("- \"{}\"{}{}: {}", t.term, translation, origin, t.context)
                })
                .collect();
            sections.push(format!("**Key Terms:**\n{}", terms.join("\n")));
        }

        if !self.ambiguous_phrases.is_empty() {
            let phrases: Vec<String> = self
                .ambiguous_phrases
                .iter()
                .map(|p| format!("- \"{}\": Use interpretation \"{}\"", p.phrase, p.recommendation))
                .collect();
            sections.push(format!(
                "**Ambiguous Phrases (use these interpretations):**\n{}",
                phrases.join("\n")
            ));
        }

        if !self.preserve_exact.is_empty() {
            let items: Vec<String> = self.preserve_exact.iter().map(|s| format!("- {}", s)).collect();
            sections.push(format!("**Do NOT translate (keep exactly as-is):**\n{}", items.join("\n")));
        }

        sections.push(format!(
            "**Content Type:** {}\n**Tone:** {}",
            self.domain, self.register_recommendation
        ));

        sections.join("\n\n")
    }
}

/// Parse an analysis response; `None` when no usable JSON object is present
pub fn parse_analysis_response(response: &str) -> Option<PreTranslationAnalysis> {
    parse_embedded_json(response)
}
