/*!
 * Prompt templates for document translation.
 *
 * Templates are plain strings with `{placeholder}` slots. The static parts
 * (instructions, glossary) are kept separate from the per-chunk parts so
 * providers with prompt caching can cache them across chunks.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::providers::{ChatMessage, ContentPart};
use crate::translation::quality::{format_mqm_errors_for_prompt, MqmError};

const NO_GLOSSARY: &str = "No glossary provided.";

fn glossary_or_placeholder(glossary: &str) -> &str {
    if glossary.trim().is_empty() { NO_GLOSSARY } else { glossary }
}

static SLOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("slot regex"));

/// Fill `{name}` slots in one pass; substituted text is never re-scanned
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    SLOT_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Prompt template collection
pub struct PromptTemplate;

impl PromptTemplate {
    pub const SYSTEM_INSTRUCTIONS: &'static str = r#"You are a professional translator specializing in {source_lang} to {target_lang} translation.

## Rules:
1. Apply glossary terms exactly as specified
2. Preserve all formatting (markdown, HTML tags, code blocks)
3. Maintain the same tone and style
4. Do not translate content inside code blocks
5. Keep URLs, file paths, and technical identifiers unchanged
6. Keep placeholders like __CODE_BLOCK_0__ unchanged"#;

    pub const GLOSSARY_SECTION: &'static str = "## Glossary (MUST use these exact translations):\n{glossary}";

    pub const TRANSLATION_CONTENT: &'static str = r#"## Document Context:
Purpose: {purpose}
{style}{summary}Previous content: {previous}

## Source Text:
{source}

Provide ONLY the translated text below, with no additional commentary or headers:"#;

    pub const REFLECTION: &'static str = r#"Review this translation and provide specific improvement suggestions.

## Source ({source_lang}):
{source}

## Translation ({target_lang}):
{translation}

## Glossary Requirements:
{glossary}

## Evaluate and suggest improvements for:
1. **Accuracy**: Does the translation convey the exact meaning?
2. **Glossary Compliance**: Are all glossary terms applied correctly?
3. **Fluency**: Does it read naturally in {target_lang}?
4. **Formatting**: Is the structure preserved?
5. **Consistency**: Are terms translated consistently?

Provide a numbered list of specific, actionable suggestions:"#;

    pub const IMPROVEMENT_HEADER: &'static str = r#"Improve this translation based on the following suggestions.

## Glossary (MUST apply):
{glossary}"#;

    pub const IMPROVEMENT_BODY: &'static str = r#"## Source Text:
{source}

## Current Translation:
{translation}

## Improvement Suggestions:
{suggestions}

Provide ONLY the improved translation below, with no additional commentary or headers:"#;

    pub const SIMPLE_EVALUATION: &'static str = r#"Rate this translation's quality from 0 to 100.

## Source ({source_lang}):
{source}

## Translation ({target_lang}):
{translation}

## Evaluation Criteria:
- Semantic accuracy (40 points)
- Fluency and naturalness (25 points)
- Glossary compliance (20 points)
- Format preservation (15 points)

Respond with only a JSON object:
{"score": <number>, "breakdown": {"accuracy": <n>, "fluency": <n>, "glossary": <n>, "format": <n>}, "issues": ["issue1", "issue2"]}"#;

    pub const MQM_EVALUATION: &'static str = r#"Evaluate this translation using MQM (Multidimensional Quality Metrics) framework.

## Source ({source_lang}):
{source}

## Translation ({target_lang}):
{translation}

## Glossary Terms (must be applied exactly):
{glossary}

## MQM Error Categories:
- accuracy/mistranslation: Incorrect meaning
- accuracy/omission: Missing content from source
- accuracy/addition: Extra content not in source
- accuracy/untranslated: Source text left unchanged
- fluency/grammar: Grammatical errors
- fluency/spelling: Spelling/typos
- fluency/register: Inappropriate formality
- fluency/inconsistency: Inconsistent terminology
- style/awkward: Unnatural phrasing
- style/unidiomatic: Non-native expressions

## Severity Weights:
- "minor" (1 point): Noticeable but doesn't affect understanding
- "major" (5 points): Affects understanding or usability
- "critical" (25 points): Completely wrong or unusable

Respond with only a JSON object:
{
  "errors": [
    {"type": "accuracy/mistranslation", "severity": "major", "span": "affected text", "suggestion": "corrected text", "explanation": "reason"}
  ],
  "score": <100 - sum of weights>,
  "summary": "brief overall assessment"
}"#;

    pub const MQM_REFINEMENT: &'static str = r#"Fix the following translation errors.

## Source Text:
{source}

## Current Translation:
{translation}

## Errors to Fix:
{errors}

## Glossary (MUST apply):
{glossary}

Apply ONLY the fixes listed above. Do not make other changes.
Provide ONLY the corrected translation, with no additional commentary:"#;

    pub const PRE_ANALYSIS: &'static str = r#"Analyze this {source_lang} text before translating to {target_lang}.

## Source Text:
{source}

## Available Glossary Terms:
{glossary}

## Analyze and extract:
1. **Key Terms**: Important domain-specific terms needing careful translation
2. **Ambiguous Phrases**: Phrases with multiple possible interpretations
3. **Preserve Exact**: Code, URLs, names that should NOT be translated
4. **Challenges**: Specific difficulties for {source_lang}→{target_lang}

Respond with only a JSON object:
{
  "keyTerms": [{"term": "...", "context": "...", "suggestedTranslation": "...", "fromGlossary": false}],
  "ambiguousPhrases": [{"phrase": "...", "interpretations": ["..."], "recommendation": "..."}],
  "preserveExact": ["code snippets", "URLs", "names"],
  "challenges": ["challenge 1", "challenge 2"],
  "domain": "technical|marketing|legal|medical|general",
  "registerRecommendation": "formal|informal|neutral"
}"#;
}

/// Per-chunk context woven into the translation prompt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub document_purpose: Option<String>,
    pub style_instruction: Option<String>,
    /// e.g. "Current section: Install > Linux"
    pub document_summary: Option<String>,
    pub previous_context: Option<String>,
}

/// Builds the chat messages the agent sends
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_lang: String,
    target_lang: String,
    glossary: String,
    cacheable: bool,
}

impl TranslationPromptBuilder {
    /// `source_lang`/`target_lang` are display names, e.g. "English"
    pub fn new(source_lang: &str, target_lang: &str) -> Self {
        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            glossary: String::new(),
            cacheable: false,
        }
    }

    pub fn with_glossary(mut self, glossary_text: &str) -> Self {
        self.glossary = glossary_text.to_string();
        self
    }

    /// Split prompts into cacheable parts
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cacheable = enabled;
        self
    }

    fn glossary(&self) -> &str {
        glossary_or_placeholder(&self.glossary)
    }

    fn system_instructions(&self) -> String {
        render(
            PromptTemplate::SYSTEM_INSTRUCTIONS,
            &[("source_lang", &self.source_lang), ("target_lang", &self.target_lang)],
        )
    }

    fn glossary_section(&self) -> String {
        render(PromptTemplate::GLOSSARY_SECTION, &[("glossary", self.glossary())])
    }

    fn translation_content(&self, source: &str, context: &PromptContext) -> String {
        let style = context
            .style_instruction
            .as_deref()
            .map(|s| format!("Style: {}\n", s))
            .unwrap_or_default();
        let summary = context
            .document_summary
            .as_deref()
            .map(|s| format!("{}\n", s))
            .unwrap_or_default();

        render(
            PromptTemplate::TRANSLATION_CONTENT,
            &[
                ("purpose", context.document_purpose.as_deref().unwrap_or("General translation")),
                ("style", &style),
                ("summary", &summary),
                ("previous", context.previous_context.as_deref().unwrap_or("None")),
                ("source", source),
            ],
        )
    }

    /// Initial translation request, optionally enriched by a pre-analysis
    pub fn initial_translation(&self, source: &str, context: &PromptContext, analysis: Option<&str>) -> ChatMessage {
        let analysis_section = analysis
            .filter(|a| !a.is_empty())
            .map(|a| format!("## Pre-Translation Analysis:\n{}", a));

        if self.cacheable {
            let mut parts = vec![
                ContentPart::cacheable(self.system_instructions()),
                ContentPart::cacheable(self.glossary_section()),
            ];
            if let Some(section) = analysis_section {
                parts.push(ContentPart::text(section));
            }
            parts.push(ContentPart::text(self.translation_content(source, context)));
            return ChatMessage::user_parts(parts);
        }

        let mut sections = vec![self.system_instructions(), self.glossary_section()];
        if let Some(section) = analysis_section {
            sections.push(section);
        }
        sections.push(self.translation_content(source, context));
        ChatMessage::user(sections.join("\n\n"))
    }

    pub fn reflection(&self, source: &str, translation: &str) -> ChatMessage {
        ChatMessage::user(render(
            PromptTemplate::REFLECTION,
            &[
                ("source_lang", &self.source_lang),
                ("target_lang", &self.target_lang),
                ("source", source),
                ("translation", translation),
                ("glossary", self.glossary()),
            ],
        ))
    }

    pub fn improvement(&self, source: &str, translation: &str, suggestions: &str) -> ChatMessage {
        let header = render(PromptTemplate::IMPROVEMENT_HEADER, &[("glossary", self.glossary())]);
        let body = render(
            PromptTemplate::IMPROVEMENT_BODY,
            &[("source", source), ("translation", translation), ("suggestions", suggestions)],
        );

        if self.cacheable {
            ChatMessage::user_parts(vec![ContentPart::cacheable(header), ContentPart::text(body)])
        } else {
            ChatMessage::user(format!("{}\n\n{}", header, body))
        }
    }

    pub fn simple_evaluation(&self, source: &str, translation: &str) -> ChatMessage {
        ChatMessage::user(render(
            PromptTemplate::SIMPLE_EVALUATION,
            &[
                ("source_lang", &self.source_lang),
                ("target_lang", &self.target_lang),
                ("source", source),
                ("translation", translation),
            ],
        ))
    }

    pub fn mqm_evaluation(&self, source: &str, translation: &str) -> ChatMessage {
        ChatMessage::user(render(
            PromptTemplate::MQM_EVALUATION,
            &[
                ("source_lang", &self.source_lang),
                ("target_lang", &self.target_lang),
                ("source", source),
                ("translation", translation),
                ("glossary", self.glossary()),
            ],
        ))
    }

    pub fn mqm_refinement(&self, source: &str, translation: &str, errors: &[MqmError]) -> ChatMessage {
        ChatMessage::user(render(
            PromptTemplate::MQM_REFINEMENT,
            &[
                ("source", source),
                ("translation", translation),
                ("errors", &format_mqm_errors_for_prompt(errors)),
                ("glossary", self.glossary()),
            ],
        ))
    }

    pub fn pre_analysis(&self, source: &str) -> ChatMessage {
        ChatMessage::user(render(
            PromptTemplate::PRE_ANALYSIS,
            &[
                ("source_lang", &self.source_lang),
                ("target_lang", &self.target_lang),
                ("source", source),
                ("glossary", self.glossary()),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MessageContent;

    fn text_of(message: &ChatMessage) -> String {
        message.content.as_text()
    }

    #[test]
    fn test_initialTranslation_plain_shouldEmbedContextAndSource() {
        let builder = TranslationPromptBuilder::new("English", "Korean").with_glossary("- \"cluster\" → \"클러스터\"");
        let context = PromptContext {
            document_purpose: Some("Kubernetes docs".to_string()),
            style_instruction: Some("경어체".to_string()),
            document_summary: Some("Current section: Setup".to_string()),
            previous_context: None,
        };
        let message = builder.initial_translation("Create a cluster.", &context, None);
        let text = text_of(&message);

        assert!(matches!(message.content, MessageContent::Text(_)));
        assert!(text.starts_with("You are a professional translator specializing in English to Korean"));
        assert!(text.contains("Purpose: Kubernetes docs\nStyle: 경어체\nCurrent section: Setup\nPrevious content: None"));
        assert!(text.contains("\"cluster\" → \"클러스터\""));
        assert!(text.contains("## Source Text:\nCreate a cluster."));
    }

    #[test]
    fn test_initialTranslation_cacheable_shouldMarkStaticParts() {
        let builder = TranslationPromptBuilder::new("English", "Korean").with_caching(true);
        let message = builder.initial_translation("Hi", &PromptContext::default(), Some("**Content Type:** general"));

        let MessageContent::Parts(parts) = &message.content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 4);
        assert!(parts[0].cacheable && parts[1].cacheable);
        assert!(!parts[2].cacheable && !parts[3].cacheable);
        assert!(parts[1].text.contains(NO_GLOSSARY));
        assert!(parts[2].text.starts_with("## Pre-Translation Analysis:"));
    }

    #[test]
    fn test_mqmEvaluation_shouldKeepJsonBraces() {
        let builder = TranslationPromptBuilder::new("English", "Japanese");
        let text = text_of(&builder.mqm_evaluation("a", "b"));
        assert!(text.contains("\"errors\": ["));
        assert!(text.contains("## Translation (Japanese):\nb"));
    }

    #[test]
    fn test_render_sourceWithSlotSyntax_shouldStayLiteral() {
        let builder = TranslationPromptBuilder::new("English", "Korean").with_glossary("GLOSSARY");
        let text = text_of(&builder.mqm_evaluation("Use {glossary} and {source} here", "x"));
        assert!(text.contains("Use {glossary} and {source} here"));
    }
}
