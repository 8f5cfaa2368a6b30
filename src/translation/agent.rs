/*!
 * Self-refining translation agent.
 *
 * One agent call translates one chunk through these stages:
 * - optional pre-translation analysis
 * - initial translation
 * - an evaluate/refine loop bounded by the iteration budget
 * - a final evaluation when the loop ended on a refinement
 *
 * Evaluation answers that cannot be parsed degrade to a neutral score.
 * Provider failures on translation calls propagate to the caller.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{ProviderError, Result, TranslationError};
use crate::language_utils::language_display_name;
use crate::logging::LogContext;
use crate::providers::{ChatMessage, ChatRequest, LlmProvider, Usage};
use crate::translation::analysis::{parse_analysis_response, PreTranslationAnalysis};
use crate::translation::glossary::{check_compliance, ComplianceResult, GlossaryLookup, ResolvedGlossary};
use crate::translation::modes::{ModeConfig, ModeOverrides, QualityMode};
use crate::translation::prompts::{PromptContext, TranslationPromptBuilder};
use crate::translation::quality::{parse_mqm_response, parse_simple_evaluation, MqmEvaluation, QualityEvaluation};

static TRAILING_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+##\s+[A-Z][^:\n]*:\s*$").expect("trailing header regex"));
static TRAILING_COLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*$").expect("trailing colon regex"));
static EVALUATION_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+\d+\.\s*\*\*[^*]+\*\*[\s\S]*$").expect("evaluation list regex"));

/// Agent behaviour; unset values come from the quality mode preset
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    /// Preset applied first; balanced when unset
    pub mode: Option<QualityMode>,
    pub quality_threshold: Option<f64>,
    pub max_iterations: Option<u32>,
    pub enable_analysis: Option<bool>,
    pub use_mqm: Option<bool>,
    /// Fail instead of returning a below-threshold translation
    pub strict_quality: bool,
    /// Split prompts into cacheable parts; defaults to provider support
    pub enable_caching: Option<bool>,
    /// Model passed on every request; provider default when unset
    pub model: Option<String>,
}

impl AgentOptions {
    /// Resolve the effective mode configuration
    pub fn mode_config(&self) -> ModeConfig {
        self.mode.unwrap_or_default().resolve(&ModeOverrides {
            enable_analysis: self.enable_analysis,
            use_mqm: self.use_mqm,
            max_iterations: self.max_iterations,
            quality_threshold: self.quality_threshold,
        })
    }
}

/// One chunk to translate
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub content: String,
    pub source_lang: String,
    pub target_lang: String,
    pub glossary: Option<Arc<ResolvedGlossary>>,
    pub context: PromptContext,
}

impl TranslationRequest {
    pub fn new(content: impl Into<String>, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            glossary: None,
            context: PromptContext::default(),
        }
    }

    pub fn with_glossary(mut self, glossary: Arc<ResolvedGlossary>) -> Self {
        self.glossary = Some(glossary);
        self
    }

    pub fn with_context(mut self, context: PromptContext) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    /// 0 when evaluation was skipped
    pub quality_score: f64,
    pub quality_threshold: f64,
    pub threshold_met: bool,
    /// The initial translation counts as the first iteration
    pub iterations: u32,
    pub tokens_used: Usage,
    #[serde(skip)]
    pub duration: Duration,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<QualityEvaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PreTranslationAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub content: String,
    pub metadata: TranslationMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glossary_compliance: Option<ComplianceResult>,
}

/// Strip prompt scaffolding an LLM sometimes echoes after its answer.
///
/// Trailing lines ending in a colon are dropped unless `source` itself ends
/// in one; a source that ends mid-list in a colon line still loses it.
pub fn clean_output(source: &str, text: &str) -> String {
    let mut cleaned = TRAILING_HEADER_RE.replace(text.trim(), "").into_owned();

    if TRAILING_COLON_RE.is_match(&cleaned) && !TRAILING_COLON_RE.is_match(source) {
        let mut lines: Vec<&str> = cleaned.split('\n').collect();
        while lines.last().is_some_and(|line| TRAILING_COLON_RE.is_match(line.trim())) {
            lines.pop();
        }
        cleaned = lines.join("\n");
    }

    cleaned = EVALUATION_LIST_RE.replace(&cleaned, "").into_owned();
    cleaned.trim().to_string()
}

/// Re-apply the source's leading and trailing whitespace around `translated`
pub fn preserve_whitespace(source: &str, translated: &str) -> String {
    let trimmed_start = source.trim_start();
    let leading = &source[..source.len() - trimmed_start.len()];
    // All-whitespace sources already contribute everything as leading
    let trailing = if trimmed_start.is_empty() {
        ""
    } else {
        &trimmed_start[trimmed_start.trim_end().len()..]
    };

    format!("{}{}{}", leading, translated, trailing)
}

/// Translates one chunk with self-refinement
#[derive(Debug, Clone)]
pub struct TranslationAgent {
    provider: Arc<dyn LlmProvider>,
    options: AgentOptions,
    log: LogContext,
}

impl TranslationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, options: AgentOptions) -> Self {
        Self {
            provider,
            options,
            log: LogContext::default().scoped("agent"),
        }
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log.scoped("agent");
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    fn model(&self) -> String {
        self.options
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Send one user message, accumulating usage
    async fn call(&self, message: ChatMessage, usage: &mut Usage) -> std::result::Result<String, ProviderError> {
        let mut request = ChatRequest::new(vec![message]);
        if let Some(model) = &self.options.model {
            request = request.with_model(model.clone());
        }
        let response = self.provider.chat(request).await?;
        *usage += response.usage;
        Ok(response.content)
    }

    /// Translation-producing call: cleaned and whitespace-aligned with the source
    async fn call_translation(&self, message: ChatMessage, source: &str, usage: &mut Usage) -> Result<String> {
        let raw = self.call(message, usage).await?;
        Ok(preserve_whitespace(source, &clean_output(source, &raw)))
    }

    async fn analyze(&self, builder: &TranslationPromptBuilder, source: &str, usage: &mut Usage) -> PreTranslationAnalysis {
        match self.call(builder.pre_analysis(source), usage).await {
            Ok(response) => parse_analysis_response(&response).unwrap_or_else(|| {
                self.log.warn("Could not parse pre-translation analysis; continuing without it");
                PreTranslationAnalysis::empty()
            }),
            Err(e) => {
                self.log.warn(format!("Pre-translation analysis failed: {}", e));
                PreTranslationAnalysis::empty()
            }
        }
    }

    async fn evaluate(
        &self,
        builder: &TranslationPromptBuilder,
        use_mqm: bool,
        source: &str,
        translation: &str,
        usage: &mut Usage,
    ) -> Result<QualityEvaluation> {
        if !use_mqm {
            let response = self.call(builder.simple_evaluation(source, translation), usage).await?;
            return Ok(QualityEvaluation::Simple(parse_simple_evaluation(&response)));
        }

        let evaluation = match self.call(builder.mqm_evaluation(source, translation), usage).await {
            Ok(response) => parse_mqm_response(&response).unwrap_or_else(|| {
                self.log.warn("Could not parse MQM evaluation; using neutral score");
                MqmEvaluation::fallback("Failed to parse MQM evaluation")
            }),
            Err(e) => {
                self.log.warn(format!("MQM evaluation failed: {}", e));
                MqmEvaluation::fallback("MQM evaluation failed")
            }
        };
        Ok(QualityEvaluation::Mqm(evaluation))
    }

    async fn refine(
        &self,
        builder: &TranslationPromptBuilder,
        source: &str,
        translation: &str,
        evaluation: &QualityEvaluation,
        usage: &mut Usage,
    ) -> Result<String> {
        if let Some(errors) = evaluation.mqm_errors() {
            self.log.debug(format!("Fixing {} MQM errors", errors.len()));
            return self
                .call_translation(builder.mqm_refinement(source, translation, errors), source, usage)
                .await;
        }

        let suggestions = self.call(builder.reflection(source, translation), usage).await?;
        self.call_translation(builder.improvement(source, translation, &suggestions), source, usage)
            .await
    }

    /// Translate one chunk
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let start = Instant::now();
        let config = self.options.mode_config();
        let mut usage = Usage::default();

        let glossary_text = request
            .glossary
            .as_deref()
            .map(|g| GlossaryLookup::new(g).format_for_prompt())
            .unwrap_or_default();
        let caching = self
            .options
            .enable_caching
            .unwrap_or_else(|| self.provider.supports_prompt_caching());
        let builder = TranslationPromptBuilder::new(
            &language_display_name(&request.source_lang),
            &language_display_name(&request.target_lang),
        )
        .with_glossary(&glossary_text)
        .with_caching(caching);

        let analysis = if config.enable_analysis {
            Some(self.analyze(&builder, &request.content, &mut usage).await)
        } else {
            None
        };
        let analysis_text = analysis.as_ref().map(PreTranslationAnalysis::format_for_prompt);

        let initial = builder.initial_translation(&request.content, &request.context, analysis_text.as_deref());
        let mut translation = self.call_translation(initial, &request.content, &mut usage).await?;
        let mut iterations: u32 = 1;

        if config.skips_evaluation() {
            self.log.debug("Single pass without evaluation");
            return Ok(self.finish(request, translation, None, &config, iterations, usage, analysis, start));
        }

        let mut evaluation: Option<QualityEvaluation> = None;
        let mut evaluated_latest = false;

        while iterations < config.max_iterations {
            let current = self
                .evaluate(&builder, config.use_mqm, &request.content, &translation, &mut usage)
                .await?;
            let score = current.score();
            evaluation = Some(current);

            if score >= config.quality_threshold {
                evaluated_latest = true;
                break;
            }

            self.log.debug(format!(
                "Iteration {}: score {:.1} below threshold {:.1}, refining",
                iterations, score, config.quality_threshold
            ));
            if let Some(current) = &evaluation {
                translation = self
                    .refine(&builder, &request.content, &translation, current, &mut usage)
                    .await?;
            }
            iterations += 1;
        }

        if !evaluated_latest {
            evaluation = Some(
                self.evaluate(&builder, config.use_mqm, &request.content, &translation, &mut usage)
                    .await?,
            );
        }

        let result = self.finish(request, translation, evaluation, &config, iterations, usage, analysis, start);

        if !result.metadata.threshold_met {
            self.log.warn(format!(
                "Quality {:.1} below threshold {:.1} after {} iterations",
                result.metadata.quality_score, config.quality_threshold, iterations
            ));
            if self.options.strict_quality {
                return Err(TranslationError::QualityThresholdNotMet {
                    score: result.metadata.quality_score,
                    threshold: config.quality_threshold,
                    iterations,
                    max_iterations: config.max_iterations,
                    issues: result
                        .metadata
                        .evaluation
                        .as_ref()
                        .map(QualityEvaluation::issues)
                        .unwrap_or_default(),
                });
            }
        }

        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        request: &TranslationRequest,
        content: String,
        evaluation: Option<QualityEvaluation>,
        config: &ModeConfig,
        iterations: u32,
        usage: Usage,
        analysis: Option<PreTranslationAnalysis>,
        start: Instant,
    ) -> TranslationResult {
        // Without an evaluation the threshold is waived
        let (quality_score, quality_threshold, threshold_met) = match &evaluation {
            Some(e) => (e.score(), config.quality_threshold, e.score() >= config.quality_threshold),
            None => (0.0, 0.0, true),
        };

        let glossary_compliance = request
            .glossary
            .as_deref()
            .filter(|g| !g.is_empty())
            .map(|g| check_compliance(&request.content, &content, g));

        if let Some(compliance) = &glossary_compliance {
            if !compliance.is_compliant() {
                self.log.debug(format!("Glossary terms missed: {}", compliance.missed.join(", ")));
            }
        }

        TranslationResult {
            content,
            metadata: TranslationMetadata {
                quality_score,
                quality_threshold,
                threshold_met,
                iterations,
                tokens_used: usage,
                duration: start.elapsed(),
                provider: self.provider.name().to_string(),
                model: self.model(),
                evaluation,
                analysis,
            },
            glossary_compliance,
        }
    }
}
