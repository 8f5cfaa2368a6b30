/*!
 * Document-level translation.
 *
 * The engine owns the per-document work around the agent:
 * - format detection and placeholder extraction
 * - glossary loading and resolution
 * - chunking and concurrent per-chunk translation with cache lookups
 * - reassembly, placeholder restoration and document-level compliance
 *
 * A chunk whose translation fails keeps its original text with a score of
 * zero, so one bad chunk never aborts a document. Quality failures in
 * strict mode are the exception and propagate.
 */

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{Result, TranslationError};
use crate::file_utils::FileManager;
use crate::logging::LogContext;
use crate::providers::{LlmProvider, Usage};
use crate::translation::agent::{AgentOptions, TranslationAgent, TranslationRequest};
use crate::translation::cache::{hash_content, CacheKey, NullCache, TranslationCache};
use crate::translation::chunker::{Chunk, Chunker, ChunkerOptions};
use crate::translation::formatting::{
    detect_format, extract_html_blocks, extract_markdown_text, restore_html, restore_markdown, DocumentFormat,
};
use crate::translation::glossary::{
    check_document_compliance, load_glossary, resolve_glossary, ComplianceResult, ResolvedGlossary,
};
use crate::translation::invalidation::InvalidationContext;
use crate::translation::modes::QualityMode;
use crate::translation::prompts::PromptContext;

/// Per-call options; unset values fall back to the configuration
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    pub source_lang: String,
    pub target_lang: String,
    /// Detected from the content when unset
    pub format: Option<DocumentFormat>,
    /// Wins over the configured glossary
    pub glossary_path: Option<PathBuf>,
    pub quality_threshold: Option<f64>,
    pub max_iterations: Option<u32>,
    pub mode: Option<QualityMode>,
    /// Document purpose passed to the model
    pub context: Option<String>,
    pub style_instruction: Option<String>,
    pub strict_quality: bool,
    pub strict_glossary: bool,
}

impl TranslateOptions {
    pub fn new(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            ..Self::default()
        }
    }
}

/// Outcome for one chunk, in document order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub original: String,
    pub translated: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub quality_score: f64,
    pub iterations: u32,
    pub tokens_used: Usage,
    /// False for code blocks and blank chunks passed through verbatim
    pub translatable: bool,
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub format: DocumentFormat,
    pub tokens_used: Usage,
    #[serde(serialize_with = "serialize_millis", rename = "durationMs")]
    pub duration: Duration,
    /// Mean over chunks that produced a score
    pub average_quality: f64,
    pub provider: String,
    pub model: String,
    pub total_iterations: u32,
    pub cache: CacheUsage,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub content: String,
    pub chunks: Vec<ChunkResult>,
    pub metadata: DocumentMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glossary_compliance: Option<ComplianceResult>,
}

/// Values shared by every chunk of one document
struct DocumentContext {
    source_lang: String,
    target_lang: String,
    glossary: Option<Arc<ResolvedGlossary>>,
    /// Canonical glossary text hashed into cache keys
    glossary_key: Option<String>,
    provider: String,
    model: String,
    purpose: Option<String>,
    style: Option<String>,
}

/// Translates whole documents
pub struct TranslationEngine {
    config: Config,
    provider: Arc<dyn LlmProvider>,
    cache: Arc<dyn TranslationCache>,
    log: LogContext,
}

impl TranslationEngine {
    /// Engine without a cache
    pub fn new(config: Config, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            config,
            provider,
            cache: Arc::new(NullCache),
            log: LogContext::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<dyn TranslationCache> {
        &self.cache
    }

    /// Model used for requests and cache keys
    pub fn model(&self) -> String {
        self.config
            .provider
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Read a file and translate it, taking the format from the extension
    /// unless one is forced
    pub async fn translate_file(&self, path: &Path, options: &TranslateOptions) -> Result<DocumentResult> {
        let content = FileManager::read_to_string(path)?;
        let mut options = options.clone();
        if options.format.is_none() {
            options.format = DocumentFormat::from_path(path);
        }
        self.translate_content(&content, &options).await
    }

    /// Translate a document held in memory
    pub async fn translate_content(&self, content: &str, options: &TranslateOptions) -> Result<DocumentResult> {
        let start = Instant::now();
        let format = options.format.unwrap_or_else(|| detect_format(content));
        self.log.debug(format!(
            "Translating {} document {} → {}",
            format, options.source_lang, options.target_lang
        ));

        let glossary = self.load_glossary(options);
        let context = self.document_context(options, glossary);
        self.apply_cache_policies(&context);

        let agent = TranslationAgent::new(Arc::clone(&self.provider), self.agent_options(options))
            .with_log(self.log.scoped("agent"));

        let (translated, chunks) = match format {
            DocumentFormat::Markdown => {
                let (text, sections) = extract_markdown_text(content);
                self.log.debug(format!("Preserved {} markdown sections", sections.len()));
                let (joined, chunks) = self.translate_text(&agent, &context, &text).await?;
                (restore_markdown(&joined, &sections), chunks)
            }
            DocumentFormat::Html => {
                let (text, sections) = extract_html_blocks(content);
                self.log.debug(format!("Preserved {} HTML blocks", sections.len()));
                let (joined, chunks) = self.translate_text(&agent, &context, &text).await?;
                (restore_html(&joined, &sections), chunks)
            }
            DocumentFormat::Text => self.translate_text(&agent, &context, content).await?,
        };

        let glossary_compliance = match &context.glossary {
            Some(glossary) if !glossary.is_empty() => {
                let compliance = check_document_compliance(content, &translated, glossary);
                let strict = options.strict_glossary || self.config.glossary.as_ref().is_some_and(|g| g.strict);
                if strict && !compliance.is_compliant() {
                    return Err(TranslationError::GlossaryComplianceFailed {
                        missed: compliance.missed.clone(),
                        applied: compliance.applied.clone(),
                        total: glossary.terms.len(),
                    });
                }
                Some(compliance)
            }
            _ => None,
        };

        let metadata = self.summarize(&chunks, format, &context, start.elapsed());
        self.log.info(format!(
            "Translated {} chunks (quality {:.1}, cache {} hit / {} miss)",
            chunks.len(),
            metadata.average_quality,
            metadata.cache.hits,
            metadata.cache.misses
        ));

        Ok(DocumentResult {
            content: translated,
            chunks,
            metadata,
            glossary_compliance,
        })
    }

    /// Chunk, translate concurrently and join in document order
    async fn translate_text(
        &self,
        agent: &TranslationAgent,
        context: &DocumentContext,
        text: &str,
    ) -> Result<(String, Vec<ChunkResult>)> {
        let chunker = Chunker::new(ChunkerOptions {
            max_tokens: self.config.chunking.max_tokens,
            overlap_tokens: self.config.chunking.overlap_tokens,
            preserve_code_blocks: self.config.chunking.preserve_structure,
        })
        .with_log(self.log.scoped("chunker"));
        let chunks = chunker.chunk(text);
        let total = chunks.len();
        self.log.debug(format!("Split into {} chunks", total));

        let concurrency = self.config.concurrency.chunks.max(1);
        let mut results = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| async move {
                self.log.debug(format!("Chunk {}/{}", index + 1, total));
                (index, self.translate_chunk(agent, context, chunk).await)
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        // Restore document order
        results.sort_by_key(|(index, _)| *index);

        let mut chunk_results = Vec::with_capacity(results.len());
        for (_, result) in results {
            chunk_results.push(result?);
        }

        let joined = chunk_results.iter().map(|c| c.translated.as_str()).collect::<String>();
        Ok((joined, chunk_results))
    }

    async fn translate_chunk(
        &self,
        agent: &TranslationAgent,
        context: &DocumentContext,
        chunk: &Chunk,
    ) -> Result<ChunkResult> {
        let mut result = ChunkResult {
            original: chunk.content.clone(),
            translated: chunk.content.clone(),
            start_offset: chunk.start_offset,
            end_offset: chunk.end_offset,
            quality_score: 100.0,
            iterations: 0,
            tokens_used: Usage::default(),
            translatable: false,
            cached: false,
        };

        if !chunk.is_translatable() || chunk.content.trim().is_empty() {
            return Ok(result);
        }
        result.translatable = true;

        let key = CacheKey {
            content: &chunk.content,
            source_lang: &context.source_lang,
            target_lang: &context.target_lang,
            glossary: context.glossary_key.as_deref(),
            provider: &context.provider,
            model: &context.model,
        };

        if let Some(entry) = self.cache.get(&key) {
            self.log.debug(format!("Cache hit (quality: {:.1})", entry.quality_score));
            result.translated = entry.translation;
            result.quality_score = entry.quality_score;
            result.cached = true;
            return Ok(result);
        }

        let mut request = TranslationRequest::new(&chunk.content, &context.source_lang, &context.target_lang)
            .with_context(PromptContext {
                document_purpose: context.purpose.clone(),
                style_instruction: context.style.clone(),
                document_summary: section_summary(&chunk.header_hierarchy),
                previous_context: chunk.previous_context.clone(),
            });
        if let Some(glossary) = &context.glossary {
            request = request.with_glossary(Arc::clone(glossary));
        }

        match agent.translate(&request).await {
            Ok(translation) => {
                self.cache
                    .set(&key, &translation.content, translation.metadata.quality_score);
                result.translated = translation.content;
                result.quality_score = translation.metadata.quality_score;
                result.iterations = translation.metadata.iterations;
                result.tokens_used = translation.metadata.tokens_used;
                Ok(result)
            }
            Err(e @ TranslationError::QualityThresholdNotMet { .. }) => Err(e),
            Err(e) => {
                self.log.error(format!("Failed to translate chunk {}: {}", chunk.id, e));
                result.quality_score = 0.0;
                Ok(result)
            }
        }
    }

    /// Explicit path first, then the configured glossary; a configured
    /// glossary that fails to load is skipped quietly
    fn load_glossary(&self, options: &TranslateOptions) -> Option<ResolvedGlossary> {
        if let Some(path) = &options.glossary_path {
            return match load_glossary(path) {
                Ok(glossary) => Some(resolve_glossary(&glossary, &options.target_lang)),
                Err(e) => {
                    self.log.warn(format!("Failed to load glossary: {}", e));
                    None
                }
            };
        }

        let configured = self.config.glossary.as_ref()?;
        match load_glossary(Path::new(&configured.path)) {
            Ok(glossary) => Some(resolve_glossary(&glossary, &options.target_lang)),
            Err(e) => {
                self.log.debug(format!("Configured glossary unavailable: {}", e));
                None
            }
        }
    }

    fn document_context(&self, options: &TranslateOptions, glossary: Option<ResolvedGlossary>) -> DocumentContext {
        let glossary_key = glossary.as_ref().filter(|g| !g.is_empty()).map(glossary_cache_key);
        let purpose = options.context.clone().or_else(|| {
            self.config
                .project
                .as_ref()
                .map(|p| p.purpose.clone())
                .filter(|p| !p.trim().is_empty())
        });
        let style = options
            .style_instruction
            .clone()
            .or_else(|| self.config.style_for(&options.target_lang).map(str::to_string));

        DocumentContext {
            source_lang: options.source_lang.clone(),
            target_lang: options.target_lang.clone(),
            glossary: glossary.map(Arc::new),
            glossary_key,
            provider: self.provider.name().to_string(),
            model: self.model(),
            purpose,
            style,
        }
    }

    fn apply_cache_policies(&self, context: &DocumentContext) {
        if !self.cache.is_enabled() {
            return;
        }

        let removed = self.cache.apply_policies(&InvalidationContext {
            glossary_hash: context.glossary_key.as_deref().map(hash_content),
            target_lang: Some(context.target_lang.clone()),
            provider: Some(context.provider.clone()),
            model: Some(context.model.clone()),
            ..InvalidationContext::default()
        });
        if removed > 0 {
            self.log.info(format!("Invalidated {} cache entries", removed));
        }
    }

    /// A mode (from the call or the config) supplies the preset and only
    /// explicit call values override it; without a mode the configured
    /// threshold and iteration budget apply
    fn agent_options(&self, options: &TranslateOptions) -> AgentOptions {
        let mode = options.mode.or(self.config.quality.mode);
        let (quality_threshold, max_iterations) = match mode {
            Some(_) => (options.quality_threshold, options.max_iterations),
            None => (
                options.quality_threshold.or(Some(self.config.quality.threshold)),
                options.max_iterations.or(Some(self.config.quality.max_iterations)),
            ),
        };

        AgentOptions {
            mode,
            quality_threshold,
            max_iterations,
            strict_quality: options.strict_quality || self.config.quality.strict,
            model: self.config.provider.model.clone(),
            ..AgentOptions::default()
        }
    }

    fn summarize(
        &self,
        chunks: &[ChunkResult],
        format: DocumentFormat,
        context: &DocumentContext,
        duration: Duration,
    ) -> DocumentMetadata {
        let mut tokens_used = Usage::default();
        let mut total_iterations = 0;
        let mut cache = CacheUsage::default();
        let mut scored = Vec::new();

        for chunk in chunks {
            tokens_used += chunk.tokens_used;
            total_iterations += chunk.iterations;
            if chunk.cached {
                cache.hits += 1;
            } else if chunk.translatable {
                cache.misses += 1;
            }
            if chunk.quality_score > 0.0 {
                scored.push(chunk.quality_score);
            }
        }

        let average_quality = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        };

        DocumentMetadata {
            format,
            tokens_used,
            duration,
            average_quality,
            provider: context.provider.clone(),
            model: context.model.clone(),
            total_iterations,
            cache,
        }
    }
}

/// `Current section: A > B` for chunks under headings
fn section_summary(headers: &[String]) -> Option<String> {
    if headers.is_empty() {
        return None;
    }
    let names: Vec<&str> = headers
        .iter()
        .map(|h| h.trim_start_matches('#').trim())
        .collect();
    Some(format!("Current section: {}", names.join(" > ")))
}

/// Stable JSON of the resolved source → target pairs
fn glossary_cache_key(glossary: &ResolvedGlossary) -> String {
    let pairs: Vec<serde_json::Value> = glossary
        .terms
        .iter()
        .map(|t| serde_json::json!({ "s": t.source, "t": t.target }))
        .collect();
    serde_json::Value::Array(pairs).to_string()
}
