/*!
 * Document translation core.
 *
 * This module contains the pipeline from source document to translated
 * document. It is split into several submodules:
 *
 * - `tokens`: Token estimation and budgets
 * - `chunker`: Structure-aware splitting into translatable chunks
 * - `glossary`: Glossary files, resolution and compliance checks
 * - `cache` / `invalidation`: Content-addressed translation cache and its policies
 * - `quality` / `analysis` / `modes`: Evaluation, pre-analysis and quality presets
 * - `prompts`: Prompt templates and builders
 * - `agent`: Per-chunk translate/evaluate/refine loop
 * - `formatting`: Markdown and HTML placeholder extraction
 * - `engine`: Per-document orchestration
 * - `batch`: Directory translation
 */

// Re-export main types for easier usage
pub use self::agent::{AgentOptions, TranslationAgent, TranslationRequest, TranslationResult};
pub use self::batch::{BatchSummary, BatchTranslator};
pub use self::cache::{CacheManager, NullCache, TranslationCache};
pub use self::chunker::{Chunk, ChunkKind, Chunker, ChunkerOptions};
pub use self::engine::{DocumentResult, TranslateOptions, TranslationEngine};
pub use self::formatting::DocumentFormat;
pub use self::glossary::{Glossary, GlossaryTerm, ResolvedGlossary};
pub use self::modes::QualityMode;

// Re-export prompt types
pub use self::prompts::{PromptContext, TranslationPromptBuilder};

// Submodules
pub mod agent;
pub mod analysis;
pub mod batch;
pub mod cache;
pub mod chunker;
pub mod engine;
pub mod formatting;
pub mod glossary;
pub mod invalidation;
pub mod modes;
pub mod parsing;
pub mod prompts;
pub mod quality;
pub mod tokens;
