/*!
 * # llm-translate
 *
 * A Rust library for translating documents with large language models.
 *
 * ## Features
 *
 * - Markdown, HTML and plain text documents
 * - Structure-aware chunking that never splits code blocks
 * - Self-refining translation: translate, evaluate, refine
 * - Simple rubric or MQM quality evaluation
 * - Glossaries with per-language targets and compliance checks
 * - Content-addressed on-disk cache with invalidation policies
 * - Providers:
 *   - Anthropic Claude (with prompt caching)
 *   - OpenAI and OpenAI-compatible endpoints
 *   - Ollama (local LLM)
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Project configuration (`.translaterc.json`)
 * - `translation`: The translation core:
 *   - `translation::chunker`: Document chunking
 *   - `translation::agent`: Per-chunk self-refine loop
 *   - `translation::engine`: Per-document orchestration
 *   - `translation::batch`: Directory translation
 *   - `translation::cache`: Translation cache
 * - `providers`: LLM clients behind the `LlmProvider` trait
 * - `file_utils`: File discovery and output paths
 * - `language_utils`: ISO language code utilities
 * - `logging`: Log context passed through the pipeline
 * - `errors`: Error types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod logging;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, ConfigOverrides};
pub use errors::{ErrorCode, ProviderError, TranslationError};
pub use language_utils::{language_codes_match, language_display_name, normalize_language_code};
pub use logging::LogContext;
pub use providers::{create_provider, LlmProvider};
pub use translation::{BatchTranslator, DocumentResult, TranslateOptions, TranslationEngine};
