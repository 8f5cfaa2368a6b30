/*!
 * Prompt engineering for document translation.
 *
 * This module provides:
 * - Templates for translation, reflection, evaluation and analysis calls
 * - A builder that renders them into chat messages, split into cacheable
 *   parts when the provider supports prompt caching
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptContext, PromptTemplate, TranslationPromptBuilder};
