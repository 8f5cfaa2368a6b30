/*!
 * Provider implementations for different LLM services.
 *
 * This module contains client implementations for various LLM providers:
 * - Anthropic: Claude via the Messages API, with prompt caching
 * - OpenAI: Chat Completions API, also used for OpenAI-compatible endpoints
 * - Ollama: Local LLM server
 * - Mock: scripted provider for tests
 *
 * The translation core only talks to [`LlmProvider`].
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, ProviderKind};
use crate::errors::{ProviderError, TranslationError};
use crate::translation::tokens::estimate_tokens;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use anthropic::Anthropic;
pub use mock::MockProvider;
pub use ollama::Ollama;
pub use openai::OpenAI;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One text segment of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub text: String,
    /// Hint that the provider may cache this prefix; ignorable
    pub cacheable: bool,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), cacheable: false }
    }

    pub fn cacheable(text: impl Into<String>) -> Self {
        Self { text: text.into(), cacheable: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten to a single string; parts are separated by a blank line
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: MessageContent::Text(text.into()) }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: MessageContent::Text(text.into()) }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: MessageContent::Text(text.into()) }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self { role: Role::User, content: MessageContent::Parts(parts) }
    }

    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Provider default when unset
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, ..Default::default() }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Text of the last user message
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(ChatMessage::text)
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self { input_tokens, output_tokens, ..Default::default() }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_write_tokens += other.cache_write_tokens;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    Error,
}

impl FinishReason {
    /// Map a provider-specific stop reason
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") | Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("length") | Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Usage,
    pub model: String,
    pub finish_reason: FinishReason,
}

/// Static facts about a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub max_context_tokens: usize,
    pub max_output_tokens: usize,
    pub supports_prompt_caching: bool,
}

/// Common trait for all LLM providers
///
/// Implementations send a chat exchange and report token usage. Everything
/// else (prompting, retries on quality) lives in the translation core.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Lowercase identifier, e.g. "claude"
    fn name(&self) -> &str;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Send a chat request and receive the complete response
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn model_info(&self, model: Option<&str>) -> ModelInfo;

    /// Whether cacheable content parts are honoured
    fn supports_prompt_caching(&self) -> bool {
        false
    }

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ChatRequest::new(vec![ChatMessage::user("Hello")]).with_max_tokens(10);
        self.chat(request).await.map(|_| ())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// API key from the config file, falling back to the environment
fn api_key_for(config: &Config, kind: ProviderKind) -> Option<String> {
    config
        .provider
        .api_keys
        .get(&kind)
        .cloned()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| kind.api_key_env().and_then(env_var))
}

/// Build a client for `kind` if it has the credentials it needs
fn build_provider(config: &Config, kind: ProviderKind, primary: bool) -> Option<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.provider.timeout_secs);
    // Model and endpoint overrides target the primary provider
    let model = if primary { config.provider.model.clone() } else { None };
    let endpoint = if primary { config.provider.endpoint.clone() } else { None };

    match kind {
        ProviderKind::Claude => {
            let key = api_key_for(config, kind)?;
            let mut client = Anthropic::new(key, endpoint.unwrap_or_default()).with_timeout(timeout);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            Some(Arc::new(client))
        }
        ProviderKind::OpenAI => {
            let key = api_key_for(config, kind)?;
            let mut client = OpenAI::new(key, endpoint.unwrap_or_default()).with_timeout(timeout);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            Some(Arc::new(client))
        }
        ProviderKind::Ollama => {
            let base_url = endpoint
                .or_else(|| env_var("OLLAMA_BASE_URL"))
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            let mut client = Ollama::from_url(base_url).with_timeout(timeout);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            Some(Arc::new(client))
        }
        ProviderKind::Custom => {
            let key = api_key_for(config, kind)?;
            let base_url = endpoint.or_else(|| env_var("LLM_BASE_URL"))?;
            let mut client = OpenAI::new(key, base_url).named("custom").with_timeout(timeout);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            Some(Arc::new(client))
        }
    }
}

/// Resolve the configured provider, trying fallbacks in order when the
/// primary lacks credentials
pub fn create_provider(config: &Config) -> Result<Arc<dyn LlmProvider>, TranslationError> {
    let primary = config.provider.default;
    if let Some(provider) = build_provider(config, primary, true) {
        return Ok(provider);
    }

    for &fallback in &config.provider.fallback {
        if let Some(provider) = build_provider(config, fallback, false) {
            log::warn!(
                "No credentials for {}, falling back to {}",
                primary.display_name(),
                fallback.display_name()
            );
            return Ok(provider);
        }
    }

    Err(ProviderError::AuthenticationError(format!(
        "No API key found for any configured provider (primary: {})",
        primary
    ))
    .into())
}
