use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatRequest, ChatResponse, FinishReason, LlmProvider, MessageContent, ModelInfo, Role, Usage};
use crate::errors::ProviderError;

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic client for interacting with the Messages API
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (empty means the public API)
    endpoint: String,
    /// Model used when a request does not name one
    model: String,
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    /// System prompt blocks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<AnthropicBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicBlock>,
}

/// Text content block, optionally marked for prompt caching
#[derive(Debug, Serialize)]
pub struct AnthropicBlock {
    #[serde(rename = "type")]
    pub block_type: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub control_type: &'static str,
}

impl AnthropicBlock {
    fn text(text: String, cacheable: bool) -> Self {
        Self {
            block_type: "text",
            text,
            cache_control: cacheable.then_some(CacheControl { control_type: "ephemeral" }),
        }
    }
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
    pub usage: TokenUsage,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

fn to_blocks(content: &MessageContent) -> Vec<AnthropicBlock> {
    match content {
        MessageContent::Text(text) => vec![AnthropicBlock::text(text.clone(), false)],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|p| AnthropicBlock::text(p.text.clone(), p.cacheable))
            .collect(),
    }
}

impl AnthropicRequest {
    /// Map a generic chat request; system messages move to the `system` field
    pub fn from_chat(request: &ChatRequest, default_model: &str) -> Self {
        let mut system = Vec::new();
        let mut messages = Vec::new();

        for message in &request.messages {
            match message.role {
                Role::System => system.extend(to_blocks(&message.content)),
                role => messages.push(AnthropicMessage {
                    role: role.as_str().to_string(),
                    content: to_blocks(&message.content),
                }),
            }
        }

        Self {
            model: request.model.clone().unwrap_or_else(|| default_model.to_string()),
            messages,
            system,
            temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder().timeout(timeout).build().unwrap_or_default();
        self
    }

    fn api_url(&self) -> String {
        let base = if self.endpoint.is_empty() { DEFAULT_ENDPOINT } else { &self.endpoint };
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }

    /// Complete a messages request
    pub async fn complete(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send request to Anthropic API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e)))
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for Anthropic {
    fn name(&self) -> &str {
        "claude"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let api_request = AnthropicRequest::from_chat(&request, &self.model);
        debug!("Anthropic request: model={} messages={}", api_request.model, api_request.messages.len());

        let response = self.complete(&api_request).await?;

        Ok(ChatResponse {
            content: Self::extract_text_from_response(&response),
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                cache_read_tokens: response.usage.cache_read_input_tokens.unwrap_or(0),
                cache_write_tokens: response.usage.cache_creation_input_tokens.unwrap_or(0),
            },
            model: if response.model.is_empty() { api_request.model } else { response.model },
            finish_reason: FinishReason::from_provider(response.stop_reason.as_deref()),
        })
    }

    fn model_info(&self, model: Option<&str>) -> ModelInfo {
        let model = model.unwrap_or(&self.model);
        let max_output_tokens = if model.contains("opus") { 32_000 } else { 64_000 };
        ModelInfo {
            max_context_tokens: 200_000,
            max_output_tokens,
            supports_prompt_caching: true,
        }
    }

    fn supports_prompt_caching(&self) -> bool {
        true
    }
}
