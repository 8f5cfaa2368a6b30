use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatResponse as LlmChatResponse, FinishReason, LlmProvider, ModelInfo, Usage};
use crate::errors::ProviderError;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Context windows of common local models; unknown models get 8k
const MODEL_CONTEXT: &[(&str, usize)] = &[
    ("llama3.3", 128_000),
    ("llama3.2", 128_000),
    ("llama3.1", 128_000),
    ("llama3", 8_192),
    ("llama2", 4_096),
    ("mistral-nemo", 128_000),
    ("mistral", 32_768),
    ("mixtral", 32_768),
    ("qwen2.5", 128_000),
    ("qwen2", 32_768),
    ("gemma2", 8_192),
    ("phi3", 128_000),
];

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    model: String,
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    pub fn from_chat(request: &super::ChatRequest, default_model: &str) -> Self {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| GenerationOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        });

        Self {
            model: request.model.clone().unwrap_or_else(|| default_model.to_string()),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: m.text(),
                })
                .collect(),
            options,
            stream: false,
        }
    }
}

/// Stitch a JSONL streaming body into one response
fn parse_streamed_chat(body: &str) -> Option<ChatResponse> {
    let frames: Vec<ChatResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<ChatResponse>(line).ok())
        .collect();

    let content: String = frames.iter().map(|f| f.message.content.as_str()).collect();
    let last = frames.into_iter().rev().find(|f| f.done)?;

    Some(ChatResponse {
        message: ChatMessage {
            role: "assistant".to_string(),
            content,
        },
        ..last
    })
}

impl Ollama {
    /// Create a new Ollama client from a complete URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_default();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat with the Ollama API
    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send chat request to Ollama API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to get response text from Ollama API: {}", e)))?;

        match serde_json::from_str::<ChatResponse>(&response_text) {
            Ok(chat_response) => Ok(chat_response),
            // Some servers stream regardless of `stream: false`
            Err(e) => parse_streamed_chat(&response_text).ok_or_else(|| {
                let preview: String = response_text.chars().take(500).collect();
                error!("Failed to parse Ollama API chat response: {}. Raw response (first 500 chars): {}", e, preview);
                ProviderError::ParseError(format!("Failed to parse Ollama API chat response: {}", e))
            }),
        }
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to connect to Ollama: {}", e)))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama version response: {}", e)))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl LlmProvider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: super::ChatRequest) -> Result<LlmChatResponse, ProviderError> {
        let api_request = ChatRequest::from_chat(&request, &self.model);
        debug!("Ollama request: model={} messages={}", api_request.model, api_request.messages.len());

        let response = self.send_chat(&api_request).await?;

        Ok(LlmChatResponse {
            content: response.message.content,
            usage: Usage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
            model: if response.model.is_empty() { api_request.model } else { response.model },
            finish_reason: if response.done {
                FinishReason::from_provider(response.done_reason.as_deref().or(Some("stop")))
            } else {
                FinishReason::Error
            },
        })
    }

    fn model_info(&self, model: Option<&str>) -> ModelInfo {
        let model = model.unwrap_or(&self.model);
        let base = model.split(':').next().unwrap_or(model);
        let max_context_tokens = MODEL_CONTEXT
            .iter()
            .find(|(name, _)| *name == base)
            .map(|(_, size)| *size)
            .unwrap_or(8_192);

        ModelInfo {
            max_context_tokens,
            max_output_tokens: 4_096,
            supports_prompt_caching: false,
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }
}
