/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::scripted(..)` - Replies from a fixed queue, in order
 * - `MockProvider::responder(..)` - Replies computed from the request
 * - `MockProvider::failing(..)` - Always fails with the given error
 * - `MockProvider::echo()` - Replies with the last user message
 *
 * Clones share the request counter, the recorded requests and the script.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{ChatRequest, ChatResponse, FinishReason, LlmProvider, ModelInfo, Usage};
use crate::translation::tokens::estimate_tokens;

type ResponderFn = dyn Fn(&ChatRequest) -> String + Send + Sync;

/// Behavior mode for the mock provider
#[derive(Clone)]
pub enum MockBehavior {
    /// Pop the next reply; an exhausted script is an error
    Scripted(Arc<Mutex<VecDeque<Result<String, ProviderError>>>>),
    /// Compute the reply from the request
    Responder(Arc<ResponderFn>),
    /// Always fail with this error
    Failing(ProviderError),
    /// Return the last user message unchanged
    Echo,
}

impl std::fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockBehavior::Scripted(queue) => write!(f, "Scripted({} left)", queue.lock().len()),
            MockBehavior::Responder(_) => f.write_str("Responder"),
            MockBehavior::Failing(e) => write!(f, "Failing({})", e),
            MockBehavior::Echo => f.write_str("Echo"),
        }
    }
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    name: String,
    model: String,
    prompt_caching: bool,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            prompt_caching: false,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replies returned in order, one per call
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = replies.into_iter().map(|r| Ok(r.into())).collect();
        Self::new(MockBehavior::Scripted(Arc::new(Mutex::new(queue))))
    }

    /// Script mixing replies and failures
    pub fn scripted_results(results: Vec<Result<String, ProviderError>>) -> Self {
        Self::new(MockBehavior::Scripted(Arc::new(Mutex::new(results.into()))))
    }

    pub fn responder<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> String + Send + Sync + 'static,
    {
        Self::new(MockBehavior::Responder(Arc::new(responder)))
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_prompt_caching(mut self, enabled: bool) -> Self {
        self.prompt_caching = enabled;
        self
    }

    /// Number of chat calls made so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    fn reply(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Scripted(queue) => queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::RequestFailed("Mock script exhausted".to_string()))),
            MockBehavior::Responder(responder) => Ok(responder(request)),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Echo => Ok(request.last_user_text().unwrap_or_default()),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            name: self.name.clone(),
            model: self.model.clone(),
            prompt_caching: self.prompt_caching,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let content = self.reply(&request)?;
        let prompt_tokens: usize = request.messages.iter().map(|m| estimate_tokens(&m.text())).sum();

        Ok(ChatResponse {
            usage: Usage::new(prompt_tokens as u64, estimate_tokens(&content) as u64),
            content,
            model: request.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: FinishReason::Stop,
        })
    }

    fn model_info(&self, _model: Option<&str>) -> ModelInfo {
        ModelInfo {
            max_context_tokens: 100_000,
            max_output_tokens: 4_096,
            supports_prompt_caching: self.prompt_caching,
        }
    }

    fn supports_prompt_caching(&self) -> bool {
        self.prompt_caching
    }
}
