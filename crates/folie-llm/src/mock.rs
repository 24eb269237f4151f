//! Mock LLM provider for testing

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::provider::{LlmError, LlmProvider, LlmRequest, LlmResponse};

type Responder = Box<dyn Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync>;

enum Behavior {
    /// Cycle through canned responses
    Canned(Vec<String>),
    /// Compute the response from the request
    Func(Responder),
    /// Every call fails
    Failing,
}

/// A mock LLM provider that returns predefined responses
pub struct MockProvider {
    /// Name of this mock
    pub name: String,
    behavior: Behavior,
    /// Number of completions served so far
    calls: AtomicUsize,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider with given responses
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_behavior("mock", Behavior::Canned(responses))
    }

    /// Create a mock that always returns the same response
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose response is computed from each request
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self::with_behavior("mock", Behavior::Func(Box::new(responder)))
    }

    /// Create a mock that fails every request
    pub fn failing() -> Self {
        Self::with_behavior("failing-mock", Behavior::Failing)
    }

    fn with_behavior(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        !matches!(self.behavior, Behavior::Failing)
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let idx = self.calls.fetch_add(1, Ordering::Relaxed);

        let content = match &self.behavior {
            Behavior::Canned(responses) if responses.is_empty() => String::new(),
            Behavior::Canned(responses) => responses[idx % responses.len()].clone(),
            Behavior::Func(responder) => responder(&request)?,
            Behavior::Failing => {
                return Err(LlmError::ConnectionFailed("mock provider failure".to_string()))
            }
        };

        Ok(LlmResponse {
            content,
            model: self.name.clone(),
            tokens_used: Some((request.prompt.len() / 4) as u32 + 1),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
