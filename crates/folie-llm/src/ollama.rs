//! Ollama provider for local inference
//!
//! Ollama serves two completion endpoints. [`OllamaApi::Generate`] posts a raw
//! prompt with a separate system string to `/api/generate`;
//! [`OllamaApi::Chat`] posts a `system` + `user` message list to `/api/chat`
//! so the model's chat template is applied. Model strings pick the endpoint:
//! `ollama/<name>` generates, `ollama_chat/<name>` chats.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::provider::{LlmError, LlmProvider, LlmRequest, LlmResponse};

/// Local Ollama server used when no base URL is configured
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OllamaApi {
    Generate,
    #[default]
    Chat,
}

impl OllamaApi {
    fn path(self) -> &'static str {
        match self {
            OllamaApi::Generate => "api/generate",
            OllamaApi::Chat => "api/chat",
        }
    }
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for either endpoint
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OllamaBody<'a> {
    Generate {
        model: &'a str,
        prompt: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        system: Option<&'a str>,
        stream: bool,
        options: SamplingOptions,
    },
    Chat {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        stream: bool,
        options: SamplingOptions,
    },
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
    model: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ChatReplyMessage,
    model: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama provider for local LLM inference
#[derive(Debug)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    api: OllamaApi,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Chat with `model` on the local server
    pub fn new(model: &str) -> Self {
        Self::with_url(DEFAULT_OLLAMA_URL, model)
    }

    /// Chat with `model` on the server at `base_url`
    pub fn with_url(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api: OllamaApi::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api(mut self, api: OllamaApi) -> Self {
        self.api = api;
        self
    }

    /// Bound every request by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;
        Ok(self)
    }

    pub fn api(&self) -> OllamaApi {
        self.api
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn body<'a>(&'a self, request: &'a LlmRequest) -> OllamaBody<'a> {
        let options = SamplingOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        };
        let system = Some(request.system.as_str()).filter(|s| !s.is_empty());

        match self.api {
            OllamaApi::Generate => OllamaBody::Generate {
                model: &self.model,
                prompt: &request.prompt,
                system,
                stream: false,
                options,
            },
            OllamaApi::Chat => {
                let mut messages = Vec::with_capacity(2);
                if let Some(content) = system {
                    messages.push(ChatMessage {
                        role: "system",
                        content,
                    });
                }
                messages.push(ChatMessage {
                    role: "user",
                    content: &request.prompt,
                });
                OllamaBody::Chat {
                    model: &self.model,
                    messages,
                    stream: false,
                    options,
                }
            }
        }
    }

    /// (content, model, eval_count) from a non-streaming reply body
    fn parse_reply(&self, bytes: &[u8]) -> Result<(String, String, Option<u32>), LlmError> {
        let invalid = |e: serde_json::Error| LlmError::InvalidResponse(e.to_string());
        match self.api {
            OllamaApi::Generate => {
                let reply: GenerateReply = serde_json::from_slice(bytes).map_err(invalid)?;
                Ok((reply.response, reply.model, reply.eval_count))
            }
            OllamaApi::Chat => {
                let reply: ChatReply = serde_json::from_slice(bytes).map_err(invalid)?;
                Ok((reply.message.content, reply.model, reply.eval_count))
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        match self.api {
            OllamaApi::Generate => "ollama",
            OllamaApi::Chat => "ollama_chat",
        }
    }

    async fn is_available(&self) -> bool {
        match self.client.get(self.url("api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.url(self.api.path()))
            .json(&self.body(&request))
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!(
                "Status: {}, Body: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await.map_err(LlmError::from_transport)?;
        let (content, model, tokens_used) = self.parse_reply(&bytes)?;

        tracing::debug!(
            model = %model,
            api = self.api.path(),
            tokens = tokens_used,
            "Ollama completion"
        );

        Ok(LlmResponse {
            content,
            model,
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
