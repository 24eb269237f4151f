//! Provider selection from an [`ExperimentConfig`]
//!
//! The model string carries the backend as a prefix:
//!
//! | Model string | Backend |
//! |--------------|---------|
//! | `ollama_chat/<name>` | [`OllamaProvider`] chat endpoint at `api_base` |
//! | `ollama/<name>` | [`OllamaProvider`] generate endpoint at `api_base` |
//! | `openai/<name>` | [`OpenAIProvider`] at `api_base` |
//! | `mock/<response>` | [`MockProvider::constant`] |
//! | anything else | [`OpenAIProvider`] with the full string as model |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use folie_core::ExperimentConfig;

use crate::cached_provider::{default_cache_dir, CachedProvider, DiskCachedProvider};
use crate::ollama::OllamaApi;
use crate::{LlmError, LlmProvider, MockProvider, OllamaProvider, OpenAIProvider};

/// Backend resolved from a model string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama { model: String, chat: bool },
    OpenAI { model: String },
    Mock { response: String },
}

impl ProviderKind {
    pub fn parse(model: &str) -> Self {
        let model = model.trim();
        if let Some(rest) = model.strip_prefix("ollama_chat/") {
            ProviderKind::Ollama {
                model: rest.to_string(),
                chat: true,
            }
        } else if let Some(rest) = model.strip_prefix("ollama/") {
            ProviderKind::Ollama {
                model: rest.to_string(),
                chat: false,
            }
        } else if let Some(rest) = model.strip_prefix("mock/") {
            ProviderKind::Mock {
                response: rest.to_string(),
            }
        } else {
            ProviderKind::OpenAI {
                model: model.strip_prefix("openai/").unwrap_or(model).to_string(),
            }
        }
    }
}

/// Disk cache namespace: the full model string and endpoint
pub fn cache_namespace(config: &ExperimentConfig) -> String {
    format!("{}@{}", config.model.trim(), config.api_base.trim_end_matches('/'))
}

/// Build the provider stack described by `config`
///
/// Layers, innermost first: backend (with request timeout), disk cache,
/// memory cache.
pub fn provider_from_config(config: &ExperimentConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    provider_with_cache_dir(config, default_cache_dir())
}

/// Same as [`provider_from_config`] with an explicit disk cache directory
pub fn provider_with_cache_dir(
    config: &ExperimentConfig,
    cache_dir: impl Into<PathBuf>,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let mut provider: Arc<dyn LlmProvider> = match ProviderKind::parse(&config.model) {
        ProviderKind::Ollama { model, chat } => {
            let api = if chat { OllamaApi::Chat } else { OllamaApi::Generate };
            Arc::new(
                OllamaProvider::with_url(&config.api_base, &model)
                    .with_api(api)
                    .with_timeout(timeout)?,
            )
        }
        ProviderKind::OpenAI { model } => Arc::new(
            OpenAIProvider::with_url(&config.api_base, &config.api_key, &model)
                .with_timeout(timeout)?,
        ),
        ProviderKind::Mock { response } => Arc::new(MockProvider::constant(&response)),
    };

    if config.enable_disk_cache {
        let dir = cache_dir.into();
        tracing::debug!(dir = %dir.display(), "LLM disk cache enabled");
        provider = Arc::new(DiskCachedProvider::new(provider, dir, cache_namespace(config)));
    }

    if config.enable_memory_cache {
        tracing::debug!("LLM memory cache enabled");
        provider = Arc::new(CachedProvider::wrap(provider));
    }

    tracing::info!(
        provider = provider.name(),
        model = %config.model,
        api_base = %config.api_base,
        "LLM provider configured"
    );

    Ok(provider)
}
