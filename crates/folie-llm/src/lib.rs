//! # Folie LLM
//!
//! LLM provider integrations for claim verifiers.
//!
//! ## Supported Backends
//!
//! | Provider | Type | Key Required |
//! |----------|------|--------------|
//! | OpenAI-compatible | API | `API_KEY` (optional for local servers) |
//! | Ollama | Local | None |
//! | Mock | Testing | None |
//!
//! ## Quick Start
//!
//! ```rust
//! use folie_llm::{LlmProvider, MockProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let llm = MockProvider::constant("yes");
//!     let response = llm.ask("Is the sun a star?").await.unwrap();
//!     assert_eq!(response, "yes");
//! }
//! ```
//!
//! ## From configuration
//!
//! ```rust,ignore
//! use folie_core::ExperimentConfig;
//! use folie_llm::provider_from_config;
//!
//! let config = ExperimentConfig::from_env()?;
//! let llm = provider_from_config(&config)?;
//! ```

pub mod cached_provider;
pub mod config;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use cached_provider::{
    cache_key, default_cache_dir, CachedProvider, DiskCachedProvider, LlmCacheConfig,
};
pub use config::{cache_namespace, provider_from_config, provider_with_cache_dir, ProviderKind};
pub use mock::MockProvider;
pub use ollama::{OllamaApi, OllamaProvider};
pub use openai::OpenAIProvider;
pub use provider::{LlmError, LlmProvider, LlmRequest, LlmResponse};
