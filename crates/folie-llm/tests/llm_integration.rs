//! Integration tests for provider stacks
//!
//! Tests that talk to a real backend are marked #[ignore] and read:
//! - OPENAI_API_KEY for OpenAI tests
//! - a local Ollama server for Ollama tests
//!
//! Run with: cargo test -p folie-llm --test llm_integration -- --ignored

use std::sync::Arc;

use folie_core::ExperimentConfig;
use folie_llm::{
    provider_with_cache_dir, CachedProvider, DiskCachedProvider, LlmProvider, LlmRequest,
    MockProvider, OllamaProvider, OpenAIProvider,
};

/// Test OpenAI provider with real API
#[tokio::test]
#[ignore = "Requires OPENAI_API_KEY"]
async fn test_openai_real_request() {
    let api_key = std::env::var("OPENAI_API_KEY")
        .expect("OPENAI_API_KEY must be set for this test");

    let provider = OpenAIProvider::new(&api_key, "gpt-4o-mini");
    assert!(provider.is_available().await, "OpenAI should be available");

    let request = LlmRequest::with_role(
        "Answer with a single word: yes or no.",
        "Claim: Water boils at 100 degrees Celsius at sea level.",
    )
    .with_params(0.0, 5);

    let response = provider.complete(request).await.unwrap();
    assert!(!response.content.is_empty(), "Response should have content");
    println!("OpenAI response: {}", response.content);
}

/// Test Ollama provider against a local server
#[tokio::test]
#[ignore = "Requires Ollama running locally"]
async fn test_ollama_real_request() {
    let provider = OllamaProvider::new("llama3.1:8b");
    let response = provider.ask("Answer yes or no: is Paris in France?").await.unwrap();
    assert!(!response.is_empty());
}

/// Unreachable servers surface as errors, not panics
#[tokio::test]
async fn test_unreachable_server_errors() {
    let provider = OpenAIProvider::with_url("http://127.0.0.1:9", "", "m")
        .with_timeout(std::time::Duration::from_secs(2))
        .unwrap();
    assert!(provider.ask("hello").await.is_err());
}

/// Memory cache in front of disk cache: second lookup never reaches disk
#[tokio::test]
async fn test_layered_caches() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockProvider::new(vec!["yes".into(), "no".into()]));

    let disk = Arc::new(DiskCachedProvider::new(backend.clone(), dir.path(), "mock/canned"));
    let memory = CachedProvider::wrap(disk.clone());

    let req = LlmRequest::simple("Claim: The sun rises in the east.");
    assert_eq!(memory.complete(req.clone()).await.unwrap().content, "yes");
    assert_eq!(memory.complete(req).await.unwrap().content, "yes");

    assert_eq!(backend.calls(), 1);
    assert_eq!(disk.stats().0, 0);
    assert_eq!(memory.stats().0, 1);
}

/// Full stack from configuration with both caches
#[tokio::test]
async fn test_config_stack_with_caches() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        model: "mock/Verdict: yes".into(),
        enable_disk_cache: true,
        enable_memory_cache: true,
        ..ExperimentConfig::default()
    };

    let provider = provider_with_cache_dir(&config, dir.path()).unwrap();
    assert!(provider.is_available().await);
    assert_eq!(provider.ask("claim").await.unwrap(), "Verdict: yes");
}
