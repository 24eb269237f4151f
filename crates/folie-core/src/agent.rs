//! Verifier agents
//!
//! A verifier maps a claim to a [`Prediction`]. Verifiers are replaced by
//! value: optimizing one produces a new verifier, the old value is never
//! mutated. Slots that hold a "current" verifier use `Arc<V>` so metrics can
//! keep a snapshot of a partner while the slot moves on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a verifier
pub type VerifierId = Uuid;

/// Errors surfaced by a verifier
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Verifier not available: {0}")]
    NotAvailable(String),
}

/// Output of a single verification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// The verdict text (normally exactly `yes` or `no`)
    pub verdict: String,
    /// Chain-of-thought reasoning, when the verifier produced any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Prediction {
    pub fn new(verdict: impl Into<String>) -> Self {
        Self {
            verdict: verdict.into(),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Anything that can judge a factual claim
#[async_trait]
pub trait ClaimVerifier: Send + Sync + std::fmt::Debug {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Decide whether `claim` is factually correct
    async fn verify(&self, claim: &str) -> Result<Prediction, VerifierError>;
}
