//! # Folie Core
//!
//! Core types for agreement co-training:
//! - [`Verdict`] normalization and ambiguity resolution
//! - [`ClaimExample`] / [`Dataset`] with validation and built-in claim sets
//! - [`ClaimVerifier`] for the agent contract
//! - [`ExperimentConfig`] as the validated run configuration
//! - [`Genome`] and evolutionary operators used by optimizers
//! - [`confidence_interval`] for score summaries

pub mod agent;
pub mod config;
pub mod evolution;
pub mod example;
pub mod stats;
pub mod verdict;

pub use agent::{ClaimVerifier, Prediction, VerifierError, VerifierId};
pub use config::{ConfigError, ExperimentConfig, OptimizerMode};
pub use evolution::{tournament_select, Demo, Fitness, GeneticOperator, Genome, LlmParams, StandardOperator};
pub use example::{dev_labeled, train_unlabeled, ClaimExample, Dataset, DatasetError};
pub use stats::{confidence_interval, ConfidenceInterval};
pub use verdict::{normalize_verdict, resolve_verdict, TracingEvents, Verdict, VerdictEvents};
