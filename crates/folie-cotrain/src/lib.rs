//! # Folie Cotrain
//!
//! Agreement co-training for a pair of claim verifiers.
//!
//! Each round, verifier A is re-optimized to agree with a snapshot of B and
//! vice versa. A truth-anchoring weight `alpha` blends ground truth back into
//! the objective.
//!
//! ## Key Types
//!
//! - [`LlmVerifier`]: genome-driven prompt over an LLM provider
//! - [`TruthMetric`], [`AgreementMetric`], [`BlendedMetric`]: scoring
//! - [`GenomeOptimizer`]: evolutionary prompt and few-shot search
//! - [`CoTrainer`] and [`run_ablation`]: the round loop and the alpha sweep
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folie_core::{dev_labeled, train_unlabeled, ExperimentConfig};
//! use folie_cotrain::{CoTrainer, GenomeOptimizer, LlmVerifierFactory};
//!
//! let config = ExperimentConfig::from_env()?;
//! let trainer = CoTrainer::new(
//!     config,
//!     Arc::new(GenomeOptimizer::default()),
//!     Arc::new(LlmVerifierFactory::new()),
//! );
//! let results = trainer.run(&dev_labeled(), &train).await?;
//! println!("{:?}", results.summary());
//! ```

pub mod evaluation;
pub mod experiment;
pub mod metrics;
pub mod optimizer;
pub mod verifier;

pub use evaluation::{
    agreement_rate, compare_programs, detailed_evaluation, evaluate, evaluate_with,
    ComparisonExample, ComparisonReport, DetailedReport, ExampleResult,
};
pub use experiment::{
    alpha_key, run_ablation, AblationEntry, AblationResults, CoTrainer, ExperimentError,
    ExperimentReport, ExperimentResults, ExperimentSummary, LlmVerifierFactory, RoundRecord,
    Stage, VerifierFactory, ABLATION_ALPHAS, TRAIN_AGREEMENT_SAMPLE,
};
pub use metrics::{AgreementMetric, BlendedMetric, Metric, MetricError, TruthMetric};
pub use optimizer::{GenomeOptimizer, OptimizeError, Optimizer, SearchBudget};
pub use verifier::LlmVerifier;
