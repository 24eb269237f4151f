//! Agreement co-training orchestrator
//!
//! Two verifiers are first trained against ground truth, then re-optimized
//! each round toward agreement with a snapshot of the other (optionally
//! blended with truth by `alpha`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use folie_core::{
    ClaimExample, ClaimVerifier, ConfigError, Dataset, DatasetError, ExperimentConfig,
    OptimizerMode,
};
use folie_llm::{provider_from_config, LlmError, LlmProvider};

use crate::evaluation::{agreement_rate, evaluate};
use crate::metrics::{AgreementMetric, BlendedMetric, Metric, MetricError, TruthMetric};
use crate::optimizer::{OptimizeError, Optimizer};
use crate::verifier::LlmVerifier;

/// Train examples used for the per-round train agreement figure
pub const TRAIN_AGREEMENT_SAMPLE: usize = 60;

/// Fixed alpha grid of the ablation sweep
pub const ABLATION_ALPHAS: [f64; 5] = [0.0, 0.05, 0.1, 0.2, 0.5];

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid dataset ({which}): {source}")]
    Dataset {
        which: &'static str,
        #[source]
        source: DatasetError,
    },
    #[error("Provider setup failed: {0}")]
    Provider(#[from] LlmError),
    #[error("Metric construction failed: {0}")]
    Metric(#[from] MetricError),
    #[error("Optimization of {agent} failed: {source}")]
    Optimize {
        agent: String,
        #[source]
        source: OptimizeError,
    },
    #[error("Verifier construction failed: {0}")]
    Factory(String),
}

/// Builds the two verifiers of a run
pub trait VerifierFactory: Send + Sync {
    type Verifier: ClaimVerifier + 'static;

    fn build_pair(
        &self,
        config: &ExperimentConfig,
    ) -> Result<(Self::Verifier, Self::Verifier), ExperimentError>;
}

/// Builds [`LlmVerifier`]s over one shared provider stack
#[derive(Debug, Default, Clone)]
pub struct LlmVerifierFactory {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl LlmVerifierFactory {
    /// Build the provider from each run's config
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse `provider` for every run (shares caches across an ablation)
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }
}

impl VerifierFactory for LlmVerifierFactory {
    type Verifier = LlmVerifier;

    fn build_pair(
        &self,
        config: &ExperimentConfig,
    ) -> Result<(LlmVerifier, LlmVerifier), ExperimentError> {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => provider_from_config(config)?,
        };

        Ok((
            LlmVerifier::from_config("A", provider.clone(), config, 0),
            LlmVerifier::from_config("B", provider, config, 1),
        ))
    }
}

/// Measurements taken after one co-training round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number
    pub round: u32,
    pub accuracy_a: f64,
    pub accuracy_b: f64,
    pub agreement_dev: f64,
    pub agreement_train: f64,
}

/// Derived view over the round records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub total_rounds: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_accuracy_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_accuracy_b: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_agreement: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_accuracy_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_accuracy_b: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agreement: Option<f64>,
}

/// Serialized form of a run: summary plus every round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub summary: ExperimentSummary,
    pub rounds: Vec<RoundRecord>,
}

/// Round records plus the final pair of verifiers
#[derive(Debug)]
pub struct ExperimentResults<V> {
    rounds: Vec<RoundRecord>,
    final_a: Option<Arc<V>>,
    final_b: Option<Arc<V>>,
}

impl<V> Default for ExperimentResults<V> {
    fn default() -> Self {
        Self {
            rounds: Vec::new(),
            final_a: None,
            final_b: None,
        }
    }
}

impl<V> ExperimentResults<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_round(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn set_final_programs(&mut self, a: Arc<V>, b: Arc<V>) {
        self.final_a = Some(a);
        self.final_b = Some(b);
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn final_programs(&self) -> Option<(&Arc<V>, &Arc<V>)> {
        self.final_a.as_ref().zip(self.final_b.as_ref())
    }

    /// Last round's `(accuracy_a, accuracy_b)`, `(0.0, 0.0)` before any round
    pub fn get_final_accuracies(&self) -> (f64, f64) {
        self.rounds
            .last()
            .map(|r| (r.accuracy_a, r.accuracy_b))
            .unwrap_or((0.0, 0.0))
    }

    /// Last round's dev agreement, 0.0 before any round
    pub fn get_final_agreement(&self) -> f64 {
        self.rounds.last().map(|r| r.agreement_dev).unwrap_or(0.0)
    }

    pub fn summary(&self) -> ExperimentSummary {
        let Some(last) = self.rounds.last() else {
            return ExperimentSummary::default();
        };

        let max = |f: fn(&RoundRecord) -> f64| {
            self.rounds.iter().map(f).fold(f64::NEG_INFINITY, f64::max)
        };

        ExperimentSummary {
            total_rounds: self.rounds.len(),
            final_accuracy_a: Some(last.accuracy_a),
            final_accuracy_b: Some(last.accuracy_b),
            final_agreement: Some(last.agreement_dev),
            max_accuracy_a: Some(max(|r| r.accuracy_a)),
            max_accuracy_b: Some(max(|r| r.accuracy_b)),
            max_agreement: Some(max(|r| r.agreement_dev)),
        }
    }

    pub fn report(&self) -> ExperimentReport {
        ExperimentReport {
            summary: self.summary(),
            rounds: self.rounds.clone(),
        }
    }
}

/// Orchestrator lifecycle, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Baseline(char),
    Round(u32),
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::Baseline(agent) => write!(f, "baseline-{agent}"),
            Stage::Round(n) => write!(f, "round-{n}"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Runs one co-training experiment
pub struct CoTrainer<F, O> {
    config: ExperimentConfig,
    optimizer: Arc<O>,
    factory: Arc<F>,
}

impl<F, O> CoTrainer<F, O>
where
    F: VerifierFactory,
    O: Optimizer<F::Verifier>,
{
    pub fn new(config: ExperimentConfig, optimizer: Arc<O>, factory: Arc<F>) -> Self {
        Self {
            config,
            optimizer,
            factory,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run baseline training and every round.
    ///
    /// Any configuration, dataset, factory or optimizer failure aborts the
    /// run; no partial results are returned.
    pub async fn run(
        &self,
        devset: &Dataset,
        trainset: &Dataset,
    ) -> Result<ExperimentResults<F::Verifier>, ExperimentError> {
        let result = self.run_stages(devset, trainset).await;
        if let Err(e) = &result {
            tracing::error!(alpha = self.config.alpha, error = %e, "Experiment failed");
        }
        result
    }

    async fn run_stages(
        &self,
        devset: &Dataset,
        trainset: &Dataset,
    ) -> Result<ExperimentResults<F::Verifier>, ExperimentError> {
        let config = &self.config;
        let mode = config.auto_mode;

        self.enter(Stage::Init);
        config.validate()?;
        devset
            .validate(true)
            .map_err(|source| ExperimentError::Dataset { which: "dev", source })?;
        trainset
            .validate(false)
            .map_err(|source| ExperimentError::Dataset { which: "train", source })?;

        let (a, b) = self.factory.build_pair(config)?;

        self.enter(Stage::Baseline('A'));
        let mut a = Arc::new(self.optimize(&a, &TruthMetric, devset.as_slice(), mode).await?);
        self.enter(Stage::Baseline('B'));
        let mut b = Arc::new(self.optimize(&b, &TruthMetric, devset.as_slice(), mode).await?);

        let mut results = ExperimentResults::new();
        let train_sample = trainset.prefix(TRAIN_AGREEMENT_SAMPLE);

        for round in 1..=config.rounds {
            self.enter(Stage::Round(round));

            // Both metrics see the partners as they were at round start
            let metric_a = round_metric(b.clone(), config.alpha)?;
            let metric_b = round_metric(a.clone(), config.alpha)?;

            a = Arc::new(self.optimize(&a, metric_a.as_ref(), trainset.as_slice(), mode).await?);
            b = Arc::new(self.optimize(&b, metric_b.as_ref(), trainset.as_slice(), mode).await?);

            let record = RoundRecord {
                round,
                accuracy_a: evaluate(a.as_ref(), devset.as_slice()).await,
                accuracy_b: evaluate(b.as_ref(), devset.as_slice()).await,
                agreement_dev: agreement_rate(a.as_ref(), b.as_ref(), devset.as_slice()).await,
                agreement_train: agreement_rate(a.as_ref(), b.as_ref(), train_sample).await,
            };

            tracing::info!(
                round,
                acc_a = %format!("{:.3}", record.accuracy_a),
                acc_b = %format!("{:.3}", record.accuracy_b),
                agree_dev = %format!("{:.3}", record.agreement_dev),
                agree_train = %format!("{:.3}", record.agreement_train),
                alpha = config.alpha,
                "Round complete"
            );

            results.add_round(record);
        }

        results.set_final_programs(a, b);
        self.enter(Stage::Done);
        Ok(results)
    }

    async fn optimize(
        &self,
        agent: &F::Verifier,
        metric: &dyn Metric,
        trainset: &[ClaimExample],
        mode: OptimizerMode,
    ) -> Result<F::Verifier, ExperimentError> {
        self.optimizer
            .optimize(agent, metric, trainset, mode)
            .await
            .map_err(|source| ExperimentError::Optimize {
                agent: agent.name().to_string(),
                source,
            })
    }

    fn enter(&self, stage: Stage) {
        tracing::debug!(stage = %stage, alpha = self.config.alpha, "Co-training stage");
    }
}

/// Agreement metric, blended with truth when `alpha > 0`
fn round_metric(
    partner: Arc<dyn ClaimVerifier>,
    alpha: f64,
) -> Result<Box<dyn Metric>, MetricError> {
    if alpha > 0.0 {
        Ok(Box::new(BlendedMetric::new(partner, alpha)?))
    } else {
        Ok(Box::new(AgreementMetric::new(partner)))
    }
}

/// Output key for an alpha value: `alpha_0.0`, `alpha_0.05`, ...
pub fn alpha_key(alpha: f64) -> String {
    format!("alpha_{:?}", alpha)
}

/// One point of an ablation sweep
#[derive(Debug)]
pub struct AblationEntry<V> {
    pub alpha: f64,
    /// `None` when the run at this alpha failed
    pub results: Option<ExperimentResults<V>>,
}

/// Results of an alpha sweep, in sweep order
#[derive(Debug)]
pub struct AblationResults<V> {
    entries: Vec<AblationEntry<V>>,
}

impl<V> AblationResults<V> {
    pub fn entries(&self) -> &[AblationEntry<V>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Option<ExperimentResults<V>>> {
        self.entries
            .iter()
            .find(|e| alpha_key(e.alpha) == key)
            .map(|e| &e.results)
    }

    /// `{"alpha_<v>": {summary, rounds} | null}`
    pub fn report(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|e| {
                let value = e
                    .results
                    .as_ref()
                    .and_then(|r| serde_json::to_value(r.report()).ok())
                    .unwrap_or(serde_json::Value::Null);
                (alpha_key(e.alpha), value)
            })
            .collect()
    }
}

/// Run one experiment per alpha in [`ABLATION_ALPHAS`].
///
/// Each run uses a copy of `base` with only alpha replaced. A failing run is
/// logged and recorded as `None`; the sweep continues.
pub async fn run_ablation<F, O>(
    base: &ExperimentConfig,
    optimizer: Arc<O>,
    factory: Arc<F>,
    devset: &Dataset,
    trainset: &Dataset,
) -> AblationResults<F::Verifier>
where
    F: VerifierFactory,
    O: Optimizer<F::Verifier>,
{
    let mut entries = Vec::with_capacity(ABLATION_ALPHAS.len());

    for alpha in ABLATION_ALPHAS {
        tracing::info!(alpha, "Starting ablation run");
        let trainer = CoTrainer::new(base.with_alpha(alpha), optimizer.clone(), factory.clone());

        let results = match trainer.run(devset, trainset).await {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::error!(alpha, error = %e, "Ablation run failed");
                None
            }
        };

        entries.push(AblationEntry { alpha, results });
    }

    AblationResults { entries }
}
