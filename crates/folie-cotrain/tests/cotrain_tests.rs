use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use folie_core::{
    ClaimExample, ClaimVerifier, Dataset, ExperimentConfig, OptimizerMode, Prediction,
    VerifierError,
};
use folie_cotrain::{
    agreement_rate, evaluate, run_ablation, CoTrainer, ExperimentError, GenomeOptimizer,
    LlmVerifierFactory, Metric, OptimizeError, Optimizer, VerifierFactory,
};
use folie_llm::{LlmRequest, MockProvider};

/// Always answers the same verdict
#[derive(Debug, Clone)]
struct Fixed {
    name: String,
    verdict: &'static str,
}

impl Fixed {
    fn new(name: &str, verdict: &'static str) -> Self {
        Self {
            name: name.to_string(),
            verdict,
        }
    }
}

#[async_trait]
impl ClaimVerifier for Fixed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self, _claim: &str) -> Result<Prediction, VerifierError> {
        Ok(Prediction::new(self.verdict))
    }
}

/// Picks whichever constant verdict the metric rewards more; ties keep the agent
#[derive(Default)]
struct Copycat {
    calls: AtomicUsize,
    metrics: Mutex<Vec<String>>,
}

impl Copycat {
    async fn mean(agent: &Fixed, metric: &dyn Metric, data: &[ClaimExample]) -> f64 {
        let mut total = 0.0;
        for example in data {
            let prediction = agent.verify(&example.claim).await.unwrap();
            total += metric.score(example, &prediction).await;
        }
        total / data.len() as f64
    }
}

#[async_trait]
impl Optimizer<Fixed> for Copycat {
    async fn optimize(
        &self,
        agent: &Fixed,
        metric: &dyn Metric,
        trainset: &[ClaimExample],
        _mode: OptimizerMode,
    ) -> Result<Fixed, OptimizeError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.metrics.lock().unwrap().push(metric.name().to_string());

        let flipped = Fixed::new(&agent.name, if agent.verdict == "yes" { "no" } else { "yes" });
        let keep = Self::mean(agent, metric, trainset).await;
        let flip = Self::mean(&flipped, metric, trainset).await;
        Ok(if flip > keep { flipped } else { agent.clone() })
    }
}

/// Always fails
struct Broken;

#[async_trait]
impl Optimizer<Fixed> for Broken {
    async fn optimize(
        &self,
        _agent: &Fixed,
        _metric: &dyn Metric,
        _trainset: &[ClaimExample],
        _mode: OptimizerMode,
    ) -> Result<Fixed, OptimizeError> {
        Err(OptimizeError::Failed("no budget".into()))
    }
}

struct PairFactory {
    a: &'static str,
    b: &'static str,
    fail_at_alpha: Option<f64>,
    builds: AtomicUsize,
}

impl PairFactory {
    fn new(a: &'static str, b: &'static str) -> Self {
        Self {
            a,
            b,
            fail_at_alpha: None,
            builds: AtomicUsize::new(0),
        }
    }
}

impl VerifierFactory for PairFactory {
    type Verifier = Fixed;

    fn build_pair(&self, config: &ExperimentConfig) -> Result<(Fixed, Fixed), ExperimentError> {
        self.builds.fetch_add(1, Ordering::Relaxed);
        if self.fail_at_alpha == Some(config.alpha) {
            return Err(ExperimentError::Factory(format!("refusing alpha {}", config.alpha)));
        }
        Ok((Fixed::new("A", self.a), Fixed::new("B", self.b)))
    }
}

fn two_claim_dev() -> Dataset {
    Dataset::new(vec![
        ClaimExample::labeled("C1", "yes"),
        ClaimExample::labeled("C2", "no"),
    ])
}

fn train() -> Dataset {
    Dataset::new(
        (0..5)
            .map(|i| ClaimExample::unlabeled(&format!("T{i}")))
            .collect(),
    )
}

fn config(rounds: u32, alpha: f64) -> ExperimentConfig {
    ExperimentConfig {
        rounds,
        alpha,
        ..ExperimentConfig::default()
    }
}

#[tokio::test]
async fn test_stub_scenario_scores() {
    let dev = two_claim_dev();
    let yes = Fixed::new("A", "yes");
    let also_yes = Fixed::new("B", "YES ");

    assert_eq!(evaluate(&yes, dev.as_slice()).await, 0.5);
    assert_eq!(agreement_rate(&yes, &also_yes, dev.as_slice()).await, 1.0);
    assert_eq!(agreement_rate(&yes, &also_yes, train().as_slice()).await, 1.0);
}

#[tokio::test]
async fn test_round_count_and_final_accuracies() {
    let optimizer = Arc::new(Copycat::default());
    let trainer = CoTrainer::new(
        config(4, 0.0),
        optimizer.clone(),
        Arc::new(PairFactory::new("yes", "yes")),
    );

    let results = trainer.run(&two_claim_dev(), &train()).await.unwrap();

    assert_eq!(results.rounds().len(), 4);
    assert_eq!(
        results.rounds().iter().map(|r| r.round).collect::<Vec<_>>(),
        [1, 2, 3, 4]
    );
    assert_eq!(results.get_final_accuracies(), (0.5, 0.5));
    assert_eq!(results.get_final_agreement(), 1.0);
    assert_eq!(optimizer.calls.load(Ordering::Relaxed), 2 + 2 * 4);
    assert!(results.final_programs().is_some());
}

#[tokio::test]
async fn test_metrics_follow_alpha() {
    let pure = Arc::new(Copycat::default());
    CoTrainer::new(config(1, 0.0), pure.clone(), Arc::new(PairFactory::new("yes", "no")))
        .run(&two_claim_dev(), &train())
        .await
        .unwrap();
    assert_eq!(
        *pure.metrics.lock().unwrap(),
        ["truth", "truth", "agreement", "agreement"]
    );

    let blended = Arc::new(Copycat::default());
    CoTrainer::new(config(1, 0.2), blended.clone(), Arc::new(PairFactory::new("yes", "no")))
        .run(&two_claim_dev(), &train())
        .await
        .unwrap();
    assert_eq!(
        *blended.metrics.lock().unwrap(),
        ["truth", "truth", "blended", "blended"]
    );
}

#[tokio::test]
async fn test_partners_are_round_start_snapshots() {
    // A=yes, B=no. A chases B's old "no" while B chases A's old "yes",
    // so they swap and still disagree.
    let results = CoTrainer::new(
        config(1, 0.0),
        Arc::new(Copycat::default()),
        Arc::new(PairFactory::new("yes", "no")),
    )
    .run(&two_claim_dev(), &train())
    .await
    .unwrap();

    let (a, b) = results.final_programs().unwrap();
    assert_eq!(a.verdict, "no");
    assert_eq!(b.verdict, "yes");
    assert_eq!(results.get_final_agreement(), 0.0);
    assert_eq!(results.rounds()[0].agreement_train, 0.0);
}

#[tokio::test]
async fn test_optimizer_failure_aborts_run() {
    let err = CoTrainer::new(config(2, 0.0), Arc::new(Broken), Arc::new(PairFactory::new("yes", "no")))
        .run(&two_claim_dev(), &train())
        .await
        .unwrap_err();

    match err {
        ExperimentError::Optimize { agent, .. } => assert_eq!(agent, "A"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_inputs_fail_before_building_verifiers() {
    let factory = Arc::new(PairFactory::new("yes", "no"));
    let trainer = CoTrainer::new(config(1, 0.0), Arc::new(Copycat::default()), factory.clone());

    let unlabeled_dev = Dataset::new(vec![ClaimExample::unlabeled("C1")]);
    let err = trainer.run(&unlabeled_dev, &train()).await.unwrap_err();
    assert!(matches!(err, ExperimentError::Dataset { which: "dev", .. }));

    let err = trainer.run(&two_claim_dev(), &Dataset::default()).await.unwrap_err();
    assert!(matches!(err, ExperimentError::Dataset { which: "train", .. }));

    let bad_alpha = CoTrainer::new(config(1, 1.5), Arc::new(Copycat::default()), factory.clone());
    let err = bad_alpha.run(&two_claim_dev(), &train()).await.unwrap_err();
    assert!(matches!(err, ExperimentError::Config(_)));

    assert_eq!(factory.builds.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_ablation_isolates_failures() {
    let factory = Arc::new(PairFactory {
        fail_at_alpha: Some(0.1),
        ..PairFactory::new("yes", "yes")
    });

    let ablation = run_ablation(
        &config(2, 0.0),
        Arc::new(Copycat::default()),
        factory,
        &two_claim_dev(),
        &train(),
    )
    .await;

    assert_eq!(ablation.len(), 5);
    assert!(ablation.get("alpha_0.1").unwrap().is_none());
    for key in ["alpha_0.0", "alpha_0.05", "alpha_0.2", "alpha_0.5"] {
        let results = ablation.get(key).unwrap().as_ref().unwrap();
        assert_eq!(results.rounds().len(), 2);
    }

    let report = ablation.report();
    assert_eq!(report.len(), 5);
    assert!(report["alpha_0.1"].is_null());
    assert_eq!(report["alpha_0.5"]["summary"]["total_rounds"], 2);
}

#[tokio::test]
async fn test_llm_pipeline_with_mock_provider() {
    // Truthful for capitals, otherwise says yes
    let provider = Arc::new(MockProvider::from_fn(|req: &LlmRequest| {
        let claim = req.prompt.rsplit("Claim: ").next().unwrap_or_default();
        Ok(if claim.contains("Sydney") { "no" } else { "yes" }.to_string())
    }));

    let dev = Dataset::new(vec![
        ClaimExample::labeled("The capital of Australia is Sydney.", "no"),
        ClaimExample::labeled("The capital of France is Paris.", "yes"),
        ClaimExample::labeled("The Great Wall is visible from space.", "no"),
    ]);

    let cfg = ExperimentConfig {
        seed: Some(42),
        ..config(2, 0.1)
    };
    let results = CoTrainer::new(
        cfg,
        Arc::new(GenomeOptimizer::seeded(42)),
        Arc::new(LlmVerifierFactory::with_provider(provider)),
    )
    .run(&dev, &train())
    .await
    .unwrap();

    assert_eq!(results.rounds().len(), 2);
    for record in results.rounds() {
        assert!((0.0..=1.0).contains(&record.accuracy_a));
        assert!((0.0..=1.0).contains(&record.agreement_dev));
    }
    let (acc_a, acc_b) = results.get_final_accuracies();
    assert!((acc_a - 2.0 / 3.0).abs() < 1e-9);
    assert!((acc_b - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(results.get_final_agreement(), 1.0);
}

#[tokio::test]
async fn test_dataset_from_file_drives_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.json");
    std::fs::write(
        &path,
        r#"[{"claim":"C1","verdict":"yes"},{"claim":"C2","verdict":"no"}]"#,
    )
    .unwrap();

    let dev = Dataset::from_json_file(&path).unwrap();
    let results = CoTrainer::new(
        config(1, 0.0),
        Arc::new(Copycat::default()),
        Arc::new(PairFactory::new("no", "no")),
    )
    .run(&dev, &train())
    .await
    .unwrap();

    assert_eq!(results.get_final_accuracies(), (0.5, 0.5));
}
