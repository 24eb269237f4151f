//! Accuracy, agreement and side-by-side reports
//!
//! Nothing here returns an error. A verifier failure on one example is
//! logged and scored as a miss (or a disagreement) for that example only.

use serde::{Deserialize, Serialize};

use folie_core::{normalize_verdict, ClaimExample, ClaimVerifier};

use crate::metrics::{Metric, TruthMetric};

/// Mean truth accuracy of `agent` over `devset`
pub async fn evaluate(agent: &dyn ClaimVerifier, devset: &[ClaimExample]) -> f64 {
    evaluate_with(agent, devset, &TruthMetric).await
}

/// Mean `metric` score of `agent` over `devset`
pub async fn evaluate_with(
    agent: &dyn ClaimVerifier,
    devset: &[ClaimExample],
    metric: &dyn Metric,
) -> f64 {
    if devset.is_empty() {
        tracing::warn!(agent = agent.name(), "Empty devset provided for evaluation");
        return 0.0;
    }

    let mut total = 0.0;
    for (index, example) in devset.iter().enumerate() {
        match agent.verify(&example.claim).await {
            Ok(prediction) => total += metric.score(example, &prediction).await,
            Err(e) => {
                tracing::error!(agent = agent.name(), index, error = %e, "Prediction failed during evaluation");
            }
        }
    }

    let score = total / devset.len() as f64;
    tracing::debug!(agent = agent.name(), metric = metric.name(), score, "Evaluation score");
    score
}

/// Fraction of `dataset` on which `a` and `b` give the same normalized verdict
pub async fn agreement_rate(
    a: &dyn ClaimVerifier,
    b: &dyn ClaimVerifier,
    dataset: &[ClaimExample],
) -> f64 {
    if dataset.is_empty() {
        tracing::warn!("Empty dataset provided for agreement calculation");
        return 0.0;
    }

    let mut agreements = 0usize;
    for example in dataset {
        match verify_pair(a, b, &example.claim).await {
            Ok((va, vb)) if va == vb => agreements += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(claim = %example.claim, error = %e, "Agreement check failed, counted as disagreement");
            }
        }
    }

    let rate = agreements as f64 / dataset.len() as f64;
    tracing::debug!(agreements, total = dataset.len(), rate, "Agreement rate");
    rate
}

/// Normalized verdicts of both verifiers for one claim
async fn verify_pair(
    a: &dyn ClaimVerifier,
    b: &dyn ClaimVerifier,
    claim: &str,
) -> Result<(String, String), folie_core::VerifierError> {
    let pa = a.verify(claim).await?;
    let pb = b.verify(claim).await?;
    Ok((
        normalize_verdict(Some(&pa.verdict)),
        normalize_verdict(Some(&pb.verdict)),
    ))
}

/// Per-example outcome in a [`DetailedReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResult {
    pub index: usize,
    pub claim: String,
    pub ground_truth: Option<String>,
    pub prediction: Option<String>,
    pub correct: bool,
    pub error: Option<String>,
}

/// Single-verifier evaluation with per-example results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedReport {
    pub total_examples: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub errors: usize,
    /// `correct / total_examples`, 0 when empty
    pub accuracy: f64,
    pub examples: Vec<ExampleResult>,
}

pub async fn detailed_evaluation(agent: &dyn ClaimVerifier, devset: &[ClaimExample]) -> DetailedReport {
    let mut report = DetailedReport {
        total_examples: devset.len(),
        ..DetailedReport::default()
    };

    for (index, example) in devset.iter().enumerate() {
        let mut result = ExampleResult {
            index,
            claim: example.claim.clone(),
            ground_truth: example.verdict.clone(),
            prediction: None,
            correct: false,
            error: None,
        };

        match agent.verify(&example.claim).await {
            Ok(prediction) => {
                if let Some(truth) = &example.verdict {
                    result.correct = normalize_verdict(Some(truth))
                        == normalize_verdict(Some(&prediction.verdict));
                    if result.correct {
                        report.correct += 1;
                    } else {
                        report.incorrect += 1;
                    }
                }
                result.prediction = Some(prediction.verdict);
            }
            Err(e) => {
                tracing::error!(agent = agent.name(), index, error = %e, "Error evaluating example");
                result.error = Some(e.to_string());
                report.errors += 1;
            }
        }

        report.examples.push(result);
    }

    if report.total_examples > 0 {
        report.accuracy = report.correct as f64 / report.total_examples as f64;
    }

    tracing::info!(
        agent = agent.name(),
        correct = report.correct,
        total = report.total_examples,
        errors = report.errors,
        accuracy = report.accuracy,
        "Detailed evaluation"
    );

    report
}

/// Per-example outcome in a [`ComparisonReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExample {
    pub index: usize,
    pub claim: String,
    pub ground_truth: Option<String>,
    pub prediction_a: Option<String>,
    pub prediction_b: Option<String>,
    pub agree: bool,
    /// Unset for unlabeled or errored examples
    pub a_correct: Option<bool>,
    pub b_correct: Option<bool>,
}

/// Side-by-side comparison of two verifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub total_examples: usize,
    pub agreement: usize,
    pub disagreement: usize,
    pub both_correct: usize,
    pub both_incorrect: usize,
    pub a_correct_b_incorrect: usize,
    pub a_incorrect_b_correct: usize,
    /// `agreement / total_examples`, 0 when empty
    pub agreement_rate: f64,
    pub examples: Vec<ComparisonExample>,
}

pub async fn compare_programs(
    a: &dyn ClaimVerifier,
    b: &dyn ClaimVerifier,
    dataset: &[ClaimExample],
) -> ComparisonReport {
    let mut report = ComparisonReport {
        total_examples: dataset.len(),
        ..ComparisonReport::default()
    };

    for (index, example) in dataset.iter().enumerate() {
        let mut result = ComparisonExample {
            index,
            claim: example.claim.clone(),
            ground_truth: example.verdict.clone(),
            prediction_a: None,
            prediction_b: None,
            agree: false,
            a_correct: None,
            b_correct: None,
        };

        let outcome = async {
            let pa = a.verify(&example.claim).await?;
            let pb = b.verify(&example.claim).await?;
            Ok::<_, folie_core::VerifierError>((pa, pb))
        };

        match outcome.await {
            Ok((pa, pb)) => {
                let va = normalize_verdict(Some(&pa.verdict));
                let vb = normalize_verdict(Some(&pb.verdict));

                result.agree = va == vb;
                if result.agree {
                    report.agreement += 1;
                } else {
                    report.disagreement += 1;
                }

                if let Some(truth) = &example.verdict {
                    let truth = normalize_verdict(Some(truth));
                    let a_ok = va == truth;
                    let b_ok = vb == truth;
                    match (a_ok, b_ok) {
                        (true, true) => report.both_correct += 1,
                        (false, false) => report.both_incorrect += 1,
                        (true, false) => report.a_correct_b_incorrect += 1,
                        (false, true) => report.a_incorrect_b_correct += 1,
                    }
                    result.a_correct = Some(a_ok);
                    result.b_correct = Some(b_ok);
                }

                result.prediction_a = Some(pa.verdict);
                result.prediction_b = Some(pb.verdict);
            }
            Err(e) => {
                tracing::error!(index, error = %e, "Error comparing verifiers on example");
            }
        }

        report.examples.push(result);
    }

    if report.total_examples > 0 {
        report.agreement_rate = report.agreement as f64 / report.total_examples as f64;
    }

    tracing::info!(
        agreement = report.agreement,
        total = report.total_examples,
        rate = report.agreement_rate,
        "Verifier comparison"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folie_core::{Prediction, VerifierError};
    use std::collections::HashMap;

    /// Answers from a lookup table; claims not in the table fail
    #[derive(Debug)]
    struct Table(HashMap<&'static str, &'static str>);

    impl Table {
        fn new(entries: &[(&'static str, &'static str)]) -> Self {
            Self(entries.iter().copied().collect())
        }
    }

    #[async_trait]
    impl ClaimVerifier for Table {
        fn name(&self) -> &str {
            "table"
        }

        async fn verify(&self, claim: &str) -> Result<Prediction, VerifierError> {
            self.0
                .get(claim)
                .map(|v| Prediction::new(*v))
                .ok_or_else(|| VerifierError::Inference(format!("no answer for {claim}")))
        }
    }

    fn devset() -> Vec<ClaimExample> {
        vec![
            ClaimExample::labeled("c1", "yes"),
            ClaimExample::labeled("c2", "no"),
            ClaimExample::labeled("c3", "yes"),
            ClaimExample::labeled("c4", "no"),
        ]
    }

    #[tokio::test]
    async fn test_evaluate_counts_errors_as_misses() {
        let agent = Table::new(&[("c1", "YES"), ("c2", "yes"), ("c3", "yes")]);
        let score = evaluate(&agent, &devset()).await;
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_sets_score_zero() {
        let agent = Table::new(&[]);
        assert_eq!(evaluate(&agent, &[]).await, 0.0);
        assert_eq!(agreement_rate(&agent, &agent, &[]).await, 0.0);
        let report = detailed_evaluation(&agent, &[]).await;
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(compare_programs(&agent, &agent, &[]).await.agreement_rate, 0.0);
    }

    #[tokio::test]
    async fn test_agreement_rate_errors_disagree() {
        let a = Table::new(&[("c1", "yes"), ("c2", "no"), ("c3", "yes"), ("c4", "no")]);
        let b = Table::new(&[("c1", " Yes"), ("c2", "yes"), ("c3", "yes")]);
        let rate = agreement_rate(&a, &b, &devset()).await;
        assert!((rate - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_self_agreement_is_total() {
        let a = Table::new(&[("c1", "yes"), ("c2", "no"), ("c3", "yes"), ("c4", "no")]);
        assert_eq!(agreement_rate(&a, &a, &devset()).await, 1.0);
    }

    #[tokio::test]
    async fn test_detailed_evaluation_counts() {
        let agent = Table::new(&[("c1", "yes"), ("c2", "yes"), ("c3", "yes")]);
        let mut data = devset();
        data.push(ClaimExample::unlabeled("c1"));

        let report = detailed_evaluation(&agent, &data).await;
        assert_eq!(report.total_examples, 5);
        assert_eq!(report.correct, 2);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.errors, 1);
        assert!((report.accuracy - 0.4).abs() < 1e-12);

        assert_eq!(report.examples[3].prediction, None);
        assert!(report.examples[3].error.is_some());
        assert_eq!(report.examples[4].prediction.as_deref(), Some("yes"));
        assert!(!report.examples[4].correct);
    }

    #[tokio::test]
    async fn test_compare_programs_breakdown() {
        let a = Table::new(&[("c1", "yes"), ("c2", "no"), ("c3", "no"), ("c4", "no"), ("u", "yes")]);
        let b = Table::new(&[("c1", "yes"), ("c2", "yes"), ("c3", "yes"), ("c4", "yes"), ("u", "no")]);
        let mut data = devset();
        data.push(ClaimExample::unlabeled("u"));

        let report = compare_programs(&a, &b, &data).await;
        assert_eq!(report.total_examples, 5);
        assert_eq!(report.agreement, 1);
        assert_eq!(report.disagreement, 4);
        assert_eq!(report.both_correct, 1);
        assert_eq!(report.both_incorrect, 0);
        assert_eq!(report.a_correct_b_incorrect, 2);
        assert_eq!(report.a_incorrect_b_correct, 1);
        assert!((report.agreement_rate - 0.2).abs() < 1e-12);

        let unlabeled = &report.examples[4];
        assert_eq!(unlabeled.a_correct, None);
        assert_eq!(unlabeled.b_correct, None);
        assert!(!unlabeled.agree);
    }

    #[tokio::test]
    async fn test_compare_programs_error_is_neither() {
        let a = Table::new(&[("c1", "yes")]);
        let report = compare_programs(&a, &a, &devset()[..2]).await;
        assert_eq!(report.agreement, 1);
        assert_eq!(report.disagreement, 0);
        assert!((report.agreement_rate - 0.5).abs() < 1e-12);
    }
}
