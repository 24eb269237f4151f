//! Scoring functions for optimization and evaluation
//!
//! Every metric maps `(example, prediction)` to a score in `[0, 1]` and never
//! fails: partner errors score 0 and are logged.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use folie_core::{normalize_verdict, ClaimExample, ClaimVerifier, Prediction};

/// Errors constructing a metric
#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("Alpha must be between 0.0 and 1.0, got {0}")]
    InvalidAlpha(f64),
}

/// A per-example score in `[0, 1]`
#[async_trait]
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, example: &ClaimExample, prediction: &Prediction) -> f64;
}

/// 1.0 when the prediction matches the example's label
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthMetric;

impl TruthMetric {
    fn score_sync(example: &ClaimExample, prediction: &Prediction) -> f64 {
        if !example.is_labeled() {
            return 0.0;
        }
        let truth = normalize_verdict(example.verdict.as_deref());
        let predicted = normalize_verdict(Some(&prediction.verdict));
        let score = if truth == predicted { 1.0 } else { 0.0 };

        tracing::debug!(score, truth = %truth, predicted = %predicted, "Truth accuracy");
        score
    }
}

#[async_trait]
impl Metric for TruthMetric {
    fn name(&self) -> &str {
        "truth"
    }

    async fn score(&self, example: &ClaimExample, prediction: &Prediction) -> f64 {
        Self::score_sync(example, prediction)
    }
}

/// 1.0 when the prediction matches what `partner` says about the same claim
#[derive(Debug, Clone)]
pub struct AgreementMetric {
    partner: Arc<dyn ClaimVerifier>,
}

impl AgreementMetric {
    /// `partner` is a snapshot; later changes to the caller's slot are not seen
    pub fn new(partner: Arc<dyn ClaimVerifier>) -> Self {
        Self { partner }
    }
}

#[async_trait]
impl Metric for AgreementMetric {
    fn name(&self) -> &str {
        "agreement"
    }

    async fn score(&self, example: &ClaimExample, prediction: &Prediction) -> f64 {
        match self.partner.verify(&example.claim).await {
            Ok(other) => {
                let ours = normalize_verdict(Some(&prediction.verdict));
                let theirs = normalize_verdict(Some(&other.verdict));
                let score = if ours == theirs { 1.0 } else { 0.0 };

                tracing::debug!(score, ours = %ours, theirs = %theirs, "Agreement");
                score
            }
            Err(e) => {
                tracing::error!(
                    partner = self.partner.name(),
                    claim = %example.claim,
                    error = %e,
                    "Partner failed while scoring agreement"
                );
                0.0
            }
        }
    }
}

/// `(1 - alpha) * agreement + alpha * truth`
#[derive(Debug, Clone)]
pub struct BlendedMetric {
    agreement: AgreementMetric,
    alpha: f64,
}

impl BlendedMetric {
    pub fn new(partner: Arc<dyn ClaimVerifier>, alpha: f64) -> Result<Self, MetricError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(MetricError::InvalidAlpha(alpha));
        }
        Ok(Self {
            agreement: AgreementMetric::new(partner),
            alpha,
        })
    }
}

#[async_trait]
impl Metric for BlendedMetric {
    fn name(&self) -> &str {
        "blended"
    }

    async fn score(&self, example: &ClaimExample, prediction: &Prediction) -> f64 {
        let agreement = self.agreement.score(example, prediction).await;
        let truth = TruthMetric::score_sync(example, prediction);
        let score = (1.0 - self.alpha) * agreement + self.alpha * truth;

        tracing::debug!(score, agreement, truth, alpha = self.alpha, "Blended metric");
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folie_core::VerifierError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Fixed(&'static str);

    #[async_trait]
    impl ClaimVerifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn verify(&self, _claim: &str) -> Result<Prediction, VerifierError> {
            Ok(Prediction::new(self.0))
        }
    }

    #[derive(Debug, Default)]
    struct Broken(AtomicUsize);

    #[async_trait]
    impl ClaimVerifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn verify(&self, _claim: &str) -> Result<Prediction, VerifierError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Err(VerifierError::Inference("boom".into()))
        }
    }

    fn labeled(verdict: &str) -> ClaimExample {
        ClaimExample::labeled("claim", verdict)
    }

    #[tokio::test]
    async fn test_truth_metric_normalizes() {
        let metric = TruthMetric;
        assert_eq!(metric.score(&labeled("Yes"), &Prediction::new(" yes ")).await, 1.0);
        assert_eq!(metric.score(&labeled("yes"), &Prediction::new("no")).await, 0.0);
        assert_eq!(
            metric
                .score(&ClaimExample::unlabeled("claim"), &Prediction::new("yes"))
                .await,
            0.0
        );
    }

    #[tokio::test]
    async fn test_agreement_metric() {
        let metric = AgreementMetric::new(Arc::new(Fixed("NO")));
        let example = ClaimExample::unlabeled("claim");
        assert_eq!(metric.score(&example, &Prediction::new("no")).await, 1.0);
        assert_eq!(metric.score(&example, &Prediction::new("yes")).await, 0.0);
    }

    #[tokio::test]
    async fn test_agreement_partner_failure_scores_zero() {
        let broken = Arc::new(Broken::default());
        let metric = AgreementMetric::new(broken.clone());
        let score = metric
            .score(&ClaimExample::unlabeled("claim"), &Prediction::new("yes"))
            .await;
        assert_eq!(score, 0.0);
        assert_eq!(broken.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_blended_rejects_bad_alpha() {
        let partner: Arc<dyn ClaimVerifier> = Arc::new(Fixed("yes"));
        assert_eq!(
            BlendedMetric::new(partner.clone(), 1.5).unwrap_err(),
            MetricError::InvalidAlpha(1.5)
        );
        assert!(BlendedMetric::new(partner.clone(), -0.1).is_err());
        assert!(BlendedMetric::new(partner.clone(), f64::NAN).is_err());
        assert!(BlendedMetric::new(partner.clone(), 0.0).is_ok());
        assert!(BlendedMetric::new(partner, 1.0).is_ok());
    }

    #[tokio::test]
    async fn test_blended_score_table() {
        // partner says yes, label is no
        let metric = BlendedMetric::new(Arc::new(Fixed("yes")), 0.25).unwrap();
        let example = labeled("no");

        let agree_wrong = metric.score(&example, &Prediction::new("yes")).await;
        let disagree_right = metric.score(&example, &Prediction::new("no")).await;
        assert!((agree_wrong - 0.75).abs() < 1e-12);
        assert!((disagree_right - 0.25).abs() < 1e-12);

        let unlabeled = metric
            .score(&ClaimExample::unlabeled("claim"), &Prediction::new("yes"))
            .await;
        assert!((unlabeled - 0.75).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_blended_extremes_match_components() {
        let example = labeled("yes");
        let prediction = Prediction::new("yes");

        let pure_agreement = BlendedMetric::new(Arc::new(Fixed("no")), 0.0).unwrap();
        assert_eq!(pure_agreement.score(&example, &prediction).await, 0.0);

        // At alpha 0 the label is ignored: agreeing with the partner on a wrong answer scores 1
        let agreeing = BlendedMetric::new(Arc::new(Fixed("yes")), 0.0).unwrap();
        assert_eq!(agreeing.score(&labeled("no"), &prediction).await, 1.0);

        let pure_truth = BlendedMetric::new(Arc::new(Fixed("no")), 1.0).unwrap();
        assert_eq!(pure_truth.score(&example, &prediction).await, 1.0);
    }
}
