//! Verifier optimization
//!
//! An [`Optimizer`] turns `(verifier, metric, trainset)` into a new verifier.
//! [`GenomeOptimizer`] searches over [`Genome`]s with tournament selection,
//! crossover and mutation, scoring each candidate on a shared minibatch.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::sync::Mutex;
use thiserror::Error;

use folie_core::{
    tournament_select, ClaimExample, ClaimVerifier, Demo, Fitness, GeneticOperator, Genome,
    OptimizerMode, StandardOperator, Verdict,
};

use crate::metrics::Metric;
use crate::verifier::LlmVerifier;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Cannot optimize on an empty trainset")]
    EmptyTrainset,
    #[error("Optimization failed: {0}")]
    Failed(String),
}

/// Produces an improved verifier for a metric
#[async_trait]
pub trait Optimizer<V: ClaimVerifier>: Send + Sync {
    async fn optimize(
        &self,
        agent: &V,
        metric: &dyn Metric,
        trainset: &[ClaimExample],
        mode: OptimizerMode,
    ) -> Result<V, OptimizeError>;
}

/// Search effort for one optimization call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Candidates per generation, including the carried-over best
    pub population: usize,
    pub generations: usize,
    /// Trainset examples each candidate is scored on
    pub minibatch: usize,
    /// Upper bound on bootstrapped few-shot demos
    pub max_demos: usize,
}

impl SearchBudget {
    pub fn for_mode(mode: OptimizerMode) -> Self {
        match mode {
            OptimizerMode::Light => Self {
                population: 4,
                generations: 2,
                minibatch: 12,
                max_demos: 3,
            },
            OptimizerMode::Medium => Self {
                population: 8,
                generations: 3,
                minibatch: 24,
                max_demos: 4,
            },
            OptimizerMode::Heavy => Self {
                population: 12,
                generations: 4,
                minibatch: 48,
                max_demos: 6,
            },
        }
    }
}

/// A genome with its minibatch score and perfectly scored examples
#[derive(Debug, Clone)]
struct Scored {
    genome: Genome,
    fitness: Fitness,
    hits: Vec<Demo>,
}

/// Evolutionary search over verifier genomes
#[derive(Debug)]
pub struct GenomeOptimizer {
    operator: StandardOperator,
    mutation_rate: f64,
    tournament_size: usize,
    rng: Mutex<StdRng>,
}

impl Default for GenomeOptimizer {
    fn default() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl GenomeOptimizer {
    fn new(rng: StdRng) -> Self {
        Self {
            operator: StandardOperator::default(),
            mutation_rate: 0.3,
            tournament_size: 2,
            rng: Mutex::new(rng),
        }
    }

    /// Reproducible search
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Mean metric score of `candidate` over `batch`
    async fn score(candidate: &LlmVerifier, metric: &dyn Metric, batch: &[ClaimExample]) -> Scored {
        let mut total = 0.0;
        let mut hits = Vec::new();

        for example in batch {
            match candidate.verify(&example.claim).await {
                Ok(prediction) => {
                    let score = metric.score(example, &prediction).await;
                    total += score;
                    if score >= 1.0 {
                        if let Some(verdict) = Verdict::parse(&prediction.verdict) {
                            hits.push(Demo::new(&example.claim, verdict));
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(verifier = candidate.name(), error = %e, "Candidate failed on example");
                }
            }
        }

        let mean = if batch.is_empty() {
            0.0
        } else {
            total / batch.len() as f64
        };

        Scored {
            genome: candidate.genome().clone(),
            fitness: Fitness::new(mean),
            hits,
        }
    }

    /// Children for the next generation: one bootstrapped copy of the best,
    /// the rest bred from tournament winners.
    fn breed(&self, population: &[Scored], best: &Scored, budget: &SearchBudget) -> Vec<Genome> {
        let pool: Vec<(Genome, Fitness)> = population
            .iter()
            .map(|s| (s.genome.clone(), s.fitness))
            .collect();

        self.with_rng(|rng| {
            let mut children = Vec::with_capacity(budget.population.saturating_sub(1));

            if budget.max_demos > 0 && !best.hits.is_empty() {
                let demos: Vec<Demo> = best
                    .hits
                    .choose_multiple(rng, budget.max_demos)
                    .cloned()
                    .collect();
                children.push(best.genome.clone().with_demos(demos));
            }

            while children.len() + 1 < budget.population {
                let parent_a = tournament_select(&pool, self.tournament_size, rng);
                let parent_b = tournament_select(&pool, self.tournament_size, rng);
                let mut child = match (parent_a, parent_b) {
                    (Some(a), Some(b)) => self.operator.crossover(a, b, rng),
                    _ => best.genome.clone(),
                };
                self.operator.mutate(&mut child, self.mutation_rate, rng);
                children.push(child);
            }

            children
        })
    }
}

#[async_trait]
impl Optimizer<LlmVerifier> for GenomeOptimizer {
    async fn optimize(
        &self,
        agent: &LlmVerifier,
        metric: &dyn Metric,
        trainset: &[ClaimExample],
        mode: OptimizerMode,
    ) -> Result<LlmVerifier, OptimizeError> {
        if trainset.is_empty() {
            return Err(OptimizeError::EmptyTrainset);
        }

        let budget = SearchBudget::for_mode(mode);
        let batch: Vec<ClaimExample> = self.with_rng(|rng| {
            trainset
                .choose_multiple(rng, budget.minibatch.max(1))
                .cloned()
                .collect()
        });

        tracing::info!(
            verifier = agent.name(),
            metric = metric.name(),
            mode = %mode,
            minibatch = batch.len(),
            "Optimizing verifier"
        );

        let incumbent = Self::score(agent, metric, &batch).await;
        let baseline = incumbent.fitness;
        let mut best = incumbent.clone();
        let mut population = vec![incumbent];

        for generation in 0..budget.generations {
            let children = self.breed(&population, &best, &budget);

            let mut next = vec![best.clone()];
            for genome in children {
                let candidate = agent.with_genome(genome);
                let scored = Self::score(&candidate, metric, &batch).await;
                tracing::debug!(
                    generation,
                    fitness = scored.fitness.value(),
                    demos = scored.genome.demos.len(),
                    "Candidate scored"
                );

                // Strict improvement only, so ties keep the incumbent
                if scored.fitness > best.fitness {
                    best = scored.clone();
                }
                next.push(scored);
            }
            population = next;
        }

        tracing::info!(
            verifier = agent.name(),
            baseline = baseline.value(),
            best = best.fitness.value(),
            "Optimization finished"
        );

        Ok(agent.with_genome(best.genome))
    }
}
