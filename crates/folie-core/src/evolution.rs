//! Evolutionary operators for verifier genomes
//!
//! A [`Genome`] is everything an optimizer may change about an LLM verifier:
//! the instruction, a few numeric traits and the few-shot demonstrations.
//! The operators here take an explicit RNG so searches are reproducible.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// A fitness score (higher is better)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fitness(pub f64);

impl Fitness {
    /// Create a new fitness score
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the raw value
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// A few-shot demonstration attached to a genome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demo {
    pub claim: String,
    pub verdict: Verdict,
}

impl Demo {
    pub fn new(claim: &str, verdict: Verdict) -> Self {
        Self {
            claim: claim.to_string(),
            verdict,
        }
    }
}

/// Default instruction for a fresh verifier
pub const BASE_INSTRUCTION: &str =
    "Decide if a claim is factually correct. Output strictly 'yes' or 'no'.";

/// Names of the traits every genome carries, in order
pub const TRAIT_NAMES: [&str; 3] = ["exploration", "verbosity", "skepticism"];

/// Instruction variants the standard operator mutates between
pub const INSTRUCTION_POOL: &[&str] = &[
    BASE_INSTRUCTION,
    "You are a careful fact checker. Judge whether the claim is true. Reply with 'yes' or 'no' only.",
    "Determine whether the following statement is factually accurate. Answer 'yes' if it is true and 'no' if it is false.",
    "Evaluate the claim against well-established knowledge. If it is correct say 'yes', otherwise say 'no'.",
    "Read the claim literally and decide if it is true as stated. Respond with a single word: yes or no.",
    "You verify trivia claims. Popular myths are false. Answer yes or no.",
];

/// A genome representing verifier strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Instruction used as the system prompt
    pub instruction: String,
    /// Strategy parameters (0.0 - 1.0 each)
    pub traits: Vec<f64>,
    /// Labels for each trait
    pub trait_names: Vec<String>,
    /// Few-shot demonstrations rendered before the claim
    pub demos: Vec<Demo>,
}

impl Default for Genome {
    fn default() -> Self {
        Self::new(BASE_INSTRUCTION)
    }
}

impl Genome {
    /// Create a new genome with neutral traits and no demos
    pub fn new(instruction: &str) -> Self {
        Self {
            instruction: instruction.to_string(),
            traits: vec![0.5; TRAIT_NAMES.len()],
            trait_names: TRAIT_NAMES.iter().map(|s| s.to_string()).collect(),
            demos: Vec::new(),
        }
    }

    /// Get a named trait value
    pub fn get_trait(&self, name: &str) -> Option<f64> {
        self.trait_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.traits.get(i).copied())
    }

    /// Set a named trait value
    pub fn set_trait(&mut self, name: &str, value: f64) {
        if let Some(i) = self.trait_names.iter().position(|n| n == name) {
            self.traits[i] = value.clamp(0.0, 1.0);
        }
    }

    /// Replace the few-shot demos
    pub fn with_demos(mut self, demos: Vec<Demo>) -> Self {
        self.demos = demos;
        self
    }

    /// Convert genome traits to LLM parameters around the configured base
    /// values.
    ///
    /// - exploration → temperature multiplier (0.5x - 1.5x)
    /// - verbosity → max_tokens multiplier (0.5x - 1.5x)
    ///
    /// Neutral traits (0.5) reproduce the base values exactly.
    pub fn to_llm_params(&self, base_temperature: f64, base_max_tokens: u32) -> LlmParams {
        let exploration = self.get_trait("exploration").unwrap_or(0.5);
        let verbosity = self.get_trait("verbosity").unwrap_or(0.5);

        let max_tokens = ((base_max_tokens as f64) * (0.5 + verbosity)).round() as u32;

        LlmParams {
            temperature: base_temperature * (0.5 + exploration),
            max_tokens: max_tokens.max(1),
        }
    }

    /// Whether the prompt should warn against common misconceptions
    pub fn is_skeptical(&self) -> bool {
        self.get_trait("skepticism").unwrap_or(0.5) > 0.66
    }
}

/// LLM inference parameters derived from genome traits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlmParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Trait for genetic operators
pub trait GeneticOperator {
    /// Perform crossover between two parent genomes
    fn crossover(&self, parent_a: &Genome, parent_b: &Genome, rng: &mut dyn rand::RngCore) -> Genome;

    /// Mutate a genome with given mutation rate
    fn mutate(&self, genome: &mut Genome, mutation_rate: f64, rng: &mut dyn rand::RngCore);
}

/// Standard genetic operator: single-point trait crossover, Gaussian-ish trait
/// mutation and instruction swaps from a fixed pool.
#[derive(Debug, Clone)]
pub struct StandardOperator {
    instructions: Vec<String>,
}

impl Default for StandardOperator {
    fn default() -> Self {
        Self::new(INSTRUCTION_POOL.iter().map(|s| s.to_string()).collect())
    }
}

impl StandardOperator {
    pub fn new(instructions: Vec<String>) -> Self {
        Self { instructions }
    }
}

impl GeneticOperator for StandardOperator {
    fn crossover(&self, parent_a: &Genome, parent_b: &Genome, rng: &mut dyn rand::RngCore) -> Genome {
        let len = parent_a.traits.len().min(parent_b.traits.len());
        let crossover_point = if len > 0 { rng.random_range(0..len) } else { 0 };

        let traits = (0..parent_a.traits.len())
            .map(|i| {
                if i < crossover_point || i >= len {
                    parent_a.traits[i]
                } else {
                    parent_b.traits[i]
                }
            })
            .collect();

        let (instruction, demos) = if rng.random_bool(0.5) {
            (parent_a.instruction.clone(), parent_a.demos.clone())
        } else {
            (parent_b.instruction.clone(), parent_b.demos.clone())
        };

        Genome {
            instruction,
            traits,
            trait_names: parent_a.trait_names.clone(),
            demos,
        }
    }

    fn mutate(&self, genome: &mut Genome, mutation_rate: f64, rng: &mut dyn rand::RngCore) {
        let rate = mutation_rate.clamp(0.0, 1.0);

        for trait_val in &mut genome.traits {
            if rng.random_bool(rate) {
                let delta: f64 = rng.random_range(-0.2..0.2);
                *trait_val = (*trait_val + delta).clamp(0.0, 1.0);
            }
        }

        if rng.random_bool(rate) {
            if let Some(instruction) = self.instructions.choose(rng) {
                genome.instruction = instruction.clone();
            }
        }
    }
}

/// Select a parent from a scored population (tournament selection).
/// Returns `None` for an empty population.
pub fn tournament_select<'a>(
    population: &'a [(Genome, Fitness)],
    tournament_size: usize,
    rng: &mut dyn rand::RngCore,
) -> Option<&'a Genome> {
    if population.is_empty() {
        return None;
    }

    let mut best: Option<&(Genome, Fitness)> = None;
    for _ in 0..tournament_size.max(1) {
        let candidate = &population[rng.random_range(0..population.len())];
        match best {
            Some(current) if candidate.1 <= current.1 => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|(genome, _)| genome)
}
