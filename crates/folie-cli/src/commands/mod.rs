//! Subcommands and the flags they share

pub mod ablation;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

use folie_core::{
    confidence_interval, dev_labeled, example::DEFAULT_TRAIN_REPETITIONS, train_unlabeled,
    Dataset, ExperimentConfig, OptimizerMode,
};
use folie_cotrain::{GenomeOptimizer, RoundRecord, ABLATION_ALPHAS};

/// Experiment flags shared by `run` and `ablation`
#[derive(Args, Debug, Default)]
pub struct ExperimentArgs {
    /// Number of training rounds
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Truth anchoring weight (0 = pure agreement, 1 = pure truth)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Use chain-of-thought prompting
    #[arg(long)]
    pub use_cot: bool,

    /// Model to use (e.g., ollama_chat/llama3.1:8b, openai/gpt-4o-mini, mock/yes)
    #[arg(long)]
    pub model: Option<String>,

    /// Provider base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Maximum tokens per completion
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Optimizer effort: light, medium or heavy
    #[arg(long)]
    pub auto_mode: Option<OptimizerMode>,

    /// Seed for shuffling, tie-breaks and the optimizer
    #[arg(long)]
    pub seed: Option<u64>,

    /// Labeled dev set (JSON array of {claim, verdict}); built-in set if omitted
    #[arg(long, value_name = "FILE", env = "FOLIE_DEV_SET")]
    pub dev_set: Option<PathBuf>,

    /// Unlabeled train set (JSON array of {claim}); built-in set if omitted
    #[arg(long, value_name = "FILE", env = "FOLIE_TRAIN_SET")]
    pub train_set: Option<PathBuf>,

    /// Output file for results (JSON)
    #[arg(long, short = 'o', value_name = "FILE", env = "FOLIE_OUTPUT")]
    pub output: Option<PathBuf>,
}

impl ExperimentArgs {
    /// Environment configuration with command-line overrides, validated
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let config = self.apply(Self::env_config()?);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Like [`Self::load_config`] for an alpha sweep, where each run replaces alpha
    pub fn load_sweep_config(&self) -> Result<ExperimentConfig> {
        self.sweep_config(Self::env_config()?)
    }

    fn env_config() -> Result<ExperimentConfig> {
        ExperimentConfig::from_env().context("Failed to read configuration from environment")
    }

    fn sweep_config(&self, base: ExperimentConfig) -> Result<ExperimentConfig> {
        if self.alpha.is_some() {
            tracing::warn!("--alpha is ignored by the ablation sweep");
        }
        let config = self.apply(base);
        config
            .with_alpha(ABLATION_ALPHAS[0])
            .validate()
            .context("Invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, mut config: ExperimentConfig) -> ExperimentConfig {
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.use_cot {
            config.use_cot = true;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(mode) = self.auto_mode {
            config.auto_mode = mode;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }

    /// Dev and train sets from files, falling back to the built-in claims
    pub fn load_datasets(&self, config: &ExperimentConfig) -> Result<(Dataset, Dataset)> {
        let dev = match &self.dev_set {
            Some(path) => Dataset::from_json_file(path)
                .with_context(|| format!("Failed to load dev set from {}", path.display()))?,
            None => dev_labeled(),
        };

        let train = match &self.train_set {
            Some(path) => Dataset::from_json_file(path)
                .with_context(|| format!("Failed to load train set from {}", path.display()))?,
            None => {
                let mut rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                train_unlabeled(DEFAULT_TRAIN_REPETITIONS, true, &mut rng)
            }
        };

        tracing::info!(dev = dev.len(), train = train.len(), "Datasets loaded");
        Ok((dev, train))
    }
}

pub fn optimizer_for(config: &ExperimentConfig) -> GenomeOptimizer {
    match config.seed {
        Some(seed) => GenomeOptimizer::seeded(seed),
        None => GenomeOptimizer::default(),
    }
}

/// Pretty-print `value` as JSON to `path`, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Per-round table
pub fn rounds_table(rounds: &[RoundRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Round").fg(Color::Cyan),
            Cell::new("Acc A").fg(Color::Cyan),
            Cell::new("Acc B").fg(Color::Cyan),
            Cell::new("Agree (dev)").fg(Color::Cyan),
            Cell::new("Agree (train)").fg(Color::Cyan),
        ]);

    for r in rounds {
        table.add_row(vec![
            Cell::new(r.round),
            Cell::new(format!("{:.3}", r.accuracy_a)),
            Cell::new(format!("{:.3}", r.accuracy_b)),
            Cell::new(format!("{:.3}", r.agreement_dev)).fg(Color::Green),
            Cell::new(format!("{:.3}", r.agreement_train)),
        ]);
    }

    table
}

/// 95% confidence interval over both verifiers' round accuracies
pub fn accuracy_interval_line(rounds: &[RoundRecord]) -> String {
    let scores: Vec<f64> = rounds
        .iter()
        .flat_map(|r| [r.accuracy_a, r.accuracy_b])
        .collect();
    let ci = confidence_interval(&scores, 0.95);
    format!(
        "{} {:.3} [{:.3}, {:.3}]",
        "Accuracy (95% CI):".bold(),
        ci.mean,
        ci.lower,
        ci.upper
    )
}
