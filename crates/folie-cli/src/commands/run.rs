//! Run command - a single co-training experiment
//!
//! Usage:
//! ```bash
//! folie run --rounds 6 --alpha 0.1 --output results.json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use folie_cotrain::{CoTrainer, LlmVerifierFactory};
use folie_llm::provider_from_config;

use super::{accuracy_interval_line, optimizer_for, rounds_table, write_json, ExperimentArgs};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

/// Run the run command
pub async fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let config = args.experiment.load_config()?;
    let (dev, train) = args.experiment.load_datasets(&config)?;

    if !quiet {
        println!("{}", "Running single experiment...".bold().cyan());
        println!(
            "  {} {}  {} {}  {} {}",
            "model:".dimmed(),
            config.model.green(),
            "alpha:".dimmed(),
            config.alpha,
            "rounds:".dimmed(),
            config.rounds
        );
    }

    let provider = provider_from_config(&config).context("Failed to set up LLM provider")?;
    let trainer = CoTrainer::new(
        config.clone(),
        Arc::new(optimizer_for(&config)),
        Arc::new(LlmVerifierFactory::with_provider(provider)),
    );

    let results = trainer.run(&dev, &train).await.context("Experiment failed")?;

    if !quiet {
        println!("{}", rounds_table(results.rounds()));
        println!("{}", accuracy_interval_line(results.rounds()));
    }

    if let Some(path) = &args.experiment.output {
        write_json(path, &results.report())?;
        if !quiet {
            crate::print_info(&format!("Results saved to {}", path.display()));
        }
    }

    Ok(())
}
