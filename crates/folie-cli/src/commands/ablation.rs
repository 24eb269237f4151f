//! Ablation command - sweep the truth anchoring weight
//!
//! Usage:
//! ```bash
//! folie ablation --rounds 4 --output ablation.json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use std::sync::Arc;

use folie_cotrain::{alpha_key, run_ablation, AblationResults, LlmVerifierFactory, ABLATION_ALPHAS};
use folie_llm::provider_from_config;

use super::{optimizer_for, write_json, ExperimentArgs};

/// Arguments for the ablation command
#[derive(Args, Debug)]
pub struct AblationArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

/// Run the ablation command
pub async fn run(args: AblationArgs, quiet: bool) -> Result<()> {
    let config = args.experiment.load_sweep_config()?;
    let (dev, train) = args.experiment.load_datasets(&config)?;

    if !quiet {
        println!("{}", "Running ablation study...".bold().cyan());
        println!(
            "  {} {}",
            "alphas:".dimmed(),
            ABLATION_ALPHAS.map(|a| a.to_string()).join(", ")
        );
    }

    // Shared by every run in the sweep
    let provider = provider_from_config(&config).context("Failed to set up LLM provider")?;
    let ablation = run_ablation(
        &config,
        Arc::new(optimizer_for(&config)),
        Arc::new(LlmVerifierFactory::with_provider(provider)),
        &dev,
        &train,
    )
    .await;

    if !quiet {
        println!("{}", summary_table(&ablation));
    }

    if let Some(path) = &args.experiment.output {
        write_json(path, &ablation.report())?;
        if !quiet {
            crate::print_info(&format!("Results saved to {}", path.display()));
        }
    }

    Ok(())
}

fn summary_table<V>(ablation: &AblationResults<V>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Alpha").fg(Color::Cyan),
            Cell::new("Final Acc A").fg(Color::Cyan),
            Cell::new("Final Acc B").fg(Color::Cyan),
            Cell::new("Final Agreement").fg(Color::Cyan),
        ]);

    for entry in ablation.entries() {
        let key = alpha_key(entry.alpha);
        match &entry.results {
            Some(results) => {
                let (acc_a, acc_b) = results.get_final_accuracies();
                table.add_row(vec![
                    Cell::new(key),
                    Cell::new(format!("{acc_a:.3}")),
                    Cell::new(format!("{acc_b:.3}")),
                    Cell::new(format!("{:.3}", results.get_final_agreement())).fg(Color::Green),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(key),
                    Cell::new("failed").fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    table
}
