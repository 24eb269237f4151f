//! Folie CLI - run agreement co-training experiments
//!
//! # Usage
//!
//! ```bash
//! # Single experiment with the environment's configuration
//! folie run
//!
//! # Three rounds, 10% truth anchoring, results to a file
//! folie run --rounds 3 --alpha 0.1 --output results.json
//!
//! # Alpha sweep over 0.0, 0.05, 0.1, 0.2, 0.5
//! folie ablation --output ablation.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process::ExitCode;

mod commands;

use commands::{ablation, run};

/// Folie à Deux: iterative LLM agreement training
///
/// Two claim verifiers are optimized to agree with each other, optionally
/// anchored to ground truth, and measured every round.
#[derive(Parser)]
#[command(
    name = "folie",
    version,
    about = "Folie à Deux - Iterative LLM Agreement Training",
    long_about = "Co-trains two LLM claim verifiers toward mutual agreement.\n\n\
                  Configuration comes from the environment (MODEL, API_BASE, ALPHA, ROUNDS, ...)\n\
                  and can be overridden per run with the flags below."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv); overrides --log-level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Logging level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Suppress progress output and tables
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single co-training experiment
    #[command(name = "run")]
    Run(run::RunArgs),

    /// Run the alpha ablation sweep
    #[command(name = "ablation")]
    Ablation(ablation::AblationArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_level);

    let quiet = cli.quiet;
    let outcome = tokio::select! {
        result = async {
            match cli.command {
                Commands::Run(args) => run::run(args, quiet).await,
                Commands::Ablation(args) => ablation::run(args, quiet).await,
            }
        } => result,
        _ = tokio::signal::ctrl_c() => {
            print_warning("Experiment interrupted by user");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(()) => {
            if !quiet {
                print_success("Experiment completed successfully!");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Setup logging: `RUST_LOG` wins, then `-v` count, then `--log-level`
fn setup_logging(verbosity: u8, level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => level.directive(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message with an X
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["folie", "run", "-vv", "--quiet", "--log-level", "error"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert_eq!(cli.log_level, LogLevel::Error);
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Debug.directive(), "debug");
    }
}
