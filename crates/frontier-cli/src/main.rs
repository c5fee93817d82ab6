mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::frontier::{FrontierArgs, OptimizeArgs};
use commands::returns::ReturnsArgs;

/// Mean-variance efficient frontier construction
#[derive(Parser)]
#[command(
    name = "frontier",
    version,
    about = "Mean-variance efficient frontier construction",
    long_about = "A CLI for turning daily price histories into simple returns and tracing \
                  the mean-variance efficient frontier over a set of assets. Supports \
                  long-only and unrestricted weights, fixed-risk and fixed-return sweeps, \
                  and the median-risk portfolio."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily simple returns for one ticker, most recent first
    Returns(ReturnsArgs),
    /// Trace the efficient frontier from precomputed returns
    Optimize(OptimizeArgs),
    /// Minimum-variance portfolio at the midpoint expected return
    MedianRisk(OptimizeArgs),
    /// Load quotes for several tickers and trace their frontier
    Frontier(FrontierArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Returns(args) => commands::returns::run_returns(args),
        Commands::Optimize(args) => commands::frontier::run_optimize(args),
        Commands::MedianRisk(args) => commands::frontier::run_median_risk(args),
        Commands::Frontier(args) => commands::frontier::run_frontier(args),
        Commands::Version => {
            println!("frontier {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
