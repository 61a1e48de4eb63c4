mod commands;
mod input;
mod nbu;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::ofx::StatementArgs;
use commands::report::ReportArgs;
use commands::taxes::TaxesArgs;

/// Dividend tax reports from broker OFX statements
#[derive(Parser)]
#[command(
    name = "divtax",
    version,
    about = "Dividend tax reports from broker OFX statements",
    long_about = "Reads an OFX investment statement, reconciles dividends with the \
                  foreign tax withheld on them, converts income at the trade-date \
                  exchange rate and computes local personal income tax and military \
                  levy with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline details to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an OFX statement and print its tree
    Parse(StatementArgs),
    /// Extract dividend transactions with reconciled withholding
    Extract(StatementArgs),
    /// First and last trade date, as used for the rate query
    DateRange(StatementArgs),
    /// Tax breakdown for a single rated dividend
    Taxes(TaxesArgs),
    /// Gross, withheld, net and top payer
    Kpi(StatementArgs),
    /// Gross dividends per month
    Monthly(StatementArgs),
    /// Full report: rows, taxes, summary, KPI and monthly totals
    Report(ReportArgs),
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

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Parse(args) => commands::ofx::run_parse(args),
        Commands::Extract(args) => commands::ofx::run_extract(args),
        Commands::DateRange(args) => commands::ofx::run_date_range(args),
        Commands::Taxes(args) => commands::taxes::run_taxes(args),
        Commands::Kpi(args) => commands::ofx::run_kpi(args),
        Commands::Monthly(args) => commands::ofx::run_monthly(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Version => {
            println!("divtax {}", env!("CARGO_PKG_VERSION"));
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
