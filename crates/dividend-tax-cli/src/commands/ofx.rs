use clap::Args;
use serde_json::Value;

use dividend_tax_core::analytics::{calculate_kpi_metrics, group_by_month};
use dividend_tax_core::dividends::{date_range, extract_dividends, DividendTransaction};
use dividend_tax_core::ofx::{parse_ofx, OfxNode};

use crate::input;

/// Arguments for commands that read one OFX statement
#[derive(Args)]
pub struct StatementArgs {
    /// Path to the OFX statement (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

/// Statement text from `--input` or piped stdin.
pub fn read_statement_text(input: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        Ok(input::file::read_statement(path)?.0)
    } else if let Some(text) = input::stdin::read_stdin_text()? {
        Ok(text)
    } else {
        Err("--input is required (or pipe the statement on stdin)".into())
    }
}

fn load_tree(args: &StatementArgs) -> Result<OfxNode, Box<dyn std::error::Error>> {
    let raw = read_statement_text(args.input.as_deref())?;
    Ok(parse_ofx(&raw)?)
}

fn load_dividends(
    args: &StatementArgs,
) -> Result<Vec<DividendTransaction>, Box<dyn std::error::Error>> {
    Ok(extract_dividends(&load_tree(args)?))
}

pub fn run_parse(args: StatementArgs) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(load_tree(&args)?)?)
}

pub fn run_extract(args: StatementArgs) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(load_dividends(&args)?)?)
}

pub fn run_date_range(args: StatementArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load_dividends(&args)?;
    let range = date_range(&rows).ok_or("No dated dividend transactions in the statement")?;
    Ok(serde_json::to_value(range)?)
}

pub fn run_kpi(args: StatementArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load_dividends(&args)?;
    Ok(serde_json::to_value(calculate_kpi_metrics(&rows))?)
}

pub fn run_monthly(args: StatementArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load_dividends(&args)?;
    Ok(serde_json::to_value(group_by_month(&rows))?)
}
