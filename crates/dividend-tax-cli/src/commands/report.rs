use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;

use dividend_tax_core::rates::{ExchangeRateRecord, FixedRates};
use dividend_tax_core::session::{InMemoryStore, Session};

use crate::commands::ofx::read_statement_text;
use crate::input;
use crate::input::config::CliConfig;
use crate::nbu::NbuRates;

/// Arguments for the full dividend report
#[derive(Args)]
pub struct ReportArgs {
    /// Path to the OFX statement (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON file of exchange-rate records (`exchangedate`, `rate_per_unit`)
    #[arg(long, conflicts_with = "fetch")]
    pub rates: Option<String>,

    /// Fetch exchange rates from the NBU service
    #[arg(long)]
    pub fetch: bool,

    /// Currency to query rates for (default USD)
    #[arg(long)]
    pub currency: Option<String>,

    /// Personal income tax rate (e.g. 0.09 for 9%)
    #[arg(long)]
    pub pit_rate: Option<Decimal>,

    /// Military levy rate (e.g. 0.05 for 5%)
    #[arg(long)]
    pub military_rate: Option<Decimal>,

    /// YAML settings file
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = CliConfig::load(args.config.as_deref())?;
    let tax_rates = config.tax_rates(args.pit_rate, args.military_rate)?;
    let currency = config.currency(args.currency.clone());

    let mut session = Session::new(InMemoryStore::default());
    match args.input.as_deref() {
        Some(path) => {
            let (raw, metadata) = input::file::read_statement(path)?;
            session.import_report(&raw, Some(metadata))?;
        }
        None => {
            let raw = read_statement_text(None)?;
            session.import_report(&raw, None)?;
        }
    }

    if let Some(ref path) = args.rates {
        let records: Vec<ExchangeRateRecord> = input::file::read_json(path)?;
        session.refresh_rates(&FixedRates(records), Some(&currency));
    } else if args.fetch {
        let source = NbuRates::new(config.rates_endpoint.clone())?;
        session.refresh_rates(&source, Some(&currency));
    }

    if let Some(error) = &session.rate_state().error {
        eprintln!(
            "{}: exchange rates unavailable ({}); report has no local tax figures",
            "warning".yellow().bold(),
            error
        );
    }

    let report = session
        .report(&tax_rates)
        .ok_or("No statement loaded")?;
    Ok(serde_json::to_value(report)?)
}
