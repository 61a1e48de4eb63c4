use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dividend_tax_core::dividends::DividendTransaction;
use dividend_tax_core::rates::HydratedDividendTransaction;
use dividend_tax_core::tax::calculate_taxes;

use crate::input;
use crate::input::config::CliConfig;

/// Arguments for a single-row tax breakdown
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct TaxesArgs {
    /// Gross dividend in the dividend currency
    #[arg(long)]
    pub total: Option<Decimal>,

    /// Foreign tax withheld (sign is ignored)
    #[arg(long)]
    pub tax: Option<Decimal>,

    /// Local-currency units per unit of the dividend currency
    #[arg(long)]
    pub cur_exchange: Option<Decimal>,

    /// Personal income tax rate (e.g. 0.09 for 9%)
    #[arg(long)]
    pub pit_rate: Option<Decimal>,

    /// Military levy rate (e.g. 0.05 for 5%)
    #[arg(long)]
    pub military_rate: Option<Decimal>,

    /// YAML settings file
    #[arg(long)]
    pub config: Option<String>,

    /// Path to a JSON rated row (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_taxes(args: TaxesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let row: HydratedDividendTransaction = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        HydratedDividendTransaction {
            transaction: DividendTransaction {
                total: args.total.ok_or("--total is required (or provide --input)")?,
                tax: args.tax.unwrap_or(Decimal::ZERO),
                ..Default::default()
            },
            cur_exchange: args
                .cur_exchange
                .ok_or("--cur-exchange is required (or provide --input)")?,
        }
    };

    if row.cur_exchange <= Decimal::ZERO {
        return Err("curExchange must be positive".into());
    }

    let config = CliConfig::load(args.config.as_deref())?;
    let rates = config.tax_rates(args.pit_rate, args.military_rate)?;

    Ok(serde_json::to_value(calculate_taxes(&row, &rates))?)
}
