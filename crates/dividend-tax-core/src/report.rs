use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{
    calculate_kpi_metrics, group_by_month, summarize, KpiMetrics, MonthlyBucket, Summary,
};
use crate::dividends::{date_range, DateRange, DividendTransaction};
use crate::format::shares_held;
use crate::rates::{ExchangeRateRecord, Hydration, RateTable};
use crate::tax::{calculate_taxes, TaxBreakdown, TaxRates};
use crate::types::{with_metadata, ComputationOutput, Rate, NOT_AVAILABLE, TARGET_CURRENCY};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One table row: the transaction, its rate and tax figures when rated, and
/// the implied share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(flatten)]
    pub transaction: DividendTransaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur_exchange: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<TaxBreakdown>,
}

/// Everything the dashboard shows for a loaded statement. `summary` is
/// only present when rates were available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendReport {
    pub rated: bool,
    pub target_currency: String,
    pub rows: Vec<ReportRow>,
    pub summary: Option<Summary>,
    pub kpi: KpiMetrics,
    pub monthly: Vec<MonthlyBucket>,
    pub date_range: Option<DateRange>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportAssumptions<'a> {
    tax_rates: &'a TaxRates,
    target_currency: &'a str,
    rate_dates: usize,
    transactions: usize,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Run hydration, per-row tax, summary, KPI and monthly grouping over
/// `transactions`. Without usable rates the report carries no tax figures.
pub fn build_report(
    transactions: &[DividendTransaction],
    rates: Option<&[ExchangeRateRecord]>,
    tax_rates: &TaxRates,
) -> ComputationOutput<DividendReport> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let table = RateTable::from_records(rates.unwrap_or_default());
    let hydration = table.hydrate(transactions);

    let rows: Vec<ReportRow> = match &hydration {
        Hydration::Rated(rated) => rated
            .iter()
            .map(|row| ReportRow {
                transaction: row.transaction.clone(),
                cur_exchange: Some(row.cur_exchange),
                shares: shares_held(row.transaction.total, row.transaction.dividend_per_share),
                taxes: Some(calculate_taxes(row, tax_rates)),
            })
            .collect(),
        Hydration::Unrated(unrated) => unrated
            .iter()
            .map(|t| ReportRow {
                transaction: t.clone(),
                cur_exchange: None,
                shares: shares_held(t.total, t.dividend_per_share),
                taxes: None,
            })
            .collect(),
    };

    // --- Data quality warnings ---
    if hydration.rated().is_none() && !transactions.is_empty() {
        warnings.push(
            "No exchange rates available; local tax was not computed".to_string(),
        );
    }
    if hydration.rated().is_some() {
        let defaulted = transactions
            .iter()
            .filter(|t| table.rate_on(&t.date).is_none())
            .count();
        if defaulted > 0 {
            warnings.push(format!(
                "{defaulted} transaction(s) had no exchange rate for their date; \
                 a rate of 1 was used"
            ));
        }
    }
    let unknown_ticker = transactions
        .iter()
        .filter(|t| t.ticker == NOT_AVAILABLE)
        .count();
    if unknown_ticker > 0 {
        warnings.push(format!(
            "{unknown_ticker} transaction(s) have no recognizable ticker"
        ));
    }
    let no_per_share = transactions
        .iter()
        .filter(|t| t.dividend_per_share.is_zero())
        .count();
    if no_per_share > 0 {
        warnings.push(format!(
            "{no_per_share} transaction(s) have no per-share amount in the memo"
        ));
    }
    let undated = transactions.iter().filter(|t| t.date.is_empty()).count();
    if undated > 0 {
        warnings.push(format!(
            "{undated} transaction(s) have no trade date and are left out of monthly totals"
        ));
    }

    let report = DividendReport {
        rated: hydration.rated().is_some(),
        target_currency: TARGET_CURRENCY.to_string(),
        summary: summarize(hydration.rated(), tax_rates),
        kpi: calculate_kpi_metrics(transactions),
        monthly: group_by_month(transactions),
        date_range: date_range(transactions),
        rows,
    };

    let assumptions = ReportAssumptions {
        tax_rates,
        target_currency: TARGET_CURRENCY,
        rate_dates: table.len(),
        transactions: transactions.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    with_metadata(
        "Foreign withholding reconciled per dividend; local PIT and military levy on income converted at the trade-date rate",
        &assumptions,
        warnings,
        elapsed,
        report,
    )
}
