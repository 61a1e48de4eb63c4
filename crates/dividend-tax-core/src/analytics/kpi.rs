use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dividends::DividendTransaction;
use crate::types::{Money, NOT_AVAILABLE};

/// Headline figures in the dividend currency. No exchange rate is involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMetrics {
    pub total_gross: Money,
    pub tax_withheld: Money,
    pub net_income: Money,
    pub top_payer: String,
}

impl Default for KpiMetrics {
    fn default() -> Self {
        Self {
            total_gross: Decimal::ZERO,
            tax_withheld: Decimal::ZERO,
            net_income: Decimal::ZERO,
            top_payer: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Gross, withheld and net totals plus the ticker with the largest gross.
///
/// Unreadable (`N/A`) tickers count toward the totals but can never be the
/// top payer. On a tie the ticker seen first wins.
pub fn calculate_kpi_metrics(transactions: &[DividendTransaction]) -> KpiMetrics {
    if transactions.is_empty() {
        return KpiMetrics::default();
    }

    let mut total_gross = Decimal::ZERO;
    let mut tax_withheld = Decimal::ZERO;
    // Insertion order drives the tie-break.
    let mut by_ticker: Vec<(&str, Money)> = Vec::new();

    for t in transactions {
        total_gross += t.total;
        tax_withheld += t.tax.abs();

        if t.ticker == NOT_AVAILABLE {
            continue;
        }
        match by_ticker.iter_mut().find(|(ticker, _)| *ticker == t.ticker) {
            Some((_, gross)) => *gross += t.total,
            None => by_ticker.push((t.ticker.as_str(), t.total)),
        }
    }

    let mut top: Option<(&str, Money)> = None;
    for &(ticker, gross) in &by_ticker {
        if top.map_or(true, |(_, best)| gross > best) {
            top = Some((ticker, gross));
        }
    }

    KpiMetrics {
        total_gross,
        tax_withheld,
        net_income: total_gross - tax_withheld,
        top_payer: top.map_or(NOT_AVAILABLE, |(ticker, _)| ticker).to_string(),
    }
}
