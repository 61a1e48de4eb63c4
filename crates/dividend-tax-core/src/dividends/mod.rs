pub mod dates;
pub mod extract;

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Money;

pub use extract::extract_dividends;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One reportable dividend event.
///
/// `date` is `YYYY-MM-DD`, or empty when the statement carried no readable
/// trade date. `tax` is the reconciled foreign withholding (normally
/// negative, zero when no withholding line matched).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DividendTransaction {
    pub id: String,
    pub date: String,
    pub ticker: String,
    pub description: String,
    pub dividend_per_share: Money,
    pub total: Money,
    pub currency_symbol: String,
    pub tax: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_id: Option<String>,
}

/// Inclusive range of trade dates in `YYYYMMDD` form, as the rate service
/// expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Earliest and latest trade date among `transactions`. Rows without a valid
/// date are ignored; `None` when nothing is left.
pub fn date_range(transactions: &[DividendTransaction]) -> Option<DateRange> {
    let mut days = transactions
        .iter()
        .filter_map(|t| dates::parse_iso(&t.date));
    let first = days.next()?;
    let (start, end) = days.fold((first, first), |(lo, hi), day| (lo.min(day), hi.max(day)));

    Some(DateRange {
        start_date: start.format(dates::DATE_FORMAT_OFX).to_string(),
        end_date: end.format(dates::DATE_FORMAT_OFX).to_string(),
    })
}

/// Largest magnitude accepted for a statement amount. Sums and local
/// conversions of bounded amounts stay well inside `Decimal` range.
pub const MAX_STATEMENT_AMOUNT: Decimal = dec!(1_000_000_000_000_000);

/// Lenient amount parse for statement fields: surrounding whitespace and a
/// leading `+` are accepted, anything else unparsable is `None`. Amounts
/// beyond `MAX_STATEMENT_AMOUNT` are rejected.
pub(crate) fn parse_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let amount = Decimal::from_str(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .ok()?;
    if amount.abs() > MAX_STATEMENT_AMOUNT {
        warn!(amount = %amount, "statement amount out of range, ignoring");
        return None;
    }
    Some(amount)
}
