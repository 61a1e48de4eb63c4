use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dividends::{dates, DividendTransaction};
use crate::types::Money;

/// Gross dividends received in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub month: String,
    pub total: Money,
}

/// One bucket per month present, ascending. Rows without a valid date are
/// left out.
pub fn group_by_month(transactions: &[DividendTransaction]) -> Vec<MonthlyBucket> {
    let mut months: BTreeMap<&str, Money> = BTreeMap::new();
    for t in transactions {
        if let Some(month) = dates::month_key(&t.date) {
            *months.entry(month).or_default() += t.total;
        }
    }

    months
        .into_iter()
        .map(|(month, total)| MonthlyBucket {
            month: month.to_string(),
            total,
        })
        .collect()
}
