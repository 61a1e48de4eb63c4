use serde::{Deserialize, Serialize};

use crate::rates::HydratedDividendTransaction;
use crate::tax::{calculate_taxes, TaxBreakdown, TaxRates};
use crate::types::Money;

/// Column totals over a rated statement: gross `total`, withheld `tax` as a
/// magnitude, and every field of the per-row breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: Money,
    pub tax: Money,
    pub abs_tax: Money,
    pub income: Money,
    pub local_income: Money,
    pub pit: Money,
    pub military_tax: Money,
    pub total_tax: Money,
    pub net_income: Money,
}

impl Summary {
    fn add(mut self, row: &HydratedDividendTransaction, b: &TaxBreakdown) -> Self {
        self.total += row.transaction.total;
        self.tax += b.abs_tax;
        self.abs_tax += b.abs_tax;
        self.income += b.income;
        self.local_income += b.local_income;
        self.pit += b.pit;
        self.military_tax += b.military_tax;
        self.total_tax += b.total_tax;
        self.net_income += b.net_income;
        self
    }
}

/// Sum every rated row. `None` when there is no rated data; an empty slice
/// gives an all-zero summary.
pub fn summarize(
    rows: Option<&[HydratedDividendTransaction]>,
    rates: &TaxRates,
) -> Option<Summary> {
    let rows = rows?;
    Some(rows.iter().fold(Summary::default(), |acc, row| {
        acc.add(row, &calculate_taxes(row, rates))
    }))
}
