use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DivTaxError;
use crate::rates::HydratedDividendTransaction;
use crate::types::{Money, Rate};
use crate::DivTaxResult;

/// Personal income tax rate applied to dividend income in local currency.
pub const TAX_RATE_PIT: Rate = dec!(0.09);

/// Military levy applied on the same base as the personal income tax.
pub const TAX_RATE_MILITARY: Rate = dec!(0.05);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Local tax rates. Both apply independently to the local-currency income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRates {
    pub pit: Rate,
    pub military: Rate,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            pit: TAX_RATE_PIT,
            military: TAX_RATE_MILITARY,
        }
    }
}

impl TaxRates {
    /// Rates must lie in `[0, 1]`.
    pub fn validate(&self) -> DivTaxResult<()> {
        for (field, rate) in [("pit_rate", self.pit), ("military_rate", self.military)] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(DivTaxError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be between 0 and 1, got {rate}"),
                });
            }
        }
        Ok(())
    }
}

/// Per-transaction tax figures. `abs_tax` and `income` are in the dividend
/// currency; everything from `local_income` on is in local currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub abs_tax: Money,
    pub income: Money,
    pub local_income: Money,
    pub pit: Money,
    pub military_tax: Money,
    pub total_tax: Money,
    pub net_income: Money,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Local tax on one rated dividend. Figures are exact; rounding is left to
/// presentation.
pub fn calculate_taxes(row: &HydratedDividendTransaction, rates: &TaxRates) -> TaxBreakdown {
    let abs_tax = row.transaction.tax.abs();
    let income = row.transaction.total - abs_tax;
    let local_income = income * row.cur_exchange;
    let pit = local_income * rates.pit;
    let military_tax = local_income * rates.military;
    let total_tax = pit + military_tax;
    let net_income = local_income - total_tax;

    TaxBreakdown {
        abs_tax,
        income,
        local_income,
        pit,
        military_tax,
        total_tax,
        net_income,
    }
}
