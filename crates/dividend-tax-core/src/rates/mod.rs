pub mod hydrate;

use serde::{Deserialize, Serialize};

use crate::dividends::{date_range, DividendTransaction};
use crate::types::{Rate, DEFAULT_CURRENCY};
use crate::DivTaxResult;

pub use hydrate::{hydrate, Hydration, HydratedDividendTransaction, RateTable};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One rate published by the exchange-rate service: local-currency units per
/// one unit of the queried currency on `exchange_date` (`DD.MM.YYYY`).
/// Extra fields the service returns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRecord {
    #[serde(rename = "exchangedate")]
    pub exchange_date: String,
    pub rate_per_unit: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
}

/// Parameters of a single rate fetch. Dates are `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuery {
    pub start_date: String,
    pub end_date: String,
    pub currency: String,
}

impl RateQuery {
    /// Query covering every dated transaction, `None` when there is nothing
    /// to look up.
    pub fn for_transactions(
        transactions: &[DividendTransaction],
        currency: Option<&str>,
    ) -> Option<Self> {
        let range = date_range(transactions)?;
        Some(Self {
            start_date: range.start_date,
            end_date: range.end_date,
            currency: currency.unwrap_or(DEFAULT_CURRENCY).to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Rate source boundary
// ---------------------------------------------------------------------------

/// External exchange-rate lookup. Implementations perform the transport;
/// any failure is reported as [`crate::DivTaxError::RateFetch`].
pub trait RateSource {
    fn fetch_rates(&self, query: &RateQuery) -> DivTaxResult<Vec<ExchangeRateRecord>>;
}

/// Rates supplied up front, e.g. read from a file. Returned as-is for every
/// query.
#[derive(Debug, Clone, Default)]
pub struct FixedRates(pub Vec<ExchangeRateRecord>);

impl RateSource for FixedRates {
    fn fetch_rates(&self, _query: &RateQuery) -> DivTaxResult<Vec<ExchangeRateRecord>> {
        Ok(self.0.clone())
    }
}
