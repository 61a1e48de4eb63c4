use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dividends::{dates, DividendTransaction};
use crate::rates::ExchangeRateRecord;
use crate::types::Rate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A dividend with the exchange rate of its trade date attached.
/// `cur_exchange` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedDividendTransaction {
    #[serde(flatten)]
    pub transaction: DividendTransaction,
    pub cur_exchange: Rate,
}

/// Result of hydration. When no rate records were supplied the rows pass
/// through unrated; tax math is only defined on `Rated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Hydration {
    Rated(Vec<HydratedDividendTransaction>),
    Unrated(Vec<DividendTransaction>),
}

impl Hydration {
    pub fn rated(&self) -> Option<&[HydratedDividendTransaction]> {
        match self {
            Hydration::Rated(rows) => Some(rows),
            Hydration::Unrated(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Hydration::Rated(rows) => rows.len(),
            Hydration::Unrated(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Largest rate-per-unit accepted from a rate source.
pub const MAX_RATE_PER_UNIT: Rate = dec!(1_000_000);

/// Rates indexed by canonical `YYYY-MM-DD` date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    by_date: HashMap<String, Rate>,
    /// Whether any record was supplied, usable or not.
    supplied: bool,
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

impl RateTable {
    /// Index records by date; a later record for the same date replaces an
    /// earlier one. Records with an unreadable date or a rate outside
    /// `(0, MAX_RATE_PER_UNIT]` are skipped.
    pub fn from_records(records: &[ExchangeRateRecord]) -> Self {
        let mut by_date = HashMap::new();
        for record in records {
            let Some(date) = dates::api_to_iso(&record.exchange_date) else {
                warn!(date = %record.exchange_date, "skipping rate with unreadable date");
                continue;
            };
            if record.rate_per_unit <= Decimal::ZERO || record.rate_per_unit > MAX_RATE_PER_UNIT {
                warn!(date = %date, rate = %record.rate_per_unit, "skipping out-of-range rate");
                continue;
            }
            by_date.insert(date, record.rate_per_unit);
        }
        debug!(dates = by_date.len(), "indexed exchange rates");
        Self {
            by_date,
            supplied: !records.is_empty(),
        }
    }

    pub fn rate_on(&self, date: &str) -> Option<Rate> {
        self.by_date.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Attach the rate of each row's date, `1` when the date has none.
    /// Rows stay unrated only when the table was built from no records.
    pub fn hydrate(&self, transactions: &[DividendTransaction]) -> Hydration {
        if !self.supplied {
            return Hydration::Unrated(transactions.to_vec());
        }

        let mut defaulted = 0usize;
        let rows = transactions
            .iter()
            .map(|transaction| {
                let cur_exchange = self.rate_on(&transaction.date).unwrap_or_else(|| {
                    defaulted += 1;
                    Decimal::ONE
                });
                HydratedDividendTransaction {
                    transaction: transaction.clone(),
                    cur_exchange,
                }
            })
            .collect();

        if defaulted > 0 {
            warn!(rows = defaulted, "no exchange rate for trade date, using 1");
        }
        Hydration::Rated(rows)
    }
}

/// Attach exchange rates to `transactions`. `None` or an empty rate list
/// leaves the rows unrated; records that are all unusable still rate every
/// row at `1`.
pub fn hydrate(
    transactions: &[DividendTransaction],
    records: Option<&[ExchangeRateRecord]>,
) -> Hydration {
    RateTable::from_records(records.unwrap_or_default()).hydrate(transactions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(id: &str, date: &str) -> DividendTransaction {
        DividendTransaction {
            id: id.into(),
            date: date.into(),
            total: dec!(10),
            ..Default::default()
        }
    }

    fn record(date: &str, rate: Decimal) -> ExchangeRateRecord {
        ExchangeRateRecord {
            exchange_date: date.into(),
            rate_per_unit: rate,
            cc: None,
        }
    }

    fn rates(hydration: &Hydration) -> Vec<Decimal> {
        hydration
            .rated()
            .unwrap()
            .iter()
            .map(|r| r.cur_exchange)
            .collect()
    }

    #[test]
    fn test_rates_attach_by_date_with_default() {
        let rows = vec![row("a", "2023-02-16"), row("b", "2023-02-17")];
        let records = vec![record("16.02.2023", dec!(36.5686))];

        let hydration = hydrate(&rows, Some(records.as_slice()));
        assert_eq!(rates(&hydration), vec![dec!(36.5686), Decimal::ONE]);
    }

    #[test]
    fn test_last_record_for_a_date_wins() {
        let records = vec![
            record("16.02.2023", dec!(36.50)),
            record("16.02.2023", dec!(36.90)),
        ];
        let table = RateTable::from_records(&records);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rate_on("2023-02-16"), Some(dec!(36.90)));
    }

    #[test]
    fn test_no_rates_passes_rows_through_unrated() {
        let rows = vec![row("a", "2023-02-16")];

        assert_eq!(hydrate(&rows, None), Hydration::Unrated(rows.clone()));
        assert_eq!(hydrate(&rows, Some(&[][..])), Hydration::Unrated(rows));
    }

    #[test]
    fn test_unusable_records_default_rows_to_one() {
        let rows = vec![row("a", "2023-02-16")];

        let zero = vec![record("16.02.2023", dec!(0))];
        assert_eq!(rates(&hydrate(&rows, Some(zero.as_slice()))), vec![Decimal::ONE]);

        let unusable = vec![
            record("2023-02-16", dec!(36)),
            record("16.02.2023", dec!(-1)),
            record("16.02.2023", dec!(1_000_001)),
        ];
        let hydration = hydrate(&rows, Some(unusable.as_slice()));
        assert_eq!(rates(&hydration), vec![Decimal::ONE]);
        assert!(RateTable::from_records(&unusable).is_empty());
    }

    #[test]
    fn test_hydration_is_idempotent() {
        let rows = vec![row("a", "2023-02-16"), row("b", "")];
        let records = vec![record("16.02.2023", dec!(36.5686))];

        let first = hydrate(&rows, Some(records.as_slice()));
        let second = hydrate(&rows, Some(records.as_slice()));
        assert_eq!(first, second);
        assert!(rates(&first).iter().all(|rate| *rate > Decimal::ZERO));
    }

    #[test]
    fn test_rated_row_requires_cur_exchange() {
        let with_rate = r#"{"id":"1","total":"100","tax":"-15","curExchange":"40.5"}"#;
        let parsed: HydratedDividendTransaction = serde_json::from_str(with_rate).unwrap();
        assert_eq!(parsed.cur_exchange, dec!(40.5));
        assert_eq!(parsed.transaction.total, dec!(100));

        let without_rate = r#"{"id":"1","total":"100","tax":"-15"}"#;
        assert!(serde_json::from_str::<HydratedDividendTransaction>(without_rate).is_err());
    }

    #[test]
    fn test_rated_row_serializes_flat() {
        let hydrated = HydratedDividendTransaction {
            transaction: row("a", "2023-02-16"),
            cur_exchange: dec!(36.5),
        };
        let value = serde_json::to_value(&hydrated).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["curExchange"], "36.5");
    }
}
