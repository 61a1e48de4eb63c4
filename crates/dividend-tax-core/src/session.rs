//! Loaded-statement state and its two independent lifecycles: the imported
//! file and the fetched rates. Each is replaced whole by a single writer.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dividends::{extract_dividends, DividendTransaction};
use crate::ofx::parse_ofx;
use crate::rates::{hydrate, ExchangeRateRecord, Hydration, RateQuery, RateSource};
use crate::report::{build_report, DividendReport};
use crate::tax::TaxRates;
use crate::types::ComputationOutput;
use crate::DivTaxResult;

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// Describes the file a statement was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
}

/// Where the currently loaded transactions live. The pipeline only reads
/// through and writes to this interface.
pub trait DividendStore {
    fn file_data(&self) -> Option<&[DividendTransaction]>;
    fn set_file_data(&mut self, data: Vec<DividendTransaction>, metadata: Option<FileMetadata>);
    fn clear_file_data(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Option<Vec<DividendTransaction>>,
    metadata: Option<FileMetadata>,
}

impl InMemoryStore {
    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }
}

impl DividendStore for InMemoryStore {
    fn file_data(&self) -> Option<&[DividendTransaction]> {
        self.data.as_deref()
    }

    fn set_file_data(&mut self, data: Vec<DividendTransaction>, metadata: Option<FileMetadata>) {
        self.data = Some(data);
        self.metadata = metadata;
    }

    fn clear_file_data(&mut self) {
        self.data = None;
        self.metadata = None;
    }
}

// ---------------------------------------------------------------------------
// Rate state
// ---------------------------------------------------------------------------

/// Outcome of the latest rate fetch. `error` is set, and `records` empty,
/// when the fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateState {
    pub query: Option<RateQuery>,
    pub records: Option<Vec<ExchangeRateRecord>>,
    pub error: Option<String>,
}

impl RateState {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Session<S: DividendStore> {
    store: S,
    rates: RateState,
}

impl<S: DividendStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rates: RateState::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rate_state(&self) -> &RateState {
        &self.rates
    }

    pub fn transactions(&self) -> Option<&[DividendTransaction]> {
        self.store.file_data()
    }

    /// Parse and extract `raw`, then replace the loaded data. On failure the
    /// previously loaded data stays as it was.
    pub fn import_report(
        &mut self,
        raw: &str,
        metadata: Option<FileMetadata>,
    ) -> DivTaxResult<usize> {
        let tree = parse_ofx(raw)?;
        let transactions = extract_dividends(&tree);
        let count = transactions.len();

        self.store.set_file_data(transactions, metadata);
        debug!(rows = count, "statement imported");
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.store.clear_file_data();
    }

    /// Fetch rates covering the loaded transactions and replace the rate
    /// state with the outcome. Nothing to cover resets the state without a
    /// fetch. Loaded file data is never touched.
    pub fn refresh_rates(&mut self, source: &dyn RateSource, currency: Option<&str>) -> &RateState {
        let query = self
            .transactions()
            .and_then(|rows| RateQuery::for_transactions(rows, currency));

        self.rates = match query {
            None => RateState::default(),
            Some(query) => match source.fetch_rates(&query) {
                Ok(records) => {
                    debug!(records = records.len(), "exchange rates fetched");
                    RateState {
                        query: Some(query),
                        records: Some(records),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "exchange rate fetch failed");
                    RateState {
                        query: Some(query),
                        records: None,
                        error: Some(e.to_string()),
                    }
                }
            },
        };
        &self.rates
    }

    /// Loaded rows with the current rates attached, `None` when nothing is
    /// loaded.
    pub fn hydrated(&self) -> Option<Hydration> {
        let rows = self.transactions()?;
        Some(hydrate(rows, self.rates.records.as_deref()))
    }

    pub fn report(&self, tax_rates: &TaxRates) -> Option<ComputationOutput<DividendReport>> {
        let rows = self.transactions()?;
        Some(build_report(rows, self.rates.records.as_deref(), tax_rates))
    }
}
