use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use dividend_tax_core::dividends::DividendTransaction;
use dividend_tax_core::ofx::OfxNode;
use dividend_tax_core::rates::{ExchangeRateRecord, HydratedDividendTransaction};
use dividend_tax_core::tax::TaxRates;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HydrateInput {
    transactions: Vec<DividendTransaction>,
    #[serde(default)]
    rates: Option<Vec<ExchangeRateRecord>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxesInput {
    #[serde(flatten)]
    row: HydratedDividendTransaction,
    #[serde(default)]
    tax_rates: TaxRates,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryInput {
    #[serde(default)]
    rows: Option<Vec<HydratedDividendTransaction>>,
    #[serde(default)]
    tax_rates: TaxRates,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportInput {
    transactions: Vec<DividendTransaction>,
    #[serde(default)]
    rates: Option<Vec<ExchangeRateRecord>>,
    #[serde(default)]
    tax_rates: TaxRates,
}

/// `null` and a missing list both mean "no data loaded".
fn read_transactions(json: &str) -> NapiResult<Vec<DividendTransaction>> {
    let rows: Option<Vec<DividendTransaction>> =
        serde_json::from_str(json).map_err(to_napi_error)?;
    Ok(rows.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

#[napi]
pub fn parse_ofx(raw: String) -> NapiResult<String> {
    let tree = dividend_tax_core::ofx::parse_ofx(&raw).map_err(to_napi_error)?;
    serde_json::to_string(&tree).map_err(to_napi_error)
}

#[napi]
pub fn extract_dividends(raw: String) -> NapiResult<String> {
    let tree = dividend_tax_core::ofx::parse_ofx(&raw).map_err(to_napi_error)?;
    let rows = dividend_tax_core::dividends::extract_dividends(&tree);
    serde_json::to_string(&rows).map_err(to_napi_error)
}

#[napi]
pub fn extract_dividends_from_tree(tree_json: String) -> NapiResult<String> {
    let tree: OfxNode = serde_json::from_str(&tree_json).map_err(to_napi_error)?;
    let rows = dividend_tax_core::dividends::extract_dividends(&tree);
    serde_json::to_string(&rows).map_err(to_napi_error)
}

#[napi]
pub fn date_range(transactions_json: String) -> NapiResult<String> {
    let rows = read_transactions(&transactions_json)?;
    let range = dividend_tax_core::dividends::date_range(&rows);
    serde_json::to_string(&range).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rates and tax
// ---------------------------------------------------------------------------

#[napi]
pub fn hydrate_dividends(input_json: String) -> NapiResult<String> {
    let input: HydrateInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let hydration =
        dividend_tax_core::rates::hydrate(&input.transactions, input.rates.as_deref());
    serde_json::to_string(&hydration).map_err(to_napi_error)
}

#[napi]
pub fn calculate_taxes(input_json: String) -> NapiResult<String> {
    let input: TaxesInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.tax_rates.validate().map_err(to_napi_error)?;
    let breakdown = dividend_tax_core::tax::calculate_taxes(&input.row, &input.tax_rates);
    serde_json::to_string(&breakdown).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[napi]
pub fn summarize_dividends(input_json: String) -> NapiResult<String> {
    let input: SummaryInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let summary =
        dividend_tax_core::analytics::summarize(input.rows.as_deref(), &input.tax_rates);
    serde_json::to_string(&summary).map_err(to_napi_error)
}

#[napi]
pub fn kpi_metrics(transactions_json: String) -> NapiResult<String> {
    let rows = read_transactions(&transactions_json)?;
    let kpi = dividend_tax_core::analytics::calculate_kpi_metrics(&rows);
    serde_json::to_string(&kpi).map_err(to_napi_error)
}

#[napi]
pub fn group_dividends_by_month(transactions_json: String) -> NapiResult<String> {
    let rows = read_transactions(&transactions_json)?;
    let buckets = dividend_tax_core::analytics::group_by_month(&rows);
    serde_json::to_string(&buckets).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[napi]
pub fn build_report(input_json: String) -> NapiResult<String> {
    let input: ReportInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.tax_rates.validate().map_err(to_napi_error)?;
    let output = dividend_tax_core::report::build_report(
        &input.transactions,
        input.rates.as_deref(),
        &input.tax_rates,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}
