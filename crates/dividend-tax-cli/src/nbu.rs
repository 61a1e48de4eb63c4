use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use dividend_tax_core::rates::{ExchangeRateRecord, RateQuery, RateSource};
use dividend_tax_core::{DivTaxError, DivTaxResult};

/// National Bank of Ukraine official exchange rates.
pub const NBU_ENDPOINT: &str = "https://bank.gov.ua/NBU_Exchange/exchange_site";

/// Overrides the endpoint when no `rates_endpoint` is configured.
pub const RATES_URL_ENV: &str = "DIVTAX_RATES_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP rate source for the NBU `exchange_site` API.
pub struct NbuRates {
    http: Client,
    endpoint: String,
}

impl NbuRates {
    pub fn new(endpoint: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let endpoint = endpoint
            .or_else(|| std::env::var(RATES_URL_ENV).ok())
            .unwrap_or_else(|| NBU_ENDPOINT.to_string());

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self { http, endpoint })
    }

    fn url(&self, query: &RateQuery) -> String {
        format!(
            "{}?start={}&end={}&valcode={}&sort=exchangedate&order=desc&json",
            self.endpoint,
            query.start_date,
            query.end_date,
            query.currency.to_lowercase()
        )
    }
}

impl RateSource for NbuRates {
    fn fetch_rates(&self, query: &RateQuery) -> DivTaxResult<Vec<ExchangeRateRecord>> {
        let url = self.url(query);
        debug!(%url, "fetching exchange rates");

        let records: Vec<ExchangeRateRecord> = self
            .http
            .get(&url)
            .send()
            .map_err(|e| DivTaxError::RateFetch(format!("GET {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| DivTaxError::RateFetch(format!("GET {url} returned {e}")))?
            .json()
            .map_err(|e| DivTaxError::RateFetch(format!("unreadable rate payload: {e}")))?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url() {
        let source = NbuRates::new(Some("http://localhost:9/rates".into())).unwrap();
        let query = RateQuery {
            start_date: "20230115".into(),
            end_date: "20230620".into(),
            currency: "USD".into(),
        };
        assert_eq!(
            source.url(&query),
            "http://localhost:9/rates?start=20230115&end=20230620&valcode=usd&sort=exchangedate&order=desc&json"
        );
    }

    #[test]
    fn test_unreachable_endpoint_is_rate_fetch_error() {
        let source = NbuRates::new(Some("http://127.0.0.1:9/rates".into())).unwrap();
        let query = RateQuery {
            start_date: "20230115".into(),
            end_date: "20230115".into(),
            currency: "USD".into(),
        };
        assert!(matches!(
            source.fetch_rates(&query),
            Err(DivTaxError::RateFetch(_))
        ));
    }
}
