use thiserror::Error;

#[derive(Debug, Error)]
pub enum DivTaxError {
    #[error("No <OFX> section found in input")]
    NoOfxSectionFound,

    #[error("Malformed OFX content: {0}")]
    MalformedOfxXml(String),

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Exchange rate fetch failed: {0}")]
    RateFetch(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DivTaxError {
    fn from(e: serde_json::Error) -> Self {
        DivTaxError::SerializationError(e.to_string())
    }
}
