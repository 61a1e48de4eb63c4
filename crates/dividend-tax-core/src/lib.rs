pub mod analytics;
pub mod dividends;
pub mod error;
pub mod format;
pub mod ofx;
pub mod rates;
pub mod report;
pub mod session;
pub mod tax;
pub mod types;

pub use error::DivTaxError;
pub use types::*;

/// Standard result type for all dividend-tax operations
pub type DivTaxResult<T> = Result<T, DivTaxError>;
