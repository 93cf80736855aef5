use chrono::NaiveDate;
use thiserror::Error;

/// Type alias for Result using the Fx error type.
pub type Result<T> = std::result::Result<T, FxError>;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("No exchange rate for {currency} on or near {date}")]
    RateNotFound { currency: String, date: NaiveDate },

    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
}
