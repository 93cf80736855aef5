use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Type alias for Result using the reconstruction error type.
pub type Result<T> = std::result::Result<T, ReconstructionError>;

/// Errors that invalidate the whole ledger reconstruction. None of these are
/// retried by the engine; the caller fixes the inputs and runs again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconstructionError {
    /// A sale drew more shares than the replayed history had acquired by
    /// that point: the supplied history has a gap before its first event.
    #[error("Incomplete history for {symbol}: sale on {date} exceeds held quantity by {missing}")]
    IncompleteHistory {
        symbol: String,
        date: NaiveDate,
        missing: Decimal,
    },

    /// The expected-balance anchor disagrees with the replayed ledger.
    /// `delta` = reconstructed − expected.
    #[error(
        "Reconstructed balance for {symbol} on {reference_date} is {reconstructed}, expected {expected} (delta {delta})"
    )]
    BalanceMismatch {
        symbol: String,
        reference_date: NaiveDate,
        expected: Decimal,
        reconstructed: Decimal,
        delta: Decimal,
    },

    /// A prior-holdings snapshot was supplied for the wrong year.
    #[error("Holdings snapshot is for {holdings_year}, need {expected_year}")]
    HoldingsYearMismatch {
        holdings_year: i32,
        expected_year: i32,
    },

    #[error("No transactions supplied for reconstruction")]
    EmptyHistory,
}
