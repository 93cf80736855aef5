//! Vestfolio Core - year-end equity compensation holdings and tax reporting.
//!
//! This crate reconstructs a lot inventory from broker transaction history,
//! settles the year's sales FIFO against it, reconciles proceeds with bank
//! wires and assembles the capital-gains report. It is boundary-agnostic:
//! parsers, CLI and web layers live elsewhere and talk to this crate through
//! the types re-exported here.

pub mod brokers;
pub mod cash;
pub mod constants;
pub mod diagnostics;
pub mod disposals;
pub mod errors;
pub mod fx;
pub mod holdings;
pub mod report;
pub mod taxes;
pub mod transactions;
pub mod wires;

// Re-export the request/response surface boundary layers use
pub use taxes::{generate_tax_report, TaxYearInput};
pub use report::TaxReportOutcome;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
