//! Cash account bookkeeping: proceeds in, wires out, year-end remainder.

mod cash_model;
mod cash_service;

pub use cash_model::{CashEntry, CashSummary, TransferRecord};
pub use cash_service::CashLedger;
