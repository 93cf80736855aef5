//! Canonical transaction events as produced by the broker normalizers.

mod transactions_model;

pub use transactions_model::{merge_histories, TransactionEvent, TransactionSequence};
