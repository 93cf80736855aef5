//! Reconciliation of sale proceeds against bank wire records.

mod wire_model;
mod wire_reconciler;

pub use wire_model::{UnmatchedWire, WireMatchConfig, WireRecord};
pub use wire_reconciler::WireReconciler;
