//! Lot ledger, holdings snapshots and the reconstruction strategies.

mod holdings_errors;
mod holdings_model;
mod reconstructor;

pub use holdings_errors::ReconstructionError;
pub use holdings_model::{
    is_quantity_significant, Holdings, Lot, LotLedger, LotShortfall, SecurityPosition,
    StockHolding,
};
pub use reconstructor::{ExpectedBalance, HoldingsReconstructor, ReconstructionInput};

#[cfg(test)]
mod reconstructor_tests;
