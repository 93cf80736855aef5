//! FX module - the reporting-currency valuation seam.

mod fx_errors;
mod fx_model;
mod fx_service;

pub use fx_errors::FxError;
pub use fx_model::Amount;
pub use fx_service::{CachedRateProvider, RateProvider, StaticRates};
