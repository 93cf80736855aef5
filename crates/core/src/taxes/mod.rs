//! Per-year orchestration: inputs in, report bundle out.

mod taxes_model;
mod taxes_service;

pub use taxes_model::TaxYearInput;
pub use taxes_service::generate_tax_report;
