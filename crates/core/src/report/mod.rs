//! Report aggregation and export packaging.

mod export;
mod report_assembler;
mod report_model;

pub use export::{build_artifacts, zip_artifacts};
pub use report_assembler::{ReportAssembler, ReportParts};
pub use report_model::{
    AcquisitionEntry, CashLedgerLine, DividendSummary, EoyBalanceItem, ExportArtifact,
    SecuritySummary, TaxReport, TaxReportOutcome, TaxSummary,
};
