use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::brokers::Broker;
use crate::cash::{CashEntry, CashSummary};
use crate::diagnostics::Diagnostic;
use crate::disposals::{Disposal, DisposalException};
use crate::fx::Amount;
use crate::holdings::Holdings;
use crate::wires::UnmatchedWire;

/// Quantity and value of one security at a year boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EoyBalanceItem {
    pub symbol: String,
    pub qty: Decimal,
    /// Market price per unit at the balance date, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fmv: Option<Decimal>,
    /// Position value at the balance-date rate; falls back to cost basis
    /// when no year-end price is available.
    pub amount: Amount,
}

/// Dividend income for one security over the year, with the source-country
/// withholding that accompanied it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DividendSummary {
    pub symbol: String,
    pub gross: Amount,
    /// Withheld tax, negative.
    pub tax: Amount,
    /// Gross minus withholding, in the reporting currency.
    pub net_reporting: Decimal,
}

/// An acquisition listed in the report's position-changes section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionEntry {
    pub date: NaiveDate,
    pub symbol: String,
    pub qty: Decimal,
    pub purchase_price: Amount,
}

/// One line of the cash ledger with its running balance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashLedgerLine {
    pub entry: CashEntry,
    pub balance: Decimal,
}

/// The full year report: everything the taxpayer (or a rendering layer)
/// needs to fill a return and audit how each number came to be.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxReport {
    pub year: i32,
    pub broker: Broker,
    /// Balance at the end of the previous year.
    pub eoy_balance_previous: Vec<EoyBalanceItem>,
    /// Balance at the end of the reporting year.
    pub eoy_balance: Vec<EoyBalanceItem>,
    pub buys: Vec<AcquisitionEntry>,
    /// Disposals per security, in sale-date order.
    pub sales: BTreeMap<String, Vec<Disposal>>,
    pub dividends: Vec<DividendSummary>,
    pub cash_ledger: Vec<CashLedgerLine>,
    pub unmatched_wires: Vec<UnmatchedWire>,
    /// Sales that could not be settled against the ledger.
    pub exceptions: Vec<DisposalException>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_holdings: Option<Holdings>,
    /// False when any disposal ended up in `exceptions`.
    pub complete: bool,
}

/// Per-security roll-up for the summary section of the return.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySummary {
    pub symbol: String,
    pub shares: Decimal,
    /// Year-end position value in the reporting currency.
    pub wealth: Decimal,
    pub dividend: Decimal,
    pub taxable_gain: Decimal,
    pub sale_count: usize,
}

/// The condensed year summary: per-security figures, totals and the cash
/// account roll-up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    pub year: i32,
    pub securities: Vec<SecuritySummary>,
    pub total_gain: Decimal,
    pub total_dividend: Decimal,
    pub cash: CashSummary,
}

/// A named file inside the export bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Everything a run returns on success.
#[derive(Debug, Clone)]
pub struct TaxReportOutcome {
    pub report: TaxReport,
    /// Year-end holdings, ready to be next year's prior-holdings input.
    pub holdings: Holdings,
    pub summary: TaxSummary,
    pub unmatched_wires: Vec<UnmatchedWire>,
    pub diagnostics: Vec<Diagnostic>,
}
