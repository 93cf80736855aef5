use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fx::Amount;

/// One movement on the broker's cash account. Positive amounts are money
/// arriving (sale proceeds, dividends), negative amounts are money leaving
/// (wires, fees, withheld tax).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashEntry {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Amount,
    /// Set when the entry is a transfer towards the taxpayer's bank.
    #[serde(default)]
    pub transfer: bool,
}

/// A completed transfer out of the account with the reporting-currency gain
/// realized between earning the cash and wiring it home.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub date: NaiveDate,
    /// Reporting-currency value of the cash consumed, at its earn-date rates.
    pub amount_sent: Decimal,
    /// Reporting-currency value received, at the transfer-date rate.
    pub amount_received: Decimal,
    pub gain: Decimal,
    pub description: String,
}

/// End-of-year cash account summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub transfers: Vec<TransferRecord>,
    /// Cash still in the account, valued at the year-end rate.
    pub remaining_cash: Amount,
    /// The individual un-transferred cash postings making up the remainder.
    pub holdings: Vec<CashEntry>,
    /// Total transfer gain for the year in the reporting currency.
    pub gain: Decimal,
}
