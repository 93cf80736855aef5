use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::brokers::Broker;
use crate::constants::{DEFAULT_SETTLEMENT_WINDOW_DAYS, DEFAULT_WIRE_TOLERANCE};

/// A bank-side transfer record, as supplied by the taxpayer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub date: NaiveDate,
    pub currency: String,
    pub value: Decimal,
    /// Reporting-currency value actually received, per the bank statement.
    pub reporting_value: Decimal,
}

/// A wire with no matching sale proceeds inside the reconciliation window.
///
/// The value is sign-normalized; the reporting-currency value is left unset
/// because no reconciled rate exists for it. Inventing one (or defaulting
/// to zero) would fabricate a figure the taxpayer never received.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedWire {
    pub date: NaiveDate,
    pub currency: String,
    /// Absolute transfer value.
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_value: Option<Decimal>,
}

impl UnmatchedWire {
    pub fn from_record(record: &WireRecord) -> Self {
        UnmatchedWire {
            date: record.date,
            currency: record.currency.clone(),
            value: record.value.abs(),
            reporting_value: None,
        }
    }
}

/// Matching tolerances. Settlement timing differs per broker, so both knobs
/// are explicit configuration rather than constants baked into the matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireMatchConfig {
    /// Maximum absolute difference between proceeds and wire value.
    pub tolerance: Decimal,
    /// Days after the sale date within which the wire must land.
    pub settlement_window_days: i64,
}

impl Default for WireMatchConfig {
    fn default() -> Self {
        WireMatchConfig {
            tolerance: Decimal::from_str(DEFAULT_WIRE_TOLERANCE)
                .unwrap_or_else(|_| Decimal::new(5, 0)),
            settlement_window_days: DEFAULT_SETTLEMENT_WINDOW_DAYS,
        }
    }
}

impl WireMatchConfig {
    pub fn for_broker(broker: Broker) -> Self {
        WireMatchConfig {
            settlement_window_days: broker.settlement_window_days(),
            ..WireMatchConfig::default()
        }
    }
}
