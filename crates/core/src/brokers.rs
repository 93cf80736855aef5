use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_SETTLEMENT_WINDOW_DAYS;
use crate::errors::ValidationError;

/// Supported brokers. The broker identifier travels with holdings snapshots
/// so a snapshot produced for one account is not silently replayed into
/// another broker's history.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Broker {
    Schwab,
    Morgan,
    Td,
}

impl Broker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Broker::Schwab => "schwab",
            Broker::Morgan => "morgan",
            Broker::Td => "td",
        }
    }

    /// Days between a sale and the matching bank wire landing. Morgan wires
    /// settle noticeably slower than the others.
    pub fn settlement_window_days(&self) -> i64 {
        match self {
            Broker::Morgan => 10,
            _ => DEFAULT_SETTLEMENT_WINDOW_DAYS,
        }
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Broker {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "schwab" => Ok(Broker::Schwab),
            "morgan" => Ok(Broker::Morgan),
            "td" => Ok(Broker::Td),
            other => Err(ValidationError::UnknownBroker(other.to_string())),
        }
    }
}
