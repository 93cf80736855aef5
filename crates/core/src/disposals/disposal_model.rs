use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fx::Amount;

/// One slice taken out of a lot when settling a sale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotMatch {
    /// Identity of the source lot within its symbol.
    pub lot_sequence: u64,
    pub acquisition_date: NaiveDate,
    /// Quantity taken from this lot.
    pub quantity: Decimal,
    /// Per-unit price at the acquisition-date rate.
    pub purchase_price: Amount,
    /// `purchase_price * quantity`, the prorated basis for this slice.
    pub cost_basis: Amount,
}

/// A sale settled against the ledger. Immutable once created; the report
/// assembler owns the collection.
///
/// The basis legs keep their acquisition-date rates and the proceeds keep
/// the sale-date rate, so the realized gain only exists in the reporting
/// currency where both sides are comparable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Disposal {
    pub symbol: String,
    pub date: NaiveDate,
    /// Quantity sold (positive).
    pub qty: Decimal,
    /// Per-unit net sale price at the sale-date rate.
    pub sale_price: Amount,
    /// Total net proceeds at the sale-date rate.
    pub proceeds: Amount,
    pub matches: Vec<LotMatch>,
    /// Total prorated basis in the reporting currency.
    pub cost_basis_reporting: Decimal,
    /// Realized gain/loss in the reporting currency.
    pub gain_reporting: Decimal,
    /// Filled by the wire reconciler; `None` until reconciliation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_confirmed: Option<bool>,
}

/// A sale that could not be settled, kept in the report instead of aborting
/// the run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisposalException {
    pub symbol: String,
    pub date: NaiveDate,
    pub requested: Decimal,
    pub available: Decimal,
    pub shortfall: Decimal,
}

/// Type alias for Result using the matching error type.
pub type Result<T> = std::result::Result<T, MatchingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchingError {
    /// The sale asked for more shares than the ledger holds. Fatal for this
    /// disposal only; it is never clipped to the available quantity.
    #[error("Sale of {requested} {symbol} on {date} exceeds held quantity {available} by {shortfall}")]
    InsufficientLots {
        symbol: String,
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("Event is not a sale: {0}")]
    NotASale(String),
}

impl MatchingError {
    pub fn to_exception(&self) -> Option<DisposalException> {
        match self {
            MatchingError::InsufficientLots {
                symbol,
                date,
                requested,
                available,
                shortfall,
            } => Some(DisposalException {
                symbol: symbol.clone(),
                date: *date,
                requested: *requested,
                available: *available,
                shortfall: *shortfall,
            }),
            MatchingError::NotASale(_) => None,
        }
    }
}
