use chrono::{Datelike, NaiveDate};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::fx::Amount;

/// One canonical broker event as emitted by the normalizer.
///
/// Sign conventions follow the wire format the normalizers produce: sale and
/// transfer-out quantities are negative, tax withholdings and outgoing wires
/// carry negative amounts. The engine validates these invariants instead of
/// trusting them.
///
/// Ordering is by `(date, sequence)`; `sequence` is assigned by the
/// normalizer in input-file order, so same-day events replay in the order
/// the broker reported them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionEvent {
    /// Shares arriving from a purchase program or vesting (ESPP/RSU deposit).
    Deposit {
        date: NaiveDate,
        symbol: String,
        qty: Decimal,
        /// Per-unit price, valued at the acquisition-date rate.
        purchase_price: Amount,
        /// Actual purchase date when it differs from the settlement date.
        purchase_date: Option<NaiveDate>,
        description: String,
        source: String,
        sequence: u64,
    },
    /// Open-market purchase inside the broker account.
    Buy {
        date: NaiveDate,
        symbol: String,
        qty: Decimal,
        purchase_price: Amount,
        source: String,
        sequence: u64,
    },
    Sell {
        date: NaiveDate,
        symbol: String,
        /// Negative by convention.
        qty: Decimal,
        /// Net proceeds after fees, valued at the sale-date rate.
        amount: Amount,
        fee: Option<Amount>,
        description: String,
        source: String,
        sequence: u64,
    },
    Dividend {
        date: NaiveDate,
        symbol: String,
        amount: Amount,
        source: String,
        sequence: u64,
    },
    DividendReinvest {
        date: NaiveDate,
        symbol: String,
        amount: Amount,
        description: String,
        source: String,
        sequence: u64,
    },
    /// Source-country withholding on a dividend. Negative amount.
    Tax {
        date: NaiveDate,
        symbol: String,
        amount: Amount,
        description: String,
        source: String,
        sequence: u64,
    },
    /// Withheld tax returned to the account.
    TaxRepayment {
        date: NaiveDate,
        symbol: String,
        amount: Amount,
        description: String,
        source: String,
        sequence: u64,
    },
    /// Cash leaving the broker account towards a bank. Negative amount.
    Wire {
        date: NaiveDate,
        amount: Amount,
        fee: Option<Amount>,
        description: String,
        source: String,
        sequence: u64,
    },
    /// Shares moved out of the account (negative qty) without a sale.
    Transfer {
        date: NaiveDate,
        symbol: String,
        qty: Decimal,
        fee: Option<Amount>,
        source: String,
        sequence: u64,
    },
    Fee {
        date: NaiveDate,
        amount: Amount,
        source: String,
        sequence: u64,
    },
    /// Manual correction of the cash balance, either sign.
    CashAdjust {
        date: NaiveDate,
        amount: Amount,
        description: String,
        source: String,
        sequence: u64,
    },
}

impl TransactionEvent {
    pub fn date(&self) -> NaiveDate {
        match self {
            TransactionEvent::Deposit { date, .. }
            | TransactionEvent::Buy { date, .. }
            | TransactionEvent::Sell { date, .. }
            | TransactionEvent::Dividend { date, .. }
            | TransactionEvent::DividendReinvest { date, .. }
            | TransactionEvent::Tax { date, .. }
            | TransactionEvent::TaxRepayment { date, .. }
            | TransactionEvent::Wire { date, .. }
            | TransactionEvent::Transfer { date, .. }
            | TransactionEvent::Fee { date, .. }
            | TransactionEvent::CashAdjust { date, .. } => *date,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            TransactionEvent::Deposit { sequence, .. }
            | TransactionEvent::Buy { sequence, .. }
            | TransactionEvent::Sell { sequence, .. }
            | TransactionEvent::Dividend { sequence, .. }
            | TransactionEvent::DividendReinvest { sequence, .. }
            | TransactionEvent::Tax { sequence, .. }
            | TransactionEvent::TaxRepayment { sequence, .. }
            | TransactionEvent::Wire { sequence, .. }
            | TransactionEvent::Transfer { sequence, .. }
            | TransactionEvent::Fee { sequence, .. }
            | TransactionEvent::CashAdjust { sequence, .. } => *sequence,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            TransactionEvent::Deposit { symbol, .. }
            | TransactionEvent::Buy { symbol, .. }
            | TransactionEvent::Sell { symbol, .. }
            | TransactionEvent::Dividend { symbol, .. }
            | TransactionEvent::DividendReinvest { symbol, .. }
            | TransactionEvent::Tax { symbol, .. }
            | TransactionEvent::TaxRepayment { symbol, .. }
            | TransactionEvent::Transfer { symbol, .. } => Some(symbol),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransactionEvent::Deposit { .. } => "DEPOSIT",
            TransactionEvent::Buy { .. } => "BUY",
            TransactionEvent::Sell { .. } => "SELL",
            TransactionEvent::Dividend { .. } => "DIVIDEND",
            TransactionEvent::DividendReinvest { .. } => "DIVIDEND_REINV",
            TransactionEvent::Tax { .. } => "TAX",
            TransactionEvent::TaxRepayment { .. } => "TAXSUB",
            TransactionEvent::Wire { .. } => "WIRE",
            TransactionEvent::Transfer { .. } => "TRANSFER",
            TransactionEvent::Fee { .. } => "FEE",
            TransactionEvent::CashAdjust { .. } => "CASHADJUST",
        }
    }

    /// Checks the per-variant sign invariants the normalizers promise.
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TransactionEvent::Deposit { qty, purchase_price, symbol, .. }
            | TransactionEvent::Buy { qty, purchase_price, symbol, .. } => {
                if symbol.is_empty() {
                    return Err(ValidationError::MissingField("symbol".to_string()));
                }
                if !qty.is_sign_positive() || qty.is_zero() {
                    return Err(ValidationError::InvalidInput(format!(
                        "{} of {} on {} must have positive quantity, got {}",
                        self.kind(),
                        symbol,
                        self.date(),
                        qty
                    )));
                }
                if purchase_price.value.is_sign_negative()
                    || purchase_price.reporting_value.is_sign_negative()
                {
                    return Err(ValidationError::InvalidInput(format!(
                        "Negative purchase price for {} on {}",
                        symbol,
                        self.date()
                    )));
                }
                Ok(())
            }
            TransactionEvent::Sell { qty, symbol, .. } => {
                if qty.is_sign_positive() || qty.is_zero() {
                    return Err(ValidationError::InvalidInput(format!(
                        "SELL of {} on {} must have negative quantity, got {}",
                        symbol,
                        self.date(),
                        qty
                    )));
                }
                Ok(())
            }
            TransactionEvent::Tax { amount, symbol, .. } => {
                if amount.value.is_sign_positive() {
                    return Err(ValidationError::InvalidInput(format!(
                        "TAX for {} on {} must have negative amount, got {}",
                        symbol,
                        self.date(),
                        amount.value
                    )));
                }
                Ok(())
            }
            TransactionEvent::Wire { amount, .. } => {
                if amount.value.is_sign_positive() {
                    return Err(ValidationError::InvalidInput(format!(
                        "WIRE on {} must have negative amount, got {}",
                        self.date(),
                        amount.value
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// A validated, chronologically ordered transaction history.
#[derive(Debug, Clone, Default)]
pub struct TransactionSequence {
    events: Vec<TransactionEvent>,
}

impl TransactionSequence {
    /// Sorts by `(date, sequence)` and validates every event's internal
    /// consistency. Sorting is stable, so the normalizer's intra-day order
    /// is preserved for events sharing date and sequence.
    pub fn from_events(mut events: Vec<TransactionEvent>) -> Result<Self, ValidationError> {
        events.sort_by_key(|e| (e.date(), e.sequence()));
        for event in &events {
            event.validate()?;
        }
        Ok(TransactionSequence { events })
    }

    pub fn events(&self) -> &[TransactionEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.events.first().map(|e| e.date().year())
    }

    pub fn last_year(&self) -> Option<i32> {
        self.events.last().map(|e| e.date().year())
    }

    /// Events dated within `year`.
    pub fn for_year(&self, year: i32) -> Vec<TransactionEvent> {
        self.events
            .iter()
            .filter(|e| e.date().year() == year)
            .cloned()
            .collect()
    }

    /// Events dated strictly before January 1 of `year`.
    pub fn before_year(&self, year: i32) -> Vec<TransactionEvent> {
        self.events
            .iter()
            .filter(|e| e.date().year() < year)
            .cloned()
            .collect()
    }
}

/// Merges transaction histories exported at different times into one
/// sequence without double counting: files are bucketed per year, later
/// exports win for overlapping years, and the first overlapping year of the
/// follow-on file is skipped since the earlier file already covers it.
pub fn merge_histories(
    files: Vec<Vec<TransactionEvent>>,
) -> Result<TransactionSequence, ValidationError> {
    let mut sets: Vec<(i32, i32, Vec<TransactionEvent>)> = Vec::new();
    for events in files {
        let seq = TransactionSequence::from_events(events)?;
        if seq.is_empty() {
            warn!("Skipping empty transaction file during merge");
            continue;
        }
        let first = seq.first_year().expect("non-empty");
        let last = seq.last_year().expect("non-empty");
        sets.push((first, last, seq.events));
    }
    sets.sort_by_key(|(first, _, _)| *first);

    let mut year_owner: std::collections::BTreeMap<i32, usize> = std::collections::BTreeMap::new();
    let mut overlap_done = false;
    for (i, (first, last, _)) in sets.iter().enumerate() {
        for year in *first..=*last {
            if year_owner.contains_key(&year) && !overlap_done {
                // Jump over the first duplicated year of the follow-on file.
                overlap_done = true;
                continue;
            }
            year_owner.insert(year, i);
        }
    }

    let mut merged = Vec::new();
    for (year, owner) in year_owner {
        merged.extend(
            sets[owner]
                .2
                .iter()
                .filter(|e| e.date().year() == year)
                .cloned(),
        );
    }
    TransactionSequence::from_events(merged)
}
