use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;

use super::cash_model::{CashEntry, CashSummary, TransferRecord};
use crate::constants::DECIMAL_PRECISION;
use crate::diagnostics::Diagnostics;
use crate::errors::{Result, ValidationError};
use crate::fx::{Amount, RateProvider};

/// Cash account bookkeeping for one tax year.
///
/// Money earned in the account (debits) keeps the rate of the day it was
/// earned; when it is later wired home (credits marked as transfers) the
/// difference between the earn-date valuation and the transfer-date
/// valuation is a currency gain that belongs in the report.
#[derive(Debug, Clone)]
pub struct CashLedger {
    year: i32,
    entries: Vec<CashEntry>,
}

impl CashLedger {
    pub fn new(year: i32) -> Self {
        CashLedger {
            year,
            entries: Vec::new(),
        }
    }

    /// Seeds the ledger with the cash carried over from the prior year's
    /// snapshot.
    pub fn with_opening_balance(year: i32, opening: Vec<CashEntry>) -> Self {
        CashLedger {
            year,
            entries: opening,
        }
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.date);
    }

    /// Money arriving on the account.
    pub fn debit(
        &mut self,
        date: NaiveDate,
        amount: Amount,
        description: impl Into<String>,
    ) -> Result<()> {
        debug!("Cash debit: {}: {}", date, amount.value);
        if amount.value < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Cash debit on {} must be positive, got {}",
                date, amount.value
            ))
            .into());
        }
        self.entries.push(CashEntry {
            date,
            description: description.into(),
            amount,
            transfer: false,
        });
        self.sort();
        Ok(())
    }

    /// Money leaving the account. `transfer` marks wires towards the
    /// taxpayer's bank, which later produce [`TransferRecord`]s.
    pub fn credit(
        &mut self,
        date: NaiveDate,
        amount: Amount,
        description: impl Into<String>,
        transfer: bool,
    ) -> Result<()> {
        debug!("Cash credit: {}: {}", date, amount.value);
        if amount.value > Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Cash credit on {} must be negative, got {}",
                date, amount.value
            ))
            .into());
        }
        self.entries.push(CashEntry {
            date,
            description: description.into(),
            amount,
            transfer,
        });
        self.sort();
        Ok(())
    }

    /// The dated entries with a running balance, for report output.
    pub fn ledger(&self) -> Vec<(CashEntry, Decimal)> {
        let mut total = Decimal::ZERO;
        self.entries
            .iter()
            .map(|e| {
                total += e.amount.value;
                (e.clone(), total)
            })
            .collect()
    }

    /// Relieves credits against debits oldest-first and produces the
    /// year-end cash summary. Over-drawing the account is reported as a
    /// diagnostic, not an error: incomplete cash histories are common and
    /// must not block the stock report.
    pub fn process(
        &self,
        rates: &dyn RateProvider,
        diagnostics: &mut Diagnostics,
    ) -> Result<CashSummary> {
        let mut debits: Vec<CashEntry> = self
            .entries
            .iter()
            .filter(|e| e.amount.value > Decimal::ZERO)
            .cloned()
            .collect();
        let credits: Vec<CashEntry> = self
            .entries
            .iter()
            .filter(|e| e.amount.value < Decimal::ZERO)
            .cloned()
            .collect();

        let mut transfers = Vec::new();
        let mut posidx = 0usize;
        for entry in &credits {
            let mut amount_to_consume = entry.amount.value.abs();
            let mut paid_reporting = Decimal::ZERO;
            let received_reporting = entry.amount.reporting_value.abs();

            while amount_to_consume > Decimal::ZERO && posidx < debits.len() {
                let available = debits[posidx].amount.value;
                if available.is_zero() {
                    posidx += 1;
                    continue;
                }
                if amount_to_consume >= available {
                    paid_reporting += available * debits[posidx].amount.reporting_rate;
                    amount_to_consume -= available;
                    debits[posidx].amount.value = Decimal::ZERO;
                    posidx += 1;
                } else {
                    paid_reporting += amount_to_consume * debits[posidx].amount.reporting_rate;
                    debits[posidx].amount.value -= amount_to_consume;
                    amount_to_consume = Decimal::ZERO;
                }
            }

            if amount_to_consume > Decimal::ZERO {
                diagnostics.warn(format!(
                    "Cash account overdrawn by {} on {} ({})",
                    amount_to_consume, entry.date, entry.description
                ));
            }

            if entry.transfer {
                transfers.push(TransferRecord {
                    date: entry.date,
                    amount_sent: paid_reporting.round_dp(0),
                    amount_received: received_reporting.round_dp(0),
                    gain: (received_reporting - paid_reporting).round_dp(0),
                    description: entry.description.clone(),
                });
            }
        }

        // Whatever is left in the account is valued at the year-end rate.
        let eoy = NaiveDate::from_ymd_opt(self.year, 12, 31).expect("valid year-end date");
        let mut holdings = Vec::new();
        let mut remaining_value = Decimal::ZERO;
        let mut remaining_currency: Option<String> = None;
        for entry in debits {
            if entry.amount.value > Decimal::ZERO {
                remaining_value += entry.amount.value;
                remaining_currency.get_or_insert_with(|| entry.amount.currency.clone());
                // Re-anchor the reporting leg to the unconsumed remainder.
                let amount = Amount::new(
                    entry.amount.currency.clone(),
                    entry.amount.value,
                    entry.amount.reporting_rate,
                );
                holdings.push(CashEntry {
                    date: entry.date,
                    description: entry.description,
                    amount,
                    transfer: false,
                });
            }
        }
        let remaining_currency =
            remaining_currency.unwrap_or_else(|| rates.reporting_currency().to_string());
        let remaining_cash = rates
            .amount(&remaining_currency, remaining_value, eoy)
            .map(|a| a.rounded())?;

        let gain: Decimal = transfers.iter().map(|t| t.gain).sum();
        Ok(CashSummary {
            transfers,
            remaining_cash,
            holdings,
            gain: gain.round_dp(DECIMAL_PRECISION),
        })
    }
}
