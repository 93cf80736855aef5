use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::brokers::Broker;
use crate::cash::CashEntry;
use crate::constants::QUANTITY_THRESHOLD;
use crate::fx::Amount;

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// A batch of shares acquired together on one date at one cost basis.
///
/// The per-unit purchase price keeps the acquisition-date rate forever;
/// identity within a symbol is `(acquisition_date, sequence)` so same-day
/// acquisitions stay distinguishable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub sequence: u64,
    pub acquisition_date: NaiveDate,
    pub quantity: Decimal,
    /// Per-unit price, valued at the acquisition-date rate.
    pub purchase_price: Amount,
}

impl Lot {
    pub fn cost_basis(&self) -> Amount {
        self.purchase_price.times(self.quantity)
    }
}

/// Shortfall information when a FIFO relief asks for more shares than the
/// position holds. Callers translate this into their own error kind.
#[derive(Debug, Clone, PartialEq)]
pub struct LotShortfall {
    pub requested: Decimal,
    pub available: Decimal,
}

impl LotShortfall {
    pub fn missing(&self) -> Decimal {
        self.requested - self.available
    }
}

/// All lots of one security, oldest acquisition first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPosition {
    pub symbol: String,
    pub quantity: Decimal,
    /// Total cost basis across lots, in the reporting currency.
    pub cost_basis_reporting: Decimal,
    #[serde(default)]
    pub lots: VecDeque<Lot>,
}

impl SecurityPosition {
    pub fn new(symbol: impl Into<String>) -> Self {
        SecurityPosition {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            cost_basis_reporting: Decimal::ZERO,
            lots: VecDeque::new(),
        }
    }

    /// Recomputes aggregates from the lots. Internal bookkeeping after every
    /// mutation so the position never reports stale totals.
    fn recalculate_aggregates(&mut self) {
        self.quantity = self.lots.iter().map(|lot| lot.quantity).sum();
        self.cost_basis_reporting = self
            .lots
            .iter()
            .map(|lot| lot.purchase_price.reporting_value * lot.quantity)
            .sum();
    }

    /// Adds an acquisition, keeping lots ordered by `(date, sequence)`.
    pub fn add_lot(&mut self, lot: Lot) {
        if !lot.quantity.is_sign_positive() {
            warn!(
                "Skipping lot for {} on {} with non-positive quantity {}",
                self.symbol, lot.acquisition_date, lot.quantity
            );
            return;
        }
        self.lots.push_back(lot);
        self.lots
            .make_contiguous()
            .sort_by_key(|l| (l.acquisition_date, l.sequence));
        self.recalculate_aggregates();
    }

    /// Relieves `quantity` shares oldest-lot-first and returns the consumed
    /// portions (each a `Lot` whose quantity is the amount taken from it).
    ///
    /// The position is left untouched when the request exceeds the holding:
    /// a disposal either matches completely or not at all.
    pub fn reduce_lots_fifo(
        &mut self,
        quantity: Decimal,
    ) -> std::result::Result<Vec<Lot>, LotShortfall> {
        let available: Decimal = self.lots.iter().map(|lot| lot.quantity).sum();
        if quantity > available {
            return Err(LotShortfall {
                requested: quantity,
                available,
            });
        }

        let mut remaining = quantity;
        let mut consumed = Vec::new();
        while remaining > Decimal::ZERO {
            let mut lot = match self.lots.pop_front() {
                Some(lot) => lot,
                // Guarded by the availability check above.
                None => break,
            };
            if lot.quantity <= remaining {
                remaining -= lot.quantity;
                consumed.push(lot);
            } else {
                let mut taken = lot.clone();
                taken.quantity = remaining;
                lot.quantity -= remaining;
                remaining = Decimal::ZERO;
                consumed.push(taken);
                self.lots.push_front(lot);
            }
        }
        self.recalculate_aggregates();
        Ok(consumed)
    }
}

/// Mapping from security identifier to its ordered lots.
///
/// A `BTreeMap` keeps iteration deterministic so two reconstructions of the
/// same inputs produce identical snapshots.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LotLedger {
    positions: BTreeMap<String, SecurityPosition>,
}

impl LotLedger {
    pub fn new() -> Self {
        LotLedger::default()
    }

    pub fn position(&self, symbol: &str) -> Option<&SecurityPosition> {
        self.positions.get(symbol)
    }

    pub fn position_mut_or_default(&mut self, symbol: &str) -> &mut SecurityPosition {
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| SecurityPosition::new(symbol))
    }

    pub fn total_quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> impl Iterator<Item = &SecurityPosition> {
        self.positions.values()
    }

    pub fn is_empty(&self) -> bool {
        self.positions
            .values()
            .all(|p| !is_quantity_significant(&p.quantity))
    }

    /// Drops positions whose quantity fell below the significance threshold.
    pub fn prune_insignificant(&mut self) {
        self.positions
            .retain(|_, p| is_quantity_significant(&p.quantity));
    }
}

/// One holdings line in an exchanged snapshot: a lot flattened to the fields
/// a follow-on run needs to rebuild it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockHolding {
    pub symbol: String,
    /// Acquisition date of the lot.
    pub date: NaiveDate,
    pub qty: Decimal,
    /// Per-unit price, valued at the acquisition-date rate.
    pub purchase_price: Amount,
}

/// Year-end holdings snapshot, exchanged across runs: the snapshot a run
/// produces for year N is the prior-holdings input for year N+1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holdings {
    /// The year this snapshot closes (holdings as of Dec 31 of `year`).
    pub year: i32,
    pub broker: Broker,
    pub stocks: Vec<StockHolding>,
    #[serde(default)]
    pub cash: Vec<CashEntry>,
}

impl Holdings {
    pub fn from_ledger(year: i32, broker: Broker, ledger: &LotLedger, cash: Vec<CashEntry>) -> Self {
        let mut stocks = Vec::new();
        for position in ledger.positions() {
            for lot in &position.lots {
                if !is_quantity_significant(&lot.quantity) {
                    continue;
                }
                stocks.push(StockHolding {
                    symbol: position.symbol.clone(),
                    date: lot.acquisition_date,
                    qty: lot.quantity,
                    purchase_price: lot.purchase_price.clone(),
                });
            }
        }
        Holdings {
            year,
            broker,
            stocks,
            cash,
        }
    }

    /// Rebuilds a ledger from the snapshot; each line becomes an acquisition
    /// at its original historical date and basis.
    pub fn to_ledger(&self) -> LotLedger {
        let mut ledger = LotLedger::new();
        for (i, stock) in self.stocks.iter().enumerate() {
            ledger.position_mut_or_default(&stock.symbol).add_lot(Lot {
                sequence: i as u64,
                acquisition_date: stock.date,
                quantity: stock.qty,
                purchase_price: stock.purchase_price.clone(),
            });
        }
        ledger
    }

    pub fn total_shares(&self, symbol: &str) -> Decimal {
        self.stocks
            .iter()
            .filter(|s| s.symbol == symbol)
            .map(|s| s.qty)
            .sum()
    }
}
