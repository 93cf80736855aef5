use log::debug;
use rust_decimal::Decimal;

use super::disposal_model::{Disposal, LotMatch, MatchingError, Result};
use crate::constants::DECIMAL_PRECISION;
use crate::holdings::LotLedger;
use crate::transactions::TransactionEvent;

/// Settles sales against the lot ledger under oldest-lot-first ordering.
///
/// A lot may be split across several disposals; each disposal records the
/// exact slices it consumed so the report can show per-acquisition detail.
#[derive(Debug, Default, Clone)]
pub struct DisposalMatcher {}

impl DisposalMatcher {
    pub fn new() -> Self {
        DisposalMatcher {}
    }

    /// Matches one sale event, mutating the ledger. On a shortfall the
    /// ledger is left untouched and the error carries the exact gap; the
    /// caller records it as an exception entry and continues with the next
    /// sale.
    pub fn match_sale(
        &self,
        ledger: &mut LotLedger,
        event: &TransactionEvent,
    ) -> Result<Disposal> {
        let (date, symbol, qty, amount) = match event {
            TransactionEvent::Sell {
                date,
                symbol,
                qty,
                amount,
                ..
            } => (*date, symbol.clone(), qty.abs(), amount.clone()),
            other => return Err(MatchingError::NotASale(other.kind().to_string())),
        };

        let consumed = ledger
            .position_mut_or_default(&symbol)
            .reduce_lots_fifo(qty)
            .map_err(|shortfall| MatchingError::InsufficientLots {
                symbol: symbol.clone(),
                date,
                requested: shortfall.requested,
                available: shortfall.available,
                shortfall: shortfall.missing(),
            })?;

        let sale_price = if qty.is_zero() {
            amount.clone()
        } else {
            amount.times(Decimal::ONE / qty)
        };

        let matches: Vec<LotMatch> = consumed
            .into_iter()
            .map(|lot| {
                let cost_basis = lot.purchase_price.times(lot.quantity);
                LotMatch {
                    lot_sequence: lot.sequence,
                    acquisition_date: lot.acquisition_date,
                    quantity: lot.quantity,
                    purchase_price: lot.purchase_price,
                    cost_basis,
                }
            })
            .collect();

        // Both legs are already valued at their own date's rate; the gain
        // only exists where they are comparable.
        let cost_basis_reporting: Decimal = matches
            .iter()
            .map(|m| m.cost_basis.reporting_value)
            .sum();
        let gain_reporting =
            (amount.reporting_value - cost_basis_reporting).round_dp(DECIMAL_PRECISION);

        debug!(
            "Matched sale of {} {} on {} across {} lot(s), gain {}",
            qty,
            symbol,
            date,
            matches.len(),
            gain_reporting
        );

        Ok(Disposal {
            symbol,
            date,
            qty,
            sale_price,
            proceeds: amount,
            matches,
            cost_basis_reporting: cost_basis_reporting.round_dp(DECIMAL_PRECISION),
            gain_reporting,
            wire_confirmed: None,
        })
    }
}

impl DisposalMatcher {
    /// Relieves shares leaving the account without a sale (transfer out).
    /// No gain is realized, but the same shortfall rules apply.
    pub fn match_transfer_out(
        &self,
        ledger: &mut LotLedger,
        symbol: &str,
        qty: Decimal,
        date: chrono::NaiveDate,
    ) -> Result<()> {
        ledger
            .position_mut_or_default(symbol)
            .reduce_lots_fifo(qty)
            .map(|_| ())
            .map_err(|shortfall| MatchingError::InsufficientLots {
                symbol: symbol.to_string(),
                date,
                requested: shortfall.requested,
                available: shortfall.available,
                shortfall: shortfall.missing(),
            })
    }
}
