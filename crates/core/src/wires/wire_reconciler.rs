use log::debug;

use super::wire_model::{UnmatchedWire, WireMatchConfig, WireRecord};
use crate::diagnostics::Diagnostics;
use crate::disposals::Disposal;

/// Matches stock-sale proceeds to bank wires by amount and date proximity.
///
/// Greedy: the earliest unconfirmed proceeds take the earliest eligible
/// wire; no record is matched twice. Everything left over on either side is
/// retained: unmatched wires for user review, unconfirmed proceeds as a
/// flag on the disposal. Nothing here ever fails a run.
#[derive(Debug, Clone)]
pub struct WireReconciler {
    config: WireMatchConfig,
}

impl WireReconciler {
    pub fn new(config: WireMatchConfig) -> Self {
        WireReconciler { config }
    }

    /// Reconciles disposals against the supplied wires, setting each
    /// disposal's `wire_confirmed` flag and returning the wires that matched
    /// nothing.
    pub fn reconcile(
        &self,
        disposals: &mut [Disposal],
        wires: &[WireRecord],
        diagnostics: &mut Diagnostics,
    ) -> Vec<UnmatchedWire> {
        // No bank records means nothing to reconcile against; leave the
        // disposals' flags unset rather than calling every sale unconfirmed.
        if wires.is_empty() {
            return Vec::new();
        }

        let mut wire_order: Vec<usize> = (0..wires.len()).collect();
        wire_order.sort_by_key(|&i| wires[i].date);
        let mut taken = vec![false; wires.len()];

        // Disposals arrive in date order from the matcher; keep that order
        // so the earliest proceeds claim the earliest eligible wire.
        for disposal in disposals.iter_mut() {
            let proceeds = disposal.proceeds.value.abs();
            let matched = wire_order.iter().copied().find(|&i| {
                if taken[i] {
                    return false;
                }
                let wire = &wires[i];
                let days_after = (wire.date - disposal.date).num_days();
                days_after >= 0
                    && days_after <= self.config.settlement_window_days
                    && (proceeds - wire.value.abs()).abs() <= self.config.tolerance
            });

            match matched {
                Some(i) => {
                    taken[i] = true;
                    disposal.wire_confirmed = Some(true);
                    debug!(
                        "Sale of {} on {} confirmed by wire on {}",
                        disposal.symbol, disposal.date, wires[i].date
                    );
                }
                None => {
                    disposal.wire_confirmed = Some(false);
                    diagnostics.warn(format!(
                        "Wire not confirmed for sale of {} {} on {} ({} {})",
                        disposal.qty,
                        disposal.symbol,
                        disposal.date,
                        disposal.proceeds.value,
                        disposal.proceeds.currency,
                    ));
                }
            }
        }

        let unmatched: Vec<UnmatchedWire> = wire_order
            .iter()
            .copied()
            .filter(|&i| !taken[i])
            .map(|i| UnmatchedWire::from_record(&wires[i]))
            .collect();
        for wire in &unmatched {
            diagnostics.warn(format!(
                "Wire of {} {} on {} has no matching sale proceeds",
                wire.value, wire.currency, wire.date
            ));
        }
        unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::Amount;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn disposal(date: &str, net: Decimal) -> Disposal {
        Disposal {
            symbol: "CSCO".to_string(),
            date: d(date),
            qty: dec!(100),
            sale_price: Amount::new("USD", net / dec!(100), dec!(10)),
            proceeds: Amount::new("USD", net, dec!(10)),
            matches: vec![],
            cost_basis_reporting: Decimal::ZERO,
            gain_reporting: Decimal::ZERO,
            wire_confirmed: None,
        }
    }

    fn wire(date: &str, value: Decimal) -> WireRecord {
        WireRecord {
            date: d(date),
            currency: "USD".to_string(),
            value,
            reporting_value: value * dec!(10),
        }
    }

    #[test]
    fn close_amount_within_window_matches() {
        let mut disposals = vec![disposal("2022-03-10", dec!(5000.00))];
        let wires = vec![wire("2022-03-14", dec!(4998.50)), wire("2022-09-01", dec!(10000))];

        let mut diagnostics = Diagnostics::new();
        let unmatched = WireReconciler::new(WireMatchConfig::default()).reconcile(
            &mut disposals,
            &wires,
            &mut diagnostics,
        );

        assert_eq!(disposals[0].wire_confirmed, Some(true));
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].value, dec!(10000));
        assert_eq!(unmatched[0].reporting_value, None);
    }

    #[test]
    fn unmatched_wire_value_is_sign_normalized() {
        let mut disposals = vec![];
        let wires = vec![wire("2022-09-01", dec!(-10000))];

        let mut diagnostics = Diagnostics::new();
        let unmatched = WireReconciler::new(WireMatchConfig::default()).reconcile(
            &mut disposals,
            &wires,
            &mut diagnostics,
        );
        assert_eq!(unmatched[0].value, dec!(10000));
    }

    #[test]
    fn wire_outside_window_does_not_confirm() {
        let mut disposals = vec![disposal("2022-03-10", dec!(5000.00))];
        let wires = vec![wire("2022-03-25", dec!(5000.00))];

        let mut diagnostics = Diagnostics::new();
        let unmatched = WireReconciler::new(WireMatchConfig::default()).reconcile(
            &mut disposals,
            &wires,
            &mut diagnostics,
        );
        assert_eq!(disposals[0].wire_confirmed, Some(false));
        assert_eq!(unmatched.len(), 1);
        // Both sides are diagnostics, neither is an error.
        assert_eq!(diagnostics.entries().len(), 2);
    }

    #[test]
    fn no_wire_is_matched_twice() {
        let mut disposals = vec![
            disposal("2022-03-10", dec!(5000.00)),
            disposal("2022-03-11", dec!(5000.00)),
        ];
        let wires = vec![wire("2022-03-12", dec!(5000.00))];

        let mut diagnostics = Diagnostics::new();
        WireReconciler::new(WireMatchConfig::default()).reconcile(
            &mut disposals,
            &wires,
            &mut diagnostics,
        );
        assert_eq!(disposals[0].wire_confirmed, Some(true));
        assert_eq!(disposals[1].wire_confirmed, Some(false));
    }

    #[test]
    fn earliest_proceeds_take_the_earliest_eligible_wire() {
        let mut disposals = vec![
            disposal("2022-03-10", dec!(5000.00)),
            disposal("2022-03-12", dec!(5000.00)),
        ];
        let wires = vec![wire("2022-03-15", dec!(5000.00)), wire("2022-03-13", dec!(5000.00))];

        let mut diagnostics = Diagnostics::new();
        let unmatched = WireReconciler::new(WireMatchConfig::default()).reconcile(
            &mut disposals,
            &wires,
            &mut diagnostics,
        );
        assert!(unmatched.is_empty());
        assert_eq!(disposals[0].wire_confirmed, Some(true));
        assert_eq!(disposals[1].wire_confirmed, Some(true));
    }
}
