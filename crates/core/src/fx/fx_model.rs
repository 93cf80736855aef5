use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DECIMAL_PRECISION;

/// A monetary value in its trading currency together with its
/// reporting-currency valuation, fixed at the rate of one specific date.
///
/// The valuation never changes after construction: cost basis keeps the
/// acquisition-date rate, proceeds keep the sale-date rate. Re-pricing an
/// `Amount` later would silently rewrite history, so there is no API for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub currency: String,
    pub value: Decimal,
    /// Rate from `currency` into the reporting currency on the valuation date.
    pub reporting_rate: Decimal,
    pub reporting_value: Decimal,
}

impl Amount {
    /// Builds an amount from a value and a resolved rate; the reporting value
    /// is derived, not supplied, so the three fields cannot drift apart.
    pub fn new(currency: impl Into<String>, value: Decimal, reporting_rate: Decimal) -> Self {
        Amount {
            currency: currency.into(),
            value,
            reporting_rate,
            reporting_value: value * reporting_rate,
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Amount {
            currency: currency.into(),
            value: Decimal::ZERO,
            reporting_rate: Decimal::ZERO,
            reporting_value: Decimal::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero() && self.reporting_value.is_zero()
    }

    /// Scales both legs by a quantity (per-unit price -> lot total).
    pub fn times(&self, qty: Decimal) -> Amount {
        Amount {
            currency: self.currency.clone(),
            value: self.value * qty,
            reporting_rate: self.reporting_rate,
            reporting_value: self.reporting_value * qty,
        }
    }

    /// Adds another amount leg-wise. The reporting values are the
    /// authoritative side of the sum; a currency mismatch is tolerated for
    /// the trading leg but flagged since the summed `value` is then mixed.
    pub fn plus(&self, other: &Amount) -> Amount {
        if self.currency != other.currency && !other.value.is_zero() {
            warn!(
                "Summing amounts in different currencies: {} + {}",
                self.currency, other.currency
            );
        }
        Amount {
            currency: self.currency.clone(),
            value: self.value + other.value,
            reporting_rate: self.reporting_rate,
            reporting_value: self.reporting_value + other.reporting_value,
        }
    }

    pub fn minus(&self, other: &Amount) -> Amount {
        self.plus(&other.negated())
    }

    pub fn negated(&self) -> Amount {
        Amount {
            currency: self.currency.clone(),
            value: -self.value,
            reporting_rate: self.reporting_rate,
            reporting_value: -self.reporting_value,
        }
    }

    pub fn abs(&self) -> Amount {
        Amount {
            currency: self.currency.clone(),
            value: self.value.abs(),
            reporting_rate: self.reporting_rate,
            reporting_value: self.reporting_value.abs(),
        }
    }

    /// Rounded copy for report output.
    pub fn rounded(&self) -> Amount {
        Amount {
            currency: self.currency.clone(),
            value: self.value.round_dp(DECIMAL_PRECISION),
            reporting_rate: self.reporting_rate,
            reporting_value: self.reporting_value.round_dp(DECIMAL_PRECISION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reporting_value_is_derived_from_rate() {
        let a = Amount::new("USD", dec!(100), dec!(10.5));
        assert_eq!(a.reporting_value, dec!(1050.0));
    }

    #[test]
    fn times_scales_both_legs() {
        let unit = Amount::new("USD", dec!(25), dec!(8));
        let lot = unit.times(dec!(4));
        assert_eq!(lot.value, dec!(100));
        assert_eq!(lot.reporting_value, dec!(800));
    }

    #[test]
    fn minus_keeps_leg_arithmetic_consistent() {
        let proceeds = Amount::new("USD", dec!(150), dec!(10));
        let basis = Amount::new("USD", dec!(100), dec!(9));
        let gain = proceeds.minus(&basis);
        assert_eq!(gain.value, dec!(50));
        assert_eq!(gain.reporting_value, dec!(600));
    }
}
