use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::fx_errors::{FxError, Result};
use super::fx_model::Amount;
use crate::constants::RATE_BACKTRACK_DAYS;

/// Source of already-resolved exchange rates into the reporting currency.
///
/// The engine never fetches market data itself; the boundary layer hands in
/// an implementation backed by whatever it has (a rates file, a database, a
/// remote feed warmed up beforehand). Implementations must be safe for
/// concurrent reads since independent runs share one provider.
pub trait RateProvider: Send + Sync {
    /// Currency all gains and summaries are expressed in.
    fn reporting_currency(&self) -> &str;

    /// Rate from `currency` into the reporting currency on `date`.
    fn rate(&self, currency: &str, date: NaiveDate) -> Result<Decimal>;

    /// Convenience: build an [`Amount`] valued at `date`'s rate.
    fn amount(&self, currency: &str, value: Decimal, date: NaiveDate) -> Result<Amount> {
        let rate = self.rate(currency, date)?;
        Ok(Amount::new(currency, value, rate))
    }
}

/// In-memory rate table keyed by currency and date.
///
/// Quoted dates are business days; lookups walk back over weekends and
/// holidays the same bounded number of days the upstream rate sources do.
#[derive(Default)]
pub struct StaticRates {
    reporting_currency: String,
    rates: HashMap<String, HashMap<NaiveDate, Decimal>>,
}

impl StaticRates {
    pub fn new(reporting_currency: impl Into<String>) -> Self {
        StaticRates {
            reporting_currency: reporting_currency.into(),
            rates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, currency: impl Into<String>, date: NaiveDate, rate: Decimal) {
        self.rates.entry(currency.into()).or_default().insert(date, rate);
    }

    /// Convenience for tests and fixtures: one flat rate for every date.
    pub fn with_flat_rate(
        reporting_currency: impl Into<String>,
        currency: impl Into<String>,
        rate: Decimal,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Self {
        let mut rates = StaticRates::new(reporting_currency);
        let currency = currency.into();
        let mut d = from;
        while d <= to {
            rates.insert(currency.clone(), d, rate);
            d = d.checked_add_days(Days::new(1)).expect("date overflow");
        }
        rates
    }
}

impl RateProvider for StaticRates {
    fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    fn rate(&self, currency: &str, date: NaiveDate) -> Result<Decimal> {
        if currency == self.reporting_currency {
            return Ok(Decimal::ONE);
        }
        let table = self
            .rates
            .get(currency)
            .ok_or_else(|| FxError::RateNotFound {
                currency: currency.to_string(),
                date,
            })?;
        let mut lookup = date;
        for _ in 0..=RATE_BACKTRACK_DAYS {
            if let Some(rate) = table.get(&lookup) {
                return Ok(*rate);
            }
            lookup = lookup
                .checked_sub_days(Days::new(1))
                .ok_or(FxError::RateNotFound {
                    currency: currency.to_string(),
                    date,
                })?;
        }
        Err(FxError::RateNotFound {
            currency: currency.to_string(),
            date,
        })
    }
}

/// Process-wide caching decorator around a [`RateProvider`].
///
/// The cache is the only process-wide mutable state in the engine: reads are
/// lock-free and concurrent, population happens entry-at-a-time so a run can
/// never observe a half-written rate for a date it needs.
pub struct CachedRateProvider<P> {
    inner: P,
    cache: DashMap<(String, NaiveDate), Decimal>,
}

impl<P: RateProvider> CachedRateProvider<P> {
    pub fn new(inner: P) -> Self {
        CachedRateProvider {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Warm the cache for a currency over a date range so concurrent runs
    /// start with every rate they need already resident.
    pub fn preheat(&self, currency: &str, from: NaiveDate, to: NaiveDate) {
        let mut d = from;
        while d <= to {
            // The range may span holidays with no quote; skip those.
            if let Ok(rate) = self.inner.rate(currency, d) {
                self.cache.insert((currency.to_string(), d), rate);
            }
            d = d.checked_add_days(Days::new(1)).expect("date overflow");
        }
        debug!("Preheated {} rates from {} to {}", currency, from, to);
    }
}

impl<P: RateProvider> RateProvider for CachedRateProvider<P> {
    fn reporting_currency(&self) -> &str {
        self.inner.reporting_currency()
    }

    fn rate(&self, currency: &str, date: NaiveDate) -> Result<Decimal> {
        let key = (currency.to_string(), date);
        if let Some(rate) = self.cache.get(&key) {
            return Ok(*rate);
        }
        let rate = self.inner.rate(currency, date)?;
        self.cache.insert(key, rate);
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn reporting_currency_rate_is_one() {
        let rates = StaticRates::new("NOK");
        assert_eq!(rates.rate("NOK", d("2022-06-01")).unwrap(), Decimal::ONE);
    }

    #[test]
    fn lookup_walks_back_over_a_weekend() {
        let mut rates = StaticRates::new("NOK");
        // Friday quote only
        rates.insert("USD", d("2022-03-04"), dec!(8.90));
        assert_eq!(rates.rate("USD", d("2022-03-06")).unwrap(), dec!(8.90));
    }

    #[test]
    fn lookup_gives_up_after_backtrack_limit() {
        let mut rates = StaticRates::new("NOK");
        rates.insert("USD", d("2022-03-04"), dec!(8.90));
        let err = rates.rate("USD", d("2022-03-20")).unwrap_err();
        assert!(matches!(err, FxError::RateNotFound { .. }));
    }

    #[test]
    fn cached_provider_serves_from_cache() {
        let mut rates = StaticRates::new("NOK");
        rates.insert("USD", d("2022-03-04"), dec!(8.90));
        let cached = CachedRateProvider::new(rates);
        assert_eq!(cached.rate("USD", d("2022-03-04")).unwrap(), dec!(8.90));
        // Second read hits the cache path.
        assert_eq!(cached.rate("USD", d("2022-03-04")).unwrap(), dec!(8.90));
    }
}
