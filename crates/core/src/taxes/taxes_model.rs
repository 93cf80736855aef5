use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::brokers::Broker;
use crate::holdings::ReconstructionInput;
use crate::wires::{WireMatchConfig, WireRecord};

/// One complete request: everything the caller has for a broker and a year.
///
/// The reconstruction variant doubles as the strategy selection: the caller
/// builds the variant matching the inputs it actually has, and the engine
/// never inspects shapes at runtime.
pub struct TaxYearInput {
    /// Target tax year.
    pub year: i32,
    pub broker: Broker,
    pub reconstruction: ReconstructionInput,
    /// Bank-side wire records for reconciliation; may be empty.
    pub wires: Vec<WireRecord>,
    /// Per-unit year-end market prices in trading currency, keyed by
    /// symbol. Used only to value end-of-year balances.
    pub year_end_prices: BTreeMap<String, Decimal>,
    /// Same, for December 31 of the previous year.
    pub prior_year_end_prices: BTreeMap<String, Decimal>,
    /// Overrides the broker-derived wire matching defaults when set.
    pub wire_config: Option<WireMatchConfig>,
}

impl TaxYearInput {
    pub fn new(year: i32, broker: Broker, reconstruction: ReconstructionInput) -> Self {
        TaxYearInput {
            year,
            broker,
            reconstruction,
            wires: Vec::new(),
            year_end_prices: BTreeMap::new(),
            prior_year_end_prices: BTreeMap::new(),
            wire_config: None,
        }
    }

    pub fn with_wires(mut self, wires: Vec<WireRecord>) -> Self {
        self.wires = wires;
        self
    }

    pub fn with_year_end_prices(mut self, prices: BTreeMap<String, Decimal>) -> Self {
        self.year_end_prices = prices;
        self
    }

    pub fn with_prior_year_end_prices(mut self, prices: BTreeMap<String, Decimal>) -> Self {
        self.prior_year_end_prices = prices;
        self
    }

    pub fn with_wire_config(mut self, config: WireMatchConfig) -> Self {
        self.wire_config = Some(config);
        self
    }
}
