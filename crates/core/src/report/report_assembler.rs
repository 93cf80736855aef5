use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::report_model::{
    AcquisitionEntry, CashLedgerLine, DividendSummary, EoyBalanceItem, SecuritySummary, TaxReport,
    TaxSummary,
};
use crate::brokers::Broker;
use crate::cash::CashSummary;
use crate::constants::DECIMAL_PRECISION;
use crate::diagnostics::Diagnostics;
use crate::disposals::{Disposal, DisposalException};
use crate::errors::Result;
use crate::fx::{Amount, RateProvider};
use crate::holdings::{Holdings, LotLedger};
use crate::transactions::TransactionEvent;
use crate::wires::UnmatchedWire;

/// Everything the assembler needs from the earlier pipeline stages.
pub struct ReportParts {
    pub year: i32,
    pub broker: Broker,
    pub prior_holdings: Holdings,
    pub final_ledger: LotLedger,
    pub year_events: Vec<TransactionEvent>,
    pub disposals: Vec<Disposal>,
    pub exceptions: Vec<DisposalException>,
    pub cash_summary: CashSummary,
    pub cash_ledger: Vec<CashLedgerLine>,
    pub unmatched_wires: Vec<UnmatchedWire>,
    /// Per-unit year-end market prices in trading currency, keyed by symbol.
    pub year_end_prices: BTreeMap<String, Decimal>,
    /// Same, for December 31 of the previous year.
    pub prior_year_end_prices: BTreeMap<String, Decimal>,
}

/// Folds disposals, income and balances into the report and summary pair.
/// Pure aggregation: every figure is computed upstream, this stage only
/// arranges and totals them.
pub struct ReportAssembler<'a> {
    rates: &'a dyn RateProvider,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(rates: &'a dyn RateProvider) -> Self {
        ReportAssembler { rates }
    }

    pub fn assemble(
        &self,
        parts: ReportParts,
        diagnostics: &mut Diagnostics,
    ) -> Result<(TaxReport, TaxSummary)> {
        let dividends = aggregate_dividends(&parts.year_events);
        let buys = acquisition_entries(&parts.year_events);

        let eoy_balance_previous = self.balance_from_holdings(
            &parts.prior_holdings,
            parts.year - 1,
            &parts.prior_year_end_prices,
            diagnostics,
        )?;
        let eoy_holdings = Holdings::from_ledger(
            parts.year,
            parts.broker,
            &parts.final_ledger,
            parts.cash_summary.holdings.clone(),
        );
        let eoy_balance = self.balance_from_holdings(
            &eoy_holdings,
            parts.year,
            &parts.year_end_prices,
            diagnostics,
        )?;

        let mut sales: BTreeMap<String, Vec<Disposal>> = BTreeMap::new();
        for disposal in parts.disposals {
            sales.entry(disposal.symbol.clone()).or_default().push(disposal);
        }

        let complete = parts.exceptions.is_empty();
        if !complete {
            diagnostics.warn(format!(
                "{} disposal(s) could not be settled; the report is incomplete",
                parts.exceptions.len()
            ));
        }

        let securities = security_summaries(&eoy_balance, &sales, &dividends);
        let total_gain = securities
            .iter()
            .map(|s| s.taxable_gain)
            .sum::<Decimal>()
            .round_dp(DECIMAL_PRECISION);
        let total_dividend = securities
            .iter()
            .map(|s| s.dividend)
            .sum::<Decimal>()
            .round_dp(DECIMAL_PRECISION);

        let summary = TaxSummary {
            year: parts.year,
            securities,
            total_gain,
            total_dividend,
            cash: parts.cash_summary,
        };

        let prev_holdings = if parts.prior_holdings.stocks.is_empty() {
            None
        } else {
            Some(parts.prior_holdings)
        };

        let report = TaxReport {
            year: parts.year,
            broker: parts.broker,
            eoy_balance_previous,
            eoy_balance,
            buys,
            sales,
            dividends,
            cash_ledger: parts.cash_ledger,
            unmatched_wires: parts.unmatched_wires,
            exceptions: parts.exceptions,
            prev_holdings,
            complete,
        };

        Ok((report, summary))
    }

    /// Values each position at the year boundary: quantity times the
    /// year-end price when one is supplied, otherwise the accumulated cost
    /// basis with a diagnostic so the gap is visible.
    fn balance_from_holdings(
        &self,
        holdings: &Holdings,
        year: i32,
        year_end_prices: &BTreeMap<String, Decimal>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EoyBalanceItem>> {
        let eoy = NaiveDate::from_ymd_opt(year, 12, 31).expect("valid year-end date");
        let mut per_symbol: BTreeMap<String, (Decimal, Decimal, String)> = BTreeMap::new();
        for stock in &holdings.stocks {
            let entry = per_symbol
                .entry(stock.symbol.clone())
                .or_insert_with(|| (Decimal::ZERO, Decimal::ZERO, stock.purchase_price.currency.clone()));
            entry.0 += stock.qty;
            entry.1 += stock.purchase_price.reporting_value * stock.qty;
        }

        let mut items = Vec::new();
        for (symbol, (qty, basis_reporting, currency)) in per_symbol {
            let (fmv, amount) = match year_end_prices.get(&symbol) {
                Some(price) => {
                    let amount = self.rates.amount(&currency, qty * price, eoy)?;
                    (Some(*price), amount.rounded())
                }
                None => {
                    diagnostics.info(format!(
                        "No year-end {} price for {}; balance valued at cost basis",
                        year, symbol
                    ));
                    let mut amount = Amount::zero(currency.as_str());
                    amount.reporting_value = basis_reporting.round_dp(DECIMAL_PRECISION);
                    (None, amount)
                }
            };
            items.push(EoyBalanceItem {
                symbol,
                qty,
                fmv,
                amount,
            });
        }
        Ok(items)
    }
}

fn aggregate_dividends(events: &[TransactionEvent]) -> Vec<DividendSummary> {
    let mut gross: BTreeMap<String, Amount> = BTreeMap::new();
    let mut tax: BTreeMap<String, Amount> = BTreeMap::new();
    for event in events {
        match event {
            TransactionEvent::Dividend { symbol, amount, .. } => {
                gross
                    .entry(symbol.clone())
                    .and_modify(|a| *a = a.plus(amount))
                    .or_insert_with(|| amount.clone());
            }
            TransactionEvent::Tax { symbol, amount, .. } => {
                tax.entry(symbol.clone())
                    .and_modify(|a| *a = a.plus(amount))
                    .or_insert_with(|| amount.clone());
            }
            TransactionEvent::TaxRepayment { symbol, amount, .. } => {
                tax.entry(symbol.clone())
                    .and_modify(|a| *a = a.plus(amount))
                    .or_insert_with(|| amount.clone());
            }
            _ => {}
        }
    }

    gross
        .into_iter()
        .map(|(symbol, gross)| {
            let tax = tax
                .remove(&symbol)
                .unwrap_or_else(|| Amount::zero(gross.currency.as_str()));
            let net_reporting =
                (gross.reporting_value + tax.reporting_value).round_dp(DECIMAL_PRECISION);
            DividendSummary {
                symbol,
                gross: gross.rounded(),
                tax: tax.rounded(),
                net_reporting,
            }
        })
        .collect()
}

fn acquisition_entries(events: &[TransactionEvent]) -> Vec<AcquisitionEntry> {
    events
        .iter()
        .filter_map(|event| match event {
            TransactionEvent::Deposit {
                date,
                symbol,
                qty,
                purchase_price,
                purchase_date,
                ..
            } => Some(AcquisitionEntry {
                date: purchase_date.unwrap_or(*date),
                symbol: symbol.clone(),
                qty: *qty,
                purchase_price: purchase_price.clone(),
            }),
            TransactionEvent::Buy {
                date,
                symbol,
                qty,
                purchase_price,
                ..
            } => Some(AcquisitionEntry {
                date: *date,
                symbol: symbol.clone(),
                qty: *qty,
                purchase_price: purchase_price.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// One summary row per security that was held at year end, sold during the
/// year, or paid a dividend.
fn security_summaries(
    eoy_balance: &[EoyBalanceItem],
    sales: &BTreeMap<String, Vec<Disposal>>,
    dividends: &[DividendSummary],
) -> Vec<SecuritySummary> {
    let mut symbols: Vec<&str> = eoy_balance
        .iter()
        .map(|e| e.symbol.as_str())
        .chain(sales.keys().map(|s| s.as_str()))
        .chain(dividends.iter().map(|d| d.symbol.as_str()))
        .collect();
    symbols.sort_unstable();
    symbols.dedup();

    symbols
        .into_iter()
        .map(|symbol| {
            let balance = eoy_balance.iter().find(|e| e.symbol == symbol);
            let symbol_sales = sales.get(symbol);
            let dividend = dividends.iter().find(|d| d.symbol == symbol);
            SecuritySummary {
                symbol: symbol.to_string(),
                shares: balance.map(|b| b.qty).unwrap_or(Decimal::ZERO),
                wealth: balance
                    .map(|b| b.amount.reporting_value.round_dp(0))
                    .unwrap_or(Decimal::ZERO),
                dividend: dividend
                    .map(|d| d.gross.reporting_value.round_dp(0))
                    .unwrap_or(Decimal::ZERO),
                taxable_gain: symbol_sales
                    .map(|s| s.iter().map(|d| d.gain_reporting).sum::<Decimal>().round_dp(0))
                    .unwrap_or(Decimal::ZERO),
                sale_count: symbol_sales.map(|s| s.len()).unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::StaticRates;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal, rate: Decimal) -> Amount {
        Amount::new("USD", value, rate)
    }

    #[test]
    fn dividends_aggregate_per_symbol_with_withholding() {
        let events = vec![
            TransactionEvent::Dividend {
                date: "2022-04-01".parse().unwrap(),
                symbol: "CSCO".to_string(),
                amount: amount(dec!(100), dec!(9)),
                source: "t".to_string(),
                sequence: 1,
            },
            TransactionEvent::Tax {
                date: "2022-04-01".parse().unwrap(),
                symbol: "CSCO".to_string(),
                amount: amount(dec!(-15), dec!(9)),
                description: "withholding".to_string(),
                source: "t".to_string(),
                sequence: 2,
            },
            TransactionEvent::Dividend {
                date: "2022-07-01".parse().unwrap(),
                symbol: "CSCO".to_string(),
                amount: amount(dec!(100), dec!(10)),
                source: "t".to_string(),
                sequence: 3,
            },
        ];
        let dividends = aggregate_dividends(&events);
        assert_eq!(dividends.len(), 1);
        assert_eq!(dividends[0].gross.value, dec!(200));
        // 100*9 + 100*10 gross, minus 15*9 withheld.
        assert_eq!(dividends[0].gross.reporting_value, dec!(1900));
        assert_eq!(dividends[0].net_reporting, dec!(1765));
    }

    #[test]
    fn missing_year_end_price_falls_back_to_cost_basis() {
        let rates =
            StaticRates::with_flat_rate("NOK", "USD", dec!(10), "2022-01-01".parse().unwrap(), "2022-12-31".parse().unwrap());
        let assembler = ReportAssembler::new(&rates);
        let holdings = Holdings {
            year: 2022,
            broker: Broker::Schwab,
            stocks: vec![crate::holdings::StockHolding {
                symbol: "CSCO".to_string(),
                date: "2020-01-01".parse().unwrap(),
                qty: dec!(10),
                purchase_price: amount(dec!(40), dec!(8)),
            }],
            cash: vec![],
        };
        let mut diagnostics = Diagnostics::new();
        let items = assembler
            .balance_from_holdings(&holdings, 2022, &BTreeMap::new(), &mut diagnostics)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fmv, None);
        assert_eq!(items[0].amount.reporting_value, dec!(3200));
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn year_end_price_values_the_position_at_the_boundary_rate() {
        let rates =
            StaticRates::with_flat_rate("NOK", "USD", dec!(10), "2022-01-01".parse().unwrap(), "2022-12-31".parse().unwrap());
        let assembler = ReportAssembler::new(&rates);
        let holdings = Holdings {
            year: 2022,
            broker: Broker::Schwab,
            stocks: vec![crate::holdings::StockHolding {
                symbol: "CSCO".to_string(),
                date: "2020-01-01".parse().unwrap(),
                qty: dec!(10),
                purchase_price: amount(dec!(40), dec!(8)),
            }],
            cash: vec![],
        };
        let mut prices = BTreeMap::new();
        prices.insert("CSCO".to_string(), dec!(47.5));
        let mut diagnostics = Diagnostics::new();
        let items = assembler
            .balance_from_holdings(&holdings, 2022, &prices, &mut diagnostics)
            .unwrap();
        assert_eq!(items[0].fmv, Some(dec!(47.5)));
        assert_eq!(items[0].amount.value, dec!(475.0));
        assert_eq!(items[0].amount.reporting_value, dec!(4750.0));
    }
}
