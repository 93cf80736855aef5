use log::debug;

use super::taxes_model::TaxYearInput;
use crate::cash::CashLedger;
use crate::diagnostics::Diagnostics;
use crate::disposals::{Disposal, DisposalException, DisposalMatcher};
use crate::errors::Result;
use crate::fx::RateProvider;
use crate::holdings::{Holdings, HoldingsReconstructor, Lot};
use crate::report::{CashLedgerLine, ReportAssembler, ReportParts, TaxReportOutcome};
use crate::transactions::TransactionEvent;
use crate::wires::{WireMatchConfig, WireReconciler};

/// Runs one reconstruction-plus-report request end to end.
///
/// The whole computation is synchronous and owns its state exclusively;
/// concurrent requests only share the (read-safe) rate provider. Failures
/// carry enough context for the boundary layer to message the user, and the
/// engine never retries anything by itself.
pub fn generate_tax_report(
    input: TaxYearInput,
    rates: &dyn RateProvider,
) -> Result<TaxReportOutcome> {
    let mut diagnostics = Diagnostics::new();
    let year = input.year;
    let broker = input.broker;

    let year_events = input.reconstruction.history().for_year(year);

    // Phase 1: rebuild what was held when the tax year opened.
    let prior_holdings =
        HoldingsReconstructor::new().reconstruct_prior(input.reconstruction, year, broker)?;
    diagnostics.info(format!(
        "Opening balance for {}: {} lot(s) across {} event(s) this year",
        year,
        prior_holdings.stocks.len(),
        year_events.len()
    ));

    // Phase 2: replay the tax year, settling each sale as it occurs.
    let mut ledger = prior_holdings.to_ledger();
    let mut cash = CashLedger::with_opening_balance(year, prior_holdings.cash.clone());
    let matcher = DisposalMatcher::new();
    let mut disposals: Vec<Disposal> = Vec::new();
    let mut exceptions: Vec<DisposalException> = Vec::new();

    for event in &year_events {
        match event {
            TransactionEvent::Deposit {
                date,
                symbol,
                qty,
                purchase_price,
                purchase_date,
                sequence,
                ..
            } => {
                ledger.position_mut_or_default(symbol).add_lot(Lot {
                    sequence: *sequence,
                    acquisition_date: purchase_date.unwrap_or(*date),
                    quantity: *qty,
                    purchase_price: purchase_price.clone(),
                });
            }
            TransactionEvent::Buy {
                date,
                symbol,
                qty,
                purchase_price,
                sequence,
                ..
            } => {
                ledger.position_mut_or_default(symbol).add_lot(Lot {
                    sequence: *sequence,
                    acquisition_date: *date,
                    quantity: *qty,
                    purchase_price: purchase_price.clone(),
                });
                cash.credit(*date, purchase_price.times(*qty).negated(), "buy", false)?;
            }
            TransactionEvent::Sell { date, amount, .. } => {
                match matcher.match_sale(&mut ledger, event) {
                    Ok(disposal) => {
                        cash.debit(*date, amount.clone(), "sale")?;
                        disposals.push(disposal);
                    }
                    Err(err) => {
                        diagnostics.warn(err.to_string());
                        if let Some(exception) = err.to_exception() {
                            exceptions.push(exception);
                        }
                    }
                }
            }
            TransactionEvent::Transfer {
                date, symbol, qty, fee, ..
            } => {
                if qty.is_sign_negative() {
                    match matcher.match_transfer_out(&mut ledger, symbol, qty.abs(), *date) {
                        Ok(_) => {}
                        Err(err) => {
                            diagnostics.warn(err.to_string());
                            if let Some(exception) = err.to_exception() {
                                exceptions.push(exception);
                            }
                        }
                    }
                } else {
                    diagnostics.warn(format!(
                        "Incoming transfer of {} {} on {} carries no basis; ignored",
                        qty, symbol, date
                    ));
                }
                if let Some(fee) = fee {
                    cash.credit(*date, fee.clone(), "transfer fee", false)?;
                }
            }
            TransactionEvent::Dividend { date, amount, .. } => {
                cash.debit(*date, amount.clone(), "dividend")?;
            }
            TransactionEvent::DividendReinvest { date, amount, .. } => {
                cash.credit(*date, amount.clone(), "dividend reinvest", false)?;
            }
            TransactionEvent::Tax { date, amount, .. } => {
                cash.credit(*date, amount.clone(), "tax withheld", false)?;
            }
            TransactionEvent::TaxRepayment { date, amount, .. } => {
                cash.debit(*date, amount.clone(), "tax repayment")?;
            }
            TransactionEvent::Wire {
                date, amount, fee, ..
            } => {
                cash.credit(*date, amount.clone(), "wire", true)?;
                if let Some(fee) = fee {
                    cash.credit(*date, fee.clone(), "wire fee", false)?;
                }
            }
            TransactionEvent::Fee { date, amount, .. } => {
                cash.credit(*date, amount.clone(), "fee", false)?;
            }
            TransactionEvent::CashAdjust {
                date,
                amount,
                description,
                ..
            } => {
                if amount.value.is_sign_negative() {
                    cash.credit(*date, amount.clone(), description.clone(), false)?;
                } else {
                    cash.debit(*date, amount.clone(), description.clone())?;
                }
            }
        }
    }
    debug!(
        "Year {} replay done: {} disposal(s), {} exception(s)",
        year,
        disposals.len(),
        exceptions.len()
    );

    // Phase 3: reconcile proceeds against the bank's wire records.
    let wire_config = input
        .wire_config
        .unwrap_or_else(|| WireMatchConfig::for_broker(broker));
    let unmatched_wires =
        WireReconciler::new(wire_config).reconcile(&mut disposals, &input.wires, &mut diagnostics);

    // Phase 4: close the cash account and assemble the report.
    let cash_summary = cash.process(rates, &mut diagnostics)?;
    let cash_ledger: Vec<CashLedgerLine> = cash
        .ledger()
        .into_iter()
        .map(|(entry, balance)| CashLedgerLine { entry, balance })
        .collect();

    ledger.prune_insignificant();
    let holdings = Holdings::from_ledger(year, broker, &ledger, cash_summary.holdings.clone());

    let (report, summary) = ReportAssembler::new(rates).assemble(
        ReportParts {
            year,
            broker,
            prior_holdings,
            final_ledger: ledger,
            year_events,
            disposals,
            exceptions,
            cash_summary,
            cash_ledger,
            unmatched_wires: unmatched_wires.clone(),
            year_end_prices: input.year_end_prices,
            prior_year_end_prices: input.prior_year_end_prices,
        },
        &mut diagnostics,
    )?;

    Ok(TaxReportOutcome {
        report,
        holdings,
        summary,
        unmatched_wires,
        diagnostics: diagnostics.into_entries(),
    })
}
