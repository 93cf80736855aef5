use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::brokers::Broker;
use crate::fx::Amount;
use crate::transactions::{TransactionEvent, TransactionSequence};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn deposit(date: &str, symbol: &str, qty: Decimal, price: Decimal, seq: u64) -> TransactionEvent {
    TransactionEvent::Deposit {
        date: d(date),
        symbol: symbol.to_string(),
        qty,
        purchase_price: Amount::new("USD", price, dec!(8.5)),
        purchase_date: None,
        description: "RS".to_string(),
        source: "test.json".to_string(),
        sequence: seq,
    }
}

fn sell(date: &str, symbol: &str, qty: Decimal, seq: u64) -> TransactionEvent {
    TransactionEvent::Sell {
        date: d(date),
        symbol: symbol.to_string(),
        qty,
        amount: Amount::new("USD", qty.abs() * dec!(50), dec!(9.0)),
        fee: None,
        description: String::new(),
        source: "test.json".to_string(),
        sequence: seq,
    }
}

fn transfer(date: &str, symbol: &str, qty: Decimal, seq: u64) -> TransactionEvent {
    TransactionEvent::Transfer {
        date: d(date),
        symbol: symbol.to_string(),
        qty,
        fee: None,
        source: "test.json".to_string(),
        sequence: seq,
    }
}

fn history(events: Vec<TransactionEvent>) -> TransactionSequence {
    TransactionSequence::from_events(events).unwrap()
}

#[test]
fn full_history_replays_into_prior_year_snapshot() {
    let input = ReconstructionInput::FullHistory {
        history: history(vec![
            deposit("2020-02-01", "CSCO", dec!(100), dec!(40), 1),
            sell("2020-08-01", "CSCO", dec!(-30), 2),
            deposit("2021-02-01", "CSCO", dec!(50), dec!(45), 3),
            // Tax-year events must not be replayed here.
            sell("2022-03-01", "CSCO", dec!(-120), 4),
        ]),
    };
    let holdings = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2022, Broker::Schwab)
        .unwrap();
    assert_eq!(holdings.year, 2021);
    assert_eq!(holdings.total_shares("CSCO"), dec!(120));
    // FIFO: the 2020 lot was reduced, the 2021 lot untouched.
    assert_eq!(holdings.stocks.len(), 2);
    assert_eq!(holdings.stocks[0].qty, dec!(70));
}

#[test]
fn reconstruction_is_deterministic() {
    let events = vec![
        deposit("2020-02-01", "CSCO", dec!(100), dec!(40), 1),
        deposit("2020-02-01", "CSCO", dec!(10), dec!(41), 2),
        sell("2021-08-01", "CSCO", dec!(-55), 3),
    ];
    let run = || {
        HoldingsReconstructor::new()
            .reconstruct_prior(
                ReconstructionInput::FullHistory {
                    history: history(events.clone()),
                },
                2022,
                Broker::Schwab,
            )
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn gap_in_history_is_an_incomplete_history_error() {
    let input = ReconstructionInput::FullHistory {
        history: history(vec![
            deposit("2021-02-01", "CSCO", dec!(10), dec!(40), 1),
            sell("2021-06-01", "CSCO", dec!(-25), 2),
        ]),
    };
    let err = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2022, Broker::Schwab)
        .unwrap_err();
    match err {
        ReconstructionError::IncompleteHistory { symbol, missing, .. } => {
            assert_eq!(symbol, "CSCO");
            assert_eq!(missing, dec!(15));
        }
        other => panic!("expected IncompleteHistory, got {other:?}"),
    }
}

#[test]
fn prior_holdings_seed_keeps_original_dates_and_bases() {
    let prior = Holdings {
        year: 2020,
        broker: Broker::Schwab,
        stocks: vec![StockHolding {
            symbol: "CSCO".to_string(),
            date: d("2018-05-15"),
            qty: dec!(40),
            purchase_price: Amount::new("USD", dec!(30), dec!(8.0)),
        }],
        cash: vec![],
    };
    let input = ReconstructionInput::PriorPlusIncremental {
        holdings: prior,
        incremental: history(vec![
            deposit("2021-02-01", "CSCO", dec!(20), dec!(45), 1),
            sell("2021-09-01", "CSCO", dec!(-10), 2),
        ]),
    };
    let holdings = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2022, Broker::Schwab)
        .unwrap();
    assert_eq!(holdings.total_shares("CSCO"), dec!(50));
    // FIFO took the 10 shares from the seeded 2018 lot.
    assert_eq!(holdings.stocks[0].date, d("2018-05-15"));
    assert_eq!(holdings.stocks[0].qty, dec!(30));
    assert_eq!(holdings.stocks[0].purchase_price.value, dec!(30));
}

#[test]
fn holdings_for_a_later_year_are_rejected() {
    let prior = Holdings {
        year: 2022,
        broker: Broker::Schwab,
        stocks: vec![],
        cash: vec![],
    };
    let err = HoldingsReconstructor::new()
        .reconstruct_prior(
            ReconstructionInput::PriorPlusIncremental {
                holdings: prior,
                incremental: history(vec![deposit("2021-02-01", "CSCO", dec!(10), dec!(40), 1)]),
            },
            2022,
            Broker::Schwab,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ReconstructionError::HoldingsYearMismatch {
            holdings_year: 2022,
            expected_year: 2021
        }
    ));
}

#[test]
fn anchor_mismatch_reports_delta_without_adjusting() {
    let input = ReconstructionInput::ExpectedBalanceAnchored {
        history: history(vec![
            deposit("2021-02-01", "CSCO", dec!(100), dec!(40), 1),
            sell("2021-06-01", "CSCO", dec!(-52), 2),
        ]),
        expected: ExpectedBalance {
            symbol: "CSCO".to_string(),
            qty: dec!(50),
        },
    };
    let err = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2023, Broker::Schwab)
        .unwrap_err();
    match err {
        ReconstructionError::BalanceMismatch {
            expected,
            reconstructed,
            delta,
            reference_date,
            ..
        } => {
            assert_eq!(expected, dec!(50));
            assert_eq!(reconstructed, dec!(48));
            assert_eq!(delta, dec!(-2));
            assert_eq!(reference_date, d("2022-12-31"));
        }
        other => panic!("expected BalanceMismatch, got {other:?}"),
    }
}

#[test]
fn anchor_match_passes_through() {
    let input = ReconstructionInput::ExpectedBalanceAnchored {
        history: history(vec![
            deposit("2021-02-01", "CSCO", dec!(100), dec!(40), 1),
            sell("2021-06-01", "CSCO", dec!(-50), 2),
        ]),
        expected: ExpectedBalance {
            symbol: "CSCO".to_string(),
            qty: dec!(50),
        },
    };
    let holdings = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2023, Broker::Schwab)
        .unwrap();
    assert_eq!(holdings.total_shares("CSCO"), dec!(50));
}

#[test]
fn authoritative_file_books_incoming_transfers_at_zero_basis() {
    let input = ReconstructionInput::SingleFileAuthoritative {
        broker: Broker::Morgan,
        history: history(vec![
            transfer("2019-03-01", "CSCO", dec!(25), 1),
            deposit("2021-02-01", "CSCO", dec!(10), dec!(45), 2),
        ]),
    };
    let holdings = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2022, Broker::Morgan)
        .unwrap();
    assert_eq!(holdings.total_shares("CSCO"), dec!(35));
    assert_eq!(holdings.stocks[0].purchase_price.value, Decimal::ZERO);
}

#[test]
fn strict_replay_ignores_incoming_transfers() {
    let input = ReconstructionInput::FullHistory {
        history: history(vec![
            transfer("2019-03-01", "CSCO", dec!(25), 1),
            deposit("2021-02-01", "CSCO", dec!(10), dec!(45), 2),
        ]),
    };
    let holdings = HoldingsReconstructor::new()
        .reconstruct_prior(input, 2022, Broker::Schwab)
        .unwrap();
    assert_eq!(holdings.total_shares("CSCO"), dec!(10));
}
