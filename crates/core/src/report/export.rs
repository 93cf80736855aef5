use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

use super::report_model::{ExportArtifact, TaxReport, TaxSummary};
use crate::errors::{Error, Result};
use crate::holdings::Holdings;

/// Builds the artifact set for one run. The set and its presence conditions
/// are contract: holdings, portfolio table and report are always present,
/// the unmatched-wires file only exists when there is something to review.
pub fn build_artifacts(
    report: &TaxReport,
    holdings: &Holdings,
    summary: &TaxSummary,
) -> Result<Vec<ExportArtifact>> {
    let year = report.year;
    let mut artifacts = vec![
        ExportArtifact {
            name: format!("holdings-{}.json", year),
            bytes: serde_json::to_vec_pretty(holdings)?,
        },
        ExportArtifact {
            name: format!("portfolio-{}.csv", year),
            bytes: portfolio_csv(holdings)?,
        },
        ExportArtifact {
            name: format!("tax-report-{}.json", year),
            bytes: serde_json::to_vec_pretty(report)?,
        },
        ExportArtifact {
            name: format!("tax-summary-{}.json", year),
            bytes: serde_json::to_vec_pretty(summary)?,
        },
    ];
    if !report.unmatched_wires.is_empty() {
        artifacts.push(ExportArtifact {
            name: format!("unmatched-wires-{}.json", year),
            bytes: serde_json::to_vec_pretty(&report.unmatched_wires)?,
        });
    }
    Ok(artifacts)
}

/// Tabular view of the year-end positions, one row per lot.
fn portfolio_csv(holdings: &Holdings) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "symbol",
        "acquired",
        "qty",
        "price",
        "currency",
        "costBasisReporting",
    ])?;
    for stock in &holdings.stocks {
        writer.write_record([
            stock.symbol.clone(),
            stock.date.to_string(),
            stock.qty.to_string(),
            stock.purchase_price.value.to_string(),
            stock.purchase_price.currency.clone(),
            (stock.purchase_price.reporting_value * stock.qty).to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))
}

/// Packs the artifacts into a single zip container for download.
pub fn zip_artifacts(artifacts: &[ExportArtifact]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for artifact in artifacts {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(artifact.name.clone(), options)?;
        zip.write_all(&artifact.bytes)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::Broker;
    use crate::cash::CashSummary;
    use crate::fx::Amount;
    use crate::holdings::StockHolding;
    use crate::wires::UnmatchedWire;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn fixture() -> (TaxReport, Holdings, TaxSummary) {
        let holdings = Holdings {
            year: 2022,
            broker: Broker::Schwab,
            stocks: vec![StockHolding {
                symbol: "CSCO".to_string(),
                date: "2020-01-01".parse().unwrap(),
                qty: dec!(10),
                purchase_price: Amount::new("USD", dec!(40), dec!(8)),
            }],
            cash: vec![],
        };
        let report = TaxReport {
            year: 2022,
            broker: Broker::Schwab,
            eoy_balance_previous: vec![],
            eoy_balance: vec![],
            buys: vec![],
            sales: BTreeMap::new(),
            dividends: vec![],
            cash_ledger: vec![],
            unmatched_wires: vec![],
            exceptions: vec![],
            prev_holdings: None,
            complete: true,
        };
        let summary = TaxSummary {
            year: 2022,
            securities: vec![],
            total_gain: Decimal::ZERO,
            total_dividend: Decimal::ZERO,
            cash: CashSummary {
                transfers: vec![],
                remaining_cash: Amount::zero("USD"),
                holdings: vec![],
                gain: Decimal::ZERO,
            },
        };
        (report, holdings, summary)
    }

    #[test]
    fn wires_artifact_only_present_when_wires_unmatched() {
        let (mut report, holdings, summary) = fixture();

        let names: Vec<String> = build_artifacts(&report, &holdings, &summary)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert!(!names.iter().any(|n| n.starts_with("unmatched-wires")));

        report.unmatched_wires.push(UnmatchedWire {
            date: "2022-09-01".parse().unwrap(),
            currency: "USD".to_string(),
            value: dec!(10000),
            reporting_value: None,
        });
        let names: Vec<String> = build_artifacts(&report, &holdings, &summary)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert!(names.contains(&"unmatched-wires-2022.json".to_string()));
    }

    #[test]
    fn portfolio_csv_lists_each_lot() {
        let (_, holdings, _) = fixture();
        let bytes = portfolio_csv(&holdings).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "symbol,acquired,qty,price,currency,costBasisReporting"
        );
        assert_eq!(lines.next().unwrap(), "CSCO,2020-01-01,10,40,USD,3200");
    }

    #[test]
    fn zip_container_holds_every_artifact() {
        let (report, holdings, summary) = fixture();
        let artifacts = build_artifacts(&report, &holdings, &summary).unwrap();
        let bytes = zip_artifacts(&artifacts).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), artifacts.len());
        for artifact in &artifacts {
            assert!(archive.by_name(&artifact.name).is_ok());
        }
    }
}
