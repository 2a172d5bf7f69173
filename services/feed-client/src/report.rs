//! Presentation stub
//!
//! Stands in for the UI: condenses a ranked batch into top losers, top
//! gainers and the aggregates, resolved to tickers.

use serde::Serialize;
use types::directory::Directory;
use types::position::PortfolioAggregate;
use types::record::EnrichedRecord;

use crate::control::CalculationResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub ticker: String,
    pub last: f64,
    pub unrealized_pl: f64,
    pub unrealized_pl_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub losers: Vec<Mover>,
    pub gainers: Vec<Mover>,
    pub aggregates: PortfolioAggregate,
    pub session: PortfolioAggregate,
}

fn mover(record: &EnrichedRecord, directory: &Directory) -> Mover {
    let ticker = directory
        .ticker(record.symbol_index())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", record.symbol_index()));
    Mover {
        ticker,
        last: record.update.last,
        unrealized_pl: record.unrealized_pl,
        unrealized_pl_pct: record.unrealized_pl_pct,
    }
}

/// Up to `rows` biggest losers and gainers. Relies on the losses-first
/// ranking of the records.
pub fn summarize(result: &CalculationResult, directory: &Directory, rows: usize) -> Report {
    let split = result.records.partition_point(EnrichedRecord::is_loss);
    let (losses, profits) = result.records.split_at(split);

    Report {
        losers: losses.iter().take(rows).map(|r| mover(r, directory)).collect(),
        gainers: profits.iter().take(rows).map(|r| mover(r, directory)).collect(),
        aggregates: result.aggregates,
        session: result.session,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use types::record::UpdateRecord;

    fn enriched(index: u32, pct: f64) -> EnrichedRecord {
        EnrichedRecord {
            update: UpdateRecord {
                symbol_index: index,
                last: 10.0,
                change: 0.0,
                change_pct: 0.0,
                high: 10.0,
                low: 10.0,
                volume: 1,
            },
            unrealized_pl: pct,
            unrealized_pl_pct: pct,
        }
    }

    fn directory() -> Directory {
        Directory::from_columns(
            ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect(),
            vec![String::new(); 5],
        )
    }

    #[test]
    fn test_top_movers_each_side() {
        let result = CalculationResult {
            records: vec![
                enriched(0, -5.0),
                enriched(1, -3.0),
                enriched(2, -1.0),
                enriched(3, 7.0),
                enriched(4, 2.0),
            ],
            timestamp: Utc::now(),
            aggregates: PortfolioAggregate::default(),
            session: PortfolioAggregate::default(),
        };

        let report = summarize(&result, &directory(), 2);
        let losers: Vec<_> = report.losers.iter().map(|m| m.ticker.as_str()).collect();
        let gainers: Vec<_> = report.gainers.iter().map(|m| m.ticker.as_str()).collect();
        assert_eq!(losers, vec!["A", "B"]);
        assert_eq!(gainers, vec!["D", "E"]);
    }

    #[test]
    fn test_unknown_index_and_one_sided_batch() {
        let result = CalculationResult {
            records: vec![enriched(9, 1.0)],
            timestamp: Utc::now(),
            aggregates: PortfolioAggregate::default(),
            session: PortfolioAggregate::default(),
        };
        let report = summarize(&result, &directory(), 3);
        assert!(report.losers.is_empty());
        assert_eq!(report.gainers[0].ticker, "#9");
    }
}
