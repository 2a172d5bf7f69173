//! P&L engine: per-batch enrichment, ranking and aggregation
//!
//! The engine owns the session directory and the position table. For each
//! update batch it skips symbols the user does not hold, values the rest on
//! the fixed-point grid, ranks them and aggregates the batch. It also keeps
//! the latest valuation of every held symbol it has seen, so a session-wide
//! view is available next to the per-batch one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use types::directory::{Directory, SymbolIndex};
use types::position::{PortfolioAggregate, PositionTable};
use types::record::{EnrichedRecord, UpdateRecord};

use crate::aggregate::{aggregate, Valuation};
use crate::ranking::rank;

/// Ranked enrichment of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBatch {
    pub records: Vec<EnrichedRecord>,
    pub aggregates: PortfolioAggregate,
}

/// Result of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PnlOutput {
    /// No directory yet, or nothing to compute: input returned unchanged.
    Passthrough(Vec<UpdateRecord>),
    Ranked(RankedBatch),
}

impl PnlOutput {
    pub fn ranked(&self) -> Option<&RankedBatch> {
        match self {
            PnlOutput::Ranked(batch) => Some(batch),
            PnlOutput::Passthrough(_) => None,
        }
    }
}

/// Compute-domain state: directory, positions, latest valuations.
#[derive(Debug, Default)]
pub struct PnlEngine {
    directory: Option<Directory>,
    positions: PositionTable,
    latest: BTreeMap<SymbolIndex, Valuation>,
    batches_processed: u64,
}

impl PnlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the session directory. A new directory starts a new session.
    pub fn set_directory(&mut self, directory: Directory) {
        debug!(symbols = directory.len(), "Directory installed");
        self.directory = Some(directory);
        self.latest.clear();
    }

    /// Install the session position table.
    pub fn set_positions(&mut self, positions: PositionTable) {
        debug!(positions = positions.len(), "Positions installed");
        self.positions = positions;
        self.latest.clear();
    }

    /// Drop all session state.
    pub fn reset(&mut self) {
        self.directory = None;
        self.positions.clear();
        self.latest.clear();
    }

    pub fn directory(&self) -> Option<&Directory> {
        self.directory.as_ref()
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    pub fn batches_processed(&self) -> u64 {
        self.batches_processed
    }

    /// Enrich, rank and aggregate one batch.
    pub fn calculate(&mut self, batch: Vec<UpdateRecord>) -> PnlOutput {
        if self.directory.is_none() || batch.is_empty() {
            return PnlOutput::Passthrough(batch);
        }

        let mut enriched = Vec::new();
        let mut valuations = Vec::new();

        for update in batch {
            let Some(position) = self.positions.get(&update.symbol_index) else {
                continue;
            };

            let valuation = Valuation::at(position, update.last);
            let unrealized_pl_pct = if position.entry_price > 0.0 {
                (update.last - position.entry_price) / position.entry_price * 100.0
            } else {
                0.0
            };

            enriched.push(EnrichedRecord {
                update,
                unrealized_pl: types::numeric::decimal_to_f64(valuation.unrealized_pl),
                unrealized_pl_pct,
            });
            valuations.push(valuation);
            self.latest.insert(update.symbol_index, valuation);
        }

        self.batches_processed += 1;

        PnlOutput::Ranked(RankedBatch {
            aggregates: aggregate(&valuations),
            records: rank(enriched),
        })
    }

    /// Aggregate over the latest valuation of every held symbol seen this
    /// session.
    pub fn session_aggregate(&self) -> PortfolioAggregate {
        aggregate(self.latest.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::position::Position;

    fn directory(n: usize) -> Directory {
        Directory::from_columns(
            (0..n).map(|i| format!("SYM{i}")).collect(),
            (0..n).map(|i| format!("Symbol {i}")).collect(),
        )
    }

    fn update(index: SymbolIndex, last: f64) -> UpdateRecord {
        UpdateRecord {
            symbol_index: index,
            last,
            change: 0.0,
            change_pct: 0.0,
            high: last,
            low: last,
            volume: 1_000,
        }
    }

    fn engine_with(positions: &[(SymbolIndex, f64, f64)]) -> PnlEngine {
        let mut engine = PnlEngine::new();
        engine.set_directory(directory(10));
        engine.set_positions(
            positions
                .iter()
                .map(|&(i, qty, entry)| (i, Position::new(qty, entry)))
                .collect(),
        );
        engine
    }

    #[test]
    fn test_no_directory_passes_through() {
        let mut engine = PnlEngine::new();
        let batch = vec![update(0, 10.0)];
        assert_eq!(engine.calculate(batch.clone()), PnlOutput::Passthrough(batch));
    }

    #[test]
    fn test_empty_batch_passes_through() {
        let mut engine = engine_with(&[(0, 1.0, 10.0)]);
        assert_eq!(engine.calculate(vec![]), PnlOutput::Passthrough(vec![]));
        assert_eq!(engine.batches_processed(), 0);
    }

    #[test]
    fn test_unheld_symbols_skipped() {
        let mut engine = engine_with(&[(1, 1.0, 10.0)]);
        let out = engine.calculate(vec![update(0, 10.0), update(1, 11.0), update(2, 9.0)]);
        let ranked = out.ranked().unwrap();
        assert_eq!(ranked.records.len(), 1);
        assert_eq!(ranked.records[0].symbol_index(), 1);
    }

    #[test]
    fn test_fixed_point_pl_exact() {
        let mut engine = engine_with(&[(0, 10.0, 100.0)]);
        let out = engine.calculate(vec![update(0, 100.30)]);
        let record = out.ranked().unwrap().records[0];
        assert_eq!(record.unrealized_pl, 3.0);
        assert_eq!(record.to_fields()[7], 3.0);
    }

    #[test]
    fn test_percent_and_zero_entry() {
        let mut engine = engine_with(&[(0, 1.0, 50.0), (1, 1.0, 0.0)]);
        let out = engine.calculate(vec![update(0, 55.0), update(1, 5.0)]);
        let ranked = out.ranked().unwrap();
        let by_index: BTreeMap<_, _> = ranked
            .records
            .iter()
            .map(|r| (r.symbol_index(), r.unrealized_pl_pct))
            .collect();
        assert_eq!(by_index[&0], 10.0);
        assert_eq!(by_index[&1], 0.0);
    }

    #[test]
    fn test_ranked_losses_then_profits() {
        let mut engine = engine_with(&[
            (0, 1.0, 100.0),
            (1, 1.0, 100.0),
            (2, 1.0, 100.0),
            (3, 1.0, 100.0),
            (4, 1.0, 100.0),
            (5, 1.0, 100.0),
        ]);
        let out = engine.calculate(vec![
            update(0, 95.0),
            update(1, 99.0),
            update(2, 97.0),
            update(3, 102.0),
            update(4, 107.0),
            update(5, 101.0),
        ]);
        let order: Vec<_> = out
            .ranked()
            .unwrap()
            .records
            .iter()
            .map(|r| r.symbol_index())
            .collect();
        assert_eq!(order, vec![0, 2, 1, 4, 3, 5]);
    }

    #[test]
    fn test_batch_aggregates() {
        let mut engine = engine_with(&[(0, 10.0, 100.0), (1, 5.0, 20.0), (2, 2.0, 30.0)]);
        let out = engine.calculate(vec![update(0, 101.0), update(1, 19.0), update(2, 30.0)]);
        let agg = out.ranked().unwrap().aggregates;
        // +10, −5, 0 on 1000 + 100 + 60 invested
        assert_eq!(agg.total_pl, 5.0);
        assert_eq!(agg.win_count, 1);
        assert_eq!(agg.loss_count, 1);
        assert!((agg.total_pl_pct - 5.0 / 1160.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregates_idempotent() {
        let mut engine = engine_with(&[(0, 3.0, 12.34), (1, 7.0, 56.78)]);
        let batch = vec![update(0, 12.99), update(1, 55.01)];
        let first = engine.calculate(batch.clone());
        let second = engine.calculate(batch);
        assert_eq!(
            first.ranked().unwrap().aggregates,
            second.ranked().unwrap().aggregates
        );
    }

    #[test]
    fn test_session_aggregate_spans_batches() {
        let mut engine = engine_with(&[(0, 1.0, 10.0), (1, 1.0, 10.0)]);
        engine.calculate(vec![update(0, 12.0)]);
        engine.calculate(vec![update(1, 9.0)]);
        engine.calculate(vec![update(0, 13.0)]);

        let session = engine.session_aggregate();
        assert_eq!(session.total_pl, 2.0);
        assert_eq!(session.win_count, 1);
        assert_eq!(session.loss_count, 1);
    }

    #[test]
    fn test_new_directory_clears_session_view() {
        let mut engine = engine_with(&[(0, 1.0, 10.0)]);
        engine.calculate(vec![update(0, 12.0)]);
        engine.set_directory(directory(3));
        assert_eq!(engine.session_aggregate(), PortfolioAggregate::default());
    }

    #[test]
    fn test_reset_returns_to_passthrough() {
        let mut engine = engine_with(&[(0, 1.0, 10.0)]);
        engine.reset();
        let batch = vec![update(0, 12.0)];
        assert_eq!(engine.calculate(batch.clone()), PnlOutput::Passthrough(batch));
    }
}
