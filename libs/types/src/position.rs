//! Position and portfolio aggregate types
//!
//! Positions are held only for symbols the user owns and are keyed by the
//! directory index. The table is generated once per session and handed to
//! the P&L engine, which owns it from then on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::directory::SymbolIndex;

/// A held position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub entry_price: f64,
}

impl Position {
    pub fn new(quantity: f64, entry_price: f64) -> Self {
        Self {
            quantity,
            entry_price,
        }
    }
}

/// Position table keyed by symbol index.
///
/// `BTreeMap` keeps iteration order stable across runs.
pub type PositionTable = BTreeMap<SymbolIndex, Position>;

/// Portfolio-level totals derived from a set of enriched records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAggregate {
    pub total_pl: f64,
    pub total_pl_pct: f64,
    pub win_count: u32,
    pub loss_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_table_sorted_iteration() {
        let mut table = PositionTable::new();
        table.insert(7, Position::new(10.0, 100.0));
        table.insert(2, Position::new(5.0, 50.0));
        table.insert(4, Position::new(1.0, 10.0));

        let keys: Vec<_> = table.keys().copied().collect();
        assert_eq!(keys, vec![2, 4, 7]);
    }

    #[test]
    fn test_aggregate_default_is_zero() {
        let agg = PortfolioAggregate::default();
        assert_eq!(agg.total_pl, 0.0);
        assert_eq!(agg.win_count, 0);
        assert_eq!(agg.loss_count, 0);
    }

    #[test]
    fn test_position_serialization_roundtrip() {
        let p = Position::new(12.0, 187.35);
        let json = serde_json::to_string(&p).unwrap();
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
