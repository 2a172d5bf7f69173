//! Seeded position generation
//!
//! Builds a session position table from the directory and the reference
//! table: a deterministic subset of symbols, integral quantities and entry
//! prices within a band around the reference price.

use rand::seq::index;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use types::directory::Directory;
use types::numeric::round_dp;
use types::position::{Position, PositionTable};
use types::reference::ReferenceTable;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("directory is empty")]
    EmptyDirectory,

    #[error("no directory symbol has a reference price")]
    NoReferencePrices,
}

/// Generator settings.
#[derive(Debug, Clone)]
pub struct PositionConfig {
    /// Number of symbols to hold (capped at the directory size).
    pub count: usize,
    /// Quantity range, inclusive.
    pub min_quantity: u32,
    pub max_quantity: u32,
    /// Entry price band around the reference price (0.10 = ±10 %).
    pub entry_band: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            count: 12,
            min_quantity: 1,
            max_quantity: 100,
            entry_band: 0.10,
        }
    }
}

/// Generate a position table keyed by directory index.
///
/// Symbols absent from the reference table are never held.
pub fn generate(
    directory: &Directory,
    reference: &ReferenceTable,
    config: &PositionConfig,
    seed: u64,
) -> Result<PositionTable, PositionError> {
    if directory.is_empty() {
        return Err(PositionError::EmptyDirectory);
    }

    let priced: Vec<(u32, f64)> = directory
        .iter()
        .filter_map(|(i, entry)| reference.get(&entry.ticker).map(|row| (i, row.last)))
        .collect();
    if priced.is_empty() {
        return Err(PositionError::NoReferencePrices);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let amount = config.count.min(priced.len());
    let (lo, hi) = (
        config.min_quantity.min(config.max_quantity),
        config.max_quantity.max(config.min_quantity),
    );

    let mut table = PositionTable::new();
    for pick in index::sample(&mut rng, priced.len(), amount) {
        let (symbol_index, reference_price) = priced[pick];
        let quantity = rng.gen_range(lo..=hi) as f64;
        let offset = if config.entry_band > 0.0 {
            rng.gen_range(-config.entry_band..=config.entry_band)
        } else {
            0.0
        };
        let entry_price = round_dp(reference_price * (1.0 + offset), 2).max(0.01);
        table.insert(symbol_index, Position::new(quantity, entry_price));
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Directory, ReferenceTable) {
        let reference = ReferenceTable::builtin();
        (reference.directory(), reference)
    }

    #[test]
    fn test_same_seed_same_positions() {
        let (dir, reference) = setup();
        let config = PositionConfig::default();
        let a = generate(&dir, &reference, &config, 42).unwrap();
        let b = generate(&dir, &reference, &config, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), config.count);
    }

    #[test]
    fn test_different_seeds_differ() {
        let (dir, reference) = setup();
        let config = PositionConfig::default();
        let a = generate(&dir, &reference, &config, 1).unwrap();
        let b = generate(&dir, &reference, &config, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_entries_within_band_and_quantities_integral() {
        let (dir, reference) = setup();
        let config = PositionConfig {
            count: 50,
            ..PositionConfig::default()
        };
        let table = generate(&dir, &reference, &config, 7).unwrap();
        assert_eq!(table.len(), dir.len());

        for (index, position) in &table {
            let ticker = dir.ticker(*index).unwrap();
            let ref_price = reference.get(ticker).unwrap().last;
            assert!(position.quantity >= 1.0 && position.quantity <= 100.0);
            assert_eq!(position.quantity.fract(), 0.0);
            assert!(position.entry_price >= ref_price * 0.9 - 0.01);
            assert!(position.entry_price <= ref_price * 1.1 + 0.01);
        }
    }

    #[test]
    fn test_unknown_symbols_not_held() {
        let reference = ReferenceTable::builtin();
        let dir = Directory::from_columns(
            vec!["NOPE".to_string(), "AAPL".to_string()],
            vec![String::new(), String::new()],
        );
        let table = generate(&dir, &reference, &PositionConfig::default(), 3).unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_errors() {
        let reference = ReferenceTable::builtin();
        assert_eq!(
            generate(&Directory::default(), &reference, &PositionConfig::default(), 0),
            Err(PositionError::EmptyDirectory)
        );
        let dir = Directory::from_columns(vec!["NOPE".to_string()], vec![]);
        assert_eq!(
            generate(&dir, &reference, &PositionConfig::default(), 0),
            Err(PositionError::NoReferencePrices)
        );
    }
}
