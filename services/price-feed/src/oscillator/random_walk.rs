//! Volume-weighted random walk
//!
//! Each tick a symbol activates with probability proportional to its
//! reference volume, capped at `activation_cap`. An activated symbol takes a
//! bounded relative price step and accrues traded volume. Only activated
//! symbols are emitted.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use types::directory::SymbolIndex;
use types::reference::ReferenceTable;
use types::record::UpdateRecord;

use super::{emit, SessionRange, TickSource, PRICE_FLOOR};
use crate::config::OscillatorKind;

#[derive(Debug, Clone)]
pub struct RandomWalkParams {
    /// Activation probability of the most traded symbol.
    pub activation_cap: f64,
    /// Largest relative price move per activation (0.002 = ±0.2 %).
    pub max_step: f64,
    /// Largest volume increment per activation.
    pub max_volume_step: u64,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            activation_cap: 0.3,
            max_step: 0.002,
            max_volume_step: 500,
        }
    }
}

#[derive(Debug, Clone)]
struct WalkState {
    index: SymbolIndex,
    reference_last: f64,
    price: f64,
    volume: u64,
    activation: f64,
    range: SessionRange,
}

/// Stochastic strategy, reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct RandomWalkOscillator {
    symbols: Vec<WalkState>,
    params: RandomWalkParams,
    rng: ChaCha8Rng,
}

impl RandomWalkOscillator {
    pub fn new(reference: &ReferenceTable, seed: u64, params: RandomWalkParams) -> Self {
        let max_volume = reference.max_volume().max(1) as f64;
        let cap = params.activation_cap.clamp(0.0, 1.0);

        let symbols = reference
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| WalkState {
                index: i as SymbolIndex,
                reference_last: row.last,
                price: row.last,
                volume: row.volume,
                activation: (row.volume as f64 / max_volume * cap).min(cap),
                range: SessionRange::starting_at(row.last),
            })
            .collect();

        Self {
            symbols,
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl TickSource for RandomWalkOscillator {
    fn tick(&mut self) -> Vec<UpdateRecord> {
        let step = self.params.max_step.abs();
        let max_volume_step = self.params.max_volume_step.max(1);

        let mut changed = Vec::new();
        for state in &mut self.symbols {
            if !self.rng.gen_bool(state.activation) {
                continue;
            }

            let delta = if step > 0.0 {
                self.rng.gen_range(-step..=step)
            } else {
                0.0
            };
            state.price = (state.price * (1.0 + delta)).max(PRICE_FLOOR);
            state.volume = state
                .volume
                .saturating_add(self.rng.gen_range(1..=max_volume_step));
            state.range.observe(state.price);

            changed.push(emit(
                state.index,
                state.price,
                state.reference_last,
                state.range,
                state.volume,
            ));
        }
        changed
    }

    fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    fn kind(&self) -> OscillatorKind {
        OscillatorKind::RandomWalk
    }
}
