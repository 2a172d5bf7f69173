//! Deterministic sine oscillator
//!
//! ```text
//! pct(t)   = amplitude · sin((t + offset) · frequency · BASE_FREQ + phase)
//! price(t) = max(ε, base · (1 + pct(t)))
//! ```
//!
//! Every per-symbol parameter comes from SHA-256(seed ‖ ticker), each read
//! from its own 32-bit slice of the digest. The same seed and table always
//! produce the same trajectories.

use std::f64::consts::TAU;

use sha2::{Digest, Sha256};
use types::directory::SymbolIndex;
use types::reference::ReferenceTable;
use types::record::UpdateRecord;

use super::{emit, to_cents, SessionRange, TickSource, PRICE_FLOOR};
use crate::config::OscillatorKind;

/// One full cycle per minute at a frequency multiplier of 1.
pub const BASE_FREQ: f64 = TAU / 60.0;

#[derive(Debug, Clone)]
pub struct SineParams {
    /// Ticks per second; converts the tick counter into seconds.
    pub tick_hz: f64,
    /// Nominal swing as a fraction of the base price.
    pub base_amplitude: f64,
    /// Frequency multipliers fall in `[min_frequency, max_frequency)`.
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Time offsets fall in `[0, max_time_offset)` seconds.
    pub max_time_offset: f64,
    /// Relative swing of the session volume.
    pub volume_swing: f64,
}

impl Default for SineParams {
    fn default() -> Self {
        Self {
            tick_hz: 100.0,
            base_amplitude: 0.02,
            min_frequency: 0.5,
            max_frequency: 2.0,
            max_time_offset: 3_600.0,
            volume_swing: 0.25,
        }
    }
}

/// Hash-derived constants of one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Wave {
    frequency: f64,
    amplitude: f64,
    phase: f64,
    time_offset: f64,
    volume_phase: f64,
}

impl Wave {
    fn derive(seed: u64, ticker: &str, params: &SineParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(ticker.as_bytes());
        let digest = hasher.finalize();

        let slot = |n: usize| {
            let s = n * 4;
            let word = u32::from_be_bytes([digest[s], digest[s + 1], digest[s + 2], digest[s + 3]]);
            word as f64 / (u32::MAX as f64 + 1.0)
        };

        Self {
            frequency: params.min_frequency
                + (params.max_frequency - params.min_frequency) * slot(0),
            amplitude: params.base_amplitude * (0.5 + slot(1)),
            phase: TAU * slot(2),
            time_offset: params.max_time_offset * slot(3),
            volume_phase: TAU * slot(4),
        }
    }

    fn angle(&self, t: f64) -> f64 {
        (t + self.time_offset) * self.frequency * BASE_FREQ + self.phase
    }
}

#[derive(Debug, Clone)]
struct SymbolState {
    index: SymbolIndex,
    base_price: f64,
    base_volume: u64,
    wave: Wave,
    range: SessionRange,
    last_emitted_cents: Option<i64>,
}

/// Deterministic per-symbol sine trajectories.
#[derive(Debug, Clone)]
pub struct SineOscillator {
    symbols: Vec<SymbolState>,
    params: SineParams,
    ticks: u64,
}

impl SineOscillator {
    pub fn new(reference: &ReferenceTable, seed: u64, params: SineParams) -> Self {
        let symbols = reference
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let wave = Wave::derive(seed, &row.symbol, &params);
                let start = price_at(row.last, &wave, 0.0);
                SymbolState {
                    index: i as SymbolIndex,
                    base_price: row.last,
                    base_volume: row.volume,
                    wave,
                    range: SessionRange::starting_at(start),
                    last_emitted_cents: None,
                }
            })
            .collect();

        Self {
            symbols,
            params,
            ticks: 0,
        }
    }

    /// Seconds since startup at the current tick.
    pub fn elapsed(&self) -> f64 {
        if self.params.tick_hz > 0.0 {
            self.ticks as f64 / self.params.tick_hz
        } else {
            0.0
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn price_at(base: f64, wave: &Wave, t: f64) -> f64 {
    let pct = wave.amplitude * wave.angle(t).sin();
    (base * (1.0 + pct)).max(PRICE_FLOOR)
}

impl TickSource for SineOscillator {
    fn tick(&mut self) -> Vec<UpdateRecord> {
        let t = self.elapsed();
        let swing = self.params.volume_swing;
        self.ticks += 1;

        let mut changed = Vec::new();
        for state in &mut self.symbols {
            let price = price_at(state.base_price, &state.wave, t);
            state.range.observe(price);

            let cents = to_cents(price);
            if state.last_emitted_cents == Some(cents) {
                continue;
            }
            state.last_emitted_cents = Some(cents);

            let volume_factor = 1.0 + swing * (state.wave.angle(t) * 0.5 + state.wave.volume_phase).sin();
            let volume = (state.base_volume as f64 * volume_factor).round().max(0.0) as u64;

            changed.push(emit(state.index, price, state.base_price, state.range, volume));
        }
        changed
    }

    fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    fn kind(&self) -> OscillatorKind {
        OscillatorKind::Sine
    }
}
