//! Price generation
//!
//! Two interchangeable strategies behind [`TickSource`]:
//!
//! - [`SineOscillator`]: deterministic per-symbol sine trajectories whose
//!   parameters come from a seeded hash of the ticker. The default.
//! - [`RandomWalkOscillator`]: volume-weighted activation with a bounded
//!   random step, driven by a seeded ChaCha8 RNG.
//!
//! Both emit delta batches: only the symbols that changed this tick, in
//! directory order, never the same symbol twice in one tick.

mod random_walk;
mod sine;

pub use random_walk::{RandomWalkOscillator, RandomWalkParams};
pub use sine::{SineOscillator, SineParams};

use types::directory::SymbolIndex;
use types::reference::ReferenceTable;
use types::record::UpdateRecord;

use crate::config::OscillatorKind;

/// Lowest price any strategy will produce.
pub const PRICE_FLOOR: f64 = 0.01;

/// A generator pulled once per tick by the broadcast subscription.
pub trait TickSource: Send {
    /// Records for the symbols that changed since the previous tick.
    fn tick(&mut self) -> Vec<UpdateRecord>;

    /// Number of symbols the source covers.
    fn symbol_count(&self) -> usize;

    fn kind(&self) -> OscillatorKind;
}

/// Build the configured strategy over a reference table.
pub fn build(
    kind: OscillatorKind,
    reference: &ReferenceTable,
    seed: u64,
    tick_hz: f64,
) -> Box<dyn TickSource> {
    match kind {
        OscillatorKind::Sine => Box::new(SineOscillator::new(
            reference,
            seed,
            SineParams {
                tick_hz,
                ..SineParams::default()
            },
        )),
        OscillatorKind::RandomWalk => Box::new(RandomWalkOscillator::new(
            reference,
            seed,
            RandomWalkParams::default(),
        )),
    }
}

/// Running session extremes of a raw price series. Never reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SessionRange {
    pub high: f64,
    pub low: f64,
}

impl SessionRange {
    pub fn starting_at(price: f64) -> Self {
        Self {
            high: price,
            low: price,
        }
    }

    pub fn observe(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
    }
}

/// Price in whole cents.
pub(crate) fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Assemble an emitted record on the 0.01 price grid.
///
/// Rounding is monotone, so `low <= price <= high` on the raw series carries
/// over to the emitted fields.
pub(crate) fn emit(
    symbol_index: SymbolIndex,
    price: f64,
    reference_last: f64,
    range: SessionRange,
    volume: u64,
) -> UpdateRecord {
    let last = from_cents(to_cents(price).max(1));
    let change = from_cents(to_cents(last - reference_last));
    let change_pct = if reference_last > 0.0 {
        from_cents(to_cents(change / reference_last * 100.0))
    } else {
        0.0
    };

    UpdateRecord {
        symbol_index,
        last,
        change,
        change_pct,
        high: from_cents(to_cents(range.high).max(1)),
        low: from_cents(to_cents(range.low).max(1)),
        volume,
    }
}
