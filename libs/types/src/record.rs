//! Update and enriched records
//!
//! An update record is the flat 7-field tuple carried by every update
//! message: `[symbolIndex, last, change, changePercent, high, low, volume]`.
//! The P&L layer extends it with two computed fields into a 9-field
//! enriched record.

use serde::{Deserialize, Serialize};

use crate::directory::SymbolIndex;
use crate::errors::RecordError;

/// Number of doubles per update record on the wire.
pub const UPDATE_FIELDS: usize = 7;

/// Number of doubles per enriched record.
pub const ENRICHED_FIELDS: usize = 9;

/// One changed symbol within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub symbol_index: SymbolIndex,
    pub last: f64,
    pub change: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
}

impl UpdateRecord {
    /// Flatten into wire field order.
    pub fn to_fields(&self) -> [f64; UPDATE_FIELDS] {
        [
            self.symbol_index as f64,
            self.last,
            self.change,
            self.change_pct,
            self.high,
            self.low,
            self.volume as f64,
        ]
    }

    /// Rebuild a record from exactly 7 wire fields.
    ///
    /// Only the structural fields are checked here (index and volume must be
    /// non-negative integers, all fields finite). Use [`validate`] for the
    /// price invariants.
    ///
    /// [`validate`]: UpdateRecord::validate
    pub fn from_fields(fields: &[f64]) -> Result<Self, RecordError> {
        if fields.len() != UPDATE_FIELDS {
            return Err(RecordError::FieldCount {
                expected: UPDATE_FIELDS,
                actual: fields.len(),
            });
        }

        const NAMES: [&str; UPDATE_FIELDS] =
            ["symbol_index", "last", "change", "change_pct", "high", "low", "volume"];
        for (value, name) in fields.iter().zip(NAMES) {
            if !value.is_finite() {
                return Err(RecordError::NotFinite { field: name });
            }
        }

        let index = fields[0];
        if index < 0.0 || index.fract() != 0.0 || index > SymbolIndex::MAX as f64 {
            return Err(RecordError::InvalidIndex(index));
        }

        let volume = fields[6];
        if volume < 0.0 || volume.fract() != 0.0 {
            return Err(RecordError::InvalidVolume(volume));
        }

        Ok(Self {
            symbol_index: index as SymbolIndex,
            last: fields[1],
            change: fields[2],
            change_pct: fields[3],
            high: fields[4],
            low: fields[5],
            volume: volume as u64,
        })
    }

    /// Check `last > 0` and `high >= last >= low`.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !(self.last > 0.0) {
            return Err(RecordError::NonPositivePrice(self.last));
        }
        if !(self.high >= self.last && self.last >= self.low) {
            return Err(RecordError::RangeViolation {
                high: self.high,
                last: self.last,
                low: self.low,
            });
        }
        Ok(())
    }
}

/// Flatten a batch into the packed wire array, in emission order.
pub fn flatten_batch(records: &[UpdateRecord]) -> Vec<f64> {
    let mut data = Vec::with_capacity(records.len() * UPDATE_FIELDS);
    for record in records {
        data.extend_from_slice(&record.to_fields());
    }
    data
}

/// Split a packed array back into records.
pub fn unflatten_batch(data: &[f64]) -> Result<Vec<UpdateRecord>, RecordError> {
    if data.len() % UPDATE_FIELDS != 0 {
        return Err(RecordError::FieldCount {
            expected: (data.len() / UPDATE_FIELDS + 1) * UPDATE_FIELDS,
            actual: data.len(),
        });
    }
    data.chunks_exact(UPDATE_FIELDS)
        .map(UpdateRecord::from_fields)
        .collect()
}

/// An update record extended with unrealized P&L.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub update: UpdateRecord,
    pub unrealized_pl: f64,
    pub unrealized_pl_pct: f64,
}

impl EnrichedRecord {
    pub fn symbol_index(&self) -> SymbolIndex {
        self.update.symbol_index
    }

    /// Losses are strictly negative percentages; zero counts as a profit.
    pub fn is_loss(&self) -> bool {
        self.unrealized_pl_pct < 0.0
    }

    pub fn to_fields(&self) -> [f64; ENRICHED_FIELDS] {
        let u = self.update.to_fields();
        [
            u[0],
            u[1],
            u[2],
            u[3],
            u[4],
            u[5],
            u[6],
            self.unrealized_pl,
            self.unrealized_pl_pct,
        ]
    }
}
