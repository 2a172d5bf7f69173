//! Client-side P&L computation
//!
//! Turns decoded update batches into a ranked, per-position P&L view:
//! - Fixed-point unrealized P&L per held symbol
//! - Loss-first / gain-first ranking
//! - Per-batch and session-wide portfolio aggregates
//! - Seeded position generation for a session
//!
//! # Determinism
//! Calculation is pure apart from the engine's own state: no system time,
//! no RNG. Money arithmetic runs on an integer grid (see
//! `types::numeric`) and sums in `Decimal`.

pub mod aggregate;
pub mod engine;
pub mod positions;
pub mod ranking;

pub use engine::{PnlEngine, PnlOutput, RankedBatch};

/// Crate version constant
pub const PNL_CORE_VERSION: &str = "1.0.0";
