//! Fixed-point scaling for prices and quantities
//!
//! Values cross the wire as doubles. Before any P&L arithmetic they are
//! rounded onto an integer grid with scale factor `S = 10^SCALE_DP`, and
//! products of two scaled values carry `S²`. Converting back goes through
//! `rust_decimal` so the result is the exact decimal quotient, not a
//! floating-point division with residue.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Decimal places kept on the fixed-point grid.
pub const SCALE_DP: u32 = 4;

/// Scale factor `S`.
pub const SCALE: i64 = 10_000;

/// Round a double onto the fixed-point grid: `round(value · S)`.
///
/// Non-finite input maps to zero.
pub fn to_fixed(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value * SCALE as f64).round() as i64
}

/// A product of two scaled values (`S²`) as an exact decimal.
///
/// Saturates at the `Decimal` range instead of panicking.
pub fn product_to_decimal(product: i128) -> Decimal {
    Decimal::try_from_i128_with_scale(product, SCALE_DP * 2).unwrap_or(if product < 0 {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Nearest double to an exact decimal.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Round a double to a number of decimal places, half away from zero.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    match Decimal::from_f64(value) {
        Some(d) => decimal_to_f64(d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)),
        None => value,
    }
}
