//! Portfolio aggregation
//!
//! ```text
//! totalPL        = Σ unrealizedPL
//! invested       = Σ entryPrice × quantity
//! totalPLPercent = invested > 0 ? totalPL / invested × 100 : 0
//! ```
//!
//! Sums run in `Decimal` over values that were computed on the fixed-point
//! grid, so the result does not depend on summation order. Every step
//! saturates at the `Decimal` range instead of panicking.

use rust_decimal::Decimal;
use types::numeric::{decimal_to_f64, product_to_decimal, to_fixed};
use types::position::{PortfolioAggregate, Position};

/// Exact money figures for one held symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub unrealized_pl: Decimal,
    pub invested: Decimal,
}

impl Valuation {
    /// Value a position at `last`.
    ///
    /// ```text
    /// priceDiff    = round(last·S) − round(entry·S)
    /// unrealizedPL = priceDiff · round(qty·S) / S²
    /// invested     = round(entry·S) · round(qty·S) / S²
    /// ```
    pub fn at(position: &Position, last: f64) -> Self {
        let last_fx = to_fixed(last) as i128;
        let entry_fx = to_fixed(position.entry_price) as i128;
        let qty_fx = to_fixed(position.quantity) as i128;

        Self {
            unrealized_pl: saturating_product(last_fx - entry_fx, qty_fx),
            invested: saturating_product(entry_fx, qty_fx),
        }
    }
}

fn saturating_product(a: i128, b: i128) -> Decimal {
    product_to_decimal(a.saturating_mul(b))
}

fn saturating_add(acc: Decimal, value: Decimal) -> Decimal {
    acc.checked_add(value).unwrap_or(if value < Decimal::ZERO {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Aggregate a set of valuations.
///
/// Wins and losses follow the sign of the P&L; a flat position counts as
/// neither.
pub fn aggregate<'a, I>(valuations: I) -> PortfolioAggregate
where
    I: IntoIterator<Item = &'a Valuation>,
{
    let mut total_pl = Decimal::ZERO;
    let mut invested = Decimal::ZERO;
    let mut win_count = 0;
    let mut loss_count = 0;

    for v in valuations {
        total_pl = saturating_add(total_pl, v.unrealized_pl);
        invested = saturating_add(invested, v.invested);
        if v.unrealized_pl > Decimal::ZERO {
            win_count += 1;
        } else if v.unrealized_pl < Decimal::ZERO {
            loss_count += 1;
        }
    }

    let total_pl_pct = if invested > Decimal::ZERO {
        total_pl
            .checked_div(invested)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(decimal_to_f64)
            .unwrap_or_else(|| decimal_to_f64(total_pl) / decimal_to_f64(invested) * 100.0)
    } else {
        0.0
    };

    PortfolioAggregate {
        total_pl: decimal_to_f64(total_pl),
        total_pl_pct,
        win_count,
        loss_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valuation_exact() {
        let v = Valuation::at(&Position::new(10.0, 100.0), 100.30);
        assert_eq!(v.unrealized_pl, Decimal::from(3));
        assert_eq!(v.invested, Decimal::from(1_000));
    }

    #[test]
    fn test_valuation_fractional_quantity() {
        let v = Valuation::at(&Position::new(0.5, 20.10), 20.0);
        // (20.00 − 20.10) × 0.5 = −0.05
        assert_eq!(v.unrealized_pl, Decimal::new(-5, 2));
        assert_eq!(v.invested, Decimal::new(1005, 2));
    }

    #[test]
    fn test_aggregate_counts_and_percent() {
        let vals = vec![
            Valuation::at(&Position::new(10.0, 100.0), 110.0), // +100 on 1000
            Valuation::at(&Position::new(10.0, 100.0), 95.0),  // −50 on 1000
            Valuation::at(&Position::new(5.0, 40.0), 40.0),    // 0 on 200
        ];
        let agg = aggregate(&vals);
        assert_eq!(agg.total_pl, 50.0);
        assert_eq!(agg.win_count, 1);
        assert_eq!(agg.loss_count, 1);
        // 50 / 2200 × 100
        assert!((agg.total_pl_pct - 2.272_727_272_727_272_7).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = aggregate(&Vec::<Valuation>::new());
        assert_eq!(agg, PortfolioAggregate::default());
    }

    #[test]
    fn test_zero_invested_percent_is_zero() {
        let vals = vec![Valuation::at(&Position::new(0.0, 100.0), 120.0)];
        let agg = aggregate(&vals);
        assert_eq!(agg.total_pl_pct, 0.0);
        assert_eq!(agg.win_count, 0);
    }

    #[test]
    fn test_no_drift_over_many_updates() {
        // Summing the same 0.1-step valuation many times stays exact
        let v = Valuation::at(&Position::new(1.0, 0.2), 0.3);
        let vals = vec![v; 10_000];
        let agg = aggregate(&vals);
        assert_eq!(agg.total_pl, 1_000.0);
    }

    #[test]
    fn test_extreme_notionals_saturate() {
        let huge = Valuation::at(&Position::new(1e12, 1e9), 2e9);
        let agg = aggregate(&[huge, huge, huge]);
        assert!(agg.total_pl.is_finite() && agg.total_pl > 0.0);
        assert!(agg.total_pl_pct.is_finite());
        assert_eq!(agg.win_count, 3);

        let crash = Valuation::at(&Position::new(1e12, 2e9), 1e9);
        let agg = aggregate(&[crash, crash, huge]);
        assert!(agg.total_pl.is_finite());
        assert_eq!(agg.loss_count, 2);
    }
}
