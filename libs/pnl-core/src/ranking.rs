//! Loss-first ranking
//!
//! Losses (`pct < 0`) come first, most negative at the top. Profits
//! (`pct >= 0`) follow, biggest gain first. Both sorts are stable, so equal
//! percentages keep their arrival order.

use types::record::EnrichedRecord;

/// Rank a batch of enriched records: losses ascending, then profits
/// descending.
pub fn rank(records: Vec<EnrichedRecord>) -> Vec<EnrichedRecord> {
    let (mut losses, mut profits): (Vec<_>, Vec<_>) =
        records.into_iter().partition(EnrichedRecord::is_loss);

    losses.sort_by(|a, b| a.unrealized_pl_pct.total_cmp(&b.unrealized_pl_pct));
    profits.sort_by(|a, b| b.unrealized_pl_pct.total_cmp(&a.unrealized_pl_pct));

    losses.extend(profits);
    losses
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::record::UpdateRecord;

    fn enriched(index: u32, pct: f64) -> EnrichedRecord {
        EnrichedRecord {
            update: UpdateRecord {
                symbol_index: index,
                last: 100.0,
                change: 0.0,
                change_pct: 0.0,
                high: 100.0,
                low: 100.0,
                volume: 0,
            },
            unrealized_pl: pct,
            unrealized_pl_pct: pct,
        }
    }

    fn pcts(records: &[EnrichedRecord]) -> Vec<f64> {
        records.iter().map(|r| r.unrealized_pl_pct).collect()
    }

    #[test]
    fn test_losses_most_negative_first() {
        let ranked = rank(vec![enriched(0, -5.0), enriched(1, -1.0), enriched(2, -3.0)]);
        assert_eq!(pcts(&ranked), vec![-5.0, -3.0, -1.0]);
    }

    #[test]
    fn test_profits_biggest_first() {
        let ranked = rank(vec![enriched(0, 2.0), enriched(1, 7.0), enriched(2, 1.0)]);
        assert_eq!(pcts(&ranked), vec![7.0, 2.0, 1.0]);
    }

    #[test]
    fn test_losses_then_profits() {
        let ranked = rank(vec![
            enriched(0, 2.0),
            enriched(1, -5.0),
            enriched(2, 7.0),
            enriched(3, -1.0),
            enriched(4, 1.0),
            enriched(5, -3.0),
        ]);
        assert_eq!(pcts(&ranked), vec![-5.0, -3.0, -1.0, 7.0, 2.0, 1.0]);
    }

    #[test]
    fn test_zero_ranks_with_profits() {
        let ranked = rank(vec![enriched(0, 0.0), enriched(1, -0.5), enriched(2, 0.5)]);
        assert_eq!(pcts(&ranked), vec![-0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let ranked = rank(vec![enriched(4, 1.0), enriched(2, 1.0), enriched(9, 1.0)]);
        let indices: Vec<_> = ranked.iter().map(|r| r.symbol_index()).collect();
        assert_eq!(indices, vec![4, 2, 9]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn losses_first_each_side_sorted(pcts in proptest::collection::vec(-50.0f64..50.0, 0..60)) {
                let input: Vec<_> = pcts
                    .iter()
                    .enumerate()
                    .map(|(i, p)| enriched(i as u32, *p))
                    .collect();
                let ranked = rank(input);
                prop_assert_eq!(ranked.len(), pcts.len());

                let split = ranked.partition_point(EnrichedRecord::is_loss);
                let (losses, profits) = ranked.split_at(split);
                prop_assert!(profits.iter().all(|r| !r.is_loss()));
                prop_assert!(losses.windows(2).all(|w| w[0].unrealized_pl_pct <= w[1].unrealized_pl_pct));
                prop_assert!(profits.windows(2).all(|w| w[0].unrealized_pl_pct >= w[1].unrealized_pl_pct));

                let mut indices: Vec<_> = ranked.iter().map(|r| r.symbol_index()).collect();
                indices.sort_unstable();
                prop_assert_eq!(indices, (0..pcts.len() as u32).collect::<Vec<_>>());
            }
        }
    }
}
