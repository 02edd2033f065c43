//! Proportional split of the workload across CPU queues.

/// Split `total` processes across queues in proportion to `weights`.
///
/// Uses cumulative rounding: the running cumulative target is rounded and each queue gets
/// the difference from the previous rounded cumulative value, so rounding errors never
/// accumulate. Weights are normalized by their sum first, so every process is assigned even
/// when the weights add up to less than one. The last queue closes the cumulative target at
/// exactly `total`.
///
/// # Returns
/// One count per weight; the counts always sum to `total`.
pub fn partition(total: usize, weights: &[f64]) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }

    let sum: f64 = weights.iter().sum();
    let share = |weight: f64| {
        if sum > 0.0 && sum.is_finite() {
            weight / sum
        } else {
            1.0 / weights.len() as f64
        }
    };

    let last = weights.len() - 1;
    let mut cumulative = 0.0f64;
    let mut previous = 0usize;
    weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| {
            cumulative += share(weight) * total as f64;
            let rounded = if index == last {
                total
            } else {
                (cumulative.round().max(0.0) as usize).clamp(previous, total)
            };
            let count = rounded - previous;
            previous = rounded;
            count
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn even_split() {
        assert_eq!(partition(6, &[0.5, 0.5]), vec![3, 3]);
    }

    #[test]
    fn cumulative_rounding_avoids_drift() {
        // Naive per-queue rounding would give 3 + 3 + 3 = 9.
        assert_eq!(partition(10, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]), vec![3, 4, 3]);
    }

    #[test]
    fn under_unit_weights_are_normalized() {
        assert_eq!(partition(8, &[0.25, 0.25]), vec![4, 4]);
        assert_eq!(partition(9, &[0.3]), vec![9]);
    }

    #[test]
    fn empty_inputs() {
        assert!(partition(5, &[]).is_empty());
        assert_eq!(partition(0, &[0.2, 0.8]), vec![0, 0]);
    }

    proptest! {
        #[test]
        fn counts_sum_to_total(
            total in 0usize..10_000,
            raw in proptest::collection::vec(0.001f64..1.0, 1..8),
            scale in 0.05f64..1.0,
        ) {
            // Scale the raw weights so they sum to at most one.
            let raw_sum: f64 = raw.iter().sum();
            let weights: Vec<f64> = raw.iter().map(|w| w / raw_sum * scale).collect();

            let counts = partition(total, &weights);
            prop_assert_eq!(counts.len(), weights.len());
            prop_assert_eq!(counts.iter().sum::<usize>(), total);

            // Each queue stays within one process of its exact proportional share.
            let weight_sum: f64 = weights.iter().sum();
            for (count, weight) in counts.iter().zip(&weights) {
                let exact = weight / weight_sum * total as f64;
                prop_assert!((*count as f64 - exact).abs() <= 1.0 + 1e-6);
            }
        }
    }
}
