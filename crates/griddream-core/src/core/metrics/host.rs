use super::emd::{self, CostMatrix};
use super::method::{DistanceMethod, MetricError, RawScore};

/// Thresholds for the `threshold` metric, applied to the magnitude of a target voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub positive: f32,
    pub negative: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            positive: 0.036,
            negative: 0.071,
        }
    }
}

fn check_lengths(target: &[f32], screen: &[f32]) -> Result<(), MetricError> {
    if target.len() != screen.len() {
        return Err(MetricError::LengthMismatch {
            target: target.len(),
            screen: screen.len(),
        });
    }
    Ok(())
}

pub fn l1(target: &[f32], screen: &[f32]) -> f32 {
    target
        .iter()
        .zip(screen)
        .map(|(&t, &s)| (t - s).abs() as f64)
        .sum::<f64>() as f32
}

pub fn l2_squared(target: &[f32], screen: &[f32]) -> f32 {
    target
        .iter()
        .zip(screen)
        .map(|(&t, &s)| {
            let d = (t - s) as f64;
            d * d
        })
        .sum::<f64>() as f32
}

pub fn mult(target: &[f32], screen: &[f32]) -> f32 {
    target
        .iter()
        .zip(screen)
        .map(|(&t, &s)| t as f64 * s as f64)
        .sum::<f64>() as f32
}

/// Squared difference over voxels whose target magnitude clears its threshold.
///
/// Only the target decides which voxels count, so the metric is not symmetric.
pub fn thresholded_l2(target: &[f32], screen: &[f32], thresholds: Thresholds) -> f32 {
    target
        .iter()
        .zip(screen)
        .map(|(&t, &s)| {
            let limit = if t >= 0.0 {
                thresholds.positive
            } else {
                thresholds.negative
            };
            let magnitude = t.abs();
            if magnitude > 0.0 && magnitude > limit {
                let d = (t - s) as f64;
                d * d
            } else {
                0.0
            }
        })
        .sum::<f64>() as f32
}

/// Computes the raw host reduction of `method` between two ligand-channel slices.
///
/// # Errors
///
/// Returns an error if the slices differ in length, or `emd` is requested without a
/// cost matrix.
pub fn raw_score(
    method: DistanceMethod,
    target: &[f32],
    screen: &[f32],
    thresholds: Thresholds,
    cost: Option<&CostMatrix>,
) -> Result<RawScore, MetricError> {
    check_lengths(target, screen)?;
    let raw = match method {
        DistanceMethod::L1 => RawScore::Single(l1(target, screen)),
        DistanceMethod::L2 => RawScore::Single(l2_squared(target, screen)),
        DistanceMethod::Mult => RawScore::Single(mult(target, screen)),
        DistanceMethod::Sum => RawScore::Sum {
            l2sq: l2_squared(target, screen),
            mult: mult(target, screen),
        },
        DistanceMethod::Threshold => {
            RawScore::Single(thresholded_l2(target, screen, thresholds))
        }
        DistanceMethod::Emd => {
            let cost = cost.ok_or(MetricError::MissingCostMatrix)?;
            let supply = emd::aggregate_subcubes(target, cost);
            let demand = emd::aggregate_subcubes(screen, cost);
            RawScore::Single(emd::earth_movers_distance(cost, &supply, &demand))
        }
    };
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn random_grid(rng: &mut StdRng, len: usize) -> Vec<f32> {
        (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn a_grid_scores_zero_against_itself() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = random_grid(&mut rng, 512);
        assert_eq!(l1(&grid, &grid), 0.0);
        assert_eq!(l2_squared(&grid, &grid), 0.0);
    }

    #[test]
    fn mult_of_a_grid_with_itself_is_maximal_among_equal_norm_grids() {
        let mut rng = StdRng::seed_from_u64(11);
        let target = random_grid(&mut rng, 256);
        let self_score = mult(&target, &target);
        for _ in 0..10 {
            let other = random_grid(&mut rng, 256);
            let norm = l2_squared(&other, &vec![0.0; 256]).sqrt();
            let scale = self_score.sqrt() / norm;
            let scaled: Vec<f32> = other.iter().map(|v| v * scale).collect();
            assert!(mult(&target, &scaled) <= self_score + 1e-3);
        }
    }

    #[test]
    fn symmetric_metrics_do_not_depend_on_argument_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = random_grid(&mut rng, 300);
        let b = random_grid(&mut rng, 300);
        assert_eq!(l1(&a, &b), l1(&b, &a));
        assert_eq!(l2_squared(&a, &b), l2_squared(&b, &a));
        assert_eq!(mult(&a, &b), mult(&b, &a));
    }

    #[test]
    fn threshold_only_counts_voxels_above_their_sign_specific_limit() {
        let thresholds = Thresholds {
            positive: 0.5,
            negative: 0.8,
        };
        // 0.6 and -1.0 pass their limits, -0.6 does not pass the negative one.
        let target = [0.6, -0.6, 0.0, -1.0];
        let screen = [0.0, 0.0, 3.0, 1.0];
        let score = thresholded_l2(&target, &screen, thresholds);
        assert!((score - 4.36).abs() < 1e-5);
    }

    #[test]
    fn threshold_weights_come_from_the_target_only() {
        let thresholds = Thresholds::default();
        let score = thresholded_l2(&[-1.0], &[0.0], thresholds);
        assert_eq!(score, 1.0);
        let swapped = thresholded_l2(&[0.0], &[-1.0], thresholds);
        assert_eq!(swapped, 0.0);
    }

    #[test]
    fn threshold_of_a_mixed_sign_grid_against_itself_is_zero() {
        let open = Thresholds {
            positive: 0.0,
            negative: 0.0,
        };
        let small = [0.5, -0.25, 0.0, -1.0];
        assert_eq!(thresholded_l2(&small, &small, open), 0.0);

        let mut rng = StdRng::seed_from_u64(19);
        let grid = random_grid(&mut rng, 1024);
        assert!(grid.iter().any(|v| *v < 0.0));
        assert_eq!(thresholded_l2(&grid, &grid, open), 0.0);
        assert_eq!(thresholded_l2(&grid, &grid, Thresholds::default()), 0.0);
    }

    #[test]
    fn mismatched_slices_are_rejected() {
        let result = raw_score(
            DistanceMethod::L1,
            &[0.0; 4],
            &[0.0; 3],
            Thresholds::default(),
            None,
        );
        assert_eq!(
            result,
            Err(MetricError::LengthMismatch {
                target: 4,
                screen: 3
            })
        );
    }

    #[test]
    fn emd_without_a_cost_matrix_is_an_error() {
        let result = raw_score(
            DistanceMethod::Emd,
            &[0.0; 4],
            &[0.0; 4],
            Thresholds::default(),
            None,
        );
        assert_eq!(result, Err(MetricError::MissingCostMatrix));
    }

    #[test]
    fn sum_reports_both_reductions() {
        let raw = raw_score(
            DistanceMethod::Sum,
            &[1.0, 2.0],
            &[1.0, 0.0],
            Thresholds::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            raw,
            RawScore::Sum {
                l2sq: 4.0,
                mult: 1.0
            }
        );
    }
}
