//! Closed-loop cell size search.
//!
//! In dynamic mode the controller walks the cell size in fixed steps until the
//! reduced cloud lands inside `[min_points, max_points]` or a bound is hit.
//! The converged size is kept between frames, so a steady scene settles after
//! the first frame and later frames usually need a single reduction.

use downsampler_core::PointCloud;
use downsampler_filters::voxel_grid_reduce;

use crate::config::FilterConfig;

/// Fraction of a step within which a stepped size snaps onto the bound.
/// Keeps accumulated rounding from costing an extra reduction.
const SNAP_TOLERANCE: f64 = 1e-6;

/// Search state carried from one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub current_cell_size: f64,
}

/// Output of one reduction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    pub cloud: PointCloud,
    /// Cell size of the reduction that produced `cloud`.
    pub cell_size_used: f64,
    /// Number of voxel-grid reductions run for this frame.
    pub reductions: usize,
}

#[derive(Debug, Clone)]
pub struct AdaptiveCellSizeController {
    state: ControllerState,
}

impl AdaptiveCellSizeController {
    pub fn new(initial_cell_size: f64) -> Self {
        Self {
            state: ControllerState {
                current_cell_size: initial_cell_size,
            },
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.cell_size)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Re-seeds the search, e.g. after a static cell size was configured.
    pub fn reset(&mut self, cell_size: f64) {
        self.state.current_cell_size = cell_size;
    }

    /// Upper bound on reductions a dynamic search may run with `config`.
    pub fn max_reductions(config: &FilterConfig) -> usize {
        let (lo, hi) = config.cell_size_bounds();
        if !Self::can_step(config) || hi <= lo {
            return 1;
        }
        // the cast saturates for vanishing steps
        (((hi - lo) / config.cell_size_step).ceil() as usize).saturating_add(1)
    }

    pub fn process(&mut self, cloud: &PointCloud, config: &FilterConfig) -> FilterResult {
        if !config.dynamic_mode {
            let cell_size = config.static_cell_size();
            return FilterResult {
                cloud: voxel_grid_reduce(cloud, cell_size),
                cell_size_used: cell_size,
                reductions: 1,
            };
        }

        let (lo, hi) = config.cell_size_bounds();
        let mut size = self.state.current_cell_size;
        if !(size >= lo) {
            size = lo;
        }
        if size > hi {
            size = hi;
        }

        let mut reduced = voxel_grid_reduce(cloud, size);
        let mut reductions = 1;

        if Self::can_step(config) {
            let step = config.cell_size_step;
            if reduced.len() < config.min_points {
                while reduced.len() <= config.min_points && size > lo {
                    size = step_down(size, step, lo);
                    reduced = voxel_grid_reduce(cloud, size);
                    reductions += 1;
                }
            } else if reduced.len() > config.max_points {
                while reduced.len() >= config.max_points && size < hi {
                    size = step_up(size, step, hi);
                    reduced = voxel_grid_reduce(cloud, size);
                    reductions += 1;
                }
            }
        } else {
            log::warn!(
                "cell_size_step {} cannot drive a search, using cell size {}",
                config.cell_size_step,
                size
            );
        }

        self.state.current_cell_size = size;
        log::trace!(
            "dynamic search settled at cell size {:.3} after {} reductions ({} points)",
            size,
            reductions,
            reduced.len()
        );

        FilterResult {
            cloud: reduced,
            cell_size_used: size,
            reductions,
        }
    }

    fn can_step(config: &FilterConfig) -> bool {
        config.cell_size_step > 0.0 && config.cell_size_step.is_finite()
    }
}

fn step_down(size: f64, step: f64, lo: f64) -> f64 {
    let next = size - step;
    if next <= lo + step * SNAP_TOLERANCE {
        lo
    } else {
        next
    }
}

fn step_up(size: f64, step: f64, hi: f64) -> f64 {
    let next = size + step;
    if next >= hi - step * SNAP_TOLERANCE {
        hi
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use downsampler_core::PointXYZI;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_ball(n: usize, radius: f64, seed: u64) -> PointCloud {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cloud = PointCloud::with_capacity(n);
        while cloud.len() < n {
            let p = PointXYZI::new(
                rng.gen_range(-radius..radius),
                rng.gen_range(-radius..radius),
                rng.gen_range(-radius..radius),
                rng.gen_range(0.0..100.0),
            );
            if p.norm() <= radius {
                cloud.push(p);
            }
        }
        cloud
    }

    /// `n` points on a line, spaced `spacing` apart.
    fn line(n: usize, spacing: f64) -> PointCloud {
        PointCloud::from_xyz(
            (0..n).map(|i| i as f64 * spacing).collect(),
            vec![0.0; n],
            vec![0.0; n],
        )
    }

    fn dynamic_config() -> FilterConfig {
        FilterConfig {
            dynamic_mode: true,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn static_mode_runs_exactly_one_reduction() {
        let config = FilterConfig {
            cell_size: 1.0,
            ..FilterConfig::default()
        };
        let mut controller = AdaptiveCellSizeController::new(2.5);
        let result = controller.process(&uniform_ball(3_000, 20.0, 1), &config);
        assert_eq!(result.reductions, 1);
        assert_eq!(result.cell_size_used, 1.0);
        assert_eq!(controller.state().current_cell_size, 2.5);
    }

    #[test]
    fn static_mode_clamps_to_resolution_floor() {
        let config = FilterConfig {
            cell_size: 0.02,
            ..FilterConfig::default()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(10, 1.0), &config);
        assert_eq!(result.cell_size_used, 0.1);
    }

    #[test]
    fn count_in_band_is_accepted_immediately() {
        // 100 points 1.0 apart: every point has its own cell at size 0.5
        let config = FilterConfig {
            min_points: 100,
            max_points: 100,
            cell_size: 0.5,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(100, 1.0), &config);
        assert_eq!(result.cloud.len(), 100);
        assert_eq!(result.reductions, 1);
        assert_eq!(result.cell_size_used, 0.5);
    }

    #[test]
    fn too_few_points_shrinks_cell_size() {
        // 200 points 0.25 apart span 49.75; count at size s is about 49.75 / s + 1
        let config = FilterConfig {
            cell_size: 2.0,
            cell_size_step: 0.2,
            min_cell_size: 0.2,
            max_cell_size: 3.0,
            min_points: 60,
            max_points: 200,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(200, 0.25), &config);
        assert!(result.cloud.len() > 60);
        assert!(result.cell_size_used < 2.0);
        assert_eq!(controller.state().current_cell_size, result.cell_size_used);
        assert!(result.reductions > 1);
    }

    #[test]
    fn too_many_points_grows_cell_size() {
        let config = FilterConfig {
            cell_size: 0.2,
            min_points: 10,
            max_points: 40,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(200, 0.25), &config);
        assert!(result.cloud.len() < 40);
        assert!(result.cell_size_used > 0.2);
    }

    #[test]
    fn unreachable_band_stops_at_lower_bound() {
        let config = FilterConfig {
            min_points: 1_000,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(50, 1.0), &config);
        assert_eq!(result.cloud.len(), 50);
        assert_abs_diff_eq!(result.cell_size_used, 0.2, epsilon = 1e-12);
        assert_eq!(controller.state().current_cell_size, result.cell_size_used);
    }

    #[test]
    fn unreachable_band_stops_at_upper_bound() {
        let config = FilterConfig {
            cell_size: 1.0,
            min_points: 0,
            max_points: 5,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(100, 1.0), &config);
        assert_eq!(result.cell_size_used, 3.0);
        assert!(result.cloud.len() > 5);
    }

    #[test]
    fn state_is_clamped_into_bounds() {
        let config = FilterConfig {
            min_points: 0,
            max_points: usize::MAX,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::new(10.0);
        let result = controller.process(&line(10, 1.0), &config);
        assert_eq!(result.cell_size_used, 3.0);

        controller.reset(0.01);
        let result = controller.process(&line(10, 1.0), &config);
        assert_eq!(result.cell_size_used, 0.2);
    }

    #[test]
    fn inverted_bounds_resolve_to_upper_bound() {
        let config = FilterConfig {
            min_cell_size: 2.5,
            max_cell_size: 1.0,
            min_points: 10_000,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::new(2.0);
        let result = controller.process(&line(30, 0.5), &config);
        assert_eq!(result.cell_size_used, 1.0);
        // 1.0 < 2.5 already sits below the lower bound, so no stepping happens
        assert_eq!(result.reductions, 1);
    }

    #[test]
    fn non_positive_step_disables_search() {
        let config = FilterConfig {
            cell_size_step: 0.0,
            min_points: 1_000,
            ..dynamic_config()
        };
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&line(50, 1.0), &config);
        assert_eq!(result.reductions, 1);
        assert_eq!(result.cell_size_used, 2.0);
    }

    #[test]
    fn empty_cloud_needs_search_but_stays_empty() {
        let config = dynamic_config();
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&PointCloud::new(), &config);
        assert!(result.cloud.is_empty());
        assert_abs_diff_eq!(result.cell_size_used, 0.2, epsilon = 1e-12);
        assert!(result.reductions <= AdaptiveCellSizeController::max_reductions(&config));
    }

    #[test]
    fn five_thousand_point_ball_scenario() {
        let config = FilterConfig {
            measurement_range: 200.0,
            dynamic_mode: true,
            cell_size: 2.0,
            cell_size_step: 0.2,
            min_cell_size: 0.2,
            max_cell_size: 3.0,
            min_points: 1500,
            max_points: 2500,
        };
        let cloud = uniform_ball(5_000, 50.0, 7);
        let mut controller = AdaptiveCellSizeController::from_config(&config);
        let result = controller.process(&cloud, &config);

        // ~4800 occupied cells at the seed size, still ~4400 at 3.0: the
        // search walks up 2.0 -> 3.0 in five steps and stops at the bound
        assert!(voxel_grid_reduce(&cloud, 2.0).len() > config.max_points);
        assert_eq!(result.reductions, 6);
        assert_eq!(result.cell_size_used, 3.0);
        assert!(result.cloud.len() > config.max_points);
        assert_eq!(result.cloud, voxel_grid_reduce(&cloud, 3.0));
    }

    #[test]
    fn vanishing_step_saturates_reduction_bound() {
        let config = FilterConfig {
            cell_size_step: f64::MIN_POSITIVE,
            ..dynamic_config()
        };
        assert_eq!(AdaptiveCellSizeController::max_reductions(&config), usize::MAX);

        let config = FilterConfig {
            cell_size_step: 1e-300,
            ..dynamic_config()
        };
        assert_eq!(AdaptiveCellSizeController::max_reductions(&config), usize::MAX);
    }

    #[test]
    fn second_identical_frame_converges_no_slower() {
        let config = FilterConfig {
            cell_size: 3.0,
            min_points: 60,
            max_points: 120,
            ..dynamic_config()
        };
        let cloud = line(200, 0.25);
        let mut controller = AdaptiveCellSizeController::from_config(&config);

        let first = controller.process(&cloud, &config);
        let converged = controller.state().current_cell_size;
        let second = controller.process(&cloud, &config);

        assert!(first.reductions > 1);
        assert!(second.reductions <= first.reductions);
        assert_eq!(second.reductions, 1);
        assert_eq!(second.cell_size_used, converged);
        assert_eq!(second.cloud.len(), first.cloud.len());
    }

    #[test]
    fn max_reductions_bound() {
        let config = dynamic_config();
        // (3.0 - 0.2) / 0.2 = 14 steps plus the initial pass
        assert_eq!(AdaptiveCellSizeController::max_reductions(&config), 15);

        let stuck = FilterConfig {
            cell_size_step: -1.0,
            ..dynamic_config()
        };
        assert_eq!(AdaptiveCellSizeController::max_reductions(&stuck), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn search_terminates_within_bound(
            n in 0usize..400,
            spacing in 0.05f64..2.0,
            seed_size in 0.0f64..6.0,
            step in 0.05f64..1.0,
            min_cell in 0.0f64..1.0,
            extra in 0.0f64..4.0,
            min_points in 0usize..300,
            width in 0usize..300,
        ) {
            let config = FilterConfig {
                dynamic_mode: true,
                cell_size: seed_size,
                cell_size_step: step,
                min_cell_size: min_cell,
                max_cell_size: min_cell.max(0.1) + extra,
                min_points,
                max_points: min_points + width,
                ..FilterConfig::default()
            };
            let mut controller = AdaptiveCellSizeController::new(seed_size);
            let result = controller.process(&line(n, spacing), &config);
            let (lo, hi) = config.cell_size_bounds();

            prop_assert!(result.reductions <= AdaptiveCellSizeController::max_reductions(&config));
            prop_assert!(result.cell_size_used >= lo - 1e-9);
            prop_assert!(result.cell_size_used <= hi + 1e-9);
            prop_assert_eq!(controller.state().current_cell_size, result.cell_size_used);
        }
    }
}
