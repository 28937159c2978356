//! Conservation and containment corrections applied after every substep
//!
//! The pipe kernels conserve volume up to float rounding and keep levels inside
//! `[0, max_level]` up to rounding, but a single non-finite value would spread
//! through the grid and rescaling can nudge a full cell past the bound. This
//! pass runs in three stages:
//!
//! 1. **Repair**: non-finite levels become 0, non-finite flows are stopped,
//!    slightly negative levels from rounding are clamped to 0.
//! 2. **Renormalise**: levels are scaled so the total matches the volume
//!    recorded at construction. If the grid is somehow empty, the volume is
//!    restored as a flat sheet.
//! 3. **Contain**: levels above `max_level` are cut and the excess spills into
//!    the neighbours with headroom. The pipe kernels already refuse to fill a
//!    cell past the bound, so this only mops up rounding and the volume
//!    rescale. Excess trapped inside a full region falls back to a grid-wide
//!    spread. The total volume is always below `cells × max_level`, so the
//!    headroom always suffices and no cell is pushed over the bound.

use rayon::prelude::*;
use tracing::warn;

use super::fields::PipeFlow;

/// Relative drift below which renormalisation is skipped
const VOLUME_TOLERANCE: f64 = 1e-7;

/// What one conservation pass had to correct
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConservationReport {
    /// Cells whose level or flow was non-finite
    pub repaired_cells: usize,
    /// Scale applied to restore the target volume (1.0 when untouched,
    /// infinite when an empty grid had to be refilled)
    pub volume_scale: f64,
    /// Volume moved from over-full cells into headroom elsewhere
    pub redistributed: f64,
}

/// Replace non-finite values and clamp negative levels.
///
/// Returns the number of cells that held a non-finite level or flow.
pub fn repair_non_finite(levels: &mut [f32], flows: &mut [PipeFlow]) -> usize {
    levels
        .par_iter_mut()
        .zip(flows.par_iter_mut())
        .map(|(level, flow)| {
            let mut repaired = false;
            if !level.is_finite() {
                *level = 0.0;
                repaired = true;
            } else if *level < 0.0 {
                *level = 0.0;
            }
            if !flow.is_finite() {
                *flow = PipeFlow::default();
                repaired = true;
            }
            usize::from(repaired)
        })
        .sum()
}

/// Scale levels so their sum equals `target_volume`.
///
/// Returns the scale factor applied.
pub fn renormalize_volume(levels: &mut [f32], target_volume: f64) -> f64 {
    if levels.is_empty() {
        return 1.0;
    }

    // Sequential reductions keep the result independent of thread scheduling
    let total: f64 = levels.iter().map(|&v| f64::from(v)).sum();
    if total <= f64::EPSILON {
        // Everything was repaired away; restore the liquid as a flat sheet
        let flat = (target_volume / levels.len() as f64) as f32;
        levels.fill(flat);
        return f64::INFINITY;
    }

    let scale = target_volume / total;
    if (scale - 1.0).abs() > VOLUME_TOLERANCE {
        let factor = scale as f32;
        levels.par_iter_mut().for_each(|v| *v *= factor);
    }
    scale
}

/// Sweeps of neighbour spilling before the remainder is spread over the grid
const LOCAL_SPILL_SWEEPS: usize = 4;

/// Cap levels at `max_level`, spilling the excess into neighbouring headroom.
///
/// Each over-full cell hands its excess to its four neighbours in proportion
/// to their headroom. Excess trapped inside a region of full cells after a few
/// sweeps is spread over every cell with headroom instead.
///
/// Returns the volume moved.
pub fn contain_levels(levels: &mut [f32], width: usize, max_level: f32) -> f64 {
    if width == 0 {
        return 0.0;
    }
    let height = levels.len() / width;
    let mut moved = 0.0;

    for _ in 0..LOCAL_SPILL_SWEEPS {
        let mut spilled = false;
        for idx in 0..levels.len() {
            let excess = levels[idx] - max_level;
            if excess <= 0.0 {
                continue;
            }

            let (x, y) = (idx % width, idx / width);
            let neighbors = [
                if x > 0 { Some(idx - 1) } else { None },
                if x + 1 < width { Some(idx + 1) } else { None },
                if y > 0 { Some(idx - width) } else { None },
                if y + 1 < height { Some(idx + width) } else { None },
            ];
            let headroom: f32 = neighbors
                .iter()
                .flatten()
                .map(|&n| (max_level - levels[n]).max(0.0))
                .sum();
            if headroom <= 0.0 {
                continue;
            }

            let give = excess.min(headroom);
            let share = give / headroom;
            for &n in neighbors.iter().flatten() {
                let room = (max_level - levels[n]).max(0.0);
                levels[n] = (levels[n] + room * share).min(max_level);
            }
            levels[idx] -= give;
            moved += f64::from(give);
            spilled = true;
        }
        if !spilled {
            break;
        }
    }

    moved + spread_into_headroom(levels, max_level)
}

/// Cut every level above `max_level` and spread the excess over all cells in
/// proportion to their remaining headroom.
///
/// Returns the volume moved.
fn spread_into_headroom(levels: &mut [f32], max_level: f32) -> f64 {
    let excess: f64 = levels
        .iter()
        .map(|&v| f64::from((v - max_level).max(0.0)))
        .sum();
    if excess <= 0.0 {
        return 0.0;
    }

    levels.par_iter_mut().for_each(|v| *v = v.min(max_level));

    let headroom: f64 = levels.iter().map(|&v| f64::from(max_level - v)).sum();
    if headroom <= 0.0 {
        return 0.0;
    }

    let share = (excess / headroom).min(1.0) as f32;
    levels
        .par_iter_mut()
        .for_each(|v| *v = (*v + (max_level - *v) * share).min(max_level));

    excess
}

/// Run all three stages in order.
pub fn enforce_conservation(
    levels: &mut [f32],
    flows: &mut [PipeFlow],
    width: usize,
    target_volume: f64,
    max_level: f32,
) -> ConservationReport {
    let repaired_cells = repair_non_finite(levels, flows);
    if repaired_cells > 0 {
        warn!(
            "Repaired {} non-finite cells in the fluid grid",
            repaired_cells
        );
    }

    let volume_scale = renormalize_volume(levels, target_volume);
    let redistributed = contain_levels(levels, width, max_level);

    ConservationReport {
        repaired_cells,
        volume_scale,
        redistributed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_repair_replaces_non_finite() {
        let mut levels = vec![1.0, f32::NAN, -1e-7, f32::INFINITY];
        let mut flows = vec![PipeFlow::default(); 4];
        flows[0].right = f32::NAN;

        let repaired = repair_non_finite(&mut levels, &mut flows);
        assert_eq!(repaired, 3);
        assert_eq!(levels, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(flows[0], PipeFlow::default());
    }

    #[test]
    fn test_renormalize_restores_target() {
        let mut levels = vec![1.0, 2.0, 1.0, 0.0];
        let scale = renormalize_volume(&mut levels, 8.0);
        assert_relative_eq!(scale, 2.0);
        assert_eq!(levels, vec![2.0, 4.0, 2.0, 0.0]);

        // Within tolerance: untouched
        let mut levels = vec![1.0; 4];
        renormalize_volume(&mut levels, 4.0);
        assert_eq!(levels, vec![1.0; 4]);
    }

    #[test]
    fn test_renormalize_refills_empty_grid() {
        let mut levels = vec![0.0; 4];
        renormalize_volume(&mut levels, 6.0);
        assert_eq!(levels, vec![1.5; 4]);
    }

    #[test]
    fn test_contain_spills_into_neighbours() {
        // 3x3, over-full centre
        let mut levels = vec![1.0; 9];
        levels[4] = 3.0;
        let moved = contain_levels(&mut levels, 3, 2.5);

        assert_relative_eq!(moved, 0.5, epsilon = 1e-6);
        assert_eq!(levels[4], 2.5);
        for corner in [0, 2, 6, 8] {
            assert_eq!(levels[corner], 1.0);
        }
        for edge in [1, 3, 5, 7] {
            assert_relative_eq!(levels[edge], 1.125, epsilon = 1e-6);
        }
        assert_relative_eq!(levels.iter().sum::<f32>(), 11.0, epsilon = 1e-5);
    }

    #[test]
    fn test_contain_falls_back_when_surrounded() {
        // 5x3, full except the last column, over-full cell boxed in by full cells
        let mut levels = vec![2.5; 15];
        for y in 0..3 {
            levels[y * 5 + 4] = 0.0;
        }
        levels[6] = 3.0;

        let moved = contain_levels(&mut levels, 5, 2.5);
        assert_relative_eq!(moved, 0.5, epsilon = 1e-6);
        assert_eq!(levels[6], 2.5);
        assert!(levels.iter().all(|&v| v <= 2.5));
        for y in 0..3 {
            assert_relative_eq!(levels[y * 5 + 4], 0.5 / 3.0, epsilon = 1e-5);
        }
        assert_relative_eq!(levels.iter().sum::<f32>(), 30.5, epsilon = 1e-4);
    }

    #[test]
    fn test_contain_leaves_bounded_levels_alone() {
        let mut levels = vec![0.0, 2.5, 1.0, 2.0];
        assert_eq!(contain_levels(&mut levels, 2, 2.5), 0.0);
        assert_eq!(levels, vec![0.0, 2.5, 1.0, 2.0]);
    }

    #[test]
    fn test_enforce_reports_work_done() {
        let mut levels = vec![1.0, f32::NAN, 3.0, 0.0];
        let mut flows = vec![PipeFlow::default(); 4];
        let report = enforce_conservation(&mut levels, &mut flows, 2, 4.0, 2.0);

        assert_eq!(report.repaired_cells, 1);
        assert!(levels.iter().all(|v| v.is_finite() && *v <= 2.0 && *v >= 0.0));
        assert_relative_eq!(levels.iter().sum::<f32>(), 4.0, epsilon = 1e-5);
    }
}
