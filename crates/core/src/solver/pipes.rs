//! Virtual-pipe shallow-water kernels
//!
//! Each cell is connected to its four neighbours by virtual pipes. Flow
//! through a pipe accelerates with the head difference between the two cells:
//!
//! ```text
//! head_i − head_j = g (h_i − h_j) + F · (r_j − r_i)
//! ∂f_ij/∂t        = A_ij × (head_i − head_j) / l − k f_ij
//! ∂h_i/∂t         = (Σ f_ji − Σ f_ij) / l²
//! ```
//!
//! Where:
//! - `F` is the filtered tilt forcing, so a tilt is a linear potential across the grid
//! - `A_ij = l × (h_i + h_j) / 2` is the wetted cross-section of the pipe
//! - `k` is the damping rate, applied implicitly so it never overshoots
//!
//! Outflows are kept non-negative and scaled so a cell never sends more than it
//! holds, which keeps every level non-negative. A pipe never carries more than
//! a quarter of the receiving cell's headroom below `max_level` per substep, so
//! four senders together cannot overfill it and a full cell behaves like the
//! container floor. Pipes through the container walls do not exist, so no
//! fluid leaves the grid.

use rayon::prelude::*;

use super::fields::PipeFlow;
use crate::core_types::Vec2;

/// Physics parameters for one pipe-model substep
#[derive(Debug, Clone, Copy)]
pub struct PipeParams {
    /// Substep in seconds
    pub dt: f32,
    /// Cell edge length (pipe length)
    pub cell_size: f32,
    /// Restoring acceleration (m/s²)
    pub gravity: f32,
    /// Damping rate (1/s)
    pub damping: f32,
    /// In-plane forcing in grid coordinates (m/s²)
    pub forcing: Vec2,
    /// Cap on each outflow (volume/s)
    pub max_flow: f32,
    /// Physical bound of the container; pipes stop filling a cell at this level
    pub max_level: f32,
}

/// Update every cell's outflows from the current levels.
///
/// Reads `levels`, writes `flows` in place (each cell only touches its own
/// outflows, so rows run in parallel).
pub fn step_pipe_flow_cpu(
    levels: &[f32],
    flows: &mut [PipeFlow],
    width: usize,
    height: usize,
    params: PipeParams,
) {
    let decay = 1.0 / (1.0 + params.damping * params.dt);
    let push_x = params.forcing.x * params.cell_size;
    let push_y = params.forcing.y * params.cell_size;
    let cell_area = params.cell_size * params.cell_size;
    // Converts a receiver's headroom into the largest rate one pipe may deliver
    let fill_rate = if params.dt > 0.0 {
        0.25 * cell_area / params.dt
    } else {
        0.0
    };

    flows
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, flow) in row.iter_mut().enumerate() {
                let idx = y * width + x;
                let level = levels[idx];

                let accelerate = |old: f32, neighbor: f32, push: f32| -> f32 {
                    let section = 0.5 * (level + neighbor);
                    let head = params.gravity * (level - neighbor) + push;
                    let capacity = (params.max_level - neighbor).max(0.0) * fill_rate;
                    (old * decay + params.dt * section * head)
                        .clamp(0.0, params.max_flow)
                        .min(capacity)
                };

                // Walls: no pipe, no flow
                flow.left = if x > 0 {
                    accelerate(flow.left, levels[idx - 1], -push_x)
                } else {
                    0.0
                };
                flow.right = if x + 1 < width {
                    accelerate(flow.right, levels[idx + 1], push_x)
                } else {
                    0.0
                };
                flow.up = if y > 0 {
                    accelerate(flow.up, levels[idx - width], -push_y)
                } else {
                    0.0
                };
                flow.down = if y + 1 < height {
                    accelerate(flow.down, levels[idx + width], push_y)
                } else {
                    0.0
                };

                // Never drain more than the cell holds during this substep
                let drained = flow.total() * params.dt;
                let available = level.max(0.0) * cell_area;
                if drained > available {
                    flow.scale(available / drained);
                }
            }
        });
}

/// Integrate levels from the current outflows.
///
/// Reads `levels_in` and `flows`, writes `levels_out`.
pub fn step_levels_cpu(
    levels_in: &[f32],
    levels_out: &mut [f32],
    flows: &[PipeFlow],
    width: usize,
    height: usize,
    params: PipeParams,
) {
    let inv_area = 1.0 / (params.cell_size * params.cell_size);

    levels_out
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, level_out) in row.iter_mut().enumerate() {
                let idx = y * width + x;

                let mut inflow = 0.0;
                if x > 0 {
                    inflow += flows[idx - 1].right;
                }
                if x + 1 < width {
                    inflow += flows[idx + 1].left;
                }
                if y > 0 {
                    inflow += flows[idx - width].down;
                }
                if y + 1 < height {
                    inflow += flows[idx + width].up;
                }

                let outflow = flows[idx].total();
                *level_out = levels_in[idx] + params.dt * (inflow - outflow) * inv_area;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(forcing: Vec2) -> PipeParams {
        PipeParams {
            dt: 0.05,
            cell_size: 1.0,
            gravity: 9.81,
            damping: 1.0,
            forcing,
            max_flow: 100.0,
            max_level: 10.0,
        }
    }

    #[test]
    fn test_flat_levels_without_forcing_do_not_flow() {
        let levels = vec![1.0; 16];
        let mut flows = vec![PipeFlow::default(); 16];
        step_pipe_flow_cpu(&levels, &mut flows, 4, 4, params(Vec2::zeros()));
        assert!(flows.iter().all(|f| *f == PipeFlow::default()));
    }

    #[test]
    fn test_walls_have_no_outflow() {
        let levels = vec![1.0; 9];
        let mut flows = vec![PipeFlow::default(); 9];
        step_pipe_flow_cpu(&levels, &mut flows, 3, 3, params(Vec2::new(5.0, 5.0)));

        // Forcing pushes right and down; the right column and bottom row are walls
        for y in 0..3 {
            assert_eq!(flows[y * 3 + 2].right, 0.0);
        }
        for x in 0..3 {
            assert_eq!(flows[2 * 3 + x].down, 0.0);
        }
        assert!(flows[0].right > 0.0);
        assert!(flows[0].down > 0.0);
        assert_eq!(flows[0].left, 0.0);
        assert_eq!(flows[0].up, 0.0);
    }

    #[test]
    fn test_mound_spreads_and_conserves_volume() {
        let width = 5;
        let height = 5;
        let mut levels = vec![1.0; width * height];
        levels[12] = 2.0;
        let mut flows = vec![PipeFlow::default(); width * height];
        let mut next = vec![0.0; width * height];

        let p = params(Vec2::zeros());
        step_pipe_flow_cpu(&levels, &mut flows, width, height, p);
        step_levels_cpu(&levels, &mut next, &flows, width, height, p);

        assert!(next[12] < 2.0);
        assert!(next[11] > 1.0 && next[13] > 1.0 && next[7] > 1.0 && next[17] > 1.0);

        let before: f32 = levels.iter().sum();
        let after: f32 = next.iter().sum();
        assert_relative_eq!(before, after, epsilon = 1e-4);
    }

    #[test]
    fn test_outflow_never_exceeds_contents() {
        let mut levels = vec![0.0; 4];
        levels[0] = 0.01;
        let mut flows = vec![PipeFlow::default(); 4];
        let mut next = vec![0.0; 4];

        let p = PipeParams {
            dt: 0.1,
            ..params(Vec2::new(40.0, 40.0))
        };
        step_pipe_flow_cpu(&levels, &mut flows, 2, 2, p);
        step_levels_cpu(&levels, &mut next, &flows, 2, 2, p);

        assert!(next.iter().all(|&h| h >= -1e-6));
        assert_relative_eq!(next.iter().sum::<f32>(), 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_full_cells_take_no_inflow() {
        // Single column pushed hard toward the bottom row, which is already full
        let levels = vec![2.0, 2.0, 2.5];
        let mut flows = vec![PipeFlow::default(); 3];
        let mut next = vec![0.0; 3];

        let p = PipeParams {
            max_level: 2.5,
            ..params(Vec2::new(0.0, 9.81))
        };
        step_pipe_flow_cpu(&levels, &mut flows, 1, 3, p);
        step_levels_cpu(&levels, &mut next, &flows, 1, 3, p);

        assert_eq!(flows[1].down, 0.0);
        assert!(flows[0].down > 0.0);
        assert!(next.iter().all(|&h| h <= 2.5));
        assert_relative_eq!(next.iter().sum::<f32>(), 6.5, epsilon = 1e-5);
    }

    #[test]
    fn test_many_senders_cannot_overfill() {
        // Mound of full cells around a nearly full centre, strong push in both axes
        let mut levels = vec![2.5; 9];
        levels[4] = 2.4;
        let mut flows = vec![PipeFlow::default(); 9];
        let mut next = vec![0.0; 9];

        let p = PipeParams {
            dt: 0.1,
            max_level: 2.5,
            ..params(Vec2::new(3.0, 3.0))
        };
        for _ in 0..5 {
            step_pipe_flow_cpu(&levels, &mut flows, 3, 3, p);
            step_levels_cpu(&levels, &mut next, &flows, 3, 3, p);
            levels.copy_from_slice(&next);
            assert!(levels.iter().all(|&h| h <= 2.5 + 1e-6), "{levels:?}");
        }
        assert_relative_eq!(levels.iter().sum::<f32>(), 22.4, epsilon = 1e-4);
    }
}
