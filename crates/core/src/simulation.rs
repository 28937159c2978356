//! Simulator façade driven by the host's per-frame loop
//!
//! [`BeerSimulator`] is the engine handle: built once with fixed dimensions,
//! stepped with `(acceleration, dt)` every frame, queried for a render
//! snapshot, and released at teardown. Everything runs inside the caller's
//! invocation; there are no background threads or queues, and the only
//! allocation happens at construction.

use std::borrow::Cow;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SimulatorConfig, MAX_GRID_CELLS};
use crate::core_types::{Acceleration, Vec2};
use crate::error::SimulatorError;
use crate::solver::{
    cosmetic_tilt, create_fluid_solver, project_to_plane, FluidSolver, TiltAngles, TiltFilter,
};

/// Render snapshot of the fluid grid.
///
/// `cells` holds every level in row-major order (`y * width + x`, row 0 at the
/// top of the container). Borrowed from the engine, so producing one costs no
/// allocation; use [`FluidState::into_owned`] to keep it past the next update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluidState<'a> {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Cell levels in row-major order
    pub cells: Cow<'a, [f32]>,
    /// Cosmetic container tilt around the horizontal axis (degrees)
    pub tilt_x_deg: f32,
    /// Cosmetic container tilt around the screen normal (degrees)
    pub tilt_z_deg: f32,
}

impl FluidState<'_> {
    /// Detach the snapshot from the engine
    #[must_use]
    pub fn into_owned(self) -> FluidState<'static> {
        FluidState {
            width: self.width,
            height: self.height,
            cells: Cow::Owned(self.cells.into_owned()),
            tilt_x_deg: self.tilt_x_deg,
            tilt_z_deg: self.tilt_z_deg,
        }
    }

    /// Level at a cell, `None` when out of bounds
    #[must_use]
    pub fn level_at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Mean level of one row, `None` when out of bounds
    #[must_use]
    pub fn row_mean(&self, y: u32) -> Option<f32> {
        if y >= self.height || self.width == 0 {
            return None;
        }
        let start = y as usize * self.width as usize;
        let row = self.cells.get(start..start + self.width as usize)?;
        Some(row.iter().sum::<f32>() / self.width as f32)
    }

    /// Mean level of one column, `None` when out of bounds
    #[must_use]
    pub fn column_mean(&self, x: u32) -> Option<f32> {
        if x >= self.width || self.height == 0 {
            return None;
        }
        let sum: f32 = (0..self.height).filter_map(|y| self.level_at(x, y)).sum();
        Some(sum / self.height as f32)
    }

    /// Sum of all cell levels
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cells.iter().map(|&v| f64::from(v)).sum()
    }
}

/// Diagnostic statistics for the running simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationStats {
    /// Sum of all cell levels
    pub total_volume: f64,
    /// Sum of all cell levels at construction
    pub initial_volume: f64,
    /// Lowest cell level
    pub min_level: f32,
    /// Highest cell level
    pub max_level: f32,
    /// Sum of squared net flows (kinetic energy proxy)
    pub flow_energy: f64,
    /// Number of `update` calls
    pub step_count: u64,
    /// Accumulated clamped `dt` (seconds)
    pub simulated_time: f64,
    /// Substeps used by the most recent update (0 when it advanced nothing)
    pub last_substeps: u32,
    /// Cells repaired from non-finite values since construction
    pub repaired_cells: u64,
    /// Current filtered forcing in grid coordinates (m/s²)
    pub forcing_x: f32,
    pub forcing_y: f32,
}

/// Liquid-in-a-glass simulator
///
/// Owns the fluid grid, its flow buffers, and the tilt filter. Designed for a
/// single owner stepping it sequentially.
pub struct BeerSimulator {
    solver: Box<dyn FluidSolver>,
    filter: TiltFilter,
    config: SimulatorConfig,
    width: u32,
    height: u32,
    initial_volume: f64,

    // Statistics
    step_count: u64,
    simulated_time: f64,
    last_substeps: u32,
    repaired_cells: u64,
}

impl BeerSimulator {
    /// Create a simulator with the default (beer) configuration
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidDimensions`] if either dimension is zero
    /// and [`SimulatorError::GridTooLarge`] beyond [`MAX_GRID_CELLS`].
    pub fn new(width: u32, height: u32) -> Result<Self, SimulatorError> {
        Self::with_config(width, height, SimulatorConfig::default())
    }

    /// Create a simulator with a custom configuration
    ///
    /// # Errors
    ///
    /// Same as [`BeerSimulator::new`], plus [`SimulatorError::InvalidConfig`]
    /// when `config` fails validation.
    pub fn with_config(
        width: u32,
        height: u32,
        config: SimulatorConfig,
    ) -> Result<Self, SimulatorError> {
        if width == 0 || height == 0 {
            return Err(SimulatorError::InvalidDimensions { width, height });
        }
        let cells = u64::from(width) * u64::from(height);
        if cells > MAX_GRID_CELLS {
            return Err(SimulatorError::GridTooLarge {
                cells,
                max_cells: MAX_GRID_CELLS,
            });
        }
        config.validate()?;

        let solver = create_fluid_solver(width as usize, height as usize, &config);
        let initial_volume = solver.total_volume();

        info!(
            "Created {}x{} beer simulator (rest level {}, container bound {}, {} substep(s) at max dt)",
            width,
            height,
            config.rest_depth,
            config.max_depth,
            config.substeps_for(config.max_dt)
        );

        Ok(Self {
            solver,
            filter: TiltFilter::new(config.filter_time_constant),
            config,
            width,
            height,
            initial_volume,
            step_count: 0,
            simulated_time: 0.0,
            last_substeps: 0,
            repaired_cells: 0,
        })
    }

    /// Advance the fluid by one timestep.
    ///
    /// Never fails: `dt` is clamped into `[0, max_dt]`, non-finite
    /// acceleration components count as zero, and numerical trouble is
    /// repaired inside the solver.
    ///
    /// # Arguments
    ///
    /// * `acceleration` - Latest accelerometer sample (device coordinates, m/s²)
    /// * `dt` - Seconds since the previous sample
    pub fn update(&mut self, acceleration: Acceleration, dt: f32) {
        let clamped_dt = self.config.clamp_dt(dt);
        if clamped_dt != dt {
            debug!("Clamped dt {} to {}", dt, clamped_dt);
        }
        if !acceleration.is_finite() {
            debug!(
                "Non-finite acceleration sample {:?}, treating those components as zero",
                acceleration
            );
        }

        let raw = project_to_plane(
            acceleration,
            self.config.tilt_gain,
            self.config.max_forcing,
        );
        let forcing = self.filter.apply(raw, clamped_dt);
        self.step_count += 1;

        if clamped_dt <= 0.0 {
            self.last_substeps = 0;
            return;
        }

        let substeps = self.config.substeps_for(clamped_dt);
        let sub_dt = clamped_dt / substeps as f32;
        for _ in 0..substeps {
            let report = self.solver.step(forcing, sub_dt);
            self.repaired_cells += report.repaired_cells as u64;
        }

        self.last_substeps = substeps;
        self.simulated_time += f64::from(clamped_dt);
    }

    /// Snapshot of the grid for rendering.
    ///
    /// `acceleration` only drives the cosmetic container tilt; the fluid is
    /// untouched. Calling this any number of times between updates returns the
    /// same cells.
    #[must_use]
    pub fn get_state(&self, acceleration: Acceleration) -> FluidState<'_> {
        let tilt = self.tilt_angles(acceleration);
        FluidState {
            width: self.width,
            height: self.height,
            cells: self.solver.read_levels(),
            tilt_x_deg: tilt.tilt_x_deg,
            tilt_z_deg: tilt.tilt_z_deg,
        }
    }

    /// Copy the cell levels into a caller-owned buffer.
    ///
    /// Copies `min(out.len(), cell_count)` values and returns the number copied.
    pub fn copy_levels_into(&self, out: &mut [f32]) -> usize {
        self.solver.copy_levels_into(out)
    }

    /// Cosmetic container tilt for an acceleration sample
    #[must_use]
    pub fn tilt_angles(&self, acceleration: Acceleration) -> TiltAngles {
        cosmetic_tilt(
            acceleration,
            self.config.tilt_sensitivity,
            self.config.max_tilt_x_deg,
            self.config.max_tilt_z_deg,
        )
    }

    /// Current filtered forcing in grid coordinates
    #[must_use]
    pub fn forcing(&self) -> Vec2 {
        self.filter.value()
    }

    /// Diagnostic statistics
    #[must_use]
    pub fn stats(&self) -> SimulationStats {
        let (min_level, max_level) = self.solver.level_range();
        let forcing = self.filter.value();
        SimulationStats {
            total_volume: self.solver.total_volume(),
            initial_volume: self.initial_volume,
            min_level,
            max_level,
            flow_energy: self.solver.flow_energy(),
            step_count: self.step_count,
            simulated_time: self.simulated_time,
            last_substeps: self.last_substeps,
            repaired_cells: self.repaired_cells,
            forcing_x: forcing.x,
            forcing_y: forcing.y,
        }
    }

    /// Return to the quiescent state without reallocating
    pub fn reset(&mut self) {
        self.solver.reset();
        self.filter.reset();
        self.step_count = 0;
        self.simulated_time = 0.0;
        self.last_substeps = 0;
        self.repaired_cells = 0;
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells in the grid
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// One-line description of the engine, for host-side logging
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "Beer simulator ready for {}x{} area ({} cells, rest level {}).",
            self.width,
            self.height,
            self.cell_count(),
            self.config.rest_depth
        )
    }

    /// Release the engine and all of its storage.
    ///
    /// Consumes the simulator, so it cannot be used afterwards.
    pub fn release(self) {
        info!(
            "Releasing {}x{} beer simulator after {} steps ({:.2}s simulated)",
            self.width, self.height, self.step_count, self.simulated_time
        );
        drop(self);
    }
}

impl std::fmt::Debug for BeerSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeerSimulator")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("config", &self.config)
            .field("step_count", &self.step_count)
            .field("simulated_time", &self.simulated_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_starts_quiescent() {
        let sim = BeerSimulator::new(30, 50).unwrap();
        let state = sim.get_state(Acceleration::LEVEL);

        assert_eq!(state.width, 30);
        assert_eq!(state.height, 50);
        assert_eq!(state.cells.len(), 1500);
        assert!(state.cells.iter().all(|&h| h == 1.0));
        assert_eq!(sim.stats().flow_energy, 0.0);
        assert_eq!(sim.stats().step_count, 0);
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert_eq!(
            BeerSimulator::new(0, 10).unwrap_err(),
            SimulatorError::InvalidDimensions {
                width: 0,
                height: 10
            }
        );
        assert!(BeerSimulator::new(10, 0).is_err());
    }

    #[test]
    fn test_rejects_huge_grid() {
        assert!(matches!(
            BeerSimulator::new(5000, 5000),
            Err(SimulatorError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SimulatorConfig {
            rest_depth: -1.0,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            BeerSimulator::with_config(10, 10, config),
            Err(SimulatorError::InvalidConfig {
                parameter: "rest_depth",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_dt_advances_nothing() {
        let mut sim = BeerSimulator::new(8, 8).unwrap();
        sim.update(Acceleration::UPRIGHT, 0.0);
        sim.update(Acceleration::UPRIGHT, -3.0);
        sim.update(Acceleration::UPRIGHT, f32::NAN);

        let stats = sim.stats();
        assert_eq!(stats.step_count, 3);
        assert_eq!(stats.simulated_time, 0.0);
        assert_eq!(stats.last_substeps, 0);
        assert_eq!(stats.forcing_y, 0.0);
        assert!(sim.get_state(Acceleration::LEVEL).cells.iter().all(|&h| h == 1.0));
    }

    #[test]
    fn test_snapshot_metadata_and_tilt() {
        let mut sim = BeerSimulator::new(4, 3).unwrap();
        sim.update(Acceleration::new(-1.0, 2.0, 9.0), 1.0 / 60.0);

        let state = sim.get_state(Acceleration::new(-2.0, 3.0, 9.0));
        assert_relative_eq!(state.tilt_z_deg, 10.0);
        assert_relative_eq!(state.tilt_x_deg, 15.0);
        assert_eq!(state.level_at(3, 2), Some(state.cells[11]));
        assert_eq!(state.level_at(4, 0), None);
        assert!(state.row_mean(2).is_some());
        assert!(state.column_mean(3).is_some());
        assert_eq!(state.row_mean(3), None);

        let owned = state.clone().into_owned();
        assert_eq!(owned, state);
    }

    #[test]
    fn test_copy_levels_into_matches_snapshot() {
        let mut sim = BeerSimulator::new(5, 5).unwrap();
        for _ in 0..10 {
            sim.update(Acceleration::new(-4.0, 0.0, 8.0), 1.0 / 30.0);
        }

        let mut buffer = vec![0.0; sim.cell_count()];
        assert_eq!(sim.copy_levels_into(&mut buffer), 25);
        assert_eq!(&buffer[..], &sim.get_state(Acceleration::LEVEL).cells[..]);

        let mut short = [0.0; 3];
        assert_eq!(sim.copy_levels_into(&mut short), 3);
    }

    #[test]
    fn test_reset_restores_quiescence() {
        let mut sim = BeerSimulator::new(6, 6).unwrap();
        for _ in 0..30 {
            sim.update(Acceleration::UPRIGHT, 1.0 / 60.0);
        }
        assert!(sim.stats().flow_energy > 0.0);

        sim.reset();
        let stats = sim.stats();
        assert_eq!(stats.flow_energy, 0.0);
        assert_eq!(stats.step_count, 0);
        assert_eq!((stats.min_level, stats.max_level), (1.0, 1.0));
        assert_eq!(sim.forcing(), Vec2::zeros());
    }

    #[test]
    fn test_describe_and_release() {
        let sim = BeerSimulator::new(300, 500).unwrap();
        assert_eq!(
            sim.describe(),
            "Beer simulator ready for 300x500 area (150000 cells, rest level 1)."
        );
        sim.release();
    }
}
