//! CPU-based fluid solver implementation
//!
//! This module provides the CPU implementation of the `FluidSolver` trait using
//! `Vec<f32>` arrays and Rayon for per-row parallelism.

use std::borrow::Cow;

use super::conservation::{enforce_conservation, ConservationReport};
use super::fields::{FieldData, FlowField};
use super::pipes::{step_levels_cpu, step_pipe_flow_cpu, PipeParams};
use super::FluidSolver;
use crate::config::SimulatorConfig;
use crate::core_types::Vec2;

/// CPU-based virtual-pipe solver using Rayon for parallelism
///
/// All storage is allocated in [`CpuFluidSolver::new`]; stepping only swaps
/// the two level buffers.
pub struct CpuFluidSolver {
    // Ping-pong buffers for the level field (read from one, write to other, then swap)
    levels: FieldData,
    levels_back: FieldData,

    flows: FlowField,

    // Physics taken from the config at construction
    gravity: f32,
    damping: f32,
    max_flow: f32,
    rest_depth: f32,
    max_depth: f32,

    // Volume recorded at rest; every substep is corrected back to it
    target_volume: f64,

    // Grid dimensions
    width: usize,
    height: usize,
    cell_size: f32,
}

impl CpuFluidSolver {
    /// Create a new CPU fluid solver at the quiescent state
    ///
    /// The config is expected to have been validated.
    ///
    /// # Arguments
    ///
    /// * `width` - Grid width in cells (non-zero)
    /// * `height` - Grid height in cells (non-zero)
    /// * `config` - Physics parameters
    #[must_use]
    pub fn new(width: usize, height: usize, config: &SimulatorConfig) -> Self {
        let levels = FieldData::with_value(width, height, config.rest_depth);
        let target_volume = levels.sum();

        Self {
            levels,
            levels_back: FieldData::new(width, height),
            flows: FlowField::new(width, height),
            gravity: config.gravity,
            damping: config.damping,
            max_flow: config.max_velocity * config.cell_size * config.max_depth,
            rest_depth: config.rest_depth,
            max_depth: config.max_depth,
            target_volume,
            width,
            height,
            cell_size: config.cell_size,
        }
    }

    /// Volume every substep is corrected back to
    #[must_use]
    pub fn target_volume(&self) -> f64 {
        self.target_volume
    }

    /// Level field as a [`FieldData`] (for row queries)
    #[must_use]
    pub fn levels(&self) -> &FieldData {
        &self.levels
    }
}

impl FluidSolver for CpuFluidSolver {
    fn step(&mut self, forcing: Vec2, dt: f32) -> ConservationReport {
        let params = PipeParams {
            dt,
            cell_size: self.cell_size,
            gravity: self.gravity,
            damping: self.damping,
            forcing,
            max_flow: self.max_flow,
            max_level: self.max_depth,
        };

        step_pipe_flow_cpu(
            self.levels.as_slice(),
            self.flows.as_mut_slice(),
            self.width,
            self.height,
            params,
        );

        step_levels_cpu(
            self.levels.as_slice(),
            self.levels_back.as_mut_slice(),
            self.flows.as_slice(),
            self.width,
            self.height,
            params,
        );

        // Swap buffers
        std::mem::swap(&mut self.levels, &mut self.levels_back);

        enforce_conservation(
            self.levels.as_mut_slice(),
            self.flows.as_mut_slice(),
            self.width,
            self.target_volume,
            self.max_depth,
        )
    }

    fn read_levels(&self) -> Cow<'_, [f32]> {
        Cow::Borrowed(self.levels.as_slice())
    }

    fn total_volume(&self) -> f64 {
        self.levels.sum()
    }

    fn flow_energy(&self) -> f64 {
        self.flows.energy()
    }

    fn level_range(&self) -> (f32, f32) {
        self.levels.min_max()
    }

    fn reset(&mut self) {
        self.levels.fill(self.rest_depth);
        self.levels_back.fill(0.0);
        self.flows.clear();
    }
}
