//! Fluid solver trait definition
//!
//! This module defines the `FluidSolver` trait, the backend-agnostic interface
//! the simulator drives once per substep.

use std::borrow::Cow;

use super::conservation::ConservationReport;
use crate::core_types::Vec2;

/// Backend-agnostic interface for the height-field fluid model
///
/// The grid is a fixed `width × height` array of fill levels in row-major
/// order. Implementations own all of their storage and never reallocate after
/// construction.
pub trait FluidSolver: Send + Sync {
    /// Advance by one substep
    ///
    /// # Arguments
    ///
    /// * `forcing` - Filtered in-plane forcing in grid coordinates (m/s²)
    /// * `dt` - Substep in seconds, already within the stable range
    ///
    /// # Returns
    ///
    /// What the conservation pass had to correct during this substep
    fn step(&mut self, forcing: Vec2, dt: f32) -> ConservationReport;

    /// Read the level field in row-major order
    ///
    /// CPU backend returns a borrowed slice.
    fn read_levels(&self) -> Cow<'_, [f32]>;

    /// Copy levels into a caller-owned buffer
    ///
    /// Copies `min(out.len(), cells)` values and returns the number copied.
    fn copy_levels_into(&self, out: &mut [f32]) -> usize {
        let levels = self.read_levels();
        let count = out.len().min(levels.len());
        out[..count].copy_from_slice(&levels[..count]);
        count
    }

    /// Sum of all cell levels
    fn total_volume(&self) -> f64;

    /// Sum of squared net flows, a kinetic energy proxy
    fn flow_energy(&self) -> f64;

    /// Smallest and largest level
    fn level_range(&self) -> (f32, f32);

    /// Return to the quiescent state (flat at rest level, no flow)
    fn reset(&mut self);
}
