//! Height-field fluid solver module
//!
//! The liquid is a grid of fill levels connected by virtual pipes. Tilt enters
//! as an in-plane body force, walls are reflective, and a conservation pass
//! after every substep keeps the total volume fixed and every level inside
//! `[0, max_depth]`.
//!
//! The core abstraction is the `FluidSolver` trait; `CpuFluidSolver` is the
//! Rayon-backed implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use beer_sim_core::config::SimulatorConfig;
//! use beer_sim_core::solver::create_fluid_solver;
//!
//! let solver = create_fluid_solver(300, 500, &SimulatorConfig::default());
//! assert_eq!(solver.read_levels().len(), 300 * 500);
//! ```

pub mod conservation;
mod cpu;
mod fields;
pub mod forcing;
pub mod pipes;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use conservation::{enforce_conservation, ConservationReport};
pub use cpu::CpuFluidSolver;
pub use fields::{FieldData, FlowField, PipeFlow};
pub use forcing::{cosmetic_tilt, project_to_plane, TiltAngles, TiltFilter};
pub use pipes::PipeParams;
pub use r#trait::FluidSolver;

use crate::config::SimulatorConfig;
use tracing::info;

/// Create a fluid solver for the given grid
///
/// # Arguments
///
/// * `width` - Grid width in cells (non-zero)
/// * `height` - Grid height in cells (non-zero)
/// * `config` - Validated physics parameters
///
/// # Returns
///
/// A boxed `FluidSolver` trait object
pub fn create_fluid_solver(
    width: usize,
    height: usize,
    config: &SimulatorConfig,
) -> Box<dyn FluidSolver> {
    info!(
        "Using CPU fluid backend ({}x{} grid, {} rayon threads)",
        width,
        height,
        rayon::current_num_threads()
    );
    Box::new(CpuFluidSolver::new(width, height, config))
}
