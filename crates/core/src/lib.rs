//! Beer Sloshing Simulation Core Library
//!
//! A real-time height-field model of liquid in a glass, driven by the device's
//! accelerometer. The host calls [`BeerSimulator::update`] once per frame with
//! the latest acceleration sample and elapsed time, then reads a snapshot of
//! the fill levels with [`BeerSimulator::get_state`] to render.
//!
//! ## Guarantees
//!
//! - Total liquid volume stays at its initial value for the life of the engine
//! - Every level stays finite and inside `[0, max_depth]`
//! - No fluid enters or leaves through the container walls
//! - A level device on a flat grid stays perfectly still

// Core types and utilities
pub mod core_types;

pub mod config;
pub mod error;

// Height-field solver and forcing
pub mod solver;

// Engine façade
pub mod simulation;

// Re-export core types
pub use core_types::{Acceleration, Vec2, STANDARD_GRAVITY};

pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use simulation::{BeerSimulator, FluidState, SimulationStats};
pub use solver::{FluidSolver, TiltAngles};
