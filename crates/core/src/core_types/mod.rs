//! Core types shared by the solver and the boundary crates

pub mod acceleration;
pub mod vec2;

pub use acceleration::{Acceleration, STANDARD_GRAVITY};
pub use vec2::Vec2;
