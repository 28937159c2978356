//! Vector type alias for grid-space quantities.

use nalgebra::Vector2;

/// 2D vector in grid coordinates (x to the right, y down the container).
///
/// Alias for `nalgebra::Vector2<f32>`, used for the in-plane tilt forcing.
pub type Vec2 = Vector2<f32>;
