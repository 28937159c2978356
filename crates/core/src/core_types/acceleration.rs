//! Accelerometer sample record.
//!
//! The host hands the engine one sample per animation frame. At the boundary it
//! is a loosely typed `{x, y, z}` object; inside the crate it is always this
//! fixed-shape record.

use serde::{Deserialize, Serialize};

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Acceleration sample in device-local coordinates (m/s²).
///
/// Follows the `accelerationIncludingGravity` convention: a device lying flat
/// with the screen up reports `z ≈ +g`, a device held upright in portrait
/// reports `y ≈ +g`, and tilting the right edge down makes `x` negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Acceleration {
    /// Device lying flat, screen up. No in-plane forcing.
    pub const LEVEL: Self = Self::new(0.0, 0.0, STANDARD_GRAVITY);

    /// Device held upright in portrait orientation.
    pub const UPRIGHT: Self = Self::new(0.0, STANDARD_GRAVITY, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Whether every component is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Replace non-finite components with zero.
    ///
    /// Sensor feeds occasionally deliver `NaN` (e.g. on the first event after a
    /// permission prompt); a zeroed component contributes no forcing.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let clean = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self::new(clean(self.x), clean(self.y), clean(self.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_zeroes_non_finite_components() {
        let a = Acceleration::new(f32::NAN, 2.0, f32::NEG_INFINITY).sanitized();
        assert_eq!(a, Acceleration::new(0.0, 2.0, 0.0));
        assert!(a.is_finite());
    }

    #[test]
    fn test_presets_are_gravity_sized() {
        assert_eq!(Acceleration::LEVEL, Acceleration::new(0.0, 0.0, STANDARD_GRAVITY));
        assert_eq!(Acceleration::UPRIGHT, Acceleration::new(0.0, STANDARD_GRAVITY, 0.0));
    }
}
