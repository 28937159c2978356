//! Tilt forcing derived from accelerometer samples
//!
//! The container cross-section is the device screen: grid x runs to the right,
//! grid y runs down the screen. The accelerometer reports the reaction to
//! gravity in device coordinates (y up the screen), so the body force on the
//! liquid in grid coordinates is:
//!
//! ```text
//! F_grid = tilt_gain × (-a_x, +a_y)
//! ```
//!
//! The z component is normal to the container plane and contributes nothing.
//! A device lying flat therefore produces no forcing, and a device held upright
//! pulls the liquid toward the bottom rows.

use serde::{Deserialize, Serialize};

use crate::core_types::{Acceleration, Vec2};

/// Project an acceleration sample onto the container plane.
///
/// Non-finite components are treated as zero and the result is capped to
/// `max_forcing` in magnitude.
///
/// # Arguments
///
/// * `acceleration` - Raw sample in device coordinates (m/s²)
/// * `tilt_gain` - Scale applied to the in-plane components
/// * `max_forcing` - Largest allowed forcing magnitude (m/s²)
#[must_use]
pub fn project_to_plane(acceleration: Acceleration, tilt_gain: f32, max_forcing: f32) -> Vec2 {
    let a = acceleration.sanitized();
    let forcing = Vec2::new(-a.x, a.y) * tilt_gain;

    let magnitude = forcing.norm();
    if magnitude > max_forcing && magnitude > 0.0 {
        forcing * (max_forcing / magnitude)
    } else {
        forcing
    }
}

/// First-order low-pass filter over the in-plane forcing.
///
/// `y += α (x - y)` with `α = dt / (τ + dt)`, so the response is independent
/// of the frame rate. A time constant of zero passes samples straight through.
/// Starts at zero forcing, matching the quiescent grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltFilter {
    value: Vec2,
    time_constant: f32,
}

impl TiltFilter {
    #[must_use]
    pub fn new(time_constant: f32) -> Self {
        Self {
            value: Vec2::zeros(),
            time_constant: time_constant.max(0.0),
        }
    }

    /// Feed one sample, returning the filtered forcing.
    ///
    /// `dt` must already be clamped; `dt == 0` leaves the filter unchanged
    /// unless filtering is disabled.
    pub fn apply(&mut self, raw: Vec2, dt: f32) -> Vec2 {
        if self.time_constant <= 0.0 {
            self.value = raw;
        } else {
            let alpha = dt / (self.time_constant + dt);
            self.value += (raw - self.value) * alpha;
        }
        self.value
    }

    /// Current filtered forcing
    #[must_use]
    pub fn value(&self) -> Vec2 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = Vec2::zeros();
    }
}

/// Cosmetic tilt of the container outline, in degrees.
///
/// Purely visual: it lets the renderer rotate the glass with the device and
/// never feeds back into the fluid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TiltAngles {
    /// Rotation around the screen's horizontal axis
    pub tilt_x_deg: f32,
    /// Rotation around the axis normal to the screen
    pub tilt_z_deg: f32,
}

/// Compute the container outline tilt from an acceleration sample.
///
/// `tilt_z = clamp(-a_x × sensitivity, ±max_z)`,
/// `tilt_x = clamp(a_y × sensitivity, ±max_x)`.
#[must_use]
pub fn cosmetic_tilt(
    acceleration: Acceleration,
    sensitivity: f32,
    max_tilt_x_deg: f32,
    max_tilt_z_deg: f32,
) -> TiltAngles {
    let a = acceleration.sanitized();
    TiltAngles {
        tilt_x_deg: (a.y * sensitivity).clamp(-max_tilt_x_deg, max_tilt_x_deg),
        tilt_z_deg: (-a.x * sensitivity).clamp(-max_tilt_z_deg, max_tilt_z_deg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::STANDARD_GRAVITY;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_device_has_no_forcing() {
        let forcing = project_to_plane(Acceleration::LEVEL, 1.0, 20.0);
        assert_eq!(forcing, Vec2::zeros());
    }

    #[test]
    fn test_upright_device_pulls_down_the_grid() {
        let forcing = project_to_plane(Acceleration::UPRIGHT, 1.0, 20.0);
        assert_eq!(forcing.x, 0.0);
        assert_relative_eq!(forcing.y, STANDARD_GRAVITY);
    }

    #[test]
    fn test_right_edge_down_pulls_right() {
        let forcing = project_to_plane(Acceleration::new(-3.0, 0.0, 9.0), 2.0, 20.0);
        assert_relative_eq!(forcing.x, 6.0);
        assert_eq!(forcing.y, 0.0);
    }

    #[test]
    fn test_forcing_is_capped_and_sanitized() {
        let forcing = project_to_plane(Acceleration::new(300.0, 400.0, 0.0), 1.0, 10.0);
        assert_relative_eq!(forcing.norm(), 10.0, epsilon = 1e-4);
        assert!(forcing.x < 0.0 && forcing.y > 0.0);

        let forcing = project_to_plane(Acceleration::new(f32::NAN, f32::INFINITY, 1.0), 1.0, 10.0);
        assert_eq!(forcing, Vec2::zeros());
    }

    #[test]
    fn test_filter_converges_to_steady_input() {
        let mut filter = TiltFilter::new(0.05);
        let target = Vec2::new(1.0, -2.0);
        for _ in 0..120 {
            filter.apply(target, 1.0 / 60.0);
        }
        assert_relative_eq!(filter.value().x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(filter.value().y, -2.0, epsilon = 1e-4);

        // First sample only moves part of the way
        let mut fresh = TiltFilter::new(0.05);
        let first = fresh.apply(target, 1.0 / 60.0);
        assert!(first.x > 0.0 && first.x < 1.0);
    }

    #[test]
    fn test_filter_holds_on_zero_dt_and_bypasses_when_disabled() {
        let mut filter = TiltFilter::new(0.1);
        filter.apply(Vec2::new(1.0, 0.0), 0.1);
        let held = filter.value();
        assert_eq!(filter.apply(Vec2::new(50.0, 50.0), 0.0), held);

        let mut bypass = TiltFilter::new(0.0);
        assert_eq!(bypass.apply(Vec2::new(3.0, 4.0), 0.0), Vec2::new(3.0, 4.0));

        bypass.reset();
        assert_eq!(bypass.value(), Vec2::zeros());
    }

    #[test]
    fn test_cosmetic_tilt_clamps() {
        let angles = cosmetic_tilt(Acceleration::new(-2.0, 3.0, 0.0), 5.0, 35.0, 45.0);
        assert_relative_eq!(angles.tilt_z_deg, 10.0);
        assert_relative_eq!(angles.tilt_x_deg, 15.0);

        let angles = cosmetic_tilt(Acceleration::new(100.0, -100.0, 0.0), 5.0, 35.0, 45.0);
        assert_eq!(angles.tilt_z_deg, -45.0);
        assert_eq!(angles.tilt_x_deg, -35.0);

        let angles = cosmetic_tilt(Acceleration::new(f32::NAN, 0.0, 0.0), 5.0, 35.0, 45.0);
        assert_eq!(angles, TiltAngles::default());
    }
}
