//! Simulator configuration
//!
//! All tunable physics lives in [`SimulatorConfig`]. The grid dimensions are
//! passed separately at construction; everything here has a sensible default
//! for a glass of beer driven by a phone accelerometer.
//!
//! Lengths are in cell units scaled by `cell_size`, levels are dimensionless
//! fill heights (the quiescent level is `rest_depth`), accelerations are m/s².

use serde::{Deserialize, Serialize};

use crate::core_types::STANDARD_GRAVITY;
use crate::error::SimulatorError;

/// Courant number used to derive the stable substep
pub const COURANT_NUMBER: f32 = 0.5;

/// Upper bound on `max_substeps`, keeps one update bounded to a few grid passes
pub const MAX_SUBSTEPS_LIMIT: u32 = 64;

/// Largest grid the engine will allocate (4096×4096, same ceiling for any aspect ratio)
pub const MAX_GRID_CELLS: u64 = 4096 * 4096;

/// Physics parameters for the fluid engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Quiescent fill level of every cell
    pub rest_depth: f32,
    /// Physical bound of the container; no cell level exceeds this
    pub max_depth: f32,
    /// Cell edge length (pipe length in the flow model)
    pub cell_size: f32,
    /// Restoring acceleration acting on the fluid column (m/s²)
    pub gravity: f32,
    /// Scale applied to the in-plane accelerometer components
    pub tilt_gain: f32,
    /// Cap on the in-plane forcing magnitude (m/s²)
    pub max_forcing: f32,
    /// Linear flow damping rate (1/s)
    pub damping: f32,
    /// Low-pass filter time constant for the forcing (s), 0 disables filtering
    pub filter_time_constant: f32,
    /// Largest `dt` accepted by one update (s); larger values are clamped
    pub max_dt: f32,
    /// Upper bound on substeps per update
    pub max_substeps: u32,
    /// Cap on the flow speed through a cell wall (cells/s)
    pub max_velocity: f32,
    /// Degrees of cosmetic tilt per m/s² of acceleration
    pub tilt_sensitivity: f32,
    /// Limit for the cosmetic tilt around the x axis (degrees)
    pub max_tilt_x_deg: f32,
    /// Limit for the cosmetic tilt around the z axis (degrees)
    pub max_tilt_z_deg: f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            rest_depth: 1.0,
            max_depth: 2.5,
            cell_size: 1.0,
            gravity: 9.81,
            tilt_gain: 1.0,
            max_forcing: 2.0 * STANDARD_GRAVITY,
            damping: 1.2,
            filter_time_constant: 0.06,
            max_dt: 0.1,
            max_substeps: 8,
            max_velocity: 20.0,
            tilt_sensitivity: 5.0,
            max_tilt_x_deg: 35.0,
            max_tilt_z_deg: 45.0,
        }
    }
}

impl SimulatorConfig {
    /// Heavily damped, strongly filtered liquid (syrup-like, forgiving of sensor noise)
    #[must_use]
    pub fn calm() -> Self {
        Self {
            damping: 3.0,
            filter_time_constant: 0.15,
            ..Self::default()
        }
    }

    /// Lightly damped, responsive liquid that sloshes for a while after each jolt
    #[must_use]
    pub fn lively() -> Self {
        Self {
            damping: 0.5,
            filter_time_constant: 0.03,
            tilt_gain: 1.5,
            ..Self::default()
        }
    }

    /// Look up a preset by name (`"beer"`/`"default"`, `"calm"`, `"lively"`)
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "beer" | "default" => Some(Self::default()),
            "calm" => Some(Self::calm()),
            "lively" => Some(Self::lively()),
            _ => None,
        }
    }

    /// Largest substep for which the explicit flow update stays stable.
    ///
    /// Gravity waves travel at `sqrt(g·h)`; the substep keeps them under
    /// [`COURANT_NUMBER`] cells per substep at the deepest allowed level.
    #[must_use]
    pub fn stable_substep(&self) -> f32 {
        let wave_speed = (self.gravity * self.max_depth).sqrt();
        COURANT_NUMBER * self.cell_size / wave_speed
    }

    /// Number of substeps used to advance by `dt` (already clamped)
    #[must_use]
    pub fn substeps_for(&self, dt: f32) -> u32 {
        let needed = (dt / self.stable_substep()).ceil();
        if needed.is_finite() && needed >= 1.0 {
            (needed as u32).min(self.max_substeps)
        } else {
            1
        }
    }

    /// Clamp a host-supplied `dt` into `[0, max_dt]`.
    ///
    /// Non-finite and non-positive values become 0, so a bogus timestamp
    /// delta never advances the fluid.
    #[must_use]
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() && dt > 0.0 {
            dt.min(self.max_dt)
        } else {
            0.0
        }
    }

    /// Validate every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidConfig`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        let positive = [
            ("rest_depth", self.rest_depth),
            ("max_depth", self.max_depth),
            ("cell_size", self.cell_size),
            ("gravity", self.gravity),
            ("max_dt", self.max_dt),
            ("max_velocity", self.max_velocity),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulatorError::invalid_config(
                    name,
                    format!("must be finite and positive, got {value}"),
                ));
            }
        }

        let non_negative = [
            ("tilt_gain", self.tilt_gain),
            ("max_forcing", self.max_forcing),
            ("damping", self.damping),
            ("filter_time_constant", self.filter_time_constant),
            ("tilt_sensitivity", self.tilt_sensitivity),
            ("max_tilt_x_deg", self.max_tilt_x_deg),
            ("max_tilt_z_deg", self.max_tilt_z_deg),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulatorError::invalid_config(
                    name,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }

        if self.max_depth <= self.rest_depth {
            return Err(SimulatorError::invalid_config(
                "max_depth",
                format!(
                    "must exceed rest_depth ({}), got {}",
                    self.rest_depth, self.max_depth
                ),
            ));
        }

        if self.max_substeps == 0 || self.max_substeps > MAX_SUBSTEPS_LIMIT {
            return Err(SimulatorError::invalid_config(
                "max_substeps",
                format!(
                    "must be in 1..={MAX_SUBSTEPS_LIMIT}, got {}",
                    self.max_substeps
                ),
            ));
        }

        // The largest dt must be reachable with stable substeps
        let required = (self.max_dt / self.stable_substep()).ceil();
        if required > self.max_substeps as f32 {
            return Err(SimulatorError::invalid_config(
                "max_substeps",
                format!(
                    "max_dt {} needs {required} stable substeps, only {} allowed",
                    self.max_dt, self.max_substeps
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulatorConfig::default().validate().is_ok());
        assert!(SimulatorConfig::calm().validate().is_ok());
        assert!(SimulatorConfig::lively().validate().is_ok());
    }

    #[test]
    fn test_default_max_dt_needs_one_substep() {
        let config = SimulatorConfig::default();
        assert!(config.stable_substep() >= config.max_dt);
        assert_eq!(config.substeps_for(config.max_dt), 1);
    }

    #[test]
    fn test_substeps_grow_with_finer_cells() {
        let config = SimulatorConfig {
            cell_size: 0.25,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.substeps_for(config.max_dt), 4);
        assert_eq!(config.substeps_for(0.0), 1);
    }

    #[test]
    fn test_clamp_dt() {
        let config = SimulatorConfig::default();
        assert_eq!(config.clamp_dt(5.0), config.max_dt);
        assert_eq!(config.clamp_dt(-1.0), 0.0);
        assert_eq!(config.clamp_dt(0.0), 0.0);
        assert_eq!(config.clamp_dt(f32::NAN), 0.0);
        assert_eq!(config.clamp_dt(f32::INFINITY), 0.0);
        assert_relative_eq!(config.clamp_dt(1.0 / 60.0), 1.0 / 60.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let config = SimulatorConfig {
            gravity: f32::NAN,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulatorError::InvalidConfig {
                parameter: "gravity",
                ..
            })
        ));

        let config = SimulatorConfig {
            max_depth: 0.5,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulatorError::InvalidConfig {
                parameter: "max_depth",
                ..
            })
        ));

        let config = SimulatorConfig {
            damping: -1.0,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unreachable_stability() {
        let config = SimulatorConfig {
            cell_size: 0.01,
            max_substeps: 8,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulatorError::InvalidConfig {
                parameter: "max_substeps",
                ..
            })
        ));
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(SimulatorConfig::preset("Beer"), Some(SimulatorConfig::default()));
        assert_eq!(SimulatorConfig::preset("calm"), Some(SimulatorConfig::calm()));
        assert_eq!(SimulatorConfig::preset("fizzy"), None);
    }
}
