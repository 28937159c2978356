use beer_sim_core::SimulatorConfig;
use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error::{BeerSimErrorCode, DefaultBeerSimError};
use crate::helpers::{handle_ffi_result_error, track_error};

/// C-compatible mirror of the engine configuration.
/// Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeerSimConfig {
    /// Quiescent fill level of every cell.
    pub rest_depth: f32,
    /// Physical bound of the container; no level exceeds this.
    pub max_depth: f32,
    /// Cell edge length.
    pub cell_size: f32,
    /// Restoring acceleration (m/s²).
    pub gravity: f32,
    /// Scale applied to the in-plane accelerometer components.
    pub tilt_gain: f32,
    /// Cap on the in-plane forcing magnitude (m/s²).
    pub max_forcing: f32,
    /// Linear flow damping rate (1/s).
    pub damping: f32,
    /// Forcing low-pass time constant (s), 0 disables filtering.
    pub filter_time_constant: f32,
    /// Largest accepted `dt` (s).
    pub max_dt: f32,
    /// Upper bound on substeps per update.
    pub max_substeps: u32,
    /// Cap on flow speed through a cell wall (cells/s).
    pub max_velocity: f32,
    /// Degrees of cosmetic tilt per m/s².
    pub tilt_sensitivity: f32,
    /// Cosmetic tilt limit around x (degrees).
    pub max_tilt_x_deg: f32,
    /// Cosmetic tilt limit around z (degrees).
    pub max_tilt_z_deg: f32,
}

impl From<SimulatorConfig> for BeerSimConfig {
    fn from(config: SimulatorConfig) -> Self {
        Self {
            rest_depth: config.rest_depth,
            max_depth: config.max_depth,
            cell_size: config.cell_size,
            gravity: config.gravity,
            tilt_gain: config.tilt_gain,
            max_forcing: config.max_forcing,
            damping: config.damping,
            filter_time_constant: config.filter_time_constant,
            max_dt: config.max_dt,
            max_substeps: config.max_substeps,
            max_velocity: config.max_velocity,
            tilt_sensitivity: config.tilt_sensitivity,
            max_tilt_x_deg: config.max_tilt_x_deg,
            max_tilt_z_deg: config.max_tilt_z_deg,
        }
    }
}

impl From<BeerSimConfig> for SimulatorConfig {
    fn from(config: BeerSimConfig) -> Self {
        Self {
            rest_depth: config.rest_depth,
            max_depth: config.max_depth,
            cell_size: config.cell_size,
            gravity: config.gravity,
            tilt_gain: config.tilt_gain,
            max_forcing: config.max_forcing,
            damping: config.damping,
            filter_time_constant: config.filter_time_constant,
            max_dt: config.max_dt,
            max_substeps: config.max_substeps,
            max_velocity: config.max_velocity,
            tilt_sensitivity: config.tilt_sensitivity,
            max_tilt_x_deg: config.max_tilt_x_deg,
            max_tilt_z_deg: config.max_tilt_z_deg,
        }
    }
}

/// Default (beer) configuration, to be tweaked and passed to `beer_sim_new_with_config`.
#[no_mangle]
pub extern "C" fn beer_sim_default_config() -> BeerSimConfig {
    SimulatorConfig::default().into()
}

/// Look up a named preset (`"beer"`, `"calm"`, `"lively"`).
///
/// Returns
/// - `BeerSimErrorCode::Ok` (0) with the preset written to `out_config`
/// - `BeerSimErrorCode::NullPointer` if `name` or `out_config` is null
/// - `BeerSimErrorCode::InvalidParameter` if the name is not valid UTF-8 or unknown
///
/// # Safety
///
/// - `name` must be null or a valid null-terminated C string.
/// - `out_config` must be null or valid for writing one `BeerSimConfig`.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_config_preset(
    name: *const c_char,
    out_config: *mut BeerSimConfig,
) -> BeerSimErrorCode {
    if name.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("name"));
    }
    if out_config.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_config"));
    }

    handle_ffi_result_error(|| {
        // SAFETY: `name` is non-null and the caller guarantees null termination.
        let name = unsafe { CStr::from_ptr(name) }.to_str().map_err(|_| {
            DefaultBeerSimError::invalid_parameter("Preset name is not valid UTF-8".to_string())
        })?;
        let preset = SimulatorConfig::preset(name).ok_or_else(|| {
            DefaultBeerSimError::invalid_parameter(format!(
                "Unknown preset '{name}', expected beer, calm or lively"
            ))
        })?;

        // SAFETY: `out_config` is non-null and the caller guarantees it is writable.
        unsafe {
            *out_config = preset.into();
        }
        Ok(())
    })
}
