use beer_sim_core::SimulationStats;
use std::slice;

use crate::error::{BeerSimErrorCode, DefaultBeerSimError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, track_error, with_beer_sim};
use crate::instance::BeerSimInstance;
use crate::simulation::BeerSimAcceleration;

/// Metadata describing a snapshot written by `beer_sim_get_state`.
/// Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeerSimStateInfo {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Total number of cells (`width * height`).
    pub cell_count: usize,
    /// Number of levels actually copied into the caller's buffer.
    pub cells_written: usize,
    /// Cosmetic container tilt around the horizontal axis (degrees).
    pub tilt_x_deg: f32,
    /// Cosmetic container tilt around the screen normal (degrees).
    pub tilt_z_deg: f32,
}

/// FFI-friendly copy of the engine's diagnostic statistics.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeerSimStats {
    /// Sum of all cell levels.
    pub total_volume: f64,
    /// Sum of all cell levels at construction.
    pub initial_volume: f64,
    /// Lowest cell level.
    pub min_level: f32,
    /// Highest cell level.
    pub max_level: f32,
    /// Kinetic energy proxy (sum of squared net flows).
    pub flow_energy: f64,
    /// Number of `beer_sim_update` calls.
    pub step_count: u64,
    /// Accumulated clamped `dt` (seconds).
    pub simulated_time: f64,
    /// Substeps used by the most recent update.
    pub last_substeps: u32,
    /// Cells repaired from non-finite values since construction.
    pub repaired_cells: u64,
}

impl From<SimulationStats> for BeerSimStats {
    fn from(stats: SimulationStats) -> Self {
        Self {
            total_volume: stats.total_volume,
            initial_volume: stats.initial_volume,
            min_level: stats.min_level,
            max_level: stats.max_level,
            flow_energy: stats.flow_energy,
            step_count: stats.step_count,
            simulated_time: stats.simulated_time,
            last_substeps: stats.last_substeps,
            repaired_cells: stats.repaired_cells,
        }
    }
}

/// Copy the current fill levels into a caller-owned buffer.
///
/// Levels are row-major (`index = y * width + x`, row 0 at the top of the
/// container). At most `levels_len` values are written; `out_info.cells_written`
/// reports how many. Pass a null `out_levels` with `levels_len == 0` to only
/// query the metadata. The acceleration drives only the cosmetic tilt in
/// `out_info`; the fluid is not modified.
///
/// Thread-safe: acquires the read lock.
///
/// Returns
/// - `BeerSimErrorCode::Ok` (0) on success
/// - `BeerSimErrorCode::NullPointer` if `ptr` or `out_info` is null, or `out_levels`
///   is null while `levels_len > 0`
/// - `BeerSimErrorCode::LockPoisoned` if the internal lock is poisoned
///
/// # Safety
///
/// - `ptr` must be null or a live pointer returned by `beer_sim_new*`.
/// - `out_levels` must be valid for writing `levels_len` floats.
/// - `out_info` must be null or valid for writing one `BeerSimStateInfo`.
///
/// # Example Usage (C)
/// ```c
/// float* levels = malloc(sizeof(float) * 300 * 500);
/// BeerSimStateInfo info;
/// if (beer_sim_get_state(sim, accel, levels, 300 * 500, &info) == Ok) {
///     draw_glass(levels, info.width, info.height, info.tilt_z_deg);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn beer_sim_get_state(
    ptr: *const BeerSimInstance,
    acceleration: BeerSimAcceleration,
    out_levels: *mut f32,
    levels_len: usize,
    out_info: *mut BeerSimStateInfo,
) -> BeerSimErrorCode {
    if out_info.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_info"));
    }
    if out_levels.is_null() && levels_len > 0 {
        return track_error(&DefaultBeerSimError::null_pointer("out_levels"));
    }

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let info = with_beer_sim(instance, |sim| {
            let cells_written = if levels_len == 0 {
                0
            } else {
                // SAFETY: non-null and valid for `levels_len` writes per the contract.
                let out = unsafe { slice::from_raw_parts_mut(out_levels, levels_len) };
                sim.copy_levels_into(out)
            };

            let tilt = sim.tilt_angles(acceleration.into());
            BeerSimStateInfo {
                width: sim.width(),
                height: sim.height(),
                cell_count: sim.cell_count(),
                cells_written,
                tilt_x_deg: tilt.tilt_x_deg,
                tilt_z_deg: tilt.tilt_z_deg,
            }
        })?;

        // SAFETY: `out_info` is non-null and writable per the contract.
        unsafe {
            *out_info = info;
        }
        Ok(())
    })
}

/// Read the grid dimensions.
///
/// # Safety
///
/// - `ptr` must be null or a live pointer returned by `beer_sim_new*`.
/// - `out_width` and `out_height` must be null or valid for writing one `u32`.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_get_dimensions(
    ptr: *const BeerSimInstance,
    out_width: *mut u32,
    out_height: *mut u32,
) -> BeerSimErrorCode {
    if out_width.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_width"));
    }
    if out_height.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_height"));
    }

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let (width, height) = with_beer_sim(instance, |sim| (sim.width(), sim.height()))?;
        unsafe {
            *out_width = width;
            *out_height = height;
        }
        Ok(())
    })
}

/// Read the engine's diagnostic statistics.
///
/// # Safety
///
/// - `ptr` must be null or a live pointer returned by `beer_sim_new*`.
/// - `out_stats` must be null or valid for writing one `BeerSimStats`.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_get_stats(
    ptr: *const BeerSimInstance,
    out_stats: *mut BeerSimStats,
) -> BeerSimErrorCode {
    if out_stats.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_stats"));
    }

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let stats = with_beer_sim(instance, |sim| BeerSimStats::from(sim.stats()))?;
        unsafe {
            *out_stats = stats;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{beer_sim_destroy, beer_sim_new};
    use crate::simulation::beer_sim_update;
    use std::ptr;

    fn new_sim(width: u32, height: u32) -> *mut BeerSimInstance {
        let mut sim: *mut BeerSimInstance = ptr::null_mut();
        assert_eq!(unsafe { beer_sim_new(width, height, &mut sim) }, BeerSimErrorCode::Ok);
        sim
    }

    #[test]
    fn test_get_state_copies_levels() {
        let sim = new_sim(4, 3);
        let level = BeerSimAcceleration {
            x: 0.0,
            y: 0.0,
            z: 9.81,
        };

        let mut levels = vec![0.0_f32; 12];
        let mut info = BeerSimStateInfo::default();
        let code = unsafe { beer_sim_get_state(sim, level, levels.as_mut_ptr(), 12, &mut info) };
        assert_eq!(code, BeerSimErrorCode::Ok);
        assert_eq!((info.width, info.height, info.cell_count), (4, 3, 12));
        assert_eq!(info.cells_written, 12);
        assert!(levels.iter().all(|&h| h == 1.0));
        assert_eq!(info.tilt_x_deg, 0.0);

        unsafe { beer_sim_destroy(sim) };
    }

    #[test]
    fn test_get_state_short_buffer_and_metadata_only() {
        let sim = new_sim(5, 5);
        let tilted = BeerSimAcceleration {
            x: -2.0,
            y: 3.0,
            z: 9.0,
        };

        let mut short = [0.0_f32; 4];
        let mut info = BeerSimStateInfo::default();
        let code = unsafe { beer_sim_get_state(sim, tilted, short.as_mut_ptr(), 4, &mut info) };
        assert_eq!(code, BeerSimErrorCode::Ok);
        assert_eq!(info.cells_written, 4);
        assert_eq!(info.tilt_z_deg, 10.0);
        assert_eq!(info.tilt_x_deg, 15.0);

        let code = unsafe { beer_sim_get_state(sim, tilted, ptr::null_mut(), 0, &mut info) };
        assert_eq!(code, BeerSimErrorCode::Ok);
        assert_eq!(info.cells_written, 0);
        assert_eq!(info.cell_count, 25);

        let code = unsafe { beer_sim_get_state(sim, tilted, ptr::null_mut(), 5, &mut info) };
        assert_eq!(code, BeerSimErrorCode::NullPointer);

        unsafe { beer_sim_destroy(sim) };
    }

    #[test]
    fn test_dimensions_and_stats() {
        let sim = new_sim(6, 9);

        let (mut width, mut height) = (0, 0);
        let code = unsafe { beer_sim_get_dimensions(sim, &mut width, &mut height) };
        assert_eq!(code, BeerSimErrorCode::Ok);
        assert_eq!((width, height), (6, 9));

        let upright = BeerSimAcceleration {
            x: 0.0,
            y: 9.81,
            z: 0.0,
        };
        unsafe { beer_sim_update(sim, upright, 1.0 / 60.0) };

        let mut stats = BeerSimStats::default();
        let code = unsafe { beer_sim_get_stats(sim, &mut stats) };
        assert_eq!(code, BeerSimErrorCode::Ok);
        assert_eq!(stats.step_count, 1);
        assert_eq!(stats.last_substeps, 1);
        assert!((stats.total_volume - 54.0).abs() < 1e-3);

        assert_eq!(
            unsafe { beer_sim_get_stats(sim, ptr::null_mut()) },
            BeerSimErrorCode::NullPointer
        );
        unsafe { beer_sim_destroy(sim) };
    }
}
