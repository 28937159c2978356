use beer_sim_core::{BeerSimulator, SimulatorConfig};
use std::ptr;
use std::sync::{PoisonError, RwLock};
use tracing::warn;

use crate::config::BeerSimConfig;
use crate::error::{BeerSimErrorCode, DefaultBeerSimError};
use crate::helpers::{track_error, track_result};

/// Opaque handle to a beer simulator.
///
/// # Thread Safety
/// The simulator is behind an `RwLock`, so snapshot queries may run on a render
/// thread while the game thread calls `beer_sim_update`. Updates take the write
/// lock briefly once per frame.
///
/// # Usage
/// ```c
/// BeerSimInstance* sim = NULL;
/// if (beer_sim_new(300, 500, &sim) != Ok) {
///     fprintf(stderr, "%s\n", beer_sim_get_last_error());
///     return;
/// }
///
/// // Per frame
/// BeerSimAcceleration accel = { ax, ay, az };
/// beer_sim_update(sim, accel, dt);
/// beer_sim_get_state(sim, accel, levels, levels_len, &info);
///
/// // Teardown
/// beer_sim_destroy(sim);
/// ```
pub struct BeerSimInstance {
    pub(crate) sim: RwLock<BeerSimulator>,
}

impl BeerSimInstance {
    /// Build a simulator for a `width` × `height` grid.
    ///
    /// # Errors
    ///
    /// Returns `BeerSimErrorCode::InvalidDimensions` for empty or oversized grids
    /// and `BeerSimErrorCode::InvalidConfig` when `config` fails validation.
    pub(crate) fn new(
        width: u32,
        height: u32,
        config: SimulatorConfig,
    ) -> Result<Box<Self>, DefaultBeerSimError> {
        let sim = BeerSimulator::with_config(width, height, config)?;
        Ok(Box::new(Self {
            sim: RwLock::new(sim),
        }))
    }
}

/// Write a freshly built instance (or null on failure) to `out_instance`.
unsafe fn publish_instance(
    result: Result<Box<BeerSimInstance>, DefaultBeerSimError>,
    out_instance: *mut *mut BeerSimInstance,
) -> BeerSimErrorCode {
    match track_result(result) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            BeerSimErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                // Set to null on error (per documentation contract)
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Create a new beer simulator with the default configuration.
///
/// Every cell starts at the rest level with no flow.
///
/// Returns
/// - `BeerSimErrorCode::Ok` (0) with a valid instance in `out_instance`
/// - `BeerSimErrorCode::NullPointer` if `out_instance` is null
/// - `BeerSimErrorCode::InvalidDimensions` if `width` or `height` is zero or the grid is too large
///
/// On failure `out_instance` is set to null and `beer_sim_get_last_error()`
/// describes the problem.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the returned instance and MUST call `beer_sim_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_new(
    width: u32,
    height: u32,
    out_instance: *mut *mut BeerSimInstance,
) -> BeerSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_instance"));
    }

    unsafe {
        publish_instance(
            BeerSimInstance::new(width, height, SimulatorConfig::default()),
            out_instance,
        )
    }
}

/// Create a new beer simulator with a custom configuration.
///
/// Start from `beer_sim_default_config()` or `beer_sim_config_preset()` and
/// adjust fields as needed.
///
/// Returns the same codes as `beer_sim_new`, plus
/// `BeerSimErrorCode::InvalidConfig` if a parameter is out of range.
///
/// # Safety
///
/// - `config` must be a valid pointer to a `BeerSimConfig`; it is only read.
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the returned instance and MUST call `beer_sim_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_new_with_config(
    width: u32,
    height: u32,
    config: *const BeerSimConfig,
    out_instance: *mut *mut BeerSimInstance,
) -> BeerSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultBeerSimError::null_pointer("out_instance"));
    }
    if config.is_null() {
        unsafe {
            *out_instance = ptr::null_mut();
        }
        return track_error(&DefaultBeerSimError::null_pointer("config"));
    }

    // SAFETY: `config` is non-null and the caller guarantees it is readable.
    let config = SimulatorConfig::from(unsafe { *config });
    unsafe { publish_instance(BeerSimInstance::new(width, height, config), out_instance) }
}

/// Destroy an instance previously created by `beer_sim_new*`, releasing all of
/// its storage.
///
/// If `ptr` is null this function is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `beer_sim_new` or `beer_sim_new_with_config`.
/// - The pointer MUST NOT have been destroyed already.
/// - After this call the pointer must not be used again.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_destroy(ptr: *mut BeerSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in `beer_sim_new*`
    // and, per the contract above, has not been freed.
    let instance = unsafe { Box::from_raw(ptr) };
    let sim = instance.sim.into_inner().unwrap_or_else(|poisoned| {
        warn!("Destroying beer simulator whose lock was poisoned");
        PoisonError::into_inner(poisoned)
    });
    sim.release();
}
