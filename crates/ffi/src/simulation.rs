use beer_sim_core::{Acceleration, BeerSimulator};

use crate::error::BeerSimErrorCode;
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_beer_sim_mut};
use crate::instance::BeerSimInstance;

/// Accelerometer sample in device coordinates (m/s²).
///
/// x to the right of the screen, y up the screen, z out of the screen.
/// A phone lying flat reads roughly `{0, 0, 9.81}`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeerSimAcceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<BeerSimAcceleration> for Acceleration {
    fn from(acc: BeerSimAcceleration) -> Self {
        Acceleration::new(acc.x, acc.y, acc.z)
    }
}

/// Advance the fluid by `dt` seconds under the given acceleration.
///
/// Thread-safe: acquires the write lock for the duration of the step.
///
/// Never fails for bad inputs: `dt` is clamped to `[0, max_dt]` (non-finite or
/// non-positive values advance nothing) and non-finite acceleration components
/// count as zero. If `ptr` is null this is a no-op and the last error is set.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `beer_sim_new*`.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_update(
    ptr: *const BeerSimInstance,
    acceleration: BeerSimAcceleration,
    dt: f32,
) {
    // Silently ignore errors for void-returning function
    let _ = handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_beer_sim_mut(instance, |sim| sim.update(acceleration.into(), dt))
    });
}

/// Return the fluid to its quiescent state without reallocating.
///
/// Returns
/// - `BeerSimErrorCode::Ok` (0) on success
/// - `BeerSimErrorCode::NullPointer` if `ptr` is null
/// - `BeerSimErrorCode::LockPoisoned` if the internal lock is poisoned
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `beer_sim_new*`.
#[no_mangle]
pub unsafe extern "C" fn beer_sim_reset(ptr: *const BeerSimInstance) -> BeerSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_beer_sim_mut(instance, BeerSimulator::reset)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::beer_sim_get_last_error_code;
    use crate::instance::{beer_sim_destroy, beer_sim_new};
    use crate::helpers::with_beer_sim;
    use std::ptr;

    #[test]
    fn test_update_moves_fluid_and_reset_restores() {
        let mut sim: *mut BeerSimInstance = ptr::null_mut();
        assert_eq!(unsafe { beer_sim_new(10, 10, &mut sim) }, BeerSimErrorCode::Ok);

        let upright = BeerSimAcceleration {
            x: 0.0,
            y: 9.81,
            z: 0.0,
        };
        for _ in 0..30 {
            unsafe { beer_sim_update(sim, upright, 1.0 / 60.0) };
        }

        let instance = instance_from_ptr(sim).unwrap();
        let energy = with_beer_sim(instance, |s| s.stats().flow_energy).unwrap();
        assert!(energy > 0.0);

        assert_eq!(unsafe { beer_sim_reset(sim) }, BeerSimErrorCode::Ok);
        let energy = with_beer_sim(instance, |s| s.stats().flow_energy).unwrap();
        assert_eq!(energy, 0.0);

        unsafe { beer_sim_destroy(sim) };
    }

    #[test]
    fn test_update_with_null_is_noop() {
        unsafe { beer_sim_update(ptr::null(), BeerSimAcceleration::default(), 0.016) };
        assert_eq!(beer_sim_get_last_error_code(), BeerSimErrorCode::NullPointer);
        assert_eq!(unsafe { beer_sim_reset(ptr::null()) }, BeerSimErrorCode::NullPointer);
    }
}
