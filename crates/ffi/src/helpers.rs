use beer_sim_core::BeerSimulator;
use std::ffi::CString;

use crate::error::{with_last_error_mut, BeerSimError, BeerSimErrorCode, DefaultBeerSimError};
use crate::instance::BeerSimInstance;

/// Set the thread-local error message and code.
/// Accepts any type implementing `BeerSimError` trait.
pub(crate) fn set_last_error(error: &impl BeerSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl BeerSimError) -> BeerSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, passing the value through on success.
pub(crate) fn track_result<T>(result: Result<T, DefaultBeerSimError>) -> Result<T, BeerSimErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run an FFI body and turn its result into an error code.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> BeerSimErrorCode
where
    F: FnOnce() -> Result<(), DefaultBeerSimError>,
{
    match track_result(f()) {
        Ok(()) => BeerSimErrorCode::Ok,
        Err(code) => code,
    }
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = BeerSimErrorCode::Ok;
    });
}

/// Borrow an instance from a raw pointer handed back by C.
///
/// The pointer must be null or come from `beer_sim_new*` and not yet be destroyed.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const BeerSimInstance,
) -> Result<&'a BeerSimInstance, DefaultBeerSimError> {
    // SAFETY: non-null pointers are required by every caller's contract to
    // originate from `Box::into_raw` in `beer_sim_new*`.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultBeerSimError::null_pointer("ptr"))
}

/// Run `f` with shared access to the simulator.
pub(crate) fn with_beer_sim<F, T>(instance: &BeerSimInstance, f: F) -> Result<T, DefaultBeerSimError>
where
    F: FnOnce(&BeerSimulator) -> T,
{
    let sim = instance
        .sim
        .read()
        .map_err(|_| DefaultBeerSimError::lock_poisoned("RwLock"))?;
    Ok(f(&sim))
}

/// Run `f` with exclusive access to the simulator.
pub(crate) fn with_beer_sim_mut<F, T>(
    instance: &BeerSimInstance,
    f: F,
) -> Result<T, DefaultBeerSimError>
where
    F: FnOnce(&mut BeerSimulator) -> T,
{
    let mut sim = instance
        .sim
        .write()
        .map_err(|_| DefaultBeerSimError::lock_poisoned("RwLock"))?;
    Ok(f(&mut sim))
}
