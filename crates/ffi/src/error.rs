use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use beer_sim_core::SimulatorError;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait BeerSimError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> BeerSimErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `BeerSimError` for the failures the C API reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultBeerSimError {
    code: BeerSimErrorCode,
    msg: String,
}

impl DefaultBeerSimError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: BeerSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: BeerSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for invalid parameter.
    ///
    /// # Arguments
    /// * `message` - Description of the error
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: BeerSimErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl From<SimulatorError> for DefaultBeerSimError {
    fn from(error: SimulatorError) -> Self {
        let code = match error {
            SimulatorError::InvalidDimensions { .. } | SimulatorError::GridTooLarge { .. } => {
                BeerSimErrorCode::InvalidDimensions
            }
            SimulatorError::InvalidConfig { .. } => BeerSimErrorCode::InvalidConfig,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl BeerSimError for DefaultBeerSimError {
    fn code(&self) -> BeerSimErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by beer simulation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeerSimErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Grid dimensions are zero or the grid is larger than the engine allows.
    InvalidDimensions = 3,

    /// A configuration parameter is out of range.
    InvalidConfig = 4,

    /// Invalid parameter passed to function.
    InvalidParameter = 5,
}

impl From<DefaultBeerSimError> for BeerSimErrorCode {
    fn from(error: DefaultBeerSimError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored here so the pointer handed to C stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, BeerSimErrorCode)> = const { RefCell::new((None, BeerSimErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, BeerSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, BeerSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded.
///
/// # Thread Safety
/// Error messages are stored per-thread, so each thread sees only its own failures.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that
/// sets or clears the error.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// BeerSimInstance* sim = NULL;
/// if (beer_sim_new(300, 500, &sim) != Ok) {
///     const char* error = beer_sim_get_last_error();
///     if (error) {
///         fprintf(stderr, "Beer sim creation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn beer_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `BeerSimErrorCode::Ok` (0) if the last call on this thread succeeded.
#[no_mangle]
pub extern "C" fn beer_sim_get_last_error_code() -> BeerSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
