//! Construction-time error taxonomy.
//!
//! The per-frame path never fails: out-of-range runtime inputs are clamped and
//! numerical trouble is repaired in place. The only hard failure is building a
//! simulator from unusable parameters, which happens once before the animation
//! loop starts.

use std::fmt;

/// Error returned when a simulator cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorError {
    /// Grid width or height was zero.
    InvalidDimensions { width: u32, height: u32 },

    /// Grid has more cells than the engine will allocate.
    GridTooLarge { cells: u64, max_cells: u64 },

    /// A configuration parameter was non-finite or outside its valid range.
    InvalidConfig {
        parameter: &'static str,
        reason: String,
    },
}

impl SimulatorError {
    pub(crate) fn invalid_config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { width, height } => write!(
                f,
                "grid dimensions must be positive, got {width}x{height}"
            ),
            Self::GridTooLarge { cells, max_cells } => write!(
                f,
                "grid of {cells} cells exceeds the maximum of {max_cells}"
            ),
            Self::InvalidConfig { parameter, reason } => {
                write!(f, "invalid config parameter '{parameter}': {reason}")
            }
        }
    }
}

impl std::error::Error for SimulatorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SimulatorError::InvalidDimensions {
            width: 0,
            height: 500,
        };
        assert_eq!(
            err.to_string(),
            "grid dimensions must be positive, got 0x500"
        );

        let err = SimulatorError::invalid_config("damping", "must be finite, got NaN");
        assert_eq!(
            err.to_string(),
            "invalid config parameter 'damping': must be finite, got NaN"
        );
    }
}
