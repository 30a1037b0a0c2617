//! Error types for volcube.
//!
//! A single `thiserror`-derived enum covers every failure the cube can
//! report.  Checks are written with the [`ensure!`](crate::ensure) and
//! [`fail!`](crate::fail) macros, which name the variant to raise.

use crate::{Real, Size, Time};
use thiserror::Error;

/// The top-level error type used throughout volcube.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A grid index is too short or not strictly increasing.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A matrix shape does not match the grid it is meant for.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Direct element access outside the stored range.
    #[error("index ({index}) out of range [0, {size})")]
    IndexOutOfRange {
        /// The index that was out of range.
        index: Size,
        /// The size of the container.
        size: Size,
    },

    /// A SABR fit did not reach the required accuracy.
    #[error(
        "SABR calibration at (expiry {expiry}, length {length}): \
         rms error {rms_error:.3e} exceeds tolerance {tolerance:.1e}"
    )]
    CalibrationAccuracy {
        /// Option expiry of the node, in years.
        expiry: Time,
        /// Underlying swap length of the node, in years.
        length: Time,
        /// Root-mean-square volatility error after optimisation.
        rms_error: Real,
        /// Maximum accepted root-mean-square error.
        tolerance: Real,
    },

    /// Market input rejected by construction-time validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Evaluation requested outside the domain with extrapolation disabled.
    #[error("out of domain: {0}")]
    OutOfDomain(String),

    /// Generic precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),
}

/// Shorthand `Result` type used throughout volcube.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Return `Err(Error::$kind(format!(..)))` if `$cond` is false.
///
/// `$kind` must be one of the single-message variants of [`Error`].
///
/// # Example
/// ```
/// use vc_core::{ensure, errors::Error};
/// fn positive(x: f64) -> vc_core::Result<f64> {
///     ensure!(x > 0.0, InvalidInput, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert_eq!(
///     positive(-1.0),
///     Err(Error::InvalidInput("x must be positive, got -1".into()))
/// );
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:ident, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::$kind(format!($($msg)*)));
        }
    };
}

/// Return `Err(Error::$kind(format!(..)))` immediately.
///
/// # Example
/// ```
/// use vc_core::{fail, errors::Error};
/// fn always() -> vc_core::Result<()> {
///     fail!(Precondition, "not available");
/// }
/// assert!(matches!(always(), Err(Error::Precondition(_))));
/// ```
#[macro_export]
macro_rules! fail {
    ($kind:ident, $($msg:tt)*) => {
        return Err($crate::errors::Error::$kind(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_index(i: Size, n: Size) -> Result<Size> {
        if i >= n {
            return Err(Error::IndexOutOfRange { index: i, size: n });
        }
        Ok(i)
    }

    #[test]
    fn ensure_raises_named_variant() {
        fn grid(n: usize) -> Result<()> {
            ensure!(n >= 2, InvalidGrid, "need at least 2 points, got {n}");
            Ok(())
        }
        assert!(grid(2).is_ok());
        assert_eq!(
            grid(1),
            Err(Error::InvalidGrid("need at least 2 points, got 1".into()))
        );
    }

    #[test]
    fn index_out_of_range_message() {
        let err = checked_index(5, 3).unwrap_err();
        assert_eq!(err.to_string(), "index (5) out of range [0, 3)");
    }

    #[test]
    fn calibration_accuracy_message_names_node() {
        let err = Error::CalibrationAccuracy {
            expiry: 1.0,
            length: 10.0,
            rms_error: 2.5e-3,
            tolerance: 1e-4,
        };
        let msg = err.to_string();
        assert!(msg.contains("expiry 1"), "{msg}");
        assert!(msg.contains("length 10"), "{msg}");
        assert!(msg.contains("2.500e-3"), "{msg}");
    }
}
