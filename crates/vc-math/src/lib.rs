//! # vc-math
//!
//! Mathematical building blocks for the volatility cube: 1D and 2D
//! interpolation, the Hagan SABR closed form, and a small optimisation
//! framework (cost functions, end criteria, line search, conjugate gradient
//! and Levenberg–Marquardt) over `nalgebra` vectors.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// 1D and 2D interpolation schemes, plus the SABR smile formula.
pub mod interpolations;

/// Least-squares optimisation.
pub mod optimization;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::close;
pub use interpolations::bilinear::{BilinearInterpolation, Interpolation2D};
pub use interpolations::cubic::NaturalCubicSpline;
pub use interpolations::sabr::{sabr_volatility, SabrParameters};
pub use interpolations::{Interpolation1D, LinearInterpolation};
