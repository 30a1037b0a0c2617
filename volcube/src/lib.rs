//! # volcube
//!
//! Swaption volatility cube: an ATM volatility surface plus smiles over
//! (option expiry, swap length, strike).
//!
//! This crate is a **façade** that re-exports the workspace crates.
//! Application code should depend on this crate rather than the individual
//! `vc-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use nalgebra::DMatrix;
//! use volcube::volatilities::{
//!     CubeConfig, MarketVolatilityCube, SpreadInterpolatedCube, SwaptionVolatilityCube,
//!     SwaptionVolatilityMatrix,
//! };
//!
//! let atm = SwaptionVolatilityMatrix::new(
//!     vec![1.0, 5.0],
//!     vec![2.0, 10.0],
//!     DMatrix::from_row_slice(2, 2, &[0.20, 0.18, 0.22, 0.19]),
//! )?;
//! let market = MarketVolatilityCube::new(
//!     vec![1.0, 5.0],
//!     vec![2.0, 10.0],
//!     vec![-0.01, 0.0, 0.01],
//!     DMatrix::zeros(4, 3),
//! )?;
//! let cube = SpreadInterpolatedCube::new(
//!     Arc::new(atm),
//!     Arc::new(|_expiry: f64, _length: f64| 0.03),
//!     market,
//!     CubeConfig::default(),
//! )?;
//! assert_eq!(cube.volatility(1.0, 2.0, 0.03)?, 0.20);
//! # Ok::<(), volcube::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use vc_core as core;

/// Interpolation, the SABR closed form and optimisation.
pub use vc_math as math;

/// Grid, cube, smile, calibration and densification types.
pub use vc_volatilities as volatilities;
