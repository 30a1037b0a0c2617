//! # vc-volatilities
//!
//! Swaption volatility cube construction and queries.
//!
//! ## Building blocks
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`grid`] | [`GridIndex`] axes and the [`BracketPolicy`] |
//! | [`cube`] | [`LayeredCube`], expiry × length layers with bilinear interpolation |
//! | [`smile_section`] | [`SmileSection`] trait, interpolated and SABR smiles |
//! | [`sabr_calibration`] | [`SabrCalibrator`] and its configuration |
//! | [`densification`] | [`DensificationEngine`] and moneyness-preserving spreads |
//!
//! ## Cubes
//!
//! [`SpreadInterpolatedCube`] and [`SabrVolatilityCube`] both implement
//! [`SwaptionVolatilityCube`].  They take an [`AtmVolatilityStructure`], a
//! [`ForwardRateProvider`] and a validated [`MarketVolatilityCube`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// ATM volatility reference.
pub mod atm;
/// Cube settings.
pub mod config;
/// Layered expiry × length storage.
pub mod cube;
/// Sparse-to-dense grid expansion.
pub mod densification;
/// Forward swap rate providers.
pub mod forward;
/// Grid axes.
pub mod grid;
/// Market input validation.
pub mod market;
/// SABR smile calibration.
pub mod sabr_calibration;
/// Smile sections.
pub mod smile_section;
/// Cube facades.
pub mod swaption_cube;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use atm::{AtmVolatilityStructure, SwaptionVolatilityMatrix};
pub use config::CubeConfig;
pub use cube::LayeredCube;
pub use densification::{DensificationEngine, SmileGrid, SpreadBracket};
pub use forward::{FlatCurveSwapRate, ForwardRateProvider, TenorSwitchedForward};
pub use grid::{BracketPolicy, GridIndex};
pub use market::MarketVolatilityCube;
pub use sabr_calibration::{
    CalibrationContext, CalibrationMethod, SabrCalibration, SabrCalibrationConfig,
    SabrCalibrator, SmileQuotes,
};
pub use smile_section::{
    InterpolatedSmileSection, SabrParameterSet, SabrSmileSection, SmileInterpolation,
    SmileSection,
};
pub use swaption_cube::{SabrVolatilityCube, SpreadInterpolatedCube, SwaptionVolatilityCube};
