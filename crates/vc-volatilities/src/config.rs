//! Cube construction settings.

use crate::grid::BracketPolicy;
use crate::sabr_calibration::{CalibrationContext, SabrCalibrationConfig};
use crate::smile_section::SmileInterpolation;

/// Settings of a swaption volatility cube.
///
/// The spread-interpolated cube reads only `extrapolate` and
/// `smile_interpolation`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubeConfig {
    /// SABR fit settings for both calibration passes.
    pub calibration: SabrCalibrationConfig,
    /// Starting point of every SABR fit (or of the first, with warm starts).
    pub context: CalibrationContext,
    /// How densified cells are bracketed by the sparse grid.
    pub bracket_policy: BracketPolicy,
    /// Whether cube layers extrapolate outside their grid.
    pub extrapolate: bool,
    /// Scheme of direct (non-parametric) smiles.
    pub smile_interpolation: SmileInterpolation,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            calibration: SabrCalibrationConfig::default(),
            context: CalibrationContext::default(),
            bracket_policy: BracketPolicy::default(),
            extrapolate: true,
            smile_interpolation: SmileInterpolation::default(),
        }
    }
}

impl CubeConfig {
    /// Override the SABR fit settings.
    pub fn with_calibration(mut self, calibration: SabrCalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// Override the calibration starting point.
    pub fn with_context(mut self, context: CalibrationContext) -> Self {
        self.context = context;
        self
    }

    /// Override the bracketing policy used by densification.
    pub fn with_bracket_policy(mut self, policy: BracketPolicy) -> Self {
        self.bracket_policy = policy;
        self
    }

    /// Enable or disable extrapolation of cube layers.
    pub fn with_extrapolation(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Override the direct smile scheme.
    pub fn with_smile_interpolation(mut self, scheme: SmileInterpolation) -> Self {
        self.smile_interpolation = scheme;
        self
    }
}
