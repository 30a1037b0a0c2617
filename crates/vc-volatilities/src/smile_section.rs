//! Volatility smiles at a single (expiry, length) node.
//!
//! Two concrete smiles are provided: [`InterpolatedSmileSection`], a direct
//! interpolation through strike/vol points, and [`SabrSmileSection`], the
//! Hagan closed form evaluated with a set of SABR parameters.

use vc_core::{ensure, errors::Result, Rate, Real, Time, Volatility};
use vc_math::{
    sabr_volatility, Interpolation1D, LinearInterpolation, NaturalCubicSpline, SabrParameters,
};

/// Lowest strike a SABR smile is evaluated at.
const SABR_MIN_STRIKE: Rate = 1e-5;

/// A volatility smile at a single expiry.
pub trait SmileSection: std::fmt::Debug + Send + Sync {
    /// Time to expiry in years.
    fn exercise_time(&self) -> Time;

    /// ATM level (forward rate), when known.
    fn atm_level(&self) -> Option<Rate>;

    /// Lowest strike the smile is defined on.
    fn min_strike(&self) -> Rate;

    /// Highest strike the smile is defined on.
    fn max_strike(&self) -> Rate;

    /// Implied Black volatility at `strike`.
    fn volatility(&self, strike: Rate) -> Volatility;

    /// Total variance σ²·T at `strike`.
    fn variance(&self, strike: Rate) -> Real {
        let vol = self.volatility(strike);
        vol * vol * self.exercise_time()
    }
}

// ── Interpolated smile ────────────────────────────────────────────────────────

/// Interpolation scheme through the strike/vol points of a direct smile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmileInterpolation {
    /// Piecewise linear, extrapolating the end segments.
    #[default]
    Linear,
    /// Natural cubic spline, extrapolating the end polynomials.
    CubicSpline,
}

/// A smile interpolated directly through strike/vol points.
#[derive(Debug)]
pub struct InterpolatedSmileSection {
    exercise_time: Time,
    atm_level: Option<Rate>,
    strikes: Vec<Rate>,
    interpolation: Box<dyn Interpolation1D>,
}

impl InterpolatedSmileSection {
    /// Build a smile through `(strikes[i], vols[i])`.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidInput`] for fewer than two points or
    /// non-increasing strikes, and
    /// [`vc_core::Error::DimensionMismatch`] if the slices differ in length.
    pub fn new(
        exercise_time: Time,
        atm_level: Option<Rate>,
        strikes: &[Rate],
        vols: &[Volatility],
        scheme: SmileInterpolation,
    ) -> Result<Self> {
        let interpolation: Box<dyn Interpolation1D> = match scheme {
            SmileInterpolation::Linear => Box::new(LinearInterpolation::new(strikes, vols)?),
            SmileInterpolation::CubicSpline => Box::new(NaturalCubicSpline::new(strikes, vols)?),
        };
        Ok(Self {
            exercise_time,
            atm_level,
            strikes: strikes.to_vec(),
            interpolation,
        })
    }

    /// Strikes the smile was built on.
    pub fn strikes(&self) -> &[Rate] {
        &self.strikes
    }
}

impl SmileSection for InterpolatedSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Option<Rate> {
        self.atm_level
    }

    fn min_strike(&self) -> Rate {
        self.interpolation.x_min()
    }

    fn max_strike(&self) -> Rate {
        self.interpolation.x_max()
    }

    fn volatility(&self, strike: Rate) -> Volatility {
        self.interpolation.value(strike)
    }
}

// ── SABR smile ────────────────────────────────────────────────────────────────

/// SABR parameters together with the forward they were fitted at.
///
/// This is the five-value record stored per node in a parameter cube, in
/// the layer order alpha, beta, nu, rho, forward.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrParameterSet {
    /// Calibrated SABR parameters.
    pub params: SabrParameters,
    /// Forward swap rate of the node.
    pub forward: Rate,
}

impl SabrParameterSet {
    /// Number of values in the layered representation.
    pub const LAYERS: usize = 5;

    /// Layer index of alpha.
    pub const ALPHA: usize = 0;
    /// Layer index of beta.
    pub const BETA: usize = 1;
    /// Layer index of nu.
    pub const NU: usize = 2;
    /// Layer index of rho.
    pub const RHO: usize = 3;
    /// Layer index of the forward.
    pub const FORWARD: usize = 4;

    /// Values in layer order.
    pub fn to_layers(&self) -> [Real; Self::LAYERS] {
        let p = self.params;
        [p.alpha, p.beta, p.nu, p.rho, self.forward]
    }

    /// Read a parameter set from values in layer order.
    ///
    /// # Errors
    /// [`vc_core::Error::DimensionMismatch`] unless exactly five values are
    /// given.
    pub fn from_layers(values: &[Real]) -> Result<Self> {
        ensure!(
            values.len() == Self::LAYERS,
            DimensionMismatch,
            "a SABR parameter set has {} values, got {}",
            Self::LAYERS,
            values.len()
        );
        Ok(Self {
            params: SabrParameters::new(
                values[Self::ALPHA],
                values[Self::BETA],
                values[Self::NU],
                values[Self::RHO],
            ),
            forward: values[Self::FORWARD],
        })
    }
}

/// A smile produced by the SABR closed form.
#[derive(Debug, Clone)]
pub struct SabrSmileSection {
    exercise_time: Time,
    forward: Rate,
    params: SabrParameters,
}

impl SabrSmileSection {
    /// Build a SABR smile.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidInput`] if the parameters are outside the
    /// SABR domain, the forward is not positive or the exercise time is
    /// negative.
    pub fn new(exercise_time: Time, forward: Rate, params: SabrParameters) -> Result<Self> {
        params.validate()?;
        ensure!(
            forward > 0.0,
            InvalidInput,
            "SABR forward must be positive, got {forward}"
        );
        ensure!(
            exercise_time >= 0.0,
            InvalidInput,
            "exercise time must be non-negative, got {exercise_time}"
        );
        Ok(Self {
            exercise_time,
            forward,
            params,
        })
    }

    /// Build a SABR smile from a five-value parameter record.
    pub fn from_parameter_set(exercise_time: Time, set: &SabrParameterSet) -> Result<Self> {
        Self::new(exercise_time, set.forward, set.params)
    }

    /// Build a SABR smile from values in layer order (alpha, beta, nu, rho,
    /// forward).
    pub fn from_layers(exercise_time: Time, values: &[Real]) -> Result<Self> {
        Self::from_parameter_set(exercise_time, &SabrParameterSet::from_layers(values)?)
    }

    /// SABR parameters.
    pub fn params(&self) -> &SabrParameters {
        &self.params
    }

    /// Forward rate.
    pub fn forward(&self) -> Rate {
        self.forward
    }
}

impl SmileSection for SabrSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Option<Rate> {
        Some(self.forward)
    }

    fn min_strike(&self) -> Rate {
        SABR_MIN_STRIKE
    }

    fn max_strike(&self) -> Rate {
        Real::MAX
    }

    fn volatility(&self, strike: Rate) -> Volatility {
        let k = strike.max(SABR_MIN_STRIKE);
        sabr_volatility(self.forward, k, self.exercise_time, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use vc_core::Error;

    #[test]
    fn linear_smile_passes_through_points() {
        let smile = InterpolatedSmileSection::new(
            2.0,
            Some(0.03),
            &[0.01, 0.03, 0.05],
            &[0.30, 0.20, 0.25],
            SmileInterpolation::Linear,
        )
        .unwrap();
        assert_abs_diff_eq!(smile.volatility(0.03), 0.20, epsilon = 1e-15);
        assert_abs_diff_eq!(smile.volatility(0.04), 0.225, epsilon = 1e-12);
        assert_abs_diff_eq!(smile.variance(0.03), 0.08, epsilon = 1e-12);
        assert_eq!(smile.min_strike(), 0.01);
        assert_eq!(smile.max_strike(), 0.05);
        assert_eq!(smile.atm_level(), Some(0.03));
    }

    #[test]
    fn cubic_smile_interpolates_smoothly() {
        let cubic = InterpolatedSmileSection::new(
            1.0,
            None,
            &[0.01, 0.03, 0.05],
            &[0.30, 0.20, 0.30],
            SmileInterpolation::CubicSpline,
        )
        .unwrap();
        assert_abs_diff_eq!(cubic.volatility(0.05), 0.30, epsilon = 1e-12);
        // symmetric data gives a symmetric spline
        assert_abs_diff_eq!(cubic.volatility(0.02), cubic.volatility(0.04), epsilon = 1e-12);
        // and curves below the chords
        assert!(cubic.volatility(0.02) < 0.25);
    }

    #[test]
    fn interpolated_smile_rejects_mismatched_points() {
        let err = InterpolatedSmileSection::new(
            1.0,
            None,
            &[0.01, 0.03, 0.05],
            &[0.30, 0.20],
            SmileInterpolation::Linear,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn sabr_smile_matches_closed_form() {
        let p = SabrParameters::new(0.03, 0.7, 0.4, -0.2);
        let smile = SabrSmileSection::new(5.0, 0.04, p).unwrap();
        assert_abs_diff_eq!(
            smile.volatility(0.05),
            sabr_volatility(0.04, 0.05, 5.0, &p),
            epsilon = 1e-15
        );
        assert_eq!(smile.atm_level(), Some(0.04));
        // strikes are floored
        assert_abs_diff_eq!(
            smile.volatility(-0.01),
            smile.volatility(SABR_MIN_STRIKE),
            epsilon = 1e-15
        );
    }

    #[test]
    fn sabr_smile_from_layers() {
        let smile = SabrSmileSection::from_layers(1.0, &[0.03, 0.7, 0.4, -0.2, 0.04]).unwrap();
        assert_eq!(smile.params().rho, -0.2);
        assert_eq!(smile.forward(), 0.04);
        assert!(matches!(
            SabrSmileSection::from_layers(1.0, &[0.03, 0.7, 0.4, -0.2]),
            Err(Error::DimensionMismatch(_))
        ));
        // extrapolated parameters outside the domain are reported
        assert!(matches!(
            SabrSmileSection::from_layers(1.0, &[0.03, 0.7, 0.4, -1.2, 0.04]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn parameter_set_layer_order() {
        let set = SabrParameterSet {
            params: SabrParameters::new(0.1, 0.5, 0.3, 0.2),
            forward: 0.03,
        };
        let layers = set.to_layers();
        assert_eq!(layers[SabrParameterSet::NU], 0.3);
        assert_eq!(SabrParameterSet::from_layers(&layers).unwrap(), set);
    }
}
