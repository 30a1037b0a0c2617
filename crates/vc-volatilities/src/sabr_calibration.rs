//! Least-squares SABR calibration of individual smiles and of whole grids.
//!
//! Parameters are optimised in an unconstrained space:
//!
//! ```text
//! α = exp(y₀)     ν = exp(y₁)     ρ = 0.9999·tanh(y₂)     β = 1 / (1 + exp(-y₃))
//! ```
//!
//! so every trial point maps to a valid SABR parameter set.  `β` is only
//! optimised when [`SabrCalibrationConfig::fixed_beta`] is `None`.

use tracing::{debug, info, warn};
use vc_core::{ensure, errors::Result, Error, Rate, Real, Time, Volatility};
use vc_math::comparison::is_strictly_increasing;
use vc_math::optimization::{
    Array, ArmijoLineSearch, ConjugateGradient, CostFunction, EndCriteria, EndCriteriaType,
    LevenbergMarquardt, OptimizationMethod,
};
use vc_math::{sabr_volatility, SabrParameters};

use crate::smile_section::SabrParameterSet;

const RHO_BOUND: Real = 0.9999;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Starting point of a SABR fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationContext {
    /// Initial alpha.
    pub alpha_guess: Real,
    /// Initial beta; ignored when beta is fixed.
    pub beta_guess: Real,
    /// Initial nu.
    pub nu_guess: Real,
    /// Initial rho.
    pub rho_guess: Real,
}

impl Default for CalibrationContext {
    fn default() -> Self {
        Self {
            alpha_guess: 0.02,
            beta_guess: 0.36,
            nu_guess: 0.4,
            rho_guess: 0.2,
        }
    }
}

impl From<&SabrParameters> for CalibrationContext {
    fn from(p: &SabrParameters) -> Self {
        Self {
            alpha_guess: p.alpha,
            beta_guess: p.beta,
            nu_guess: p.nu,
            rho_guess: p.rho,
        }
    }
}

/// Optimiser used for each smile fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationMethod {
    /// Damped Gauss–Newton.
    #[default]
    LevenbergMarquardt,
    /// Fletcher–Reeves conjugate gradient.
    ConjugateGradient,
}

/// Settings shared by every smile fit of a cube.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrCalibrationConfig {
    /// Beta held fixed during the fit, or `None` to calibrate it.
    pub fixed_beta: Option<Real>,
    /// Optimiser.
    pub method: CalibrationMethod,
    /// Stopping rules of the optimiser.
    pub end_criteria: EndCriteria,
    /// Backtracking line search of the optimiser.
    pub line_search: ArmijoLineSearch,
    /// Largest accepted RMS volatility error of a fit.
    pub accuracy_tolerance: Real,
    /// Seed each node of a grid pass with the previous node's result.
    ///
    /// Warm-started passes run sequentially in row-major node order.
    pub warm_start: bool,
}

impl Default for SabrCalibrationConfig {
    fn default() -> Self {
        Self {
            fixed_beta: Some(0.7),
            method: CalibrationMethod::default(),
            end_criteria: EndCriteria::new(2_000, 50, 1e-18, 1e-22, 1e-16),
            line_search: ArmijoLineSearch::default(),
            accuracy_tolerance: 1e-4,
            warm_start: false,
        }
    }
}

impl SabrCalibrationConfig {
    /// Fix beta, or free it with `None`.
    pub fn with_fixed_beta(mut self, beta: Option<Real>) -> Self {
        self.fixed_beta = beta;
        self
    }

    /// Use `method` for every fit.
    pub fn with_method(mut self, method: CalibrationMethod) -> Self {
        self.method = method;
        self
    }

    /// Override the optimiser stopping rules.
    pub fn with_end_criteria(mut self, end_criteria: EndCriteria) -> Self {
        self.end_criteria = end_criteria;
        self
    }

    /// Override the accepted RMS error.
    pub fn with_accuracy_tolerance(mut self, tolerance: Real) -> Self {
        self.accuracy_tolerance = tolerance;
        self
    }

    /// Enable or disable warm starts across a grid pass.
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }
}

// ── Inputs and results ────────────────────────────────────────────────────────

/// Market smile at one (expiry, length) node.
#[derive(Debug, Clone, PartialEq)]
pub struct SmileQuotes {
    /// Option expiry in years.
    pub expiry: Time,
    /// Swap length in years.
    pub length: Time,
    /// ATM forward swap rate.
    pub forward: Rate,
    /// Absolute strikes, strictly increasing.
    pub strikes: Vec<Rate>,
    /// Black volatilities, one per strike.
    pub vols: Vec<Volatility>,
}

impl SmileQuotes {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.strikes.len() == self.vols.len(),
            DimensionMismatch,
            "{} strikes but {} vols at ({}, {})",
            self.strikes.len(),
            self.vols.len(),
            self.expiry,
            self.length
        );
        ensure!(
            self.strikes.len() >= 2,
            InvalidInput,
            "need at least 2 strikes to calibrate, got {}",
            self.strikes.len()
        );
        ensure!(
            is_strictly_increasing(&self.strikes),
            InvalidInput,
            "strikes must be strictly increasing"
        );
        ensure!(
            self.strikes[0] > 0.0,
            InvalidInput,
            "SABR strikes must be positive, got {} at ({}, {})",
            self.strikes[0],
            self.expiry,
            self.length
        );
        ensure!(
            self.forward > 0.0,
            InvalidInput,
            "SABR forward must be positive, got {}",
            self.forward
        );
        ensure!(
            self.expiry > 0.0,
            InvalidInput,
            "expiry must be positive, got {}",
            self.expiry
        );
        Ok(())
    }
}

/// Outcome of one smile fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SabrCalibration {
    /// Calibrated parameters.
    pub params: SabrParameters,
    /// Forward the smile was fitted at.
    pub forward: Rate,
    /// RMS volatility error over the quotes.
    pub rms_error: Real,
    /// Largest absolute volatility error over the quotes.
    pub max_error: Real,
    /// Optimiser iterations.
    pub iterations: usize,
    /// Why the optimiser stopped.
    pub end_type: EndCriteriaType,
}

impl SabrCalibration {
    /// The five-value record stored in a parameter cube.
    pub fn parameter_set(&self) -> SabrParameterSet {
        SabrParameterSet {
            params: self.params,
            forward: self.forward,
        }
    }
}

// ── Cost function ─────────────────────────────────────────────────────────────

struct SabrSmileCost<'a> {
    quotes: &'a SmileQuotes,
    fixed_beta: Option<Real>,
}

impl SabrSmileCost<'_> {
    fn params(&self, y: &Array) -> SabrParameters {
        let beta = match self.fixed_beta {
            Some(beta) => beta,
            None => 1.0 / (1.0 + (-y[3]).exp()),
        };
        SabrParameters::new(y[0].exp(), beta, y[1].exp(), RHO_BOUND * y[2].tanh())
    }

    fn initial_point(&self, ctx: &CalibrationContext) -> Array {
        let rho = (ctx.rho_guess / RHO_BOUND).clamp(-0.999, 0.999);
        let mut y = vec![
            ctx.alpha_guess.max(1e-8).ln(),
            ctx.nu_guess.max(1e-8).ln(),
            rho.atanh(),
        ];
        if self.fixed_beta.is_none() {
            let b = ctx.beta_guess.clamp(1e-6, 1.0 - 1e-6);
            y.push((b / (1.0 - b)).ln());
        }
        Array::from_vec(y)
    }
}

impl CostFunction for SabrSmileCost<'_> {
    fn values(&self, y: &Array) -> Array {
        let p = self.params(y);
        let q = self.quotes;
        Array::from_iterator(
            q.strikes.len(),
            q.strikes
                .iter()
                .zip(&q.vols)
                .map(|(&k, &v)| sabr_volatility(q.forward, k, q.expiry, &p) - v),
        )
    }
}

// ── Calibrator ────────────────────────────────────────────────────────────────

/// Fits SABR parameters to market smiles.
#[derive(Debug, Clone, Default)]
pub struct SabrCalibrator {
    config: SabrCalibrationConfig,
}

impl SabrCalibrator {
    /// Create a calibrator.
    pub fn new(config: SabrCalibrationConfig) -> Self {
        Self { config }
    }

    /// Calibration settings.
    pub fn config(&self) -> &SabrCalibrationConfig {
        &self.config
    }

    /// Fit one smile starting from `context`.
    ///
    /// # Errors
    /// * [`Error::DimensionMismatch`] / [`Error::InvalidInput`] for malformed
    ///   quotes, or a fixed beta outside `[0, 1]`.
    /// * [`Error::CalibrationAccuracy`] if the RMS error of the fit exceeds
    ///   the configured tolerance.
    pub fn calibrate(
        &self,
        quotes: &SmileQuotes,
        context: &CalibrationContext,
    ) -> Result<SabrCalibration> {
        quotes.validate()?;
        if let Some(beta) = self.config.fixed_beta {
            ensure!(
                (0.0..=1.0).contains(&beta),
                InvalidInput,
                "fixed beta must be in [0, 1], got {beta}"
            );
        }

        let cost = SabrSmileCost {
            quotes,
            fixed_beta: self.config.fixed_beta,
        };
        let start = cost.initial_point(context);
        let outcome = match self.config.method {
            CalibrationMethod::LevenbergMarquardt => {
                LevenbergMarquardt::new(self.config.line_search, 1e-3).minimize(
                    &cost,
                    &start,
                    &self.config.end_criteria,
                )?
            }
            CalibrationMethod::ConjugateGradient => ConjugateGradient::new(self.config.line_search)
                .minimize(&cost, &start, &self.config.end_criteria)?,
        };

        let residuals = cost.values(&outcome.x);
        let n = residuals.len() as Real;
        let rms_error = (residuals.norm_squared() / n).sqrt();
        let max_error = residuals.amax();
        let params = cost.params(&outcome.x);

        debug!(
            expiry = quotes.expiry,
            length = quotes.length,
            alpha = params.alpha,
            beta = params.beta,
            nu = params.nu,
            rho = params.rho,
            rms_error,
            iterations = outcome.iterations,
            end_type = ?outcome.end_type,
            "SABR node calibrated"
        );

        if rms_error.is_nan() || rms_error > self.config.accuracy_tolerance {
            warn!(
                expiry = quotes.expiry,
                length = quotes.length,
                rms_error,
                tolerance = self.config.accuracy_tolerance,
                "SABR calibration failed accuracy check"
            );
            return Err(Error::CalibrationAccuracy {
                expiry: quotes.expiry,
                length: quotes.length,
                rms_error,
                tolerance: self.config.accuracy_tolerance,
            });
        }

        Ok(SabrCalibration {
            params,
            forward: quotes.forward,
            rms_error,
            max_error,
            iterations: outcome.iterations,
            end_type: outcome.end_type,
        })
    }

    /// Fit every smile of a grid pass.
    ///
    /// Results come back in the order of `quotes`.  Without warm starts the
    /// fits are independent and run in parallel when the `parallel` feature
    /// is enabled; with warm starts each fit is seeded by the previous one.
    /// The first failing node aborts the pass.
    pub fn calibrate_all(
        &self,
        quotes: &[SmileQuotes],
        context: &CalibrationContext,
    ) -> Result<Vec<SabrCalibration>> {
        let results = if self.config.warm_start {
            let mut ctx = *context;
            let mut results = Vec::with_capacity(quotes.len());
            for q in quotes {
                let fit = self.calibrate(q, &ctx)?;
                ctx = CalibrationContext::from(&fit.params);
                results.push(fit);
            }
            results
        } else {
            self.calibrate_independent(quotes, context)?
        };

        let worst = results.iter().map(|r| r.rms_error).fold(0.0, Real::max);
        info!(
            nodes = results.len(),
            max_rms_error = worst,
            warm_start = self.config.warm_start,
            "SABR calibration pass complete"
        );
        Ok(results)
    }

    #[cfg(feature = "parallel")]
    fn calibrate_independent(
        &self,
        quotes: &[SmileQuotes],
        context: &CalibrationContext,
    ) -> Result<Vec<SabrCalibration>> {
        use rayon::prelude::*;
        quotes
            .par_iter()
            .map(|q| self.calibrate(q, context))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn calibrate_independent(
        &self,
        quotes: &[SmileQuotes],
        context: &CalibrationContext,
    ) -> Result<Vec<SabrCalibration>> {
        quotes.iter().map(|q| self.calibrate(q, context)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const FORWARD: Rate = 0.04;
    const OFFSETS: [Real; 5] = [-0.02, -0.01, 0.0, 0.01, 0.02];

    fn market_params() -> SabrParameters {
        SabrParameters::new(0.03, 0.7, 0.4, -0.2)
    }

    fn quotes(expiry: Time, p: &SabrParameters) -> SmileQuotes {
        let strikes: Vec<Rate> = OFFSETS.iter().map(|o| FORWARD + o).collect();
        let vols = strikes
            .iter()
            .map(|&k| sabr_volatility(FORWARD, k, expiry, p))
            .collect();
        SmileQuotes {
            expiry,
            length: 10.0,
            forward: FORWARD,
            strikes,
            vols,
        }
    }

    #[test]
    fn recovers_parameters_with_fixed_beta() {
        let p = market_params();
        let fit = SabrCalibrator::default()
            .calibrate(&quotes(5.0, &p), &CalibrationContext::default())
            .unwrap();
        assert_eq!(fit.params.beta, 0.7);
        assert!(fit.rms_error < 1e-6, "rms {}", fit.rms_error);
        assert_abs_diff_eq!(fit.params.alpha, p.alpha, epsilon = 1e-4);
        assert_abs_diff_eq!(fit.params.nu, p.nu, epsilon = 1e-2);
        assert_abs_diff_eq!(fit.params.rho, p.rho, epsilon = 1e-2);
        assert_eq!(fit.forward, FORWARD);
    }

    #[test]
    fn conjugate_gradient_meets_tolerance() {
        let p = market_params();
        let config = SabrCalibrationConfig::default()
            .with_method(CalibrationMethod::ConjugateGradient)
            .with_end_criteria(EndCriteria::new(100_000, 1_000, 1e-14, 1e-20, 1e-14));
        let start = CalibrationContext {
            alpha_guess: 0.0305,
            ..CalibrationContext::from(&p)
        };
        let fit = SabrCalibrator::new(config)
            .calibrate(&quotes(2.0, &p), &start)
            .unwrap();
        assert!(fit.rms_error <= 1e-4);
    }

    #[test]
    fn free_beta_fits_the_smile() {
        let p = SabrParameters::new(0.03, 0.5, 0.3, -0.1);
        let config = SabrCalibrationConfig::default().with_fixed_beta(None);
        let fit = SabrCalibrator::new(config)
            .calibrate(&quotes(3.0, &p), &CalibrationContext::default())
            .unwrap();
        assert!((0.0..=1.0).contains(&fit.params.beta));
        assert!(fit.rms_error <= 1e-4);
    }

    #[test]
    fn unattainable_tolerance_is_reported_with_node() {
        let mut q = quotes(5.0, &market_params());
        // a kink SABR cannot reproduce
        q.vols[2] += 0.05;
        let err = SabrCalibrator::default()
            .calibrate(&q, &CalibrationContext::default())
            .unwrap_err();
        match err {
            Error::CalibrationAccuracy {
                expiry,
                length,
                rms_error,
                tolerance,
            } => {
                assert_eq!(expiry, 5.0);
                assert_eq!(length, 10.0);
                assert!(rms_error > tolerance);
                assert_eq!(tolerance, 1e-4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_quotes() {
        let calibrator = SabrCalibrator::default();
        let ctx = CalibrationContext::default();
        let mut q = quotes(1.0, &market_params());
        q.vols.pop();
        assert!(matches!(
            calibrator.calibrate(&q, &ctx),
            Err(Error::DimensionMismatch(_))
        ));

        let mut q = quotes(1.0, &market_params());
        q.strikes.truncate(1);
        q.vols.truncate(1);
        assert!(matches!(
            calibrator.calibrate(&q, &ctx),
            Err(Error::InvalidInput(_))
        ));

        let mut q = quotes(1.0, &market_params());
        q.strikes[0] = -0.01;
        assert!(matches!(
            calibrator.calibrate(&q, &ctx),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn grid_pass_preserves_node_order() {
        let p = market_params();
        let all: Vec<SmileQuotes> = [1.0, 2.0, 5.0, 10.0]
            .iter()
            .map(|&t| quotes(t, &p))
            .collect();
        for warm_start in [false, true] {
            let calibrator =
                SabrCalibrator::new(SabrCalibrationConfig::default().with_warm_start(warm_start));
            let fits = calibrator
                .calibrate_all(&all, &CalibrationContext::default())
                .unwrap();
            assert_eq!(fits.len(), all.len());
            for fit in &fits {
                assert_abs_diff_eq!(fit.params.alpha, p.alpha, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn context_from_parameters() {
        let ctx = CalibrationContext::from(&market_params());
        assert_eq!(ctx.alpha_guess, 0.03);
        assert_eq!(ctx.rho_guess, -0.2);
        let d = CalibrationContext::default();
        assert_eq!(
            (d.alpha_guess, d.beta_guess, d.nu_guess, d.rho_guess),
            (0.02, 0.36, 0.4, 0.2)
        );
    }
}
