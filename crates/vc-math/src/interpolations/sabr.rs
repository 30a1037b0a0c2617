//! SABR (Stochastic Alpha Beta Rho) implied volatility.
//!
//! Hagan et al. (2002) closed-form approximation for the Black volatility of
//! a forward `f` at strike `k`:
//!
//! ```text
//! σ_B(k) = α / [(fk)^((1-β)/2) (1 + (1-β)²/24 L² + (1-β)⁴/1920 L⁴)]
//!          · z / x(z)
//!          · [1 + ((1-β)²/24 α²/(fk)^(1-β) + ρβνα/(4 (fk)^((1-β)/2)) + (2-3ρ²)/24 ν²) t]
//! ```
//!
//! with `L = ln(f/k)`, `z = ν/α (fk)^((1-β)/2) L` and
//! `x(z) = ln((√(1-2ρz+z²) + z - ρ) / (1-ρ))`.

use vc_core::{ensure, errors::Result, Real, Time, Volatility};

/// SABR model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrParameters {
    /// Alpha (initial volatility level)
    pub alpha: Real,
    /// Beta (CEV exponent, usually fixed: 0 = normal, 1 = log-normal)
    pub beta: Real,
    /// Nu (vol-of-vol)
    pub nu: Real,
    /// Rho (correlation between forward and volatility increments)
    pub rho: Real,
}

impl SabrParameters {
    /// Create a parameter set without validation.
    pub fn new(alpha: Real, beta: Real, nu: Real, rho: Real) -> Self {
        Self {
            alpha,
            beta,
            nu,
            rho,
        }
    }

    /// Check the parameter domain: `α > 0`, `β ∈ [0, 1]`, `ν ≥ 0`, `|ρ| < 1`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.alpha > 0.0,
            InvalidInput,
            "SABR alpha must be positive, got {}",
            self.alpha
        );
        ensure!(
            (0.0..=1.0).contains(&self.beta),
            InvalidInput,
            "SABR beta must be in [0, 1], got {}",
            self.beta
        );
        ensure!(
            self.nu >= 0.0,
            InvalidInput,
            "SABR nu must be non-negative, got {}",
            self.nu
        );
        ensure!(
            self.rho.abs() < 1.0,
            InvalidInput,
            "SABR rho must satisfy |rho| < 1, got {}",
            self.rho
        );
        Ok(())
    }
}

/// Compute the SABR implied (Black) volatility using the Hagan et al. (2002) formula.
///
/// # Arguments
/// * `f`: forward rate (positive)
/// * `k`: strike (positive)
/// * `t`: time to expiry (years)
/// * `p`: SABR parameters
pub fn sabr_volatility(f: Real, k: Real, t: Time, p: &SabrParameters) -> Volatility {
    let SabrParameters {
        alpha,
        beta,
        nu,
        rho,
    } = *p;

    let one_minus_beta = 1.0 - beta;
    let a = one_minus_beta * one_minus_beta;

    let log_fk = (f / k).ln();
    let fk_beta = (f * k).powf(one_minus_beta);
    let fk_half_beta = fk_beta.sqrt();

    let log_fk2 = log_fk * log_fk;
    let denom = fk_half_beta * (1.0 + a / 24.0 * log_fk2 + a * a / 1920.0 * log_fk2 * log_fk2);

    let z = nu / alpha * fk_half_beta * log_fk;
    let ratio = z_over_x(z, rho);

    let correction = 1.0
        + (a / 24.0 * alpha * alpha / fk_beta
            + 0.25 * rho * beta * nu * alpha / fk_half_beta
            + (2.0 - 3.0 * rho * rho) / 24.0 * nu * nu)
            * t;

    alpha / denom * ratio * correction
}

/// `z / x(z)`, with its Taylor expansion near the money where both vanish.
fn z_over_x(z: Real, rho: Real) -> Real {
    if z.abs() < 1e-6 {
        return 1.0 - 0.5 * rho * z + (2.0 - 3.0 * rho * rho) * z * z / 12.0;
    }
    let sqrt_val = (1.0 - 2.0 * rho * z + z * z).max(0.0).sqrt();
    let xz = ((sqrt_val + z - rho) / (1.0 - rho)).ln();
    z / xz
}
