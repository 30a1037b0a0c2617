//! Forward swap rate providers.
//!
//! The cube only needs one thing from the rate world: the fair forward swap
//! rate of the `(expiry, length)` underlying, which is the ATM strike of the
//! smile at that node.

use std::sync::Arc;

use vc_core::{ensure, errors::Result, Rate, Real, Time};

/// Supplies the ATM forward swap rate at any (expiry, length).
pub trait ForwardRateProvider: Send + Sync {
    /// Fair rate of the swap of tenor `length` starting at `expiry`.
    fn fair_forward_rate(&self, expiry: Time, length: Time) -> Result<Rate>;
}

impl<F> ForwardRateProvider for F
where
    F: Fn(Time, Time) -> Rate + Send + Sync,
{
    fn fair_forward_rate(&self, expiry: Time, length: Time) -> Result<Rate> {
        Ok(self(expiry, length))
    }
}

/// Par swap rates off a flat continuously-compounded zero curve.
///
/// The fixed leg pays `fixed_frequency` times a year; the swap starts
/// `settlement_lag` years after the option expiry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurveSwapRate {
    zero_rate: Rate,
    fixed_frequency: u32,
    settlement_lag: Time,
}

impl FlatCurveSwapRate {
    /// Create a provider.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidInput`] if the frequency is zero or the lag is
    /// negative.
    pub fn new(zero_rate: Rate, fixed_frequency: u32, settlement_lag: Time) -> Result<Self> {
        ensure!(
            fixed_frequency > 0,
            InvalidInput,
            "fixed leg frequency must be positive"
        );
        ensure!(
            settlement_lag >= 0.0,
            InvalidInput,
            "settlement lag must be non-negative, got {settlement_lag}"
        );
        Ok(Self {
            zero_rate,
            fixed_frequency,
            settlement_lag,
        })
    }

    fn discount(&self, t: Time) -> Real {
        (-self.zero_rate * t).exp()
    }
}

impl ForwardRateProvider for FlatCurveSwapRate {
    fn fair_forward_rate(&self, expiry: Time, length: Time) -> Result<Rate> {
        ensure!(
            expiry >= 0.0 && length > 0.0,
            InvalidInput,
            "no swap of length {length} at expiry {expiry}"
        );
        let tau = 1.0 / Real::from(self.fixed_frequency);
        let periods = ((length / tau).round() as usize).max(1);
        let start = expiry + self.settlement_lag;
        let annuity: Real = (1..=periods)
            .map(|i| tau * self.discount(start + i as Real * tau))
            .sum();
        let end = start + periods as Real * tau;
        Ok((self.discount(start) - self.discount(end)) / annuity)
    }
}

/// Routes short underlyings to a separate provider.
///
/// Lengths up to and including `short_tenor` use `short`; longer ones use
/// `long`.
#[derive(Clone)]
pub struct TenorSwitchedForward {
    short_tenor: Time,
    short: Arc<dyn ForwardRateProvider>,
    long: Arc<dyn ForwardRateProvider>,
}

impl TenorSwitchedForward {
    /// Create a switched provider.
    pub fn new(
        short_tenor: Time,
        short: Arc<dyn ForwardRateProvider>,
        long: Arc<dyn ForwardRateProvider>,
    ) -> Self {
        Self {
            short_tenor,
            short,
            long,
        }
    }
}

impl std::fmt::Debug for TenorSwitchedForward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenorSwitchedForward")
            .field("short_tenor", &self.short_tenor)
            .finish_non_exhaustive()
    }
}

impl ForwardRateProvider for TenorSwitchedForward {
    fn fair_forward_rate(&self, expiry: Time, length: Time) -> Result<Rate> {
        if length <= self.short_tenor {
            self.short.fair_forward_rate(expiry, length)
        } else {
            self.long.fair_forward_rate(expiry, length)
        }
    }
}
