//! Validated market input of a swaption volatility cube.

use nalgebra::DMatrix;
use vc_core::{ensure, errors::Result, Real, Size, Spread, Time};
use vc_math::comparison::is_strictly_increasing;

/// Sparse smile quotes: volatility spreads over ATM, per option expiry,
/// swap length and strike offset.
///
/// `vol_spreads` has one row per (expiry, length) pair, ordered expiry-major
/// (row `i * n_lengths + j` is expiry `i`, length `j`), and one column per
/// strike offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MarketVolatilityCube {
    expiries: Vec<Time>,
    lengths: Vec<Time>,
    strike_spreads: Vec<Spread>,
    vol_spreads: DMatrix<Real>,
}

impl MarketVolatilityCube {
    /// Validate and store market input.
    ///
    /// # Errors
    /// * [`vc_core::Error::InvalidInput`] if the first expiry or length is not
    ///   positive, an axis is not strictly increasing, or fewer than two
    ///   strike offsets are given.
    /// * [`vc_core::Error::DimensionMismatch`] if `vol_spreads` does not have
    ///   `n_expiries · n_lengths` rows and one column per strike offset.
    pub fn new(
        expiries: Vec<Time>,
        lengths: Vec<Time>,
        strike_spreads: Vec<Spread>,
        vol_spreads: DMatrix<Real>,
    ) -> Result<Self> {
        ensure!(!expiries.is_empty(), InvalidInput, "no option expiries given");
        ensure!(
            expiries[0] > 0.0,
            InvalidInput,
            "first option expiry is negative or zero ({})",
            expiries[0]
        );
        ensure!(
            is_strictly_increasing(&expiries),
            InvalidInput,
            "non increasing option expiries"
        );
        ensure!(!lengths.is_empty(), InvalidInput, "no swap lengths given");
        ensure!(
            lengths[0] > 0.0,
            InvalidInput,
            "first swap length is negative or zero ({})",
            lengths[0]
        );
        ensure!(
            is_strictly_increasing(&lengths),
            InvalidInput,
            "non increasing swap lengths"
        );
        ensure!(
            strike_spreads.len() > 1,
            InvalidInput,
            "too few strikes ({})",
            strike_spreads.len()
        );
        ensure!(
            is_strictly_increasing(&strike_spreads),
            InvalidInput,
            "non increasing strike spreads"
        );
        ensure!(
            vol_spreads.ncols() == strike_spreads.len(),
            DimensionMismatch,
            "{} columns in volatility spreads, {} strike spreads",
            vol_spreads.ncols(),
            strike_spreads.len()
        );
        ensure!(
            vol_spreads.nrows() == expiries.len() * lengths.len(),
            DimensionMismatch,
            "{} rows in volatility spreads, {} expiries × {} lengths",
            vol_spreads.nrows(),
            expiries.len(),
            lengths.len()
        );
        Ok(Self {
            expiries,
            lengths,
            strike_spreads,
            vol_spreads,
        })
    }

    /// Replace the volatility spreads on the same axes.
    ///
    /// The result is validated like a freshly built cube.
    pub fn with_vol_spreads(&self, vol_spreads: DMatrix<Real>) -> Result<Self> {
        Self::new(
            self.expiries.clone(),
            self.lengths.clone(),
            self.strike_spreads.clone(),
            vol_spreads,
        )
    }

    /// Option expiries in years.
    pub fn expiries(&self) -> &[Time] {
        &self.expiries
    }

    /// Swap lengths in years.
    pub fn lengths(&self) -> &[Time] {
        &self.lengths
    }

    /// Strike offsets from ATM.
    pub fn strike_spreads(&self) -> &[Spread] {
        &self.strike_spreads
    }

    /// Raw volatility spread matrix.
    pub fn vol_spreads(&self) -> &DMatrix<Real> {
        &self.vol_spreads
    }

    /// Number of strike offsets.
    pub fn n_strikes(&self) -> Size {
        self.strike_spreads.len()
    }

    /// Volatility spread of expiry `i`, length `j` at strike offset `k`.
    pub fn vol_spread(&self, i: Size, j: Size, k: Size) -> Real {
        self.vol_spreads[(i * self.lengths.len() + j, k)]
    }

    /// Spreads over ATM for every strike offset at expiry `i`, length `j`.
    pub fn smile_spreads(&self, i: Size, j: Size) -> Vec<Real> {
        let row = i * self.lengths.len() + j;
        self.vol_spreads.row(row).iter().copied().collect()
    }

    /// One expiry × length matrix per strike offset.
    pub fn spread_layers(&self) -> Vec<DMatrix<Real>> {
        let (ne, nl) = (self.expiries.len(), self.lengths.len());
        (0..self.n_strikes())
            .map(|k| DMatrix::from_fn(ne, nl, |i, j| self.vol_spread(i, j, k)))
            .collect()
    }
}
