//! ATM volatility reference structures.

use nalgebra::DMatrix;
use vc_core::{errors::Result, Rate, Real, Time, Volatility};
use vc_math::{BilinearInterpolation, Interpolation2D};

use crate::grid::GridIndex;

/// An ATM swaption volatility surface over (expiry, length).
///
/// The cube adds smile spreads on top of this surface, and densification
/// adds its native grid to the cube's own.
pub trait AtmVolatilityStructure: std::fmt::Debug + Send + Sync {
    /// Black volatility of the `(expiry, length)` swaption struck at `strike`.
    fn volatility(&self, expiry: Time, length: Time, strike: Rate) -> Result<Volatility>;

    /// Expiries the surface is quoted on.
    fn native_expiries(&self) -> &[Time];

    /// Swap lengths the surface is quoted on.
    fn native_lengths(&self) -> &[Time];
}

/// ATM volatilities quoted on an expiry × length matrix, interpolated
/// bilinearly.
///
/// Strike is ignored: the matrix holds one volatility per node.
#[derive(Debug, Clone)]
pub struct SwaptionVolatilityMatrix {
    expiries: GridIndex,
    lengths: GridIndex,
    vols: DMatrix<Real>,
    interpolation: BilinearInterpolation,
}

impl SwaptionVolatilityMatrix {
    /// Build the surface; `vols[(i, j)]` is quoted at `(expiries[i], lengths[j])`.
    ///
    /// Extrapolation beyond the quoted grid is on.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidGrid`] for invalid axes and
    /// [`vc_core::Error::DimensionMismatch`] if `vols` has the wrong shape.
    pub fn new(expiries: Vec<Time>, lengths: Vec<Time>, vols: DMatrix<Real>) -> Result<Self> {
        let expiries = GridIndex::new(expiries)?;
        let lengths = GridIndex::new(lengths)?;
        let interpolation =
            BilinearInterpolation::new(expiries.values(), lengths.values(), &vols, true)?;
        Ok(Self {
            expiries,
            lengths,
            vols,
            interpolation,
        })
    }

    /// Enable or disable extrapolation beyond the quoted grid.
    pub fn with_extrapolation(mut self, extrapolate: bool) -> Self {
        self.interpolation = self.interpolation.with_extrapolation(extrapolate);
        self
    }

    /// Quoted volatilities.
    pub fn vols(&self) -> &DMatrix<Real> {
        &self.vols
    }
}

impl AtmVolatilityStructure for SwaptionVolatilityMatrix {
    fn volatility(&self, expiry: Time, length: Time, _strike: Rate) -> Result<Volatility> {
        self.interpolation.value(expiry, length)
    }

    fn native_expiries(&self) -> &[Time] {
        self.expiries.values()
    }

    fn native_lengths(&self) -> &[Time] {
        self.lengths.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use vc_core::Error;

    fn matrix() -> SwaptionVolatilityMatrix {
        let vols = DMatrix::from_row_slice(2, 3, &[0.20, 0.18, 0.16, 0.22, 0.20, 0.18]);
        SwaptionVolatilityMatrix::new(vec![1.0, 5.0], vec![2.0, 10.0, 30.0], vols).unwrap()
    }

    #[test]
    fn quoted_nodes_and_interpolation() {
        let m = matrix();
        assert_abs_diff_eq!(m.volatility(5.0, 10.0, 0.03).unwrap(), 0.20, epsilon = 1e-15);
        assert_abs_diff_eq!(m.volatility(3.0, 2.0, 0.03).unwrap(), 0.21, epsilon = 1e-12);
        assert_eq!(m.native_expiries(), &[1.0, 5.0]);
        assert_eq!(m.native_lengths(), &[2.0, 10.0, 30.0]);
    }

    #[test]
    fn extrapolation_can_be_disabled() {
        let m = matrix();
        assert_abs_diff_eq!(m.volatility(9.0, 2.0, 0.03).unwrap(), 0.24, epsilon = 1e-12);
        let closed = m.with_extrapolation(false);
        assert!(matches!(
            closed.volatility(9.0, 2.0, 0.03),
            Err(Error::OutOfDomain(_))
        ));
    }

    #[test]
    fn shape_is_checked() {
        let err =
            SwaptionVolatilityMatrix::new(vec![1.0, 5.0], vec![2.0, 10.0], DMatrix::zeros(3, 2))
                .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }
}
