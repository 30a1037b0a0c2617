//! Bilinear 2D interpolation on a rectangular grid `(xs × ys → z)`.
//!
//! Values are stored in an `nalgebra` matrix with rows indexed by `xs` and
//! columns by `ys`, which is exactly the layout of a cube layer
//! (expiries × lengths).

use nalgebra::DMatrix;
use vc_core::{ensure, errors::Result, Real};

use super::locate;
use crate::comparison::is_strictly_increasing;

/// 2D interpolation trait.
pub trait Interpolation2D: std::fmt::Debug + Send + Sync {
    /// Evaluate the surface at `(x, y)`, extrapolating the boundary cells
    /// when the point lies outside the grid.
    fn evaluate(&self, x: Real, y: Real) -> Real;
    /// Lower bound of the x domain.
    fn x_min(&self) -> Real;
    /// Upper bound of the x domain.
    fn x_max(&self) -> Real;
    /// Lower bound of the y domain.
    fn y_min(&self) -> Real;
    /// Upper bound of the y domain.
    fn y_max(&self) -> Real;
    /// Whether evaluation outside the grid is allowed.
    fn allows_extrapolation(&self) -> bool;

    /// Return `true` if `(x, y)` lies inside the grid rectangle.
    fn is_in_range(&self, x: Real, y: Real) -> bool {
        x >= self.x_min() && x <= self.x_max() && y >= self.y_min() && y <= self.y_max()
    }

    /// Evaluate the surface at `(x, y)`, honouring the extrapolation flag.
    ///
    /// # Errors
    /// [`vc_core::Error::OutOfDomain`] if the point is outside the grid and
    /// extrapolation is disabled.
    fn value(&self, x: Real, y: Real) -> Result<Real> {
        ensure!(
            self.allows_extrapolation() || self.is_in_range(x, y),
            OutOfDomain,
            "({x}, {y}) outside [{}, {}] × [{}, {}] with extrapolation disabled",
            self.x_min(),
            self.x_max(),
            self.y_min(),
            self.y_max()
        );
        Ok(self.evaluate(x, y))
    }
}

/// Bilinear interpolation on a rectangular grid.
///
/// `z[(i, j)]` = f(xs\[i\], ys\[j\]).
#[derive(Debug, Clone)]
pub struct BilinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
    z: DMatrix<Real>,
    extrapolate: bool,
}

impl BilinearInterpolation {
    /// Build a bilinear interpolation on the grid `(xs × ys → z)`.
    ///
    /// Both `xs` and `ys` must be strictly increasing with at least two
    /// entries, and `z` must be `xs.len() × ys.len()`.
    pub fn new(xs: &[Real], ys: &[Real], z: &DMatrix<Real>, extrapolate: bool) -> Result<Self> {
        ensure!(xs.len() >= 2, InvalidGrid, "need at least 2 x points, got {}", xs.len());
        ensure!(ys.len() >= 2, InvalidGrid, "need at least 2 y points, got {}", ys.len());
        ensure!(
            is_strictly_increasing(xs) && is_strictly_increasing(ys),
            InvalidGrid,
            "grid coordinates must be strictly increasing"
        );
        ensure!(
            z.nrows() == xs.len() && z.ncols() == ys.len(),
            DimensionMismatch,
            "z is {}×{}, grid is {}×{}",
            z.nrows(),
            z.ncols(),
            xs.len(),
            ys.len()
        );
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            z: z.clone(),
            extrapolate,
        })
    }

    /// Enable or disable extrapolation.
    pub fn with_extrapolation(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }
}

impl Interpolation2D for BilinearInterpolation {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }

    fn y_min(&self) -> Real {
        self.ys[0]
    }

    fn y_max(&self) -> Real {
        self.ys[self.ys.len() - 1]
    }

    fn allows_extrapolation(&self) -> bool {
        self.extrapolate
    }

    fn evaluate(&self, x: Real, y: Real) -> Real {
        let i = locate(&self.xs, x);
        let j = locate(&self.ys, y);

        let z1 = self.z[(i, j)];
        let z2 = self.z[(i + 1, j)];
        let z3 = self.z[(i, j + 1)];
        let z4 = self.z[(i + 1, j + 1)];

        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        let u = (y - self.ys[j]) / (self.ys[j + 1] - self.ys[j]);

        (1.0 - t) * (1.0 - u) * z1 + t * (1.0 - u) * z2 + (1.0 - t) * u * z3 + t * u * z4
    }
}
