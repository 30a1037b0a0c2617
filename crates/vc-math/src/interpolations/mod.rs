//! 1D interpolation trait and the linear scheme; submodules hold the cubic
//! spline, bilinear surfaces and the SABR smile formula.

use vc_core::{ensure, errors::Result, Real};

use crate::comparison::is_strictly_increasing;

/// Bilinear 2D interpolation.
pub mod bilinear;

/// Natural cubic spline.
pub mod cubic;

/// Hagan SABR implied-volatility formula.
pub mod sabr;

/// A 1D interpolation function `f: R → R` defined by a set of known points.
///
/// Evaluation outside `[x_min, x_max]` extrapolates the boundary segment.
pub trait Interpolation1D: std::fmt::Debug + Send + Sync {
    /// Evaluate the interpolation at `x`.
    fn value(&self, x: Real) -> Real;

    /// Return the lower bound of the interpolation domain.
    fn x_min(&self) -> Real;

    /// Return the upper bound of the interpolation domain.
    fn x_max(&self) -> Real;

    /// Return `true` if `x` is within the interpolation range.
    fn is_in_range(&self, x: Real) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }
}

/// Binary search: find `k` such that `xs[k] <= x < xs[k+1]`, clamped to
/// `[0, n-2]` so that out-of-range values use the boundary segment.
pub(crate) fn locate(xs: &[Real], x: Real) -> usize {
    let n = xs.len();
    if x <= xs[0] {
        return 0;
    }
    if x >= xs[n - 1] {
        return n - 2;
    }
    // partition_point returns the first index with xs[i] > x, which is >= 1 here
    xs.partition_point(|&v| v <= x) - 1
}

/// Validate the abscissae/ordinates shared by every 1D scheme.
pub(crate) fn check_points(xs: &[Real], ys: &[Real], min_points: usize) -> Result<()> {
    ensure!(
        xs.len() >= min_points,
        InvalidInput,
        "need at least {min_points} points for interpolation, got {}",
        xs.len()
    );
    ensure!(
        xs.len() == ys.len(),
        DimensionMismatch,
        "xs ({}) and ys ({}) must have the same length",
        xs.len(),
        ys.len()
    );
    ensure!(
        is_strictly_increasing(xs),
        InvalidInput,
        "interpolation abscissae must be strictly increasing"
    );
    Ok(())
}

// ── Linear ────────────────────────────────────────────────────────────────────

/// Linear interpolation.
///
/// `f(x) = y[i] + (y[i+1] - y[i]) * (x - x[i]) / (x[i+1] - x[i])`
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl LinearInterpolation {
    /// Construct a linear interpolation from sorted `xs` and corresponding `ys`.
    ///
    /// # Errors
    /// Returns an error if the slices have different lengths, fewer than 2
    /// points, or `xs` is not strictly increasing.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_points(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation1D for LinearInterpolation {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }

    fn value(&self, x: Real) -> Real {
        let i = locate(&self.xs, x);
        let dx = self.xs[i + 1] - self.xs[i];
        self.ys[i] + (x - self.xs[i]) * (self.ys[i + 1] - self.ys[i]) / dx
    }
}
