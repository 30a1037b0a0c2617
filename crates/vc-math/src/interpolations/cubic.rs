//! Natural cubic spline.
//!
//! Second derivatives vanish at both ends; the interior ones solve the usual
//! tridiagonal system.  Each interval is stored in the Horner form
//!
//!   `f(x) = y_i + dx*(a_i + dx*(b_i + dx*c_i))`,  `dx = x - x_i`.

use vc_core::{errors::Result, Real};

use super::{check_points, locate, Interpolation1D};

/// Natural cubic spline interpolation.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<Real>,
    ys: Vec<Real>,
    a: Vec<Real>,
    b: Vec<Real>,
    c: Vec<Real>,
}

impl NaturalCubicSpline {
    /// Build a natural cubic spline through `(xs, ys)`.
    ///
    /// With only two points the spline degenerates to a straight line.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_points(xs, ys, 2)?;
        let n = xs.len();
        let h: Vec<Real> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let s: Vec<Real> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

        // Second derivatives, natural boundary: m[0] = m[n-1] = 0.
        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the (n-2)×(n-2) interior system.
            let k = n - 2;
            let mut diag = vec![0.0; k];
            let mut rhs = vec![0.0; k];
            for r in 0..k {
                diag[r] = 2.0 * (h[r] + h[r + 1]);
                rhs[r] = 6.0 * (s[r + 1] - s[r]);
            }
            for r in 1..k {
                let w = h[r] / diag[r - 1];
                diag[r] -= w * h[r];
                rhs[r] -= w * rhs[r - 1];
            }
            m[k] = rhs[k - 1] / diag[k - 1];
            for r in (0..k - 1).rev() {
                m[r + 1] = (rhs[r] - h[r + 1] * m[r + 2]) / diag[r];
            }
        }

        let mut a = Vec::with_capacity(n - 1);
        let mut b = Vec::with_capacity(n - 1);
        let mut c = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            a.push(s[i] - h[i] * (2.0 * m[i] + m[i + 1]) / 6.0);
            b.push(m[i] / 2.0);
            c.push((m[i + 1] - m[i]) / (6.0 * h[i]));
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            a,
            b,
            c,
        })
    }
}

impl Interpolation1D for NaturalCubicSpline {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }

    fn value(&self, x: Real) -> Real {
        let i = locate(&self.xs, x);
        let dx = x - self.xs[i];
        self.ys[i] + dx * (self.a[i] + dx * (self.b[i] + dx * self.c[i]))
    }
}
