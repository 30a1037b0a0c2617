//! Optimization framework.
//!
//! Provides the least-squares cost function abstraction, end criteria and
//! two gradient-based minimisers sharing an Armijo backtracking line search:
//! Fletcher–Reeves conjugate gradient and Levenberg–Marquardt.

use nalgebra::{DMatrix, DVector};
use vc_core::{errors::Result, Real};

mod conjugate_gradient;
mod levenberg_marquardt;
mod line_search;

pub use conjugate_gradient::ConjugateGradient;
pub use levenberg_marquardt::LevenbergMarquardt;
pub use line_search::ArmijoLineSearch;

/// Dense vector of parameters or residuals.
pub type Array = DVector<Real>;

// ── Cost function trait ───────────────────────────────────────────────────────

/// A least-squares cost (objective) function.
pub trait CostFunction {
    /// Evaluate the residual vector at `x`.
    fn values(&self, x: &Array) -> Array;

    /// Return the scalar cost `0.5 * Σ r²(x)`.
    fn value(&self, x: &Array) -> Real {
        0.5 * self.values(x).norm_squared()
    }

    /// Jacobian of the residuals (`m × n`). Default uses central differences.
    fn jacobian(&self, x: &Array) -> DMatrix<Real> {
        let n = x.len();
        let m = self.values(x).len();
        let mut jac = DMatrix::zeros(m, n);
        for j in 0..n {
            let h = 1e-6 * x[j].abs().max(1.0);
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[j] += h;
            xm[j] -= h;
            let column = (self.values(&xp) - self.values(&xm)) / (2.0 * h);
            jac.set_column(j, &column);
        }
        jac
    }

    /// Gradient of the scalar cost, `Jᵀ r`.
    fn gradient(&self, x: &Array) -> Array {
        self.jacobian(x).transpose() * self.values(x)
    }
}

// ── End criteria ──────────────────────────────────────────────────────────────

/// Criteria to stop an optimization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum number of stationary-state iterations.
    pub max_stationary_state_iterations: usize,
    /// Root epsilon: stop when function value drops below this.
    pub root_epsilon: Real,
    /// Function epsilon: stop when function change drops below this.
    pub function_epsilon: Real,
    /// Gradient norm epsilon: stop when gradient norm drops below this.
    pub gradient_norm_epsilon: Real,
}

impl EndCriteria {
    /// Create new end criteria.
    pub fn new(
        max_iterations: usize,
        max_stationary_state_iterations: usize,
        root_epsilon: Real,
        function_epsilon: Real,
        gradient_norm_epsilon: Real,
    ) -> Self {
        Self {
            max_iterations,
            max_stationary_state_iterations,
            root_epsilon,
            function_epsilon,
            gradient_norm_epsilon,
        }
    }

    /// Bookkeeping for the stationary-state test; returns `true` once the
    /// cost has failed to move for too many consecutive iterations.
    pub(crate) fn is_stationary(&self, previous: Real, current: Real, count: &mut usize) -> bool {
        if (previous - current).abs() < self.function_epsilon {
            *count += 1;
            *count >= self.max_stationary_state_iterations
        } else {
            *count = 0;
            false
        }
    }
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_stationary_state_iterations: 100,
            root_epsilon: 1e-8,
            function_epsilon: 1e-8,
            gradient_norm_epsilon: 1e-8,
        }
    }
}

/// The reason an optimization terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCriteriaType {
    /// Maximum iterations reached.
    MaxIterations,
    /// Function value below root epsilon.
    RootEpsilon,
    /// Gradient norm below gradient norm epsilon.
    GradientNormEpsilon,
    /// Maximum stationary-state iterations reached, or no descent step found.
    StationaryPoint,
}

/// Result of an optimization.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Final parameter values.
    pub x: Array,
    /// Final function value.
    pub value: Real,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Reason for termination.
    pub end_type: EndCriteriaType,
}

/// A minimiser of least-squares cost functions.
pub trait OptimizationMethod {
    /// Minimize `cost_fn` starting from `initial_values`.
    fn minimize(
        &self,
        cost_fn: &dyn CostFunction,
        initial_values: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult>;
}
