//! Armijo backtracking line search.

use vc_core::Real;

use super::{Array, CostFunction};

/// Backtracking line search with the Armijo sufficient-decrease test
///
///   `f(x + t·d) ≤ f(x) + alpha · t · ∇f(x)·d`
///
/// starting from `t = 1` and shrinking `t ← beta · t` until the test passes
/// or `t` falls below `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmijoLineSearch {
    /// Smallest step length tried before giving up.
    pub epsilon: Real,
    /// Sufficient-decrease coefficient.
    pub alpha: Real,
    /// Step contraction factor.
    pub beta: Real,
}

/// An accepted step.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub t: Real,
    pub x: Array,
    pub value: Real,
}

impl ArmijoLineSearch {
    /// Create a line search.
    pub fn new(epsilon: Real, alpha: Real, beta: Real) -> Self {
        Self {
            epsilon,
            alpha,
            beta,
        }
    }

    /// Search along `direction` from `x`, where `value` and `gradient` are
    /// the cost and its gradient at `x`.
    ///
    /// Returns `None` when `direction` is not a descent direction or no step
    /// longer than `epsilon` satisfies the Armijo test.
    pub(crate) fn search(
        &self,
        cost_fn: &dyn CostFunction,
        x: &Array,
        value: Real,
        gradient: &Array,
        direction: &Array,
    ) -> Option<Step> {
        let slope = gradient.dot(direction);
        if slope.is_nan() || slope >= 0.0 {
            return None;
        }
        let mut t = 1.0;
        while t >= self.epsilon {
            let candidate = x + direction * t;
            let candidate_value = cost_fn.value(&candidate);
            if candidate_value.is_finite() && candidate_value <= value + self.alpha * t * slope {
                return Some(Step {
                    t,
                    x: candidate,
                    value: candidate_value,
                });
            }
            t *= self.beta;
        }
        None
    }
}

impl Default for ArmijoLineSearch {
    fn default() -> Self {
        Self::new(1e-12, 0.15, 0.55)
    }
}
