//! Fletcher–Reeves conjugate gradient.

use vc_core::{errors::Result, Real};

use super::{
    Array, ArmijoLineSearch, CostFunction, EndCriteria, EndCriteriaType, OptimizationMethod,
    OptimizationResult,
};

/// Fletcher–Reeves conjugate gradient optimizer with Armijo backtracking.
///
/// The search direction is reset to steepest descent whenever the conjugate
/// direction stops being a descent direction, and every `n` iterations.
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradient {
    line_search: ArmijoLineSearch,
}

impl ConjugateGradient {
    /// Create a conjugate gradient optimizer using `line_search`.
    pub fn new(line_search: ArmijoLineSearch) -> Self {
        Self { line_search }
    }
}

impl OptimizationMethod for ConjugateGradient {
    fn minimize(
        &self,
        cost_fn: &dyn CostFunction,
        initial_values: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        let n = initial_values.len();
        let mut x = initial_values.clone();
        let mut value = cost_fn.value(&x);
        let mut grad = cost_fn.gradient(&x);
        let mut direction = -&grad;
        let mut grad_norm_sq = grad.norm_squared();
        let mut stationary = 0;

        let finish = |x: Array,
                      value: Real,
                      iterations: usize,
                      end_type: EndCriteriaType|
         -> Result<OptimizationResult> {
            Ok(OptimizationResult {
                x,
                value,
                iterations,
                end_type,
            })
        };

        for iteration in 0..end_criteria.max_iterations {
            if value < end_criteria.root_epsilon {
                return finish(x, value, iteration, EndCriteriaType::RootEpsilon);
            }
            if grad_norm_sq.sqrt() < end_criteria.gradient_norm_epsilon {
                return finish(x, value, iteration, EndCriteriaType::GradientNormEpsilon);
            }

            if grad.dot(&direction) >= 0.0 || iteration % n.max(1) == 0 {
                direction = -&grad;
            }
            let step = match self
                .line_search
                .search(cost_fn, &x, value, &grad, &direction)
            {
                Some(step) => step,
                None => return finish(x, value, iteration, EndCriteriaType::StationaryPoint),
            };

            let previous = value;
            x = step.x;
            value = step.value;

            let new_grad = cost_fn.gradient(&x);
            let new_norm_sq = new_grad.norm_squared();
            let beta = if grad_norm_sq > 1e-300 {
                new_norm_sq / grad_norm_sq
            } else {
                0.0
            };
            direction = -&new_grad + direction * beta;
            grad = new_grad;
            grad_norm_sq = new_norm_sq;

            if end_criteria.is_stationary(previous, value, &mut stationary) {
                return finish(x, value, iteration + 1, EndCriteriaType::StationaryPoint);
            }
        }

        finish(
            x,
            value,
            end_criteria.max_iterations,
            EndCriteriaType::MaxIterations,
        )
    }
}
