//! Levenberg–Marquardt least-squares optimizer.

use nalgebra::DMatrix;
use vc_core::{errors::Result, Real};

use super::{
    Array, ArmijoLineSearch, CostFunction, EndCriteria, EndCriteriaType, OptimizationMethod,
    OptimizationResult,
};

const MIN_DAMPING: Real = 1e-12;
const MAX_DAMPING: Real = 1e12;

/// Levenberg–Marquardt least-squares optimizer.
///
/// Each iteration solves the damped normal equations
/// `(JᵀJ + μ·diag(JᵀJ)) d = -Jᵀr` and backtracks along `d` with the Armijo
/// line search.  `μ` shrinks after a full step and grows after a shortened
/// or failed one; the search stops at a stationary point once `μ` exceeds
/// its upper bound.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    line_search: ArmijoLineSearch,
    initial_damping: Real,
}

impl LevenbergMarquardt {
    /// Create an optimizer with the given line search and initial damping.
    pub fn new(line_search: ArmijoLineSearch, initial_damping: Real) -> Self {
        Self {
            line_search,
            initial_damping,
        }
    }

    fn damped_direction(jac: &DMatrix<Real>, gradient: &Array, damping: Real) -> Option<Array> {
        let mut normal = jac.transpose() * jac;
        for i in 0..normal.nrows() {
            normal[(i, i)] += damping * normal[(i, i)].max(1e-12);
        }
        normal.cholesky().map(|c| -c.solve(gradient))
    }
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new(ArmijoLineSearch::default(), 1e-3)
    }
}

impl OptimizationMethod for LevenbergMarquardt {
    fn minimize(
        &self,
        cost_fn: &dyn CostFunction,
        initial_values: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        let mut x = initial_values.clone();
        let mut residuals = cost_fn.values(&x);
        let mut value = 0.5 * residuals.norm_squared();
        let mut damping = self.initial_damping;
        let mut stationary = 0;

        for iteration in 0..end_criteria.max_iterations {
            if value < end_criteria.root_epsilon {
                return Ok(OptimizationResult {
                    x,
                    value,
                    iterations: iteration,
                    end_type: EndCriteriaType::RootEpsilon,
                });
            }

            let jac = cost_fn.jacobian(&x);
            let gradient = jac.transpose() * &residuals;
            if gradient.norm() < end_criteria.gradient_norm_epsilon {
                return Ok(OptimizationResult {
                    x,
                    value,
                    iterations: iteration,
                    end_type: EndCriteriaType::GradientNormEpsilon,
                });
            }

            let step = Self::damped_direction(&jac, &gradient, damping).and_then(|direction| {
                self.line_search
                    .search(cost_fn, &x, value, &gradient, &direction)
            });

            match step {
                Some(step) => {
                    damping = if step.t == 1.0 {
                        (damping / 10.0).max(MIN_DAMPING)
                    } else {
                        damping * 10.0
                    };
                    let previous = value;
                    x = step.x;
                    value = step.value;
                    residuals = cost_fn.values(&x);
                    if end_criteria.is_stationary(previous, value, &mut stationary) {
                        return Ok(OptimizationResult {
                            x,
                            value,
                            iterations: iteration + 1,
                            end_type: EndCriteriaType::StationaryPoint,
                        });
                    }
                }
                None => {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        return Ok(OptimizationResult {
                            x,
                            value,
                            iterations: iteration + 1,
                            end_type: EndCriteriaType::StationaryPoint,
                        });
                    }
                }
            }
        }

        Ok(OptimizationResult {
            x,
            value,
            iterations: end_criteria.max_iterations,
            end_type: EndCriteriaType::MaxIterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_functions::*;
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn levenberg_marquardt_simple() {
        let opt = LevenbergMarquardt::default();
        let ec = EndCriteria::new(1000, 100, 1e-20, 1e-20, 1e-14);
        let result = opt
            .minimize(&SimpleQuadratic, &Array::from_vec(vec![0.0]), &ec)
            .unwrap();
        assert_abs_diff_eq!(result.x[0], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn levenberg_marquardt_rosenbrock() {
        let opt = LevenbergMarquardt::default();
        let ec = EndCriteria::new(5000, 100, 1e-24, 1e-24, 1e-14);
        let result = opt
            .minimize(&Rosenbrock, &Array::from_vec(vec![-1.2, 1.0]), &ec)
            .unwrap();
        assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn levenberg_marquardt_exponential_fit() {
        let opt = LevenbergMarquardt::default();
        let ec = EndCriteria::new(1000, 100, 1e-24, 1e-24, 1e-14);
        let result = opt
            .minimize(&ExpDecay, &Array::from_vec(vec![1.0, 0.1]), &ec)
            .unwrap();
        assert_abs_diff_eq!(result.x[0], 2.0, epsilon = 1e-7);
        assert_abs_diff_eq!(result.x[1], 0.5, epsilon = 1e-7);
        assert_ne!(result.end_type, EndCriteriaType::MaxIterations);
    }
}
