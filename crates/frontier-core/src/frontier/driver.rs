use serde::{Deserialize, Serialize};

use super::covariance::CovarianceMap;
use super::filter::Universe;
use super::objective::{portfolio_return, portfolio_variance, PortfolioFunction};
use super::solver::{Bounds, ConstrainedMinimizer, Constraint, Problem};

/// Which weights are admissible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Every weight `>= 0`.
    #[default]
    LongOnly,
    /// Any real weight; short positions allowed.
    Unrestricted,
}

impl WeightMode {
    pub fn bounds(&self, n: usize) -> Bounds {
        match self {
            WeightMode::LongOnly => Bounds::non_negative(n),
            WeightMode::Unrestricted => Bounds::unbounded(n),
        }
    }
}

/// What a single solve optimizes, always subject to weights summing to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "goal", rename_all = "snake_case")]
pub enum Goal {
    /// Global minimum variance, optionally with `return(x) >= 0`.
    MinimizeVariance { non_negative_return: bool },
    /// Minimum variance with the portfolio return pinned.
    MinimizeVarianceAtReturn { target_return: f64 },
    /// Maximum return with the portfolio variance pinned.
    MaximizeReturnAtVariance { target_variance: f64 },
}

/// Normalized solver output, evaluated back through the portfolio functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Universe-ordered weights summing to one.
    pub weights: Vec<f64>,
    /// Daily expected return of the portfolio.
    pub expected_return: f64,
    /// Daily variance of the portfolio.
    pub variance: f64,
    pub converged: bool,
    /// Largest constraint violation reported by the solver.
    pub max_violation: f64,
}

/// A universe and its covariances posed to a constrained minimizer.
pub struct PortfolioProblem<'a> {
    universe: &'a Universe,
    covariance: &'a CovarianceMap,
    mode: WeightMode,
    minimizer: &'a dyn ConstrainedMinimizer,
}

impl<'a> PortfolioProblem<'a> {
    pub fn new(
        universe: &'a Universe,
        covariance: &'a CovarianceMap,
        mode: WeightMode,
        minimizer: &'a dyn ConstrainedMinimizer,
    ) -> Self {
        PortfolioProblem {
            universe,
            covariance,
            mode,
            minimizer,
        }
    }

    pub fn mode(&self) -> WeightMode {
        self.mode
    }

    /// Uniform weights `1 / n`.
    pub fn initial_guess(&self) -> Vec<f64> {
        let n = self.universe.len();
        vec![1.0 / n as f64; n]
    }

    pub fn solve(&self, goal: Goal) -> Allocation {
        let n = self.universe.len();
        if n == 1 {
            return self.evaluate(vec![1.0], true, 0.0);
        }

        let universe = self.universe;
        let covariance = self.covariance;
        let weight_sum = PortfolioFunction::WeightSum;
        let return_floor = PortfolioFunction::Return {
            universe,
            target: 0.0,
            sign: 1.0,
        };
        let (objective, pin) = match goal {
            Goal::MinimizeVariance { .. } => (
                PortfolioFunction::Variance {
                    covariance,
                    target: 0.0,
                },
                None,
            ),
            Goal::MinimizeVarianceAtReturn { target_return } => (
                PortfolioFunction::Variance {
                    covariance,
                    target: 0.0,
                },
                Some(PortfolioFunction::Return {
                    universe,
                    target: target_return,
                    sign: 1.0,
                }),
            ),
            Goal::MaximizeReturnAtVariance { target_variance } => (
                PortfolioFunction::Return {
                    universe,
                    target: 0.0,
                    sign: -1.0,
                },
                Some(PortfolioFunction::Variance {
                    covariance,
                    target: target_variance,
                }),
            ),
        };

        let mut constraints = vec![Constraint::equality(&weight_sum)];
        if let Some(pin) = pin.as_ref() {
            constraints.push(Constraint::equality(pin));
        }
        if let Goal::MinimizeVariance {
            non_negative_return: true,
        } = goal
        {
            constraints.push(Constraint::inequality(&return_floor));
        }

        let problem = Problem {
            objective: &objective,
            constraints,
            bounds: self.mode.bounds(n),
        };
        let solution = self.minimizer.minimize(&problem, &self.initial_guess());
        let weights = normalize_weights(solution.x, self.mode);
        self.evaluate(weights, solution.converged, solution.max_violation)
    }

    /// 100% in the asset at `index`.
    pub fn single_asset(&self, index: usize) -> Allocation {
        let mut weights = vec![0.0; self.universe.len()];
        weights[index] = 1.0;
        self.evaluate(weights, true, 0.0)
    }

    fn evaluate(&self, weights: Vec<f64>, converged: bool, max_violation: f64) -> Allocation {
        Allocation {
            expected_return: portfolio_return(self.universe, &weights, 0.0, 1.0),
            variance: portfolio_variance(self.covariance, &weights, 0.0),
            weights,
            converged,
            max_violation,
        }
    }
}

/// Clip negative weights in long-only mode, then rescale to sum to one.
fn normalize_weights(mut w: Vec<f64>, mode: WeightMode) -> Vec<f64> {
    if mode == WeightMode::LongOnly {
        for wi in w.iter_mut() {
            if *wi < 0.0 {
                *wi = 0.0;
            }
        }
    }
    let total: f64 = w.iter().sum();
    if total.abs() > f64::EPSILON {
        for wi in w.iter_mut() {
            *wi /= total;
        }
    }
    w
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
