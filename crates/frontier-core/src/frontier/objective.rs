//! Portfolio variance and return as functions of the weight vector, with
//! their exact gradients.
//!
//! Every function takes its data explicitly. `target` shifts the value so the
//! same function serves as an equality-constraint residual:
//! `portfolio_variance(cov, x, t) == 0` exactly when the portfolio variance
//! is `t`.

use super::covariance::CovarianceMap;
use super::filter::Universe;
use super::solver::Differentiable;

/// `sum_i cov[i,i] x_i^2 + sum_{i != j} cov[i,j] x_i x_j - target`
#[allow(clippy::needless_range_loop)]
pub fn portfolio_variance(cov: &CovarianceMap, x: &[f64], target: f64) -> f64 {
    let n = cov.len();
    let mut out = -target;
    for i in 0..n {
        out += cov.variance(i) * x[i] * x[i];
        for j in (i + 1)..n {
            out += 2.0 * x[i] * x[j] * cov.covariance(i, j);
        }
    }
    out
}

/// Gradient of [`portfolio_variance`]; independent of `target`.
#[allow(clippy::needless_range_loop)]
pub fn variance_gradient(cov: &CovarianceMap, x: &[f64]) -> Vec<f64> {
    let n = cov.len();
    let mut out = vec![0.0; n];
    for i in 0..n {
        out[i] += 2.0 * cov.variance(i) * x[i];
        for j in (i + 1)..n {
            let c = cov.covariance(i, j);
            out[i] += 2.0 * c * x[j];
            out[j] += 2.0 * c * x[i];
        }
    }
    out
}

/// `sign * (sum_i x_i r_i - target)`. `sign = -1` turns maximization into
/// minimization.
pub fn portfolio_return(universe: &Universe, x: &[f64], target: f64, sign: f64) -> f64 {
    let raw: f64 = universe
        .assets()
        .iter()
        .zip(x.iter())
        .map(|(a, w)| a.expected_return * w)
        .sum();
    sign * (raw - target)
}

/// Gradient of [`portfolio_return`]: `sign * r_i`, constant in `x`.
pub fn return_gradient(universe: &Universe, sign: f64) -> Vec<f64> {
    universe
        .assets()
        .iter()
        .map(|a| sign * a.expected_return)
        .collect()
}

/// `sum_i x_i - 1`
pub fn weight_sum(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() - 1.0
}

pub fn weight_sum_gradient(n: usize) -> Vec<f64> {
    vec![1.0; n]
}

/// The portfolio functions above, bound to their data for the solver.
#[derive(Debug, Clone, Copy)]
pub enum PortfolioFunction<'a> {
    Variance {
        covariance: &'a CovarianceMap,
        target: f64,
    },
    Return {
        universe: &'a Universe,
        target: f64,
        sign: f64,
    },
    WeightSum,
}

impl Differentiable for PortfolioFunction<'_> {
    fn value(&self, x: &[f64]) -> f64 {
        match *self {
            PortfolioFunction::Variance { covariance, target } => {
                portfolio_variance(covariance, x, target)
            }
            PortfolioFunction::Return {
                universe,
                target,
                sign,
            } => portfolio_return(universe, x, target, sign),
            PortfolioFunction::WeightSum => weight_sum(x),
        }
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        match *self {
            PortfolioFunction::Variance { covariance, .. } => variance_gradient(covariance, x),
            PortfolioFunction::Return { universe, sign, .. } => return_gradient(universe, sign),
            PortfolioFunction::WeightSum => weight_sum_gradient(x.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
