//! General nonlinear minimizer with equality constraints, `g(x) >= 0`
//! inequality constraints and box bounds.
//!
//! The outer loop is a Powell-Hestenes-Rockafellar augmented Lagrangian: it
//! folds the constraints into a penalized merit function, minimizes that over
//! the box, then updates the multipliers and, when infeasibility stalls, the
//! penalty. The inner, bound-constrained minimization is a nonmonotone
//! spectral projected gradient (Barzilai-Borwein step, projected onto the
//! box, Grippo-Lampariello-Lucidi line search).
//!
//! Objective and constraints are rescaled so that their gradients at the
//! starting point have unit max-norm; tolerances apply to the scaled
//! quantities.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// A scalar function with an exact gradient.
pub trait Differentiable {
    fn value(&self, x: &[f64]) -> f64;
    fn gradient(&self, x: &[f64]) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `f(x) == 0`
    Equality,
    /// `f(x) >= 0`
    Inequality,
}

pub struct Constraint<'a> {
    pub kind: ConstraintKind,
    pub function: &'a dyn Differentiable,
}

impl<'a> Constraint<'a> {
    pub fn equality(function: &'a dyn Differentiable) -> Self {
        Constraint {
            kind: ConstraintKind::Equality,
            function,
        }
    }

    pub fn inequality(function: &'a dyn Differentiable) -> Self {
        Constraint {
            kind: ConstraintKind::Inequality,
            function,
        }
    }

    /// Amount by which `x` violates this constraint (0 when satisfied).
    fn violation(&self, x: &[f64]) -> f64 {
        let v = self.function.value(x);
        match self.kind {
            ConstraintKind::Equality => v.abs(),
            ConstraintKind::Inequality => (-v).max(0.0),
        }
    }
}

/// Per-coordinate box `lower[i] <= x[i] <= upper[i]`; infinite ends allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Bounds { lower, upper }
    }

    pub fn unbounded(n: usize) -> Self {
        Bounds {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn non_negative(n: usize) -> Self {
        Bounds {
            lower: vec![0.0; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    fn clamp(&self, i: usize, v: f64) -> f64 {
        v.max(self.lower[i]).min(self.upper[i])
    }

    /// Closest point of the box to `x`.
    pub fn project(&self, x: &[f64]) -> Vec<f64> {
        x.iter().enumerate().map(|(i, v)| self.clamp(i, *v)).collect()
    }
}

pub struct Problem<'a> {
    pub objective: &'a dyn Differentiable,
    pub constraints: Vec<Constraint<'a>>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub x: Vec<f64>,
    /// Unscaled objective at `x`.
    pub objective: f64,
    /// Largest unscaled constraint violation at `x`.
    pub max_violation: f64,
    /// Outer iterations used.
    pub iterations: u32,
    /// False when the iteration caps were hit first; `x` is then the best
    /// effort at termination.
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_outer_iterations: u32,
    pub max_inner_iterations: u32,
    /// Scaled constraint violation accepted as feasible.
    pub feasibility_tolerance: f64,
    /// Scaled projected-gradient norm accepted as stationary.
    pub optimality_tolerance: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_outer_iterations: 40,
            max_inner_iterations: 3000,
            feasibility_tolerance: 1e-9,
            optimality_tolerance: 1e-7,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e10,
        }
    }
}

/// Anything that can minimize a [`Problem`] from a starting point.
pub trait ConstrainedMinimizer {
    fn minimize(&self, problem: &Problem<'_>, x0: &[f64]) -> Solution;
}

#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangian {
    pub settings: SolverSettings,
}

impl AugmentedLagrangian {
    pub fn new(settings: SolverSettings) -> Self {
        AugmentedLagrangian { settings }
    }
}

impl ConstrainedMinimizer for AugmentedLagrangian {
    fn minimize(&self, problem: &Problem<'_>, x0: &[f64]) -> Solution {
        let s = &self.settings;
        let bounds = &problem.bounds;
        let mut x = bounds.project(x0);

        let objective_scale = gradient_scale(problem.objective, &x);
        let scales: Vec<f64> = problem
            .constraints
            .iter()
            .map(|c| gradient_scale(c.function, &x))
            .collect();
        let mut multipliers = vec![0.0; problem.constraints.len()];
        let mut penalty = s.initial_penalty;
        let mut inner_tolerance = s.optimality_tolerance.max(1e-3);
        let mut previous = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;

        for k in 0..s.max_outer_iterations {
            iterations = k + 1;
            let stationary = {
                let merit = Merit {
                    problem,
                    objective_scale,
                    scales: &scales,
                    multipliers: &multipliers,
                    penalty,
                };
                spectral_projected_gradient(
                    &merit,
                    &mut x,
                    bounds,
                    inner_tolerance,
                    s.max_inner_iterations,
                )
            };

            let mut infeasibility: f64 = 0.0;
            for (j, c) in problem.constraints.iter().enumerate() {
                let v = scales[j] * c.function.value(&x);
                match c.kind {
                    ConstraintKind::Equality => {
                        infeasibility = infeasibility.max(v.abs());
                        multipliers[j] += penalty * v;
                    }
                    ConstraintKind::Inequality => {
                        infeasibility = infeasibility.max(v.min(multipliers[j] / penalty).abs());
                        multipliers[j] = (multipliers[j] - penalty * v).max(0.0);
                    }
                }
                multipliers[j] = multipliers[j].clamp(-MAX_MULTIPLIER, MAX_MULTIPLIER);
            }
            trace!(
                outer = iterations,
                infeasibility,
                penalty,
                stationary,
                "augmented Lagrangian step"
            );

            if stationary
                && infeasibility <= s.feasibility_tolerance
                && inner_tolerance <= s.optimality_tolerance
            {
                converged = true;
                break;
            }
            if infeasibility > 0.25 * previous {
                penalty = (penalty * s.penalty_growth).min(s.max_penalty);
            }
            previous = infeasibility;
            inner_tolerance = (inner_tolerance * 0.1).max(s.optimality_tolerance);
        }

        let max_violation = problem
            .constraints
            .iter()
            .map(|c| c.violation(&x))
            .fold(0.0, f64::max);
        let objective = problem.objective.value(&x);
        debug!(iterations, converged, max_violation, "minimization finished");

        Solution {
            x,
            objective,
            max_violation,
            iterations,
            converged,
        }
    }
}

const MAX_MULTIPLIER: f64 = 1e12;

/// Scaled augmented Lagrangian for fixed multipliers and penalty.
struct Merit<'p, 'a> {
    problem: &'p Problem<'a>,
    objective_scale: f64,
    scales: &'p [f64],
    multipliers: &'p [f64],
    penalty: f64,
}

impl Differentiable for Merit<'_, '_> {
    fn value(&self, x: &[f64]) -> f64 {
        let rho = self.penalty;
        let mut out = self.objective_scale * self.problem.objective.value(x);
        for (j, c) in self.problem.constraints.iter().enumerate() {
            let v = self.scales[j] * c.function.value(x);
            let lambda = self.multipliers[j];
            out += match c.kind {
                ConstraintKind::Equality => lambda * v + 0.5 * rho * v * v,
                ConstraintKind::Inequality => {
                    let shifted = (lambda - rho * v).max(0.0);
                    (shifted * shifted - lambda * lambda) / (2.0 * rho)
                }
            };
        }
        out
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let rho = self.penalty;
        let mut out: Vec<f64> = self
            .problem
            .objective
            .gradient(x)
            .into_iter()
            .map(|g| g * self.objective_scale)
            .collect();
        for (j, c) in self.problem.constraints.iter().enumerate() {
            let v = self.scales[j] * c.function.value(x);
            let lambda = self.multipliers[j];
            let weight = match c.kind {
                ConstraintKind::Equality => lambda + rho * v,
                ConstraintKind::Inequality => -(lambda - rho * v).max(0.0),
            };
            if weight == 0.0 {
                continue;
            }
            let w = weight * self.scales[j];
            for (o, g) in out.iter_mut().zip(c.function.gradient(x)) {
                *o += w * g;
            }
        }
        out
    }
}

/// `1 / ||grad f(x)||_inf`, clamped; 1 when the gradient vanishes.
fn gradient_scale(f: &dyn Differentiable, x: &[f64]) -> f64 {
    let norm = f.gradient(x).iter().fold(0.0_f64, |m, g| m.max(g.abs()));
    if norm.is_finite() && norm > 1e-12 {
        (1.0 / norm).clamp(1e-8, 1e8)
    } else {
        1.0
    }
}

fn projected_gradient_norm(x: &[f64], g: &[f64], bounds: &Bounds) -> f64 {
    x.iter()
        .zip(g.iter())
        .enumerate()
        .map(|(i, (xi, gi))| (bounds.clamp(i, xi - gi) - xi).abs())
        .fold(0.0, f64::max)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

const MEMORY: usize = 10;
const SUFFICIENT_DECREASE: f64 = 1e-4;
const STEP_MIN: f64 = 1e-12;
const STEP_MAX: f64 = 1e12;
const MAX_BACKTRACKS: u32 = 60;

/// Minimize `f` over `bounds` starting from `x`, in place. Returns whether
/// the projected-gradient norm reached `tolerance`.
fn spectral_projected_gradient(
    f: &dyn Differentiable,
    x: &mut Vec<f64>,
    bounds: &Bounds,
    tolerance: f64,
    max_iterations: u32,
) -> bool {
    let mut fx = f.value(x);
    let mut g = f.gradient(x);
    let mut recent: VecDeque<f64> = VecDeque::with_capacity(MEMORY);
    recent.push_back(fx);

    let pg = projected_gradient_norm(x, &g, bounds);
    if pg <= tolerance {
        return true;
    }
    let mut step = (1.0 / pg).clamp(STEP_MIN, STEP_MAX);

    for _ in 0..max_iterations {
        let d: Vec<f64> = (0..x.len())
            .map(|i| bounds.clamp(i, x[i] - step * g[i]) - x[i])
            .collect();
        let slope = dot(&g, &d);
        // Also catches NaN.
        if !(slope < 0.0) {
            return false;
        }

        let reference = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut lambda = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate: Vec<f64> = (0..x.len())
                .map(|i| bounds.clamp(i, x[i] + lambda * d[i]))
                .collect();
            let fc = f.value(&candidate);
            if fc <= reference + SUFFICIENT_DECREASE * lambda * slope {
                accepted = Some((candidate, fc));
                break;
            }
            // Safeguarded quadratic interpolation.
            let curvature = fc - fx - lambda * slope;
            let q = if curvature > 0.0 && curvature.is_finite() {
                -0.5 * lambda * lambda * slope / curvature
            } else {
                0.5 * lambda
            };
            lambda = if q >= 0.1 * lambda && q <= 0.9 * lambda {
                q
            } else {
                0.5 * lambda
            };
        }
        let Some((x_new, f_new)) = accepted else {
            return false;
        };

        let g_new = f.gradient(&x_new);
        let mut sts = 0.0;
        let mut sty = 0.0;
        for i in 0..x.len() {
            let si = x_new[i] - x[i];
            let yi = g_new[i] - g[i];
            sts += si * si;
            sty += si * yi;
        }
        step = if sty > 0.0 {
            (sts / sty).clamp(STEP_MIN, STEP_MAX)
        } else {
            STEP_MAX
        };

        *x = x_new;
        fx = f_new;
        g = g_new;
        if recent.len() == MEMORY {
            recent.pop_front();
        }
        recent.push_back(fx);

        if projected_gradient_norm(x, &g, bounds) <= tolerance {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
