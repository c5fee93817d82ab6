use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::covariance::{Asset, CovarianceMap, MIN_RETURN_OBSERVATIONS};
use super::driver::{Allocation, Goal, PortfolioProblem, WeightMode};
use super::filter::{dominated_by, pareto_filter, Universe};
use super::solver::{AugmentedLagrangian, SolverSettings};
use crate::error::FrontierError;
use crate::types::{with_metadata, ComputationOutput};
use crate::FrontierResult;

/// Intervals between the lowest and highest sweep level; 11 points.
pub const FRONTIER_STEPS: u32 = 10;

/// Days over which daily returns are compounded for reporting.
pub const HORIZON_DAYS: i32 = 30;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input to a frontier sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    /// Ticker to daily simple returns, most recent first.
    pub returns: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub weight_mode: WeightMode,
    #[serde(default)]
    pub solver: SolverSettings,
}

impl FrontierInput {
    pub fn new(returns: BTreeMap<String, Vec<f64>>) -> Self {
        FrontierInput {
            returns,
            weight_mode: WeightMode::default(),
            solver: SolverSettings::default(),
        }
    }

    pub fn with_weight_mode(mut self, mode: WeightMode) -> Self {
        self.weight_mode = mode;
        self
    }
}

/// One portfolio on the frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Ticker to fraction of capital, over the filtered universe.
    pub values: BTreeMap<String, f64>,
    /// Expected return compounded over [`HORIZON_DAYS`].
    #[serde(rename = "return")]
    pub expected_return: f64,
    /// Standard deviation of daily portfolio returns.
    pub risk: f64,
    /// The pinned level in reporting units: a standard deviation on the
    /// fixed-risk sweep, a compounded return on the fixed-return sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    /// False when the solver stopped on an iteration cap.
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateCase {
    /// Every asset has a non-positive expected return.
    NoPositiveReturn,
    /// Only one asset survived filtering.
    SingleAsset,
}

/// Output of a frontier sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierOutput {
    /// Tickers that survived filtering, in weight-vector order.
    pub universe: Vec<String>,
    /// Tickers dropped as Pareto-dominated.
    pub excluded: Vec<String>,
    /// Maximum return at each of 11 evenly spaced variances, low to high.
    pub fixed_risk: Vec<FrontierPoint>,
    /// Minimum variance at each of 11 evenly spaced returns, low to high.
    pub fixed_return: Vec<FrontierPoint>,
    /// Unpinned minimum-variance portfolio with non-negative return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_variance: Option<FrontierPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degenerate: Option<DegenerateCase>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Trace the efficient frontier for the given return series.
///
/// Dominated assets are filtered out first. When no surviving asset has a
/// positive expected return, every point is 100% in the best of them.
/// Otherwise 11 fixed-risk and 11 fixed-return solves are run; a solve
/// that hits its iteration cap still yields a point, flagged
/// `converged: false` and listed in the warnings.
pub fn optimize(input: &FrontierInput) -> FrontierResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let prepared = prepare(input, &mut warnings)?;
    let universe = &prepared.universe;
    let minimizer = AugmentedLagrangian::new(input.solver.clone());
    let problem = PortfolioProblem::new(
        universe,
        &prepared.covariance,
        input.weight_mode,
        &minimizer,
    );

    let best = universe
        .best()
        .ok_or_else(|| FrontierError::InsufficientData("Empty universe".into()))?;
    let n_points = FRONTIER_STEPS as usize + 1;

    let (fixed_risk, fixed_return, min_variance, degenerate) = if best.expected_return <= 0.0 {
        info!(ticker = %best.ticker, "no positive expected return, skipping optimization");
        warnings.push(format!(
            "No asset has a positive expected return; allocating 100% to {}",
            best.ticker
        ));
        let index = universe.position(&best.ticker).unwrap_or(0);
        let alloc = problem.single_asset(index);
        let risk_point = frontier_point(universe, &alloc, Some(alloc.variance.sqrt()));
        let return_point = frontier_point(
            universe,
            &alloc,
            Some(compound_return(alloc.expected_return)),
        );
        (
            vec![risk_point; n_points],
            vec![return_point; n_points],
            None,
            Some(DegenerateCase::NoPositiveReturn),
        )
    } else {
        let levels = SweepLevels::new(universe, &problem);

        let fixed_risk: Vec<FrontierPoint> = (0..=FRONTIER_STEPS)
            .map(|k| {
                let target_variance = levels.variance_at(k);
                let alloc = problem.solve(Goal::MaximizeReturnAtVariance { target_variance });
                note_convergence("fixed_risk", k, target_variance, &alloc, &mut warnings);
                frontier_point(universe, &alloc, Some(target_variance.max(0.0).sqrt()))
            })
            .collect();

        let fixed_return: Vec<FrontierPoint> = (0..=FRONTIER_STEPS)
            .map(|k| {
                let target_return = levels.return_at(k);
                let alloc = problem.solve(Goal::MinimizeVarianceAtReturn { target_return });
                note_convergence("fixed_return", k, target_return, &alloc, &mut warnings);
                frontier_point(universe, &alloc, Some(compound_return(target_return)))
            })
            .collect();

        let anchor = problem.solve(Goal::MinimizeVariance {
            non_negative_return: true,
        });
        if !anchor.converged {
            warnings.push("min_variance: solver did not converge; weights are best effort".into());
        }
        let min_variance = frontier_point(universe, &anchor, None);

        let degenerate = (universe.len() == 1).then_some(DegenerateCase::SingleAsset);
        (fixed_risk, fixed_return, Some(min_variance), degenerate)
    };

    let output = FrontierOutput {
        universe: universe.tickers(),
        excluded: prepared.excluded,
        fixed_risk,
        fixed_return,
        min_variance,
        degenerate,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mean-Variance Efficient Frontier Sweep (augmented Lagrangian)",
        &serde_json::json!({
            "n_candidates": input.returns.len(),
            "n_assets": output.universe.len(),
            "weight_mode": input.weight_mode,
            "frontier_points": n_points,
            "horizon_days": HORIZON_DAYS,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Minimum-variance portfolio whose return is the midpoint of the lowest and
/// highest expected returns in the filtered universe.
pub fn median_risk(input: &FrontierInput) -> FrontierResult<ComputationOutput<FrontierPoint>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let prepared = prepare(input, &mut warnings)?;
    let universe = &prepared.universe;
    let minimizer = AugmentedLagrangian::new(input.solver.clone());
    let problem = PortfolioProblem::new(
        universe,
        &prepared.covariance,
        input.weight_mode,
        &minimizer,
    );

    let returns = universe.expected_returns();
    let min_return = returns.iter().copied().fold(f64::INFINITY, f64::min);
    let max_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let target_return = (min_return + max_return) / 2.0;

    let alloc = problem.solve(Goal::MinimizeVarianceAtReturn { target_return });
    note_convergence("median_risk", 0, target_return, &alloc, &mut warnings);
    let point = frontier_point(universe, &alloc, Some(compound_return(target_return)));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Median-Return Minimum-Variance Portfolio",
        &serde_json::json!({
            "n_candidates": input.returns.len(),
            "n_assets": universe.len(),
            "weight_mode": input.weight_mode,
            "target_daily_return": target_return,
            "horizon_days": HORIZON_DAYS,
        }),
        warnings,
        elapsed,
        point,
    ))
}

/// `(1 + r)^30 - 1`
pub fn compound_return(daily: f64) -> f64 {
    (1.0 + daily).powi(HORIZON_DAYS) - 1.0
}

// ---------------------------------------------------------------------------
// Sweep internals
// ---------------------------------------------------------------------------

struct Prepared {
    universe: Universe,
    covariance: CovarianceMap,
    excluded: Vec<String>,
}

fn prepare(input: &FrontierInput, warnings: &mut Vec<String>) -> FrontierResult<Prepared> {
    validate_input(input)?;

    let candidates: Vec<Asset> = input
        .returns
        .iter()
        .map(|(ticker, series)| Asset::from_returns(ticker, series))
        .collect::<FrontierResult<_>>()?;
    let universe = pareto_filter(candidates.clone());

    let mut excluded = Vec::new();
    for (dropped, by) in dominated_by(&candidates, &universe) {
        debug!(dropped = %dropped.ticker, by = %by.ticker, "dominated asset excluded");
        warnings.push(format!(
            "{} excluded: dominated by {}",
            dropped.ticker, by.ticker
        ));
        excluded.push(dropped.ticker.clone());
    }

    let lengths: Vec<usize> = universe
        .assets()
        .iter()
        .filter_map(|a| input.returns.get(&a.ticker).map(Vec::len))
        .collect();
    if let (Some(shortest), Some(longest)) = (lengths.iter().min(), lengths.iter().max()) {
        if shortest != longest {
            warnings.push(format!(
                "Return series lengths differ ({} to {}); covariances use the most recent {} \
                 observations without checking that dates align",
                shortest, longest, shortest
            ));
        }
    }

    let covariance = CovarianceMap::build(&universe, &input.returns)?;
    Ok(Prepared {
        universe,
        covariance,
        excluded,
    })
}

/// Evenly spaced variance and return levels for the two sweeps.
struct SweepLevels {
    min_return: f64,
    delta_return: f64,
    min_variance: f64,
    delta_variance: f64,
}

impl SweepLevels {
    fn new(universe: &Universe, problem: &PortfolioProblem<'_>) -> Self {
        let steps = FRONTIER_STEPS as f64;
        let returns = universe.expected_returns();
        let min_return = returns.iter().copied().fold(f64::INFINITY, f64::min).max(0.0);
        let max_return = returns
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
            .max(0.0);

        let positive: Vec<f64> = universe
            .assets()
            .iter()
            .filter(|a| a.expected_return > 0.0)
            .map(|a| a.variance)
            .collect();
        let (min_variance, max_variance) = if positive.is_empty() {
            let v = problem
                .solve(Goal::MinimizeVariance {
                    non_negative_return: false,
                })
                .variance;
            (v, v)
        } else {
            (
                positive.iter().copied().fold(f64::INFINITY, f64::min),
                positive.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        SweepLevels {
            min_return,
            delta_return: (max_return - min_return) / steps,
            min_variance,
            delta_variance: (max_variance - min_variance) / steps,
        }
    }

    fn variance_at(&self, k: u32) -> f64 {
        self.min_variance + k as f64 * self.delta_variance
    }

    fn return_at(&self, k: u32) -> f64 {
        self.min_return + k as f64 * self.delta_return
    }
}

fn frontier_point(universe: &Universe, alloc: &Allocation, target: Option<f64>) -> FrontierPoint {
    FrontierPoint {
        values: universe
            .tickers()
            .into_iter()
            .zip(alloc.weights.iter().copied())
            .collect(),
        expected_return: compound_return(alloc.expected_return),
        risk: alloc.variance.max(0.0).sqrt(),
        target,
        converged: alloc.converged,
    }
}

fn note_convergence(
    sweep: &str,
    step: u32,
    target: f64,
    alloc: &Allocation,
    warnings: &mut Vec<String>,
) {
    if alloc.converged {
        debug!(sweep, step, target, "frontier step converged");
        return;
    }
    warn!(
        sweep,
        step,
        target,
        max_violation = alloc.max_violation,
        "frontier step did not converge"
    );
    warnings.push(format!(
        "{} step {}: solver did not converge (target {:.6e}, violation {:.2e}); weights are best effort",
        sweep, step, target, alloc.max_violation
    ));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &FrontierInput) -> FrontierResult<()> {
    if input.returns.is_empty() {
        return Err(FrontierError::InsufficientData(
            "At least one ticker required".into(),
        ));
    }

    for (ticker, series) in &input.returns {
        if ticker.trim().is_empty() {
            return Err(FrontierError::InvalidInput {
                field: "returns".into(),
                reason: "Empty ticker symbol".into(),
            });
        }
        if series.len() < MIN_RETURN_OBSERVATIONS {
            return Err(FrontierError::InsufficientData(format!(
                "{}: at least {} return observations required, got {}",
                ticker,
                MIN_RETURN_OBSERVATIONS,
                series.len()
            )));
        }
        if series.iter().any(|r| !r.is_finite()) {
            return Err(FrontierError::InvalidInput {
                field: format!("returns.{}", ticker),
                reason: "Returns must be finite".into(),
            });
        }
    }

    let s = &input.solver;
    if !(s.initial_penalty > 0.0) || !(s.penalty_growth >= 1.0) || !(s.max_penalty >= s.initial_penalty)
    {
        return Err(FrontierError::InvalidInput {
            field: "solver".into(),
            reason: "Penalties must be positive and non-decreasing".into(),
        });
    }
    if !(s.feasibility_tolerance > 0.0) || !(s.optimality_tolerance > 0.0) {
        return Err(FrontierError::InvalidInput {
            field: "solver".into(),
            reason: "Tolerances must be positive".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
