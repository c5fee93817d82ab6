use frontier_core::frontier::covariance::{covariance, Asset, CovarianceMap};
use frontier_core::frontier::filter::{dominates, pareto_filter};
use frontier_core::frontier::objective::{
    portfolio_return, portfolio_variance, return_gradient, variance_gradient,
};
use frontier_core::frontier::sweep::DegenerateCase;
use frontier_core::frontier::{median_risk, optimize, FrontierInput, FrontierPoint, WeightMode};
use frontier_core::FrontierError;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const EPS: f64 = 1e-6;

fn input(series: &[(&str, &[f64])]) -> FrontierInput {
    FrontierInput::new(
        series
            .iter()
            .map(|(t, r)| (t.to_string(), r.to_vec()))
            .collect(),
    )
}

/// Three assets with distinct risk/return profiles, none dominated.
fn three_asset_input() -> FrontierInput {
    input(&[
        ("BOND", &[0.001, 0.0012, 0.0008, 0.0011, 0.0009, 0.001]),
        ("BLUE", &[0.004, -0.002, 0.006, 0.001, 0.003, 0.0]),
        ("TECH", &[0.02, -0.015, 0.025, -0.01, 0.018, 0.002]),
    ])
}

fn all_points(points: &[&[FrontierPoint]]) -> Vec<FrontierPoint> {
    points.iter().flat_map(|p| p.iter().cloned()).collect()
}

fn assert_budget(point: &FrontierPoint) {
    let total: f64 = point.values.values().sum();
    assert!(
        (total - 1.0).abs() < EPS,
        "weights sum to {} in {:?}",
        total,
        point.values
    );
}

// ===========================================================================
// Covariance engine
// ===========================================================================

#[test]
fn test_covariance_symmetric_random_pairs() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let len_a = rng.gen_range(2..30);
        let len_b = rng.gen_range(2..30);
        let a: Vec<f64> = (0..len_a).map(|_| rng.gen_range(-0.05..0.05)).collect();
        let b: Vec<f64> = (0..len_b).map(|_| rng.gen_range(-0.05..0.05)).collect();
        assert_eq!(covariance(&a, &b).unwrap(), covariance(&b, &a).unwrap());
    }
}

#[test]
fn test_covariance_map_matches_pairwise() {
    let inp = three_asset_input();
    let assets: Vec<Asset> = inp
        .returns
        .iter()
        .map(|(t, r)| Asset::from_returns(t, r).unwrap())
        .collect();
    let universe = pareto_filter(assets);
    let map = CovarianceMap::build(&universe, &inp.returns).unwrap();

    let direct = covariance(&inp.returns["BOND"], &inp.returns["TECH"]).unwrap();
    assert_eq!(map.get("BOND", "TECH"), Some(direct));
    assert_eq!(map.get("TECH", "BOND"), Some(direct));
    assert_eq!(map.get("BOND", "NOPE"), None);
}

// ===========================================================================
// Frontier filter
// ===========================================================================

#[test]
fn test_filter_no_retained_pair_dominates() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let n = rng.gen_range(1..15);
        let assets: Vec<Asset> = (0..n)
            .map(|i| Asset {
                ticker: format!("T{}", i),
                expected_return: rng.gen_range(-0.01..0.01),
                variance: rng.gen_range(0.0001..0.001),
            })
            .collect();
        let top = assets
            .iter()
            .map(|a| a.expected_return)
            .fold(f64::NEG_INFINITY, f64::max);

        let universe = pareto_filter(assets);
        for a in universe.assets() {
            for b in universe.assets() {
                assert!(!dominates(a, b), "{} dominates {}", a.ticker, b.ticker);
            }
        }
        assert!(universe.assets().iter().any(|a| a.expected_return == top));
    }
}

// ===========================================================================
// Objective gradients
// ===========================================================================

#[test]
fn test_gradients_match_finite_differences() {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 5;
    let tickers: Vec<String> = (0..n).map(|i| format!("T{}", i)).collect();
    let returns: BTreeMap<String, Vec<f64>> = tickers
        .iter()
        .map(|t| (t.clone(), (0..20).map(|_| rng.gen_range(-0.03..0.03)).collect()))
        .collect();
    let assets: Vec<Asset> = tickers
        .iter()
        .map(|t| Asset::from_returns(t, &returns[t]).unwrap())
        .collect();
    let universe = frontier_core::frontier::filter::Universe::from_assets(assets);
    let cov = CovarianceMap::build(&universe, &returns).unwrap();

    let h = 1e-6;
    for _ in 0..10 {
        let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let gv = variance_gradient(&cov, &x);
        let gr = return_gradient(&universe, 1.0);
        for i in 0..n {
            let mut up = x.clone();
            let mut down = x.clone();
            up[i] += h;
            down[i] -= h;
            let fd_v = (portfolio_variance(&cov, &up, 0.0) - portfolio_variance(&cov, &down, 0.0))
                / (2.0 * h);
            let fd_r = (portfolio_return(&universe, &up, 0.0, 1.0)
                - portfolio_return(&universe, &down, 0.0, 1.0))
                / (2.0 * h);
            assert!((gv[i] - fd_v).abs() < 1e-7, "variance d/dx{}: {} vs {}", i, gv[i], fd_v);
            assert!((gr[i] - fd_r).abs() < 1e-7, "return d/dx{}: {} vs {}", i, gr[i], fd_r);
        }
    }
}

// ===========================================================================
// Frontier sweep
// ===========================================================================

#[test]
fn test_single_asset_full_weight_everywhere() {
    let out = optimize(&input(&[("A", &[0.01, 0.02, 0.015])])).unwrap();
    let frontier = out.result;
    assert_eq!(frontier.fixed_risk.len(), 11);
    assert_eq!(frontier.fixed_return.len(), 11);
    assert_eq!(frontier.degenerate, Some(DegenerateCase::SingleAsset));
    for p in all_points(&[frontier.fixed_risk.as_slice(), frontier.fixed_return.as_slice()]) {
        assert_eq!(p.values.get("A"), Some(&1.0));
        assert!(p.converged);
    }
}

#[test]
fn test_all_negative_returns_pick_least_negative() {
    let out = optimize(&input(&[
        ("A", &[-0.01, -0.02]),
        ("B", &[-0.005, -0.01]),
    ]))
    .unwrap();
    let frontier = out.result;
    assert_eq!(frontier.degenerate, Some(DegenerateCase::NoPositiveReturn));
    assert_eq!(frontier.excluded, vec!["A".to_string()]);
    assert_eq!(frontier.min_variance, None);
    for p in all_points(&[frontier.fixed_risk.as_slice(), frontier.fixed_return.as_slice()]) {
        assert_eq!(p.values.get("B"), Some(&1.0));
        assert_eq!(p.values.get("A").copied().unwrap_or(0.0), 0.0);
    }
    assert!(out.warnings.iter().any(|w| w.contains("positive expected return")));
}

#[test]
fn test_weights_sum_to_one_long_only() {
    let out = optimize(&three_asset_input()).unwrap();
    let frontier = out.result;
    assert_eq!(frontier.universe.len(), 3);
    let anchor = frontier.min_variance.clone().unwrap();
    for p in all_points(&[
        frontier.fixed_risk.as_slice(),
        frontier.fixed_return.as_slice(),
        std::slice::from_ref(&anchor),
    ]) {
        assert_budget(&p);
        for (t, w) in &p.values {
            assert!(*w >= -EPS, "{} has negative weight {}", t, w);
        }
    }
}

#[test]
fn test_weights_sum_to_one_unrestricted() {
    let inp = three_asset_input().with_weight_mode(WeightMode::Unrestricted);
    let out = optimize(&inp).unwrap();
    for p in all_points(&[
        out.result.fixed_risk.as_slice(),
        out.result.fixed_return.as_slice(),
    ]) {
        assert_budget(&p);
    }
}

#[test]
fn test_fixed_return_hits_targets() {
    let out = optimize(&three_asset_input()).unwrap();
    for (step, p) in out.result.fixed_return.iter().enumerate() {
        assert!(p.converged, "fixed_return step {} did not converge", step);
        let target = p.target.unwrap();
        assert!(
            (p.expected_return - target).abs() < 1e-4,
            "return {} vs target {}",
            p.expected_return,
            target
        );
    }
}

#[test]
fn test_optimize_idempotent() {
    let inp = three_asset_input();
    let first = optimize(&inp).unwrap();
    let second = optimize(&inp).unwrap();
    assert_eq!(first.result, second.result);
}

#[test]
fn test_anti_correlated_pair_balances() {
    let out = optimize(&input(&[
        ("A", &[0.02, 0.0, 0.01, 0.03]),
        ("B", &[0.01, 0.03, 0.02, 0.0]),
    ]))
    .unwrap();
    let frontier = out.result;

    let anchor = frontier.min_variance.unwrap();
    assert!((anchor.values["A"] - 0.5).abs() < 1e-4);
    assert!((anchor.values["B"] - 0.5).abs() < 1e-4);
    assert!(anchor.risk < 1e-4, "risk {}", anchor.risk);

    for p in &frontier.fixed_return {
        assert!((p.values["A"] - 0.5).abs() < 1e-4);
        assert!(p.risk < 1e-4);
    }
}

#[test]
fn test_short_series_rejected() {
    let err = optimize(&input(&[("A", &[0.01, 0.02]), ("B", &[0.01])])).unwrap_err();
    assert!(matches!(err, FrontierError::InsufficientData(_)));
}

#[test]
fn test_output_json_shape() {
    let out = optimize(&input(&[("A", &[0.01, 0.02, 0.015])])).unwrap();
    let json = serde_json::to_value(&out.result).unwrap();
    let point = &json["fixed_risk"][0];
    assert!(point.get("values").is_some());
    assert!(point.get("return").is_some());
    assert!(point.get("risk").is_some());
    assert_eq!(json["degenerate"], "single_asset");
}

#[test]
fn test_input_accepts_defaults() {
    let inp: FrontierInput =
        serde_json::from_str(r#"{"returns":{"A":[0.01,0.02,0.015]}}"#).unwrap();
    assert_eq!(inp.weight_mode, WeightMode::LongOnly);
    assert!(optimize(&inp).is_ok());
}

// ===========================================================================
// Median-risk portfolio
// ===========================================================================

#[test]
fn test_median_risk_targets_midpoint() {
    let out = median_risk(&three_asset_input()).unwrap();
    let point = out.result;
    assert_budget(&point);
    assert!(point.converged, "median-risk solve did not converge");
    assert!((point.expected_return - point.target.unwrap()).abs() < 1e-4);
}

#[test]
fn test_median_risk_single_asset() {
    let out = median_risk(&input(&[("A", &[0.01, 0.02, 0.015])])).unwrap();
    assert_eq!(out.result.values.get("A"), Some(&1.0));
}
