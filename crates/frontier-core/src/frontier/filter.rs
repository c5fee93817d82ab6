use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::covariance::Asset;

/// The assets that survive Pareto filtering, in a fixed order.
///
/// Index `i` of every weight vector refers to `assets()[i]` for the lifetime
/// of one optimization request. Order is ascending by expected return, then
/// by variance, then by ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    assets: Vec<Asset>,
}

impl Universe {
    /// Wrap `assets` as-is, without filtering or reordering.
    pub fn from_assets(assets: Vec<Asset>) -> Self {
        Universe { assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn tickers(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.ticker.clone()).collect()
    }

    pub fn expected_returns(&self) -> Vec<f64> {
        self.assets.iter().map(|a| a.expected_return).collect()
    }

    pub fn position(&self, ticker: &str) -> Option<usize> {
        self.assets.iter().position(|a| a.ticker == ticker)
    }

    /// Highest expected return, lowest variance among ties.
    pub fn best(&self) -> Option<&Asset> {
        self.assets.iter().max_by(|a, b| preference_order(a, b))
    }
}

/// `a` dominates `b`: at least the return, at most the variance, and
/// strictly better in one of the two.
pub fn dominates(a: &Asset, b: &Asset) -> bool {
    a.expected_return >= b.expected_return
        && a.variance <= b.variance
        && (a.expected_return > b.expected_return || a.variance < b.variance)
}

fn asset_order(a: &Asset, b: &Asset) -> Ordering {
    a.expected_return
        .total_cmp(&b.expected_return)
        .then_with(|| a.variance.total_cmp(&b.variance))
        .then_with(|| a.ticker.cmp(&b.ticker))
}

/// Higher expected return is greater; among equal returns, lower variance is.
fn preference_order(a: &Asset, b: &Asset) -> Ordering {
    a.expected_return
        .total_cmp(&b.expected_return)
        .then_with(|| b.variance.total_cmp(&a.variance))
}

/// Drop every Pareto-dominated candidate.
///
/// The candidate with the highest expected return (lowest variance among
/// ties) is always kept, so the universe is non-empty whenever `candidates`
/// is.
pub fn pareto_filter(candidates: Vec<Asset>) -> Universe {
    let mut sorted = candidates;
    sorted.sort_by(asset_order);

    let best_idx = sorted
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| preference_order(a, b))
        .map(|(i, _)| i);

    let keep: Vec<bool> = sorted
        .iter()
        .enumerate()
        .map(|(i, a)| Some(i) == best_idx || !sorted.iter().any(|b| dominates(b, a)))
        .collect();

    let assets = sorted
        .into_iter()
        .zip(keep)
        .filter_map(|(a, k)| k.then_some(a))
        .collect();
    Universe { assets }
}

/// Candidates that [`pareto_filter`] dropped, with a ticker that dominates
/// each of them.
pub fn dominated_by<'a>(
    candidates: &'a [Asset],
    universe: &'a Universe,
) -> Vec<(&'a Asset, &'a Asset)> {
    candidates
        .iter()
        .filter(|c| universe.position(&c.ticker).is_none())
        .filter_map(|c| {
            universe
                .assets()
                .iter()
                .find(|u| dominates(u, c))
                .map(|u| (c, u))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
