use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::filter::Universe;
use crate::error::FrontierError;
use crate::FrontierResult;

/// Fewest return observations per series; `n - 1` must be non-zero.
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

/// A candidate asset summarized by its own return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub ticker: String,
    /// Sample mean of daily returns.
    pub expected_return: f64,
    /// Sample variance of daily returns.
    pub variance: f64,
}

impl Asset {
    pub fn from_returns(ticker: &str, returns: &[f64]) -> FrontierResult<Self> {
        Ok(Asset {
            ticker: ticker.to_string(),
            expected_return: mean(returns)?,
            variance: variance(returns)?,
        })
    }
}

/// Arithmetic mean.
pub fn mean(series: &[f64]) -> FrontierResult<f64> {
    if series.is_empty() {
        return Err(FrontierError::InsufficientData(
            "Mean of an empty series".into(),
        ));
    }
    Ok(series.iter().sum::<f64>() / series.len() as f64)
}

/// Bessel-corrected sample covariance.
///
/// Each mean is taken over its full series; the cross products use only the
/// first `min(len(a), len(b))` positions, i.e. the most recent observations
/// of both series.
pub fn covariance(a: &[f64], b: &[f64]) -> FrontierResult<f64> {
    let pairs = a.len().min(b.len());
    if pairs < MIN_RETURN_OBSERVATIONS {
        return Err(FrontierError::InsufficientData(format!(
            "Covariance needs at least {} paired observations, got {}",
            MIN_RETURN_OBSERVATIONS, pairs
        )));
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let total: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    Ok(total / (pairs - 1) as f64)
}

/// Sample variance, `covariance(series, series)`.
pub fn variance(series: &[f64]) -> FrontierResult<f64> {
    covariance(series, series)
}

/// Variances and pairwise covariances for every asset of a universe.
///
/// Stored densely in universe order; entry `(i, j)` and `(j, i)` are the
/// same number, so lookups are order-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMap {
    tickers: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

impl CovarianceMap {
    /// Build the map for `universe` from each ticker's return series.
    pub fn build(
        universe: &Universe,
        returns: &BTreeMap<String, Vec<f64>>,
    ) -> FrontierResult<Self> {
        let tickers = universe.tickers();
        let n = tickers.len();
        let series: Vec<&Vec<f64>> = tickers
            .iter()
            .map(|t| {
                returns.get(t).ok_or_else(|| FrontierError::InvalidInput {
                    field: "returns".into(),
                    reason: format!("No return series for {}", t),
                })
            })
            .collect::<FrontierResult<_>>()?;

        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let c = covariance(series[i], series[j])?;
                matrix[i][j] = c;
                matrix[j][i] = c;
            }
        }
        Ok(CovarianceMap { tickers, matrix })
    }

    /// Build directly from a symmetric matrix in `tickers` order.
    pub fn from_matrix(tickers: Vec<String>, matrix: Vec<Vec<f64>>) -> FrontierResult<Self> {
        let n = tickers.len();
        if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
            return Err(FrontierError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Expected {}x{} matrix", n, n),
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if (matrix[i][j] - matrix[j][i]).abs() > 1e-12 {
                    return Err(FrontierError::InvalidInput {
                        field: "covariance_matrix".into(),
                        reason: format!("Not symmetric at [{},{}]", i, j),
                    });
                }
            }
        }
        Ok(CovarianceMap { tickers, matrix })
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Variance of the asset at index `i`.
    pub fn variance(&self, i: usize) -> f64 {
        self.matrix[i][i]
    }

    /// Covariance of assets `i` and `j` (variance when `i == j`).
    pub fn covariance(&self, i: usize, j: usize) -> f64 {
        self.matrix[i][j]
    }

    /// Order-free lookup by ticker: a single ticker (`a == b`) yields its
    /// variance, two distinct tickers their covariance.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        Some(self.matrix[i][j])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
