use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::quotes::{PriceHistory, QuoteSource, QuoteWindow};
use crate::error::{FrontierError, QuoteError};
use crate::types::Money;
use crate::FrontierResult;

/// Fewest price observations that still yield two returns, the minimum the
/// covariance engine can divide by `n - 1` with.
pub const MIN_PRICE_POINTS: usize = 3;

/// Presentation-shaped answer for a single ticker lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DailyReturnsResponse {
    Error { error: String },
    Results { results: Vec<f64> },
}

/// Simple returns over consecutive prices, most recent first.
///
/// `prices` must be in chronological order (earliest first). The output is
/// reversed so that series of different lengths line up on their most
/// recent observations when zipped together.
pub fn simple_returns(prices: &[Money]) -> FrontierResult<Vec<f64>> {
    if prices.len() < MIN_PRICE_POINTS {
        return Err(FrontierError::InsufficientData(format!(
            "At least {} price points required, got {}",
            MIN_PRICE_POINTS,
            prices.len()
        )));
    }

    // A quote of zero or less is a bad response from the source.
    if let Some(bad) = prices.iter().find(|p| **p <= Decimal::ZERO) {
        return Err(QuoteError::MalformedResponse(format!(
            "non-positive adjusted close {}",
            bad
        ))
        .into());
    }

    let mut returns = Vec::with_capacity(prices.len() - 1);
    for pair in prices.windows(2) {
        let (today, tomorrow) = (pair[0], pair[1]);
        let r = (tomorrow - today) / today;
        let r = r.to_f64().ok_or_else(|| {
            QuoteError::MalformedResponse(format!("return {} is not representable as f64", r))
        })?;
        returns.push(r);
    }
    returns.reverse();
    Ok(returns)
}

/// Simple returns from a dated history, using the adjusted close.
pub fn returns_from_history(history: &PriceHistory) -> FrontierResult<Vec<f64>> {
    let closes: Vec<Money> = history.values().map(|rec| rec.adj_close).collect();
    simple_returns(&closes)
}

/// Look up `ticker` over `window` and compute its daily returns.
pub fn daily_returns<S: QuoteSource + ?Sized>(
    source: &S,
    ticker: &str,
    window: QuoteWindow,
) -> FrontierResult<Vec<f64>> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(FrontierError::InvalidInput {
            field: "ticker".into(),
            reason: "No symbol given".into(),
        });
    }

    let history = source.historical_prices(ticker, window).map_err(|e| {
        warn!(ticker, error = %e, "quote lookup failed");
        FrontierError::from(e)
    })?;
    debug!(ticker, points = history.len(), "fetched price history");

    returns_from_history(&history)
}

/// Same as [`daily_returns`] but never fails: errors become the
/// user-facing `{ "error": ... }` shape.
pub fn get_daily_returns<S: QuoteSource + ?Sized>(
    source: &S,
    ticker: &str,
    window: QuoteWindow,
) -> DailyReturnsResponse {
    match daily_returns(source, ticker, window) {
        Ok(results) => DailyReturnsResponse::Results { results },
        Err(e) => DailyReturnsResponse::Error {
            error: e.user_message(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
