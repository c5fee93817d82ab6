use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::QuoteError;
use crate::types::Money;

/// Calendar days covered by a default quote window (one quarter).
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// One day's quote. Only the adjusted close is used for returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Money>,
    pub adj_close: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl PriceRecord {
    pub fn adjusted(adj_close: Money) -> Self {
        PriceRecord {
            close: None,
            adj_close,
            volume: None,
        }
    }
}

/// Quotes keyed by trading date. Iteration order is chronological.
pub type PriceHistory = BTreeMap<NaiveDate, PriceRecord>;

/// Inclusive date range requested from a quote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl QuoteWindow {
    /// The `lookback_days` calendar days ending at `as_of`.
    pub fn trailing(as_of: NaiveDate, lookback_days: i64) -> Self {
        QuoteWindow {
            from: as_of - Duration::days(lookback_days),
            to: as_of,
        }
    }

    /// The default quarter-long window ending at `as_of`.
    pub fn last_quarter(as_of: NaiveDate) -> Self {
        Self::trailing(as_of, DEFAULT_LOOKBACK_DAYS)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// Historical price lookup by ticker and date range.
pub trait QuoteSource {
    fn historical_prices(
        &self,
        ticker: &str,
        window: QuoteWindow,
    ) -> Result<PriceHistory, QuoteError>;
}

/// Quote source backed by histories held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQuoteSource {
    histories: HashMap<String, PriceHistory>,
}

impl InMemoryQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<String>, history: PriceHistory) {
        self.histories.insert(ticker.into(), history);
    }

    pub fn with_history(mut self, ticker: impl Into<String>, history: PriceHistory) -> Self {
        self.insert(ticker, history);
        self
    }
}

impl QuoteSource for InMemoryQuoteSource {
    fn historical_prices(
        &self,
        ticker: &str,
        window: QuoteWindow,
    ) -> Result<PriceHistory, QuoteError> {
        let history = self
            .histories
            .get(ticker)
            .ok_or_else(|| QuoteError::TickerNotFound(ticker.to_string()))?;
        Ok(history
            .iter()
            .filter(|(date, _)| window.contains(**date))
            .map(|(date, record)| (*date, record.clone()))
            .collect())
    }
}

impl<S: QuoteSource + ?Sized> QuoteSource for &S {
    fn historical_prices(
        &self,
        ticker: &str,
        window: QuoteWindow,
    ) -> Result<PriceHistory, QuoteError> {
        (**self).historical_prices(ticker, window)
    }
}
