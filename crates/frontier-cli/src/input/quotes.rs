use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use frontier_core::returns::quotes::{PriceHistory, PriceRecord, QuoteSource, QuoteWindow};
use frontier_core::QuoteError;

/// Quote source reading one Yahoo-style CSV per ticker from a directory.
///
/// Files are named `<TICKER>.csv` with the header
/// `Date,Open,High,Low,Close,Adj Close,Volume`. Only `Date` and
/// `Adj Close` are required.
#[derive(Debug, Clone)]
pub struct CsvQuoteSource {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Close", default, with = "rust_decimal::serde::str_option")]
    close: Option<Decimal>,
    #[serde(rename = "Adj Close", with = "rust_decimal::serde::str")]
    adj_close: Decimal,
    #[serde(rename = "Volume", default)]
    volume: Option<u64>,
}

impl CsvQuoteSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        CsvQuoteSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, ticker: &str) -> Result<PathBuf, QuoteError> {
        let plain = ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
        if ticker.is_empty() || !plain || ticker.starts_with('.') {
            return Err(QuoteError::TickerNotFound(ticker.to_string()));
        }
        Ok(self.dir.join(format!("{}.csv", ticker)))
    }
}

impl QuoteSource for CsvQuoteSource {
    fn historical_prices(
        &self,
        ticker: &str,
        window: QuoteWindow,
    ) -> Result<PriceHistory, QuoteError> {
        let path = self.path_for(ticker)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => QuoteError::TickerNotFound(ticker.to_string()),
            _ => QuoteError::SourceUnavailable(format!("{}: {}", path.display(), e)),
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let mut history = PriceHistory::new();
        for row in reader.deserialize::<QuoteRow>() {
            let row = row.map_err(|e| {
                QuoteError::MalformedResponse(format!("{}: {}", path.display(), e))
            })?;
            if !window.contains(row.date) {
                continue;
            }
            history.insert(
                row.date,
                PriceRecord {
                    close: row.close,
                    adj_close: row.adj_close,
                    volume: row.volume,
                },
            );
        }
        Ok(history)
    }
}
