use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use frontier_core::returns::daily::get_daily_returns;
use frontier_core::returns::quotes::{QuoteWindow, DEFAULT_LOOKBACK_DAYS};

use crate::input::quotes::CsvQuoteSource;

/// Where quotes come from and which dates to use.
#[derive(Args)]
pub struct QuoteArgs {
    /// Directory holding one <TICKER>.csv price file per symbol
    #[arg(long, default_value = ".")]
    pub prices_dir: PathBuf,

    /// Last day of the quote window, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Calendar days covered by the quote window
    #[arg(
        long,
        default_value_t = DEFAULT_LOOKBACK_DAYS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub lookback_days: i64,
}

impl QuoteArgs {
    pub fn window(&self) -> QuoteWindow {
        let as_of = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        QuoteWindow::trailing(as_of, self.lookback_days)
    }

    pub fn source(&self) -> CsvQuoteSource {
        CsvQuoteSource::new(&self.prices_dir)
    }
}

/// Arguments for daily returns lookup
#[derive(Args)]
pub struct ReturnsArgs {
    /// Ticker symbol
    pub ticker: String,

    #[command(flatten)]
    pub quotes: QuoteArgs,
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let response = get_daily_returns(&args.quotes.source(), &args.ticker, args.quotes.window());
    Ok(serde_json::to_value(response)?)
}
