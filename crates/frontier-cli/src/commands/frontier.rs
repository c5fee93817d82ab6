use clap::{Args, ValueEnum};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use frontier_core::frontier::{median_risk, optimize, FrontierInput, WeightMode};
use frontier_core::returns::daily::daily_returns;

use super::returns::QuoteArgs;
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WeightModeArg {
    /// No short positions
    LongOnly,
    /// Any real weight, shorts allowed
    Unrestricted,
}

impl From<WeightModeArg> for WeightMode {
    fn from(arg: WeightModeArg) -> Self {
        match arg {
            WeightModeArg::LongOnly => WeightMode::LongOnly,
            WeightModeArg::Unrestricted => WeightMode::Unrestricted,
        }
    }
}

/// Either a full `FrontierInput` or a bare ticker to returns map.
#[derive(Deserialize)]
#[serde(untagged)]
enum OptimizeRequest {
    Full(FrontierInput),
    Bare(BTreeMap<String, Vec<f64>>),
}

impl From<OptimizeRequest> for FrontierInput {
    fn from(req: OptimizeRequest) -> Self {
        match req {
            OptimizeRequest::Full(input) => input,
            OptimizeRequest::Bare(returns) => FrontierInput::new(returns),
        }
    }
}

/// Arguments for frontier optimization over precomputed returns
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the weight mode given in the input
    #[arg(long, value_enum)]
    pub weight_mode: Option<WeightModeArg>,
}

/// Arguments for fetching quotes and tracing the frontier end to end
#[derive(Args)]
pub struct FrontierArgs {
    /// Comma-separated ticker symbols (e.g. "AAPL,MSFT,XOM")
    #[arg(required = true, value_delimiter = ',')]
    pub tickers: Vec<String>,

    #[command(flatten)]
    pub quotes: QuoteArgs,

    /// Allowed portfolio weights
    #[arg(long, value_enum, default_value = "long-only")]
    pub weight_mode: WeightModeArg,
}

fn load_input(args: &OptimizeArgs) -> Result<FrontierInput, Box<dyn std::error::Error>> {
    let request: OptimizeRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        return Err("--input <file.json> or stdin required for frontier optimization".into());
    };

    let mut frontier_input = FrontierInput::from(request);
    if let Some(mode) = args.weight_mode {
        frontier_input.weight_mode = mode.into();
    }
    Ok(frontier_input)
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let frontier_input = load_input(&args)?;
    let result = optimize(&frontier_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_median_risk(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let frontier_input = load_input(&args)?;
    let result = median_risk(&frontier_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let source = args.quotes.source();
    let window = args.quotes.window();

    let mut returns = BTreeMap::new();
    for ticker in &args.tickers {
        let ticker = ticker.trim();
        let series = daily_returns(&source, ticker, window)
            .map_err(|e| format!("{}: {}", ticker, e.user_message()))?;
        info!(ticker, observations = series.len(), "loaded daily returns");
        returns.insert(ticker.to_string(), series);
    }

    let frontier_input = FrontierInput::new(returns).with_weight_mode(args.weight_mode.into());
    let result = optimize(&frontier_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_request_parses() {
        let req: OptimizeRequest =
            serde_json::from_str(r#"{"AAPL":[0.01,0.02,-0.01],"MSFT":[0.0,0.01,0.02]}"#).unwrap();
        let inp = FrontierInput::from(req);
        assert_eq!(inp.returns.len(), 2);
        assert_eq!(inp.weight_mode, WeightMode::LongOnly);
    }

    #[test]
    fn test_full_request_parses() {
        let req: OptimizeRequest = serde_json::from_str(
            r#"{"returns":{"AAPL":[0.01,0.02,-0.01]},"weight_mode":"unrestricted"}"#,
        )
        .unwrap();
        let inp = FrontierInput::from(req);
        assert_eq!(inp.returns.len(), 1);
        assert_eq!(inp.weight_mode, WeightMode::Unrestricted);
    }
}
