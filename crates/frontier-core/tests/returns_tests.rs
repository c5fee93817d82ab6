use chrono::NaiveDate;
use frontier_core::returns::daily::{
    daily_returns, get_daily_returns, simple_returns, DailyReturnsResponse,
};
use frontier_core::returns::quotes::{
    InMemoryQuoteSource, PriceHistory, PriceRecord, QuoteSource, QuoteWindow,
};
use frontier_core::{FrontierError, QuoteError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn history(start: NaiveDate, prices: &[Decimal]) -> PriceHistory {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| {
            (
                start + chrono::Duration::days(i as i64),
                PriceRecord::adjusted(*p),
            )
        })
        .collect()
}

/// Source that always fails with the given error.
struct FailingSource(QuoteError);

impl QuoteSource for FailingSource {
    fn historical_prices(
        &self,
        _ticker: &str,
        _window: QuoteWindow,
    ) -> Result<PriceHistory, QuoteError> {
        Err(self.0.clone())
    }
}

// ===========================================================================
// Simple returns
// ===========================================================================

#[test]
fn test_two_prices_rejected() {
    let err = simple_returns(&[dec!(10), dec!(11)]).unwrap_err();
    assert!(matches!(err, FrontierError::InsufficientData(_)));
}

#[test]
fn test_three_prices_give_two_returns() {
    let r = simple_returns(&[dec!(50), dec!(55), dec!(44)]).unwrap();
    assert_eq!(r.len(), 2);
    assert!((r[0] + 0.2).abs() < 1e-12);
    assert!((r[1] - 0.1).abs() < 1e-12);
}

// ===========================================================================
// Quote window and adapter
// ===========================================================================

#[test]
fn test_window_excludes_old_quotes() {
    let as_of = day(6, 30);
    // 120 daily quotes ending on the as-of date; only the last quarter counts.
    let prices: Vec<Decimal> = (0..120).map(|i| Decimal::from(100 + i)).collect();
    let start = as_of - chrono::Duration::days(119);
    let source = InMemoryQuoteSource::new().with_history("ACME", history(start, &prices));

    let window = QuoteWindow::last_quarter(as_of);
    let r = daily_returns(&source, "ACME", window).unwrap();
    // 91 inclusive days -> 90 returns
    assert_eq!(r.len(), 90);
    // Most recent first: 219 -> 218 is the last move.
    assert!((r[0] - (1.0 / 218.0)).abs() < 1e-12);
}

#[test]
fn test_ticker_is_trimmed() {
    let source = InMemoryQuoteSource::new().with_history(
        "ACME",
        history(day(3, 1), &[dec!(1), dec!(2), dec!(3)]),
    );
    let window = QuoteWindow::trailing(day(3, 10), 30);
    assert_eq!(daily_returns(&source, "  ACME ", window).unwrap().len(), 2);
}

#[test]
fn test_user_messages_collapse_quote_failures() {
    let window = QuoteWindow::last_quarter(day(6, 30));
    let failures = [
        QuoteError::TickerNotFound("X".into()),
        QuoteError::SourceUnavailable("timeout".into()),
        QuoteError::MalformedResponse("bad json".into()),
    ];
    for failure in failures {
        let source = FailingSource(failure.clone());
        // Internally distinct...
        match daily_returns(&source, "X", window).unwrap_err() {
            FrontierError::QuoteSource(e) => assert_eq!(e, failure),
            other => panic!("unexpected error {:?}", other),
        }
        // ...but one message for the user.
        assert_eq!(
            get_daily_returns(&source, "X", window),
            DailyReturnsResponse::Error {
                error: "Not a valid ticker.".into()
            }
        );
    }
}

#[test]
fn test_response_json_shapes() {
    let source = InMemoryQuoteSource::new().with_history(
        "ACME",
        history(day(3, 1), &[dec!(100), dec!(101)]),
    );
    let window = QuoteWindow::trailing(day(3, 10), 30);

    let empty = serde_json::to_value(get_daily_returns(&source, "", window)).unwrap();
    assert_eq!(empty, serde_json::json!({ "error": "No symbol given." }));

    let short = serde_json::to_value(get_daily_returns(&source, "ACME", window)).unwrap();
    assert_eq!(short, serde_json::json!({ "error": "Too few data points." }));

    let source = source.with_history("ACME", history(day(3, 1), &[dec!(100), dec!(110), dec!(121)]));
    let ok = serde_json::to_value(get_daily_returns(&source, "ACME", window)).unwrap();
    let results = ok["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_non_positive_quote_reads_as_bad_ticker() {
    let source = InMemoryQuoteSource::new().with_history(
        "ACME",
        history(day(3, 1), &[dec!(100), dec!(0), dec!(101)]),
    );
    let window = QuoteWindow::trailing(day(3, 10), 30);

    match daily_returns(&source, "ACME", window).unwrap_err() {
        FrontierError::QuoteSource(QuoteError::MalformedResponse(_)) => {}
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(
        get_daily_returns(&source, "ACME", window),
        DailyReturnsResponse::Error {
            error: "Not a valid ticker.".into()
        }
    );
}
