use thiserror::Error;

/// Failure talking to the external quote service.
///
/// The variants stay distinct for logging and tests; callers that face
/// end users collapse all of them into a single message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("ticker not found: {0}")]
    TickerNotFound(String),

    #[error("quote source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("malformed quote response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Quote source error: {0}")]
    QuoteSource(#[from] QuoteError),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FrontierError {
    /// Message shown to end users. Every quote-source failure maps to the
    /// same message.
    pub fn user_message(&self) -> String {
        match self {
            FrontierError::InvalidInput { field, .. } if field == "ticker" => {
                "No symbol given.".to_string()
            }
            FrontierError::InsufficientData(_) => "Too few data points.".to_string(),
            FrontierError::QuoteSource(_) => "Not a valid ticker.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for FrontierError {
    fn from(e: serde_json::Error) -> Self {
        FrontierError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_failures_share_one_user_message() {
        let errors = [
            QuoteError::TickerNotFound("ZZZZ".into()),
            QuoteError::SourceUnavailable("timeout".into()),
            QuoteError::MalformedResponse("missing Adj Close".into()),
        ];
        for e in errors {
            let err: FrontierError = e.into();
            assert_eq!(err.user_message(), "Not a valid ticker.");
        }
    }

    #[test]
    fn test_empty_ticker_message() {
        let err = FrontierError::InvalidInput {
            field: "ticker".into(),
            reason: "empty".into(),
        };
        assert_eq!(err.user_message(), "No symbol given.");
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = FrontierError::InsufficientData("2 prices".into());
        assert_eq!(err.user_message(), "Too few data points.");
    }
}
