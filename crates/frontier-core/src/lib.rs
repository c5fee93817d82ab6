pub mod error;
pub mod types;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "frontier")]
pub mod frontier;

pub use error::{FrontierError, QuoteError};
pub use types::*;

/// Standard result type for all frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;
