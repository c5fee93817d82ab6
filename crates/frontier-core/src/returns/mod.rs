//! Return Series Adapter: turns quoted price histories into most-recent-first
//! simple daily returns.

pub mod daily;
pub mod quotes;
