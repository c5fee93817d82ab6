//! Mean-variance efficient frontier.
//!
//! Pipeline, leaf to root: [`covariance`] computes sample statistics,
//! [`filter`] drops Pareto-dominated assets, [`objective`] builds the
//! variance/return functions and their gradients, [`solver`] minimizes under
//! constraints, [`driver`] poses portfolio problems to the solver, and
//! [`sweep`] traces the frontier.

pub mod covariance;
pub mod driver;
pub mod filter;
pub mod objective;
pub mod solver;
pub mod sweep;

pub use driver::WeightMode;
pub use sweep::{median_risk, optimize, FrontierInput, FrontierOutput, FrontierPoint};
