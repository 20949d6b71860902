//! # Errors
//!
//! $$
//! \text{Error taxonomy: data quality} \cup \text{configuration} \cup \text{solver}
//! $$
//!
//! Shared error type for every fallible operation in the crate.

use thiserror::Error;

/// Errors surfaced by the analytics pipeline.
///
/// Every variant indicates either a data-quality problem (the upstream data
/// supplier must fix it) or a configuration problem (the caller must fix it);
/// nothing is retried internally and partial results are never returned.
#[derive(Debug, Clone, Error)]
pub enum FrontierError {
  /// No asset series were supplied.
  #[error("no asset series supplied")]
  EmptyInput,

  /// Too few aligned observations remain to compute a return.
  #[error("insufficient data: {observations} aligned observations, need at least {required}")]
  InsufficientData {
    /// Aligned observations remaining after the timestamp intersection.
    observations: usize,
    /// Minimum observations required.
    required: usize,
  },

  /// An asset's return series has zero variance, which would make the
  /// covariance matrix singular along that row/column.
  #[error("asset `{id}` has zero return variance")]
  DegenerateSeries {
    /// Offending asset identifier.
    id: String,
  },

  /// A caller-supplied parameter is out of range or malformed.
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  /// The configured bounds cannot satisfy the problem constraints.
  #[error("infeasible constraints: {0}")]
  InfeasibleConstraints(String),

  /// The nonlinear solver did not converge to a feasible optimum.
  #[error("optimization failed: {message}")]
  OptimizationFailed {
    /// Solver diagnostic message.
    message: String,
    /// Last iterate produced before the failure, in asset order.
    last_weights: Vec<f64>,
  },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FrontierError>;
