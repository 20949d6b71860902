//! # Risk/Return Statistics
//!
//! $$
//! \Sigma_{ij} = \frac{P}{T-1}\sum_{t}(r_{i,t}-\bar r_i)(r_{j,t}-\bar r_j)
//! $$
//!
//! Annualized mean-return vector and covariance matrix from aligned returns.

use ndarray::Array1;
use ndarray::Array2;
use tracing::warn;

use crate::error::FrontierError;
use crate::error::Result;
use crate::series::ReturnSeries;

/// Default periods-per-year constant for daily observations.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

const ZERO_VARIANCE_TOL: f64 = 1e-18;
const NEAR_SINGULAR_CORR: f64 = 0.9999;

/// Non-fatal numerical findings reported alongside successful statistics.
///
/// Diagnostics never abort the pipeline: the Monte Carlo path stays usable
/// even when the exact optimizer would be ill-conditioned.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
  /// Two assets are correlated beyond the near-singularity threshold, so the
  /// covariance matrix is close to rank-deficient.
  NearSingularCovariance {
    /// First asset identifier.
    id_a: String,
    /// Second asset identifier.
    id_b: String,
    /// Observed correlation.
    correlation: f64,
  },
}

/// Annualized risk/return statistics for a fixed set of assets.
///
/// Computed once per analysis and shared read-only by the sampler and the
/// optimizer; nothing mutates it after construction.
#[derive(Clone, Debug)]
pub struct StatisticsBundle {
  ids: Vec<String>,
  mean_returns: Array1<f64>,
  covariance: Array2<f64>,
  periods_per_year: usize,
  diagnostics: Vec<Diagnostic>,
}

impl StatisticsBundle {
  /// Asset identifiers in matrix order.
  pub fn ids(&self) -> &[String] {
    &self.ids
  }

  /// Number of assets.
  pub fn n_assets(&self) -> usize {
    self.ids.len()
  }

  /// Annualized mean returns, one per asset in id order.
  pub fn mean_returns(&self) -> &Array1<f64> {
    &self.mean_returns
  }

  /// Annualized covariance matrix in id order, symmetrized.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  /// Periods-per-year constant the annualization used.
  pub fn periods_per_year(&self) -> usize {
    self.periods_per_year
  }

  /// Numerical diagnostics gathered during computation.
  pub fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
  }

  /// Derived correlation matrix for reporting.
  ///
  /// Not consumed by the optimizer; diagonal is exactly 1.
  pub fn correlation(&self) -> Array2<f64> {
    let n = self.n_assets();
    let sigmas: Vec<f64> = (0..n).map(|i| self.covariance[[i, i]].max(0.0).sqrt()).collect();

    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
      for j in 0..n {
        let denom = sigmas[i] * sigmas[j];
        corr[[i, j]] = if i == j {
          1.0
        } else if denom > 1e-15 {
          (self.covariance[[i, j]] / denom).clamp(-1.0, 1.0)
        } else {
          0.0
        };
      }
    }

    corr
  }

  #[cfg(test)]
  pub(crate) fn from_parts(
    ids: Vec<String>,
    mean_returns: Array1<f64>,
    covariance: Array2<f64>,
  ) -> Self {
    Self {
      ids,
      mean_returns,
      covariance,
      periods_per_year: TRADING_DAYS_PER_YEAR,
      diagnostics: Vec::new(),
    }
  }
}

/// Compute annualized statistics from aligned return series.
///
/// Means are arithmetic periodic means scaled by `periods_per_year`; the
/// covariance uses the unbiased (T-1) estimator scaled the same way, then is
/// explicitly symmetrized as `(A + Aᵀ)/2` to remove floating-point asymmetry
/// before the optimizer sees it.
pub fn compute_statistics(
  returns: &[ReturnSeries],
  periods_per_year: usize,
) -> Result<StatisticsBundle> {
  if returns.is_empty() {
    return Err(FrontierError::EmptyInput);
  }
  if periods_per_year == 0 {
    return Err(FrontierError::InvalidParameter(
      "periods_per_year must be positive".into(),
    ));
  }

  let t = returns[0].len();
  for r in returns {
    if r.len() != t {
      return Err(FrontierError::InvalidParameter(format!(
        "return series are not aligned: `{}` has {} observations, expected {}",
        r.id(),
        r.len(),
        t
      )));
    }
  }
  if t < 2 {
    return Err(FrontierError::InsufficientData {
      observations: t,
      required: 2,
    });
  }

  let n = returns.len();
  let ids: Vec<String> = returns.iter().map(|r| r.id().to_string()).collect();
  let values: Vec<Vec<f64>> = returns.iter().map(|r| r.values()).collect();
  let scale = periods_per_year as f64;

  let periodic_means: Vec<f64> = values
    .iter()
    .map(|v| v.iter().sum::<f64>() / t as f64)
    .collect();

  let mut covariance = Array2::zeros((n, n));
  for i in 0..n {
    for j in i..n {
      let mut acc = 0.0;
      for k in 0..t {
        acc += (values[i][k] - periodic_means[i]) * (values[j][k] - periodic_means[j]);
      }
      let cov_ij = acc / (t - 1) as f64 * scale;
      covariance[[i, j]] = cov_ij;
      covariance[[j, i]] = cov_ij;
    }
  }

  // Symmetrize explicitly so the optimizer never sees fp asymmetry.
  covariance = (&covariance + &covariance.t()) / 2.0;

  for i in 0..n {
    if covariance[[i, i]].abs() < ZERO_VARIANCE_TOL {
      return Err(FrontierError::DegenerateSeries { id: ids[i].clone() });
    }
  }

  let mean_returns = Array1::from_iter(periodic_means.iter().map(|&m| m * scale));

  let mut bundle = StatisticsBundle {
    ids,
    mean_returns,
    covariance,
    periods_per_year,
    diagnostics: Vec::new(),
  };

  let corr = bundle.correlation();
  for i in 0..n {
    for j in (i + 1)..n {
      if corr[[i, j]].abs() > NEAR_SINGULAR_CORR {
        let diagnostic = Diagnostic::NearSingularCovariance {
          id_a: bundle.ids[i].clone(),
          id_b: bundle.ids[j].clone(),
          correlation: corr[[i, j]],
        };
        warn!(
          asset_a = %bundle.ids[i],
          asset_b = %bundle.ids[j],
          correlation = corr[[i, j]],
          "covariance matrix is near-singular"
        );
        bundle.diagnostics.push(diagnostic);
      }
    }
  }

  Ok(bundle)
}
