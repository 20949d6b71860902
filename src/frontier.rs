//! # Frontier Sampling
//!
//! $$
//! \mu_p = \mathbf{w}\cdot\mu,\qquad \sigma_p = \sqrt{\mathbf{w}^\top\Sigma\,\mathbf{w}}
//! $$
//!
//! Portfolio evaluation and Monte Carlo approximation of the feasible set.

use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Uniform;
use rayon::prelude::*;
use tracing::debug;

use crate::error::FrontierError;
use crate::error::Result;
use crate::stats::StatisticsBundle;

/// A weight vector together with its risk/return evaluation.
#[derive(Clone, Debug)]
pub struct PortfolioPoint {
  /// Allocation weights in [`StatisticsBundle`] asset order.
  pub weights: Vec<f64>,
  /// Annualized expected portfolio return.
  pub expected_return: f64,
  /// Annualized portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

/// A collection of evaluated portfolios.
///
/// Sampled frontiers are unordered; exact frontiers from the optimizer are
/// sorted by increasing volatility.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
  points: Vec<PortfolioPoint>,
}

impl Frontier {
  pub(crate) fn new(points: Vec<PortfolioPoint>) -> Self {
    Self { points }
  }

  /// All portfolio points.
  pub fn points(&self) -> &[PortfolioPoint] {
    &self.points
  }

  /// Number of points.
  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// Whether the frontier holds no points.
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Point with the highest Sharpe ratio.
  pub fn max_sharpe(&self) -> Option<&PortfolioPoint> {
    self
      .points
      .iter()
      .max_by(|a, b| a.sharpe.total_cmp(&b.sharpe))
  }

  /// Point with the lowest volatility.
  pub fn min_volatility(&self) -> Option<&PortfolioPoint> {
    self
      .points
      .iter()
      .min_by(|a, b| a.volatility.total_cmp(&b.volatility))
  }

  pub(crate) fn sort_by_volatility(&mut self) {
    self
      .points
      .sort_by(|a, b| a.volatility.total_cmp(&b.volatility));
  }
}

/// Evaluate a weight vector against annualized statistics.
pub fn evaluate_weights(
  stats: &StatisticsBundle,
  weights: &[f64],
  risk_free: f64,
) -> Result<PortfolioPoint> {
  if weights.len() != stats.n_assets() {
    return Err(FrontierError::InvalidParameter(format!(
      "weight vector has {} entries, statistics cover {} assets",
      weights.len(),
      stats.n_assets()
    )));
  }

  let w = Array1::from_vec(weights.to_vec());
  let expected_return = w.dot(stats.mean_returns());
  let variance = w.dot(&stats.covariance().dot(&w));
  let volatility = variance.max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  Ok(PortfolioPoint {
    weights: weights.to_vec(),
    expected_return,
    volatility,
    sharpe,
  })
}

/// Sample random feasible long-only portfolios and evaluate each one.
///
/// Weights are N uniforms normalized by their sum. This is the usual
/// simplex-via-normalized-uniforms draw; it is not uniform over the simplex
/// in the measure-theoretic sense, which is adequate for frontier
/// visualization.
///
/// Draws come serially from one seeded [`StdRng`], so the same seed, bundle
/// and count reproduce the frontier bit-for-bit on a given platform;
/// evaluation runs as an order-stable parallel map.
pub fn sample_frontier(
  stats: &StatisticsBundle,
  count: usize,
  risk_free: f64,
  seed: Option<u64>,
) -> Result<Frontier> {
  if count == 0 {
    return Err(FrontierError::InvalidParameter(
      "sample count must be positive".into(),
    ));
  }

  let n = stats.n_assets();
  let mut rng = match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let uniform = Uniform::new(0.0f64, 1.0);

  let mut samples = Vec::with_capacity(count);
  for _ in 0..count {
    let raw: Vec<f64> = (0..n).map(|_| uniform.sample(&mut rng)).collect();
    let total: f64 = raw.iter().sum();
    let weights: Vec<f64> = if total > 1e-15 {
      raw.iter().map(|&v| v / total).collect()
    } else {
      vec![1.0 / n as f64; n]
    };
    samples.push(weights);
  }

  let points = samples
    .into_par_iter()
    .map(|weights| evaluate_weights(stats, &weights, risk_free))
    .collect::<Result<Vec<_>>>()?;

  debug!(count, n_assets = n, "sampled Monte Carlo frontier");

  Ok(Frontier::new(points))
}

#[cfg(test)]
mod tests {
  use ndarray::arr1;
  use ndarray::arr2;

  use super::*;

  fn diag_stats() -> StatisticsBundle {
    StatisticsBundle::from_parts(
      vec!["AAA".into(), "BBB".into(), "CCC".into()],
      arr1(&[0.08, 0.12, 0.05]),
      arr2(&[[0.04, 0.0, 0.0], [0.0, 0.09, 0.0], [0.0, 0.0, 0.01]]),
    )
  }

  #[test]
  fn zero_count_is_invalid() {
    let result = sample_frontier(&diag_stats(), 0, 0.0, Some(1));
    assert!(matches!(result, Err(FrontierError::InvalidParameter(_))));
  }

  #[test]
  fn sampled_weights_are_feasible() {
    let frontier = sample_frontier(&diag_stats(), 500, 0.0, Some(42)).unwrap();
    assert_eq!(frontier.len(), 500);

    for point in frontier.points() {
      let sum: f64 = point.weights.iter().sum();
      assert!((sum - 1.0).abs() < 1e-6);
      assert!(point.weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
      assert!(point.volatility >= 0.0);
    }
  }

  #[test]
  fn identical_seeds_reproduce_the_frontier() {
    let stats = diag_stats();
    let first = sample_frontier(&stats, 256, 0.01, Some(7)).unwrap();
    let second = sample_frontier(&stats, 256, 0.01, Some(7)).unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.points().iter().zip(second.points()) {
      assert_eq!(a.weights, b.weights);
      assert_eq!(a.expected_return, b.expected_return);
      assert_eq!(a.volatility, b.volatility);
      assert_eq!(a.sharpe, b.sharpe);
    }
  }

  #[test]
  fn different_seeds_differ() {
    let stats = diag_stats();
    let first = sample_frontier(&stats, 64, 0.0, Some(1)).unwrap();
    let second = sample_frontier(&stats, 64, 0.0, Some(2)).unwrap();

    let any_diff = first
      .points()
      .iter()
      .zip(second.points())
      .any(|(a, b)| a.weights != b.weights);
    assert!(any_diff);
  }

  #[test]
  fn extrema_accessors_agree_with_scan() {
    let frontier = sample_frontier(&diag_stats(), 300, 0.0, Some(9)).unwrap();

    let best = frontier.max_sharpe().unwrap();
    let calm = frontier.min_volatility().unwrap();
    for p in frontier.points() {
      assert!(p.sharpe <= best.sharpe);
      assert!(p.volatility >= calm.volatility);
    }
  }

  #[test]
  fn evaluation_matches_hand_computation() {
    let stats = diag_stats();
    let point = evaluate_weights(&stats, &[0.5, 0.25, 0.25], 0.0).unwrap();

    let expected = 0.5 * 0.08 + 0.25 * 0.12 + 0.25 * 0.05;
    let variance: f64 = 0.25 * 0.04 + 0.0625 * 0.09 + 0.0625 * 0.01;
    assert!((point.expected_return - expected).abs() < 1e-12);
    assert!((point.volatility - variance.sqrt()).abs() < 1e-12);
    assert!((point.sharpe - expected / variance.sqrt()).abs() < 1e-12);
  }

  #[test]
  fn mismatched_weight_length_is_invalid() {
    let result = evaluate_weights(&diag_stats(), &[0.5, 0.5], 0.0);
    assert!(matches!(result, Err(FrontierError::InvalidParameter(_))));
  }
}
