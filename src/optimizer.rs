//! # Constrained Optimizer
//!
//! $$
//! \min_{\mathbf{w}} \mathbf{w}^\top\Sigma\,\mathbf{w}
//! \quad\text{s.t.}\quad \textstyle\sum_i w_i = 1,\ \mathbf{w}\cdot\mu = r^\*,\ l_i \le w_i \le u_i
//! $$
//!
//! Exact minimum-volatility and maximum-Sharpe allocation under linear
//! constraints, plus the grid driver that traces the efficient frontier.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::error::FrontierError;
use crate::error::Result;
use crate::frontier::Frontier;
use crate::frontier::PortfolioPoint;
use crate::frontier::evaluate_weights;
use crate::stats::StatisticsBundle;

const SUM_PENALTY: f64 = 1e4;
const RETURN_PENALTY: f64 = 1e5;
const BOUND_PENALTY: f64 = 1e7;
const MAX_ITERS: u64 = 5000;
const RETURN_TOL: f64 = 1e-3;
// Penalty equilibria leave raw iterates a few parts in 1e-5 outside a binding
// constraint; anything inside solver resolution is projected away, anything
// beyond it is a genuine convergence failure.
const RAW_BOUND_TOL: f64 = 1e-4;
const RAW_SUM_TOL: f64 = 1e-3;
const BOUND_TOL: f64 = 1e-6;
const FEASIBILITY_TOL: f64 = 1e-9;

/// Optimization objective.
#[derive(Clone, Copy, Debug)]
pub enum Objective {
  /// Minimize volatility subject to the portfolio return hitting the target.
  MinVolatilityForReturn(f64),
  /// Maximize `(w·μ − risk_free) / σ_p`.
  MaxSharpe,
}

/// Per-asset allocation bounds, one `(lower, upper)` pair per asset.
#[derive(Clone, Debug)]
pub struct WeightBounds {
  bounds: Vec<(f64, f64)>,
}

impl WeightBounds {
  /// Long-only bounds `[0, 1]` for every asset.
  pub fn long_only(n_assets: usize) -> Self {
    Self {
      bounds: vec![(0.0, 1.0); n_assets],
    }
  }

  /// Explicit per-asset bounds; each pair must be finite with `lower <= upper`.
  pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self> {
    for (i, &(lo, hi)) in bounds.iter().enumerate() {
      if !lo.is_finite() || !hi.is_finite() {
        return Err(FrontierError::InvalidParameter(format!(
          "bounds for asset {i} are not finite"
        )));
      }
      if lo > hi {
        return Err(FrontierError::InvalidParameter(format!(
          "bounds for asset {i}: lower {lo} exceeds upper {hi}"
        )));
      }
    }
    Ok(Self { bounds })
  }

  /// Bound pairs in asset order.
  pub fn as_slice(&self) -> &[(f64, f64)] {
    &self.bounds
  }

  /// Number of bounded assets.
  pub fn len(&self) -> usize {
    self.bounds.len()
  }

  /// Whether no bounds are configured.
  pub fn is_empty(&self) -> bool {
    self.bounds.is_empty()
  }

  /// Reject bound sets under which `sum(w) = 1` has no solution.
  fn check_budget_feasible(&self) -> Result<()> {
    let low_sum: f64 = self.bounds.iter().map(|&(lo, _)| lo).sum();
    let high_sum: f64 = self.bounds.iter().map(|&(_, hi)| hi).sum();

    if low_sum > 1.0 + FEASIBILITY_TOL {
      return Err(FrontierError::InfeasibleConstraints(format!(
        "lower bounds sum to {low_sum}, above the unit budget"
      )));
    }
    if high_sum < 1.0 - FEASIBILITY_TOL {
      return Err(FrontierError::InfeasibleConstraints(format!(
        "upper bounds sum to {high_sum}, below the unit budget"
      )));
    }
    Ok(())
  }
}

/// Achievable portfolio return range under the bounds, by greedy allocation
/// of the unit budget toward the extreme-μ assets.
fn achievable_return_range(mu: &Array1<f64>, bounds: &WeightBounds) -> (f64, f64) {
  let n = mu.len();
  let mut order: Vec<usize> = (0..n).collect();

  let extreme = |descending: bool, order: &mut Vec<usize>| -> f64 {
    order.sort_by(|&a, &b| {
      if descending {
        mu[b].total_cmp(&mu[a])
      } else {
        mu[a].total_cmp(&mu[b])
      }
    });

    let mut weights: Vec<f64> = bounds.bounds.iter().map(|&(lo, _)| lo).collect();
    let mut budget = 1.0 - weights.iter().sum::<f64>();
    for &i in order.iter() {
      if budget <= 0.0 {
        break;
      }
      let room = bounds.bounds[i].1 - bounds.bounds[i].0;
      let add = room.min(budget);
      weights[i] += add;
      budget -= add;
    }

    weights.iter().zip(mu.iter()).map(|(&w, &m)| w * m).sum()
  };

  let max = extreme(true, &mut order);
  let min = extreme(false, &mut order);
  (min, max)
}

struct PenalizedCost {
  mu: Array1<f64>,
  cov: Array2<f64>,
  bounds: Vec<(f64, f64)>,
  risk_free: f64,
  /// `Some(target)` selects the minimum-volatility problem, `None` the
  /// maximum-Sharpe problem.
  target: Option<f64>,
}

impl CostFunction for PenalizedCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = Array1::from_vec(x.clone());
    let sum: f64 = x.iter().sum();
    let ret = w.dot(&self.mu);
    let var = w.dot(&self.cov.dot(&w));

    let mut penalty = SUM_PENALTY * (sum - 1.0).powi(2);
    for (&wi, &(lo, hi)) in x.iter().zip(&self.bounds) {
      let violation = (lo - wi).max(0.0) + (wi - hi).max(0.0);
      penalty += BOUND_PENALTY * violation * violation;
    }

    let objective = match self.target {
      Some(target) => var + RETURN_PENALTY * (ret - target).powi(2),
      None => {
        let vol = var.max(0.0).sqrt();
        if vol > 1e-12 {
          -(ret - self.risk_free) / vol
        } else {
          1e10
        }
      }
    };

    Ok(objective + penalty)
  }
}

/// Solve one allocation problem exactly (no sampling).
///
/// The solver is a local constrained nonlinear optimization in penalized form:
/// Nelder-Mead over raw weights with quadratic penalties for the unit budget,
/// the return target and the per-asset bounds, started from the equal-weight
/// vector. The Sharpe objective is quasi-concave under a positive-definite
/// covariance, so the neutral start converges reliably.
///
/// Infeasible bounds or an unattainable target are rejected before the solver
/// runs; a non-converged solve surfaces as
/// [`FrontierError::OptimizationFailed`] with the last iterate attached.
/// Retrying with relaxed bounds is the caller's decision, never automatic.
pub fn optimize(
  stats: &StatisticsBundle,
  objective: Objective,
  bounds: &WeightBounds,
  risk_free: f64,
) -> Result<PortfolioPoint> {
  let n = stats.n_assets();
  if bounds.len() != n {
    return Err(FrontierError::InvalidParameter(format!(
      "{} bound pairs supplied for {} assets",
      bounds.len(),
      n
    )));
  }
  bounds.check_budget_feasible()?;

  let target = match objective {
    Objective::MinVolatilityForReturn(target) => {
      let (min_ret, max_ret) = achievable_return_range(stats.mean_returns(), bounds);
      if target < min_ret - FEASIBILITY_TOL || target > max_ret + FEASIBILITY_TOL {
        return Err(FrontierError::InfeasibleConstraints(format!(
          "target return {target} outside achievable range [{min_ret}, {max_ret}]"
        )));
      }
      Some(target)
    }
    Objective::MaxSharpe => None,
  };

  let cost = PenalizedCost {
    mu: stats.mean_returns().clone(),
    cov: stats.covariance().clone(),
    bounds: bounds.bounds.clone(),
    risk_free,
    target,
  };

  // Equal-weight start; the simplex perturbs one coordinate per vertex.
  let x0 = vec![1.0 / n as f64; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] += 0.1;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(1e-10)
    .map_err(|e| FrontierError::OptimizationFailed {
      message: e.to_string(),
      last_weights: x0.clone(),
    })?;

  let run = Executor::new(cost, solver)
    .configure(|state| state.max_iters(MAX_ITERS))
    .run()
    .map_err(|e| FrontierError::OptimizationFailed {
      message: e.to_string(),
      last_weights: x0.clone(),
    })?;

  let raw = run.state.best_param.unwrap_or(x0);
  debug!(objective = ?objective, iterations = run.state.iter, "solver finished");

  finish_solution(stats, raw, bounds, target, risk_free)
}

fn max_bound_violation(weights: &[f64], bounds: &WeightBounds) -> f64 {
  weights
    .iter()
    .zip(bounds.as_slice())
    .map(|(&w, &(lo, hi))| (lo - w).max(0.0).max(w - hi))
    .fold(0.0f64, f64::max)
}

/// Project a near-feasible iterate onto `{sum(w) = 1, l <= w <= u}`.
///
/// Clamps into the box, then spreads the budget residual across assets with
/// remaining room, repeating while a pass saturates further bounds. Budget
/// feasibility of the bounds is checked before any solve, so the residual
/// always fits.
fn project_onto_budget(raw: &[f64], bounds: &WeightBounds) -> Vec<f64> {
  let mut weights: Vec<f64> = raw
    .iter()
    .zip(bounds.as_slice())
    .map(|(&w, &(lo, hi))| w.clamp(lo, hi))
    .collect();

  for _ in 0..=weights.len() {
    let residual = 1.0 - weights.iter().sum::<f64>();
    if residual.abs() < 1e-12 {
      break;
    }

    let open: Vec<usize> = (0..weights.len())
      .filter(|&i| {
        let (lo, hi) = bounds.as_slice()[i];
        if residual > 0.0 {
          weights[i] < hi
        } else {
          weights[i] > lo
        }
      })
      .collect();
    if open.is_empty() {
      break;
    }

    let share = residual / open.len() as f64;
    for &i in &open {
      let (lo, hi) = bounds.as_slice()[i];
      weights[i] = (weights[i] + share).clamp(lo, hi);
    }
  }

  weights
}

/// Validate a raw solver iterate and turn it into an evaluated point.
///
/// Iterates within solver resolution of the constraints are projected onto
/// the feasible set; the returned vector is then verified against the strict
/// feasibility tolerances, so a successful result never carries a violation.
fn finish_solution(
  stats: &StatisticsBundle,
  raw: Vec<f64>,
  bounds: &WeightBounds,
  target: Option<f64>,
  risk_free: f64,
) -> Result<PortfolioPoint> {
  let violation = max_bound_violation(&raw, bounds);
  if violation > RAW_BOUND_TOL {
    return Err(FrontierError::OptimizationFailed {
      message: format!(
        "bound violation {violation:.3e} above solver resolution {RAW_BOUND_TOL:.0e}"
      ),
      last_weights: raw,
    });
  }

  let sum: f64 = raw.iter().sum();
  if (sum - 1.0).abs() > RAW_SUM_TOL {
    return Err(FrontierError::OptimizationFailed {
      message: format!("weight sum {sum} drifted from the unit budget beyond {RAW_SUM_TOL:.0e}"),
      last_weights: raw,
    });
  }

  let weights = project_onto_budget(&raw, bounds);

  let final_sum: f64 = weights.iter().sum();
  let final_violation = max_bound_violation(&weights, bounds);
  if final_violation > BOUND_TOL || (final_sum - 1.0).abs() > BOUND_TOL {
    return Err(FrontierError::OptimizationFailed {
      message: format!(
        "projection left an infeasible vector (sum {final_sum}, violation {final_violation:.3e})"
      ),
      last_weights: weights,
    });
  }

  let point = evaluate_weights(stats, &weights, risk_free)?;

  if let Some(target) = target {
    if (point.expected_return - target).abs() > RETURN_TOL {
      return Err(FrontierError::OptimizationFailed {
        message: format!(
          "achieved return {} misses target {target} beyond tolerance {RETURN_TOL:.0e}",
          point.expected_return
        ),
        last_weights: point.weights,
      });
    }
  }

  Ok(point)
}

/// Trace the exact efficient frontier over a grid of target returns.
///
/// Targets are evenly spaced across the achievable return range under the
/// bounds. Grid points are independent solves and run as a parallel map; the
/// collected points are re-sorted by volatility because completion order is
/// not return-ordered.
pub fn efficient_frontier(
  stats: &StatisticsBundle,
  n_points: usize,
  bounds: &WeightBounds,
  risk_free: f64,
) -> Result<Frontier> {
  if n_points < 2 {
    return Err(FrontierError::InvalidParameter(
      "frontier grid needs at least 2 points".into(),
    ));
  }
  if bounds.len() != stats.n_assets() {
    return Err(FrontierError::InvalidParameter(format!(
      "{} bound pairs supplied for {} assets",
      bounds.len(),
      stats.n_assets()
    )));
  }
  bounds.check_budget_feasible()?;

  let (min_ret, max_ret) = achievable_return_range(stats.mean_returns(), bounds);
  let step = (max_ret - min_ret) / (n_points - 1) as f64;
  let targets: Vec<f64> = (0..n_points).map(|i| min_ret + step * i as f64).collect();

  let points = targets
    .par_iter()
    .map(|&target| {
      optimize(
        stats,
        Objective::MinVolatilityForReturn(target),
        bounds,
        risk_free,
      )
    })
    .collect::<Result<Vec<_>>>()?;

  debug!(n_points, min_ret, max_ret, "traced efficient frontier");

  let mut frontier = Frontier::new(points);
  frontier.sort_by_volatility();
  Ok(frontier)
}
