//! # Return Series
//!
//! $$
//! r_t = \frac{p_t}{p_{t-1}} - 1
//! $$
//!
//! Price history containers and aligned simple-return construction.

use std::collections::HashSet;

use chrono::DateTime;
use chrono::Utc;

use crate::error::FrontierError;
use crate::error::Result;

/// An asset's ordered price history.
///
/// Timestamps are strictly increasing with no duplicates; both properties are
/// validated at construction and the series is immutable afterwards.
#[derive(Clone, Debug)]
pub struct AssetSeries {
  id: String,
  points: Vec<(DateTime<Utc>, f64)>,
}

impl AssetSeries {
  /// Build a price series, validating ordering and price sanity.
  pub fn new(id: impl Into<String>, points: Vec<(DateTime<Utc>, f64)>) -> Result<Self> {
    let id = id.into();

    for window in points.windows(2) {
      if window[1].0 <= window[0].0 {
        return Err(FrontierError::InvalidParameter(format!(
          "asset `{id}`: timestamps must be strictly increasing"
        )));
      }
    }

    for &(ts, price) in &points {
      if !price.is_finite() || price <= 0.0 {
        return Err(FrontierError::InvalidParameter(format!(
          "asset `{id}`: non-positive or non-finite price {price} at {ts}"
        )));
      }
    }

    Ok(Self { id, points })
  }

  /// Asset identifier.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Ordered (timestamp, price) observations.
  pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
    &self.points
  }

  /// Number of price observations.
  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// Whether the series holds no observations.
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

/// An asset's periodic simple-return series, one entry per price interval.
///
/// Each return is stamped with the later timestamp of the price pair that
/// produced it. All return series within one analysis share an identical
/// timestamp set after alignment.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
  id: String,
  returns: Vec<(DateTime<Utc>, f64)>,
}

impl ReturnSeries {
  /// Asset identifier.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Ordered (timestamp, periodic return) observations.
  pub fn returns(&self) -> &[(DateTime<Utc>, f64)] {
    &self.returns
  }

  /// Return values without timestamps, in time order.
  pub fn values(&self) -> Vec<f64> {
    self.returns.iter().map(|&(_, r)| r).collect()
  }

  /// Number of periodic returns.
  pub fn len(&self) -> usize {
    self.returns.len()
  }

  /// Whether the series holds no returns.
  pub fn is_empty(&self) -> bool {
    self.returns.is_empty()
  }
}

/// Align asset series on their common timestamps and compute simple returns.
///
/// Alignment is an inner join: a timestamp missing from any one series is
/// dropped from all of them, because downstream statistics require perfectly
/// synchronized observations. Forward-filling is deliberately not offered.
///
/// Returns one [`ReturnSeries`] per input asset (same order) plus the common
/// price timestamp index; each return series is one element shorter than the
/// index.
pub fn build_returns(series: &[AssetSeries]) -> Result<(Vec<ReturnSeries>, Vec<DateTime<Utc>>)> {
  if series.is_empty() {
    return Err(FrontierError::EmptyInput);
  }

  let mut common: HashSet<DateTime<Utc>> = series[0].points.iter().map(|&(ts, _)| ts).collect();
  for s in &series[1..] {
    let stamps: HashSet<DateTime<Utc>> = s.points.iter().map(|&(ts, _)| ts).collect();
    common.retain(|ts| stamps.contains(ts));
  }

  // The first series is strictly increasing, so filtering it by membership
  // yields the intersection already in time order.
  let index: Vec<DateTime<Utc>> = series[0]
    .points
    .iter()
    .map(|&(ts, _)| ts)
    .filter(|ts| common.contains(ts))
    .collect();

  if index.len() < 2 {
    return Err(FrontierError::InsufficientData {
      observations: index.len(),
      required: 2,
    });
  }

  let mut aligned = Vec::with_capacity(series.len());
  for s in series {
    let prices: Vec<(DateTime<Utc>, f64)> = s
      .points
      .iter()
      .filter(|(ts, _)| common.contains(ts))
      .copied()
      .collect();

    let returns: Vec<(DateTime<Utc>, f64)> = prices
      .windows(2)
      .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
      .collect();

    aligned.push(ReturnSeries {
      id: s.id.clone(),
      returns,
    });
  }

  Ok((aligned, index))
}
