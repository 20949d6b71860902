//! # Mean-Variance Portfolio Analytics
//!
//! `frontier_rs` computes risk/return characteristics of a set of tradable
//! assets and derives an optimal capital allocation under a chosen objective.
//! The crate consumes numeric price series and produces numeric allocation and
//! risk/return summaries; data acquisition and presentation live outside it.
//!
//! ## Modules
//!
//! | Module        | Description                                                                 |
//! |---------------|-----------------------------------------------------------------------------|
//! | [`series`]    | Price history containers and aligned simple-return construction.            |
//! | [`stats`]     | Annualized mean-return vector and covariance matrix with diagnostics.       |
//! | [`frontier`]  | Portfolio evaluation and Monte Carlo approximation of the feasible set.     |
//! | [`optimizer`] | Exact constrained min-volatility and max-Sharpe allocation, frontier grid.  |
//! | [`engine`]    | Configuration bundle and orchestration facade over the pipeline stages.     |
//! | [`error`]     | Shared error taxonomy.                                                      |
//!
//! ## Pipeline
//!
//! Data flows strictly builder → statistics → {sampler, optimizer}; the
//! sampler and optimizer are independent read-only consumers of the same
//! [`StatisticsBundle`] and may run concurrently.
//!
//! ## Parallelism
//!
//! Monte Carlo evaluations and frontier grid solves are embarrassingly
//! parallel rayon maps over immutable inputs; sampling stays bit-for-bit
//! reproducible under an explicit seed.
//!
//! ## Example Usage
//!
//! ```rust
//! use frontier_rs::{FrontierConfig, FrontierEngine, Objective};
//!
//! let engine = FrontierEngine::new(FrontierConfig::default());
//! let stats = engine.statistics(&assets)?;
//! let best = engine.optimize(&stats, Objective::MaxSharpe)?;
//! ```

pub mod engine;
pub mod error;
pub mod frontier;
pub mod optimizer;
pub mod series;
pub mod stats;

pub use engine::FrontierConfig;
pub use engine::FrontierEngine;
pub use error::FrontierError;
pub use error::Result;
pub use frontier::Frontier;
pub use frontier::PortfolioPoint;
pub use frontier::evaluate_weights;
pub use frontier::sample_frontier;
pub use optimizer::Objective;
pub use optimizer::WeightBounds;
pub use optimizer::efficient_frontier;
pub use optimizer::optimize;
pub use series::AssetSeries;
pub use series::ReturnSeries;
pub use series::build_returns;
pub use stats::Diagnostic;
pub use stats::StatisticsBundle;
pub use stats::TRADING_DAYS_PER_YEAR;
pub use stats::compute_statistics;
