//! # hails
//!
//! Hierarchical time-series preparation + decomposition-linear forecasting.
//!
//! - [`hierarchy`]: roll leaf series up a categorical hierarchy and build the
//!   aggregation (summation) matrix linking every level to the leaves.
//! - [`decomposition`]: moving-average trend / seasonal split.
//! - [`forecast`]: trend-seasonal and shift-normalized linear forecasters with
//!   per-channel or shared weights.
//! - [`reconciliation`]: make per-series forecasts coherent with the hierarchy.
//!
//! ```text
//! leaf table ──► HierarchyAggregator ──► (series [m, T], aggregation [m, m])
//!                                             │
//!                       window [batch, seq_len, m] ──► Forecaster ──► [batch, pred_len, m]
//!                                                                        │
//!                                                          reconcile ◄───┘
//! ```
//!
//! Every operation is a synchronous, in-memory batch computation. The
//! `parallel` feature spreads per-channel projections over rayon without
//! changing results.

pub mod decomposition;
/// Error types used across `hails`.
pub mod error;
pub mod forecast;
pub mod hierarchy;
pub mod reconciliation;


pub use crate::decomposition::{MovingAverage, SeriesDecomposition};
pub use crate::forecast::{
    Forecaster, LinearConfig, Projection, ShiftNormalizedLinear, TrendSeasonalLinear,
};
pub use crate::hierarchy::{AggregatedHierarchy, GroupOrder, HierarchyAggregator, HierarchyTable};
pub use crate::reconciliation::{reconcile, reconcile_forecast, ReconciliationMethod, SummingMatrix};

pub use error::{Error, Result};
