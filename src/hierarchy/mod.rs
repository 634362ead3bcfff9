//! Hierarchical aggregation of leaf-level time series.
//!
//! # The Core Insight
//!
//! Sales, demand or traffic data is usually recorded at the finest grain
//! (a store, a product, a profit center) but planned at coarser ones:
//!
//! ```text
//! Level     │ Example rows
//! ──────────┼──────────────────────────────
//! Country   │ US
//! Region    │ US/East, US/West
//! Store     │ US/East/s1, US/East/s2, US/West/s3
//! ```
//!
//! Every coarse series is a sum of leaves. [`HierarchyAggregator`] rolls a
//! leaf [`HierarchyTable`] up through each level and records the summation
//! structure as a square aggregation matrix, so that the stacked series can
//! be forecast jointly (one channel per series) and later reconciled.
//!
//! # Module Overview
//!
//! - [`HierarchyTable`]: categorical attribute columns + `[rows, time]` values
//! - [`HierarchyAggregator`]: recursive groupby rollup
//! - [`AggregatedHierarchy`]: stacked series, aggregation matrix, per-level
//!   membership matrices and labels
//! - [`HealthCheck`]: structural validation of the result
//!
//! # Example
//!
//! ```rust,ignore
//! use hails::hierarchy::{HierarchyAggregator, HierarchyTable};
//!
//! let table = HierarchyTable::from_records(
//!     &["Country", "Region"],
//!     vec![
//!         (vec!["X", "A"], vec![1.0, 2.0]),
//!         (vec!["X", "B"], vec![3.0, 4.0]),
//!     ],
//! )?;
//! let agg = HierarchyAggregator::new(["Country", "Region"]).aggregate(&table)?;
//! assert_eq!(agg.total_series(), 3);
//! ```

mod aggregate;
mod table;
mod validate;

pub use aggregate::{AggregatedHierarchy, GroupOrder, HierarchyAggregator, Level};
pub use table::HierarchyTable;
pub use validate::{
    validate_membership, validate_summation, HealthCheck, HealthReport, Severity,
    ValidationIssue, ValidationReport, RECONSTRUCTION_TOLERANCE,
};
