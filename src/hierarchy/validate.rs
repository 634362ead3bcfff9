//! Aggregation validation and health checking utilities.
//!
//! Verifies the structural guarantees of an aggregated hierarchy:
//! - the aggregation matrix is square and binary
//! - the leaf block is the identity
//! - every membership matrix assigns each child row to exactly one group
//! - the leaf columns reproduce every level's series from the leaves
//!
//! # Example
//!
//! ```rust,ignore
//! use hails::hierarchy::{HealthCheck, HierarchyAggregator};
//!
//! let agg = HierarchyAggregator::new(["Country", "Region"]).aggregate(&table)?;
//! let report = agg.health_check();
//! if !report.is_healthy() {
//!     for issue in report.validation.issues {
//!         eprintln!("{}", issue);
//!     }
//! }
//! ```

use std::collections::HashMap;

use super::aggregate::AggregatedHierarchy;
use ndarray::{s, ArrayView2};

/// Absolute tolerance when comparing reconstructed sums.
pub const RECONSTRUCTION_TOLERANCE: f64 = 1e-9;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational, not a problem.
    Info,
    /// Something unusual but not necessarily wrong.
    Warning,
    /// A problem that should be fixed.
    Error,
    /// A critical issue that may cause failures.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Optional series row involved.
    pub row: Option<usize>,
    /// Optional additional context.
    pub context: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            row: None,
            context: None,
        }
    }

    /// Attach the series row this issue concerns.
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Add context to this issue.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(row) = self.row {
            write!(f, " (row {})", row)?;
        }
        if let Some(ctx) = &self.context {
            write!(f, " - {}", ctx)?;
        }
        Ok(())
    }
}

/// Collected validation issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Add an info-level issue.
    pub fn info(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Info, message));
    }

    /// Add an error-level issue.
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Error, message));
    }

    /// Add a critical-level issue.
    pub fn critical(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Critical, message));
    }

    /// Check if the report contains no errors or critical issues.
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// Check if there are any issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Get issues of a specific severity or higher.
    pub fn issues_at_level(&self, min_severity: Severity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity >= min_severity)
            .collect()
    }

    /// Count issues by severity.
    pub fn counts(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "Validation passed: no issues found");
        }

        let counts = self.counts();
        write!(f, "Validation report: ")?;

        let parts: Vec<String> = [
            (Severity::Critical, "critical"),
            (Severity::Error, "errors"),
            (Severity::Warning, "warnings"),
            (Severity::Info, "info"),
        ]
        .iter()
        .filter_map(|(sev, name)| counts.get(sev).map(|c| format!("{} {}", c, name)))
        .collect();

        writeln!(f, "{}", parts.join(", "))?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// Health report with hierarchy statistics.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Validation issues.
    pub validation: ValidationReport,
    /// Total number of series.
    pub series_count: usize,
    /// Number of leaf series.
    pub leaf_count: usize,
    /// Number of levels, leaves included.
    pub level_count: usize,
    /// Average number of children per aggregated series.
    pub avg_branching_factor: f64,
}

impl HealthReport {
    /// Check if the hierarchy is healthy (no errors or critical issues).
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl std::fmt::Display for HealthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Hierarchy Health Report")?;
        writeln!(f, "=======================")?;
        writeln!(f, "Series: {} ({} leaves)", self.series_count, self.leaf_count)?;
        writeln!(f, "Levels: {}", self.level_count)?;
        writeln!(f, "Avg branching factor: {:.2}", self.avg_branching_factor)?;
        writeln!(f)?;
        write!(f, "{}", self.validation)
    }
}

/// Trait for types that can be health-checked.
pub trait HealthCheck {
    /// Perform a health check and return a report.
    fn health_check(&self) -> HealthReport;

    /// Quick check: returns true if healthy.
    fn is_healthy(&self) -> bool {
        self.health_check().is_healthy()
    }
}

impl HealthCheck for AggregatedHierarchy {
    fn health_check(&self) -> HealthReport {
        let mut validation = validate_summation(
            self.aggregation().view(),
            self.time_series().view(),
            self.n_leaves(),
        );

        for level in self.levels() {
            let Some(membership) = level.membership() else {
                continue;
            };
            let level_report = validate_membership(membership.view());
            for issue in level_report.issues {
                let context = match &issue.context {
                    Some(ctx) => format!("level '{}': {ctx}", level.name()),
                    None => format!("level '{}'", level.name()),
                };
                let issue = match issue.row {
                    Some(r) => issue.with_row(level.rows().start + r),
                    None => issue,
                };
                validation.add(issue.with_context(context));
            }
        }

        let aggregated: Vec<_> = self.levels().iter().filter(|l| !l.is_leaf()).collect();
        let group_count: usize = aggregated.iter().map(|l| l.len()).sum();
        let child_count: usize = aggregated
            .iter()
            .filter_map(|l| l.membership())
            .map(|m| m.ncols())
            .sum();
        let avg_branching_factor = if group_count == 0 {
            0.0
        } else {
            child_count as f64 / group_count as f64
        };

        HealthReport {
            validation,
            series_count: self.total_series(),
            leaf_count: self.n_leaves(),
            level_count: self.levels().len(),
            avg_branching_factor,
        }
    }
}

/// Validate one rollup's membership matrix.
///
/// Every entry must be 0 or 1, every group must have at least one child, and
/// every child column must belong to exactly one group. Single-member groups
/// are reported as warnings.
pub fn validate_membership(membership: ArrayView2<'_, f64>) -> ValidationReport {
    let mut report = ValidationReport::new();

    if membership.iter().any(|&v| v != 0.0 && v != 1.0) {
        report.error("membership matrix is not binary");
    }
    for (g, row) in membership.rows().into_iter().enumerate() {
        let members = row.sum();
        if members < 1.0 {
            report.add(ValidationIssue::new(Severity::Error, "group has no members").with_row(g));
        } else if members == 1.0 {
            // Pass-through series: identical to its only child.
            report.add(
                ValidationIssue::new(Severity::Warning, "group has a single member").with_row(g),
            );
        }
    }
    for (child, col) in membership.columns().into_iter().enumerate() {
        let owners = col.sum();
        if owners != 1.0 {
            report.add(
                ValidationIssue::new(Severity::Error, "child row not owned by exactly one group")
                    .with_context(format!("child {child} owned {owners} times")),
            );
        }
    }

    report
}

/// Validate a square aggregation matrix against stacked series.
///
/// The last `n_leaves` rows are the leaves; `series` is `[total, time]`.
pub fn validate_summation(
    aggregation: ArrayView2<'_, f64>,
    series: ArrayView2<'_, f64>,
    n_leaves: usize,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let total = aggregation.nrows();

    if aggregation.ncols() != total {
        report.critical(format!(
            "aggregation matrix is not square ({}x{})",
            total,
            aggregation.ncols()
        ));
        return report;
    }
    if series.nrows() != total || n_leaves > total {
        report.critical(format!(
            "{} series rows and {} leaves do not fit a {}x{} matrix",
            series.nrows(),
            n_leaves,
            total,
            total
        ));
        return report;
    }
    if aggregation.iter().any(|&v| v != 0.0 && v != 1.0) {
        report.error("aggregation matrix is not binary");
    }

    let leaf_start = total - n_leaves;
    let leaf_block = aggregation.slice(s![leaf_start.., leaf_start..]);
    for ((i, j), &v) in leaf_block.indexed_iter() {
        let expected = if i == j { 1.0 } else { 0.0 };
        if v != expected {
            report.add(
                ValidationIssue::new(Severity::Error, "leaf block is not the identity")
                    .with_row(leaf_start + i)
                    .with_context(format!("column {}", leaf_start + j)),
            );
        }
    }

    let leaf_cols = aggregation.slice(s![.., leaf_start..]);
    let rebuilt = leaf_cols.dot(&series.slice(s![leaf_start.., ..]));
    for (r, (want, got)) in series.rows().into_iter().zip(rebuilt.rows()).enumerate() {
        let worst = want
            .iter()
            .zip(got.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        if worst > RECONSTRUCTION_TOLERANCE {
            report.add(
                ValidationIssue::new(Severity::Error, "series is not the sum of its leaves")
                    .with_row(r)
                    .with_context(format!("max abs deviation {worst:.3e}")),
            );
        }
    }

    if n_leaves == total {
        report.info("hierarchy has no aggregated levels");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{HierarchyAggregator, HierarchyTable};
    use crate::Result;
    use ndarray::array;

    fn aggregated() -> Result<AggregatedHierarchy> {
        let table = HierarchyTable::from_records(
            &["Country", "Region", "Store"],
            vec![
                (vec!["US", "West", "s1"], vec![1.0, 2.0]),
                (vec!["US", "West", "s2"], vec![3.0, 4.0]),
                (vec!["US", "East", "s3"], vec![5.0, 6.0]),
                (vec!["US", "East", "s4"], vec![7.0, 8.0]),
            ],
        )?;
        HierarchyAggregator::new(["Country", "Region", "Store"]).aggregate(&table)
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_aggregated_hierarchy_is_healthy() -> Result<()> {
        let report = aggregated()?.health_check();
        assert!(report.is_healthy(), "{}", report);
        assert!(report.validation.is_clean());
        assert_eq!(report.series_count, 7);
        assert_eq!(report.leaf_count, 4);
        assert_eq!(report.level_count, 3);
        // 2 regions over 4 stores, 1 country over 2 regions.
        assert!((report.avg_branching_factor - 2.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_single_member_group_is_warning() {
        let membership = array![[1.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let report = validate_membership(membership.view());
        assert!(report.is_healthy());
        let warnings = report.issues_at_level(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, Some(1));
    }

    #[test]
    fn test_health_check_flags_pass_through_region() -> Result<()> {
        let table = HierarchyTable::from_records(
            &["Country", "Region", "Store"],
            vec![
                (vec!["US", "West", "s1"], vec![1.0]),
                (vec!["US", "West", "s2"], vec![3.0]),
                (vec!["US", "East", "s3"], vec![5.0]),
            ],
        )?;
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"]).aggregate(&table)?;
        let report = agg.health_check();
        assert!(report.is_healthy());

        // East is the first region row, right below the country.
        let warnings = report.validation.issues_at_level(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, Some(1));
        assert_eq!(warnings[0].context.as_deref(), Some("level 'Region'"));
        Ok(())
    }

    #[test]
    fn test_membership_double_count() {
        let membership = array![[1.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        let report = validate_membership(membership.view());
        assert!(!report.is_healthy());
        assert_eq!(report.issues_at_level(Severity::Error).len(), 1);
    }

    #[test]
    fn test_membership_empty_group_and_orphan() {
        let membership = array![[1.0, 0.0], [0.0, 0.0]];
        let report = validate_membership(membership.view());
        // Empty group row 1, child 1 unowned.
        assert_eq!(report.counts().get(&Severity::Error), Some(&2));
    }

    #[test]
    fn test_summation_detects_wrong_parent_values() -> Result<()> {
        let agg = aggregated()?;
        let mut series = agg.time_series().clone();
        series[[0, 0]] += 1.0;
        let report = validate_summation(agg.aggregation().view(), series.view(), agg.n_leaves());
        assert!(!report.is_healthy());
        assert_eq!(report.issues[0].row, Some(0));
        Ok(())
    }

    #[test]
    fn test_summation_detects_non_identity_leaves() {
        let aggregation = array![[0.0, 1.0, 1.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]];
        let series = array![[3.0], [1.0], [2.0]];
        let report = validate_summation(aggregation.view(), series.view(), 2);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_non_square_is_critical() {
        let aggregation = ndarray::Array2::<f64>::zeros((2, 3));
        let series = ndarray::Array2::<f64>::zeros((2, 1));
        let report = validate_summation(aggregation.view(), series.view(), 1);
        assert_eq!(report.issues_at_level(Severity::Critical).len(), 1);
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new();
        assert_eq!(report.to_string(), "Validation passed: no issues found");
        report.add(ValidationIssue::new(Severity::Warning, "odd").with_row(3));
        assert!(report.to_string().contains("[WARN] odd (row 3)"));
    }
}
