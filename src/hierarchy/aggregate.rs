//! Recursive rollup of leaf series into a multi-level hierarchy.
//!
//! # Algorithm
//!
//! Given hierarchy columns ordered coarsest to finest, `[root, c1, ..., ck]`,
//! each column except the root is aggregated away in turn, finest first:
//!
//! 1. group the current rows by every other remaining hierarchy column
//! 2. sum the time series within each group
//! 3. prepend the group sums to the running series matrix
//! 4. grow the aggregation matrix by one block of rows and columns
//!
//! # Aggregation Matrix Layout
//!
//! Levels are stacked coarsest first, leaves last. For a 2-level example
//! with one country over four regions:
//!
//! ```text
//!              X   A1  A2  B1  B2
//!   Country X [0   1   1   1   1 ]
//!   leaf A1   [0   1   0   0   0 ]
//!   leaf A2   [0   0   1   0   0 ]
//!   leaf B1   [0   0   0   1   0 ]
//!   leaf B2   [0   0   0   0   1 ]
//! ```
//!
//! Each rollup allocates a larger matrix whose top block maps the new groups
//! onto the previous row set and whose bottom-right block is the previous
//! matrix. Every aggregated row carries its leaf descendants, so the leaf
//! columns alone reproduce every level:
//!
//! ```text
//! aggregation[level_rows, leaf_cols] · leaf_series == series[level_rows]
//! ```
//!
//! The level-to-direct-children layout, where each group row covers only the
//! rows of the level immediately below it, is available from
//! [`AggregatedHierarchy::parent_matrix`].
//!
//! # Group Order
//!
//! Group rows are enumerated by a fixed rule so that matrix indices are
//! reproducible. [`GroupOrder::Lexicographic`] (the default) sorts the key
//! tuple column by column by byte order; [`GroupOrder::FirstAppearance`]
//! keeps the order in which each key is first seen in the current rows.
//! Both give value-equivalent hierarchies with different row permutations.

use super::table::HierarchyTable;
use crate::error::{Error, Result};
use crate::reconciliation::SummingMatrix;
use faer::Mat;
use ndarray::{concatenate, s, Array2, Array3, ArrayView2, Axis};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use tracing::{debug, trace};

/// Enumeration order of groups within a rollup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupOrder {
    /// Sort group keys lexicographically.
    #[default]
    Lexicographic,
    /// Keep groups in order of first appearance.
    FirstAppearance,
}

/// One level of an aggregated hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    name: String,
    key_columns: Vec<String>,
    labels: Vec<Vec<String>>,
    rows: Range<usize>,
    membership: Option<Array2<f64>>,
}

impl Level {
    /// Finest hierarchy column still identifying this level's rows.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hierarchy columns forming the row key, coarsest first.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Key values of every row.
    pub fn labels(&self) -> &[Vec<String>] {
        &self.labels
    }

    /// Rows of this level in the stacked series and aggregation matrix.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Number of series at this level.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the level has no series.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether this is the leaf level.
    pub fn is_leaf(&self) -> bool {
        self.membership.is_none()
    }

    /// Binary `[len, next_level_len]` matrix assigning each row of the next
    /// finer level to its group here. `None` for the leaf level.
    pub fn membership(&self) -> Option<&Array2<f64>> {
        self.membership.as_ref()
    }
}

/// Series and aggregation matrix for every hierarchy level.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedHierarchy {
    time_series: Array2<f64>,
    aggregation: Array2<f64>,
    levels: Vec<Level>,
}

impl AggregatedHierarchy {
    /// Stacked `[total_series, time]` matrix, coarsest level first.
    pub fn time_series(&self) -> &Array2<f64> {
        &self.time_series
    }

    /// Square `[total_series, total_series]` aggregation matrix.
    pub fn aggregation(&self) -> &Array2<f64> {
        &self.aggregation
    }

    /// Consume into `(time_series, aggregation)`.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>) {
        (self.time_series, self.aggregation)
    }

    /// Levels, coarsest first.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Look up a level by name.
    pub fn level(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.name == name)
    }

    /// The leaf level (always last).
    pub fn leaf_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    /// Total number of series across all levels.
    pub fn total_series(&self) -> usize {
        self.time_series.nrows()
    }

    /// Number of leaf series.
    pub fn n_leaves(&self) -> usize {
        self.leaf_level().len()
    }

    /// Leaf rows of the stacked series.
    pub fn leaf_series(&self) -> ArrayView2<'_, f64> {
        self.time_series.slice(s![self.leaf_level().rows(), ..])
    }

    /// Leaf columns of the aggregation matrix, `[total_series, n_leaves]`.
    pub fn leaf_columns(&self) -> ArrayView2<'_, f64> {
        self.aggregation.slice(s![.., self.leaf_level().rows()])
    }

    /// Structural summing matrix for reconciliation.
    pub fn summing_matrix(&self) -> SummingMatrix {
        let leaf = self.leaf_columns();
        SummingMatrix::new(Mat::from_fn(leaf.nrows(), leaf.ncols(), |i, j| leaf[[i, j]]))
    }

    /// Sum leaf-level values `[n_leaves, k]` up to every level, `[total_series, k]`.
    pub fn aggregate_leaves(&self, leaf_values: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if leaf_values.nrows() != self.n_leaves() {
            return Err(Error::DimensionMismatch {
                expected: self.n_leaves(),
                found: leaf_values.nrows(),
            });
        }
        Ok(self.leaf_columns().dot(&leaf_values))
    }

    /// Level-to-children adjacency.
    ///
    /// Each aggregated row holds its membership over the rows of the level
    /// directly below, and the leaf block is the identity. Unlike
    /// [`AggregatedHierarchy::aggregation`], intermediate levels are not
    /// expanded down to the leaves.
    pub fn parent_matrix(&self) -> Array2<f64> {
        let total = self.total_series();
        let mut parents = Array2::<f64>::zeros((total, total));
        for (i, level) in self.levels.iter().enumerate() {
            match (level.membership(), self.levels.get(i + 1)) {
                (Some(membership), Some(child)) => {
                    parents
                        .slice_mut(s![level.rows(), child.rows()])
                        .assign(membership);
                }
                _ => {
                    for r in level.rows() {
                        parents[[r, r]] = 1.0;
                    }
                }
            }
        }
        parents
    }

    /// The stacked series as a single forecasting window `[1, time, total_series]`.
    pub fn to_window(&self) -> Array3<f64> {
        self.time_series
            .t()
            .insert_axis(Axis(0))
            .as_standard_layout()
            .into_owned()
    }
}

/// Builds an [`AggregatedHierarchy`] from a leaf table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HierarchyAggregator {
    hierarchy: Vec<String>,
    order: GroupOrder,
}

impl HierarchyAggregator {
    /// Create an aggregator for hierarchy columns ordered coarsest to finest.
    ///
    /// The first column names the whole dataset and is never aggregated away.
    pub fn new<I, S>(hierarchy: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hierarchy: hierarchy.into_iter().map(Into::into).collect(),
            order: GroupOrder::default(),
        }
    }

    /// Set the group enumeration order.
    pub fn with_group_order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    /// Hierarchy columns, coarsest first.
    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    /// Group enumeration order.
    pub fn group_order(&self) -> GroupOrder {
        self.order
    }

    /// Roll the leaf table up through every hierarchy level.
    pub fn aggregate(&self, table: &HierarchyTable) -> Result<AggregatedHierarchy> {
        let n_leaves = table.n_rows();
        if n_leaves == 0 {
            return Err(Error::EmptyInput);
        }

        let mut current = self.leaf_table(table)?;
        if current.columns().is_empty() {
            let column = self
                .hierarchy
                .last()
                .cloned()
                .unwrap_or_else(|| "<empty hierarchy>".to_string());
            return Err(Error::MissingHierarchyColumn { column });
        }
        let mut series = current.values().clone();
        let mut aggregation = Array2::<f64>::eye(n_leaves);

        // Finest first; reversed once all rollups are done.
        let mut pending = vec![PendingLevel {
            name: level_name(current.columns()),
            key_columns: current.columns().to_vec(),
            labels: (0..n_leaves).map(|r| current.attributes(r).to_vec()).collect(),
            membership: None,
        }];

        for column in self.hierarchy.iter().skip(1).rev() {
            let Some(dropped) = current.column_index(column) else {
                debug!(column = %column, "column already aggregated away, skipping");
                continue;
            };
            let key_cols: Vec<usize> = (0..current.columns().len())
                .filter(|&i| i != dropped)
                .collect();
            if key_cols.is_empty() {
                return Err(Error::MissingHierarchyColumn {
                    column: column.clone(),
                });
            }

            let groups = group_rows(&current, &key_cols, self.order);
            let membership = membership_matrix(&groups, current.n_rows());

            let mut level_values = Array2::<f64>::zeros((groups.len(), current.n_steps()));
            for (g, group) in groups.iter().enumerate() {
                let mut row = level_values.row_mut(g);
                for &member in &group.members {
                    row += &current.series(member);
                }
                trace!(key = ?group.key, members = group.members.len(), "group");
            }

            // Map the new groups onto the leaf columns through the child rows.
            let child_rows = aggregation.slice(s![..current.n_rows(), ..]);
            let top = membership.dot(&child_rows);
            aggregation = stack_level(&aggregation, &top);
            series = concatenate(Axis(0), &[level_values.view(), series.view()])?;

            let key_columns: Vec<String> =
                key_cols.iter().map(|&i| current.columns()[i].clone()).collect();
            let labels: Vec<Vec<String>> = groups.into_iter().map(|g| g.key).collect();

            debug!(
                column = %column,
                groups = labels.len(),
                total_series = aggregation.nrows(),
                "rolled up hierarchy level"
            );

            current = HierarchyTable::new(key_columns.clone(), labels.clone(), level_values)?;
            pending.push(PendingLevel {
                name: level_name(&key_columns),
                key_columns,
                labels,
                membership: Some(membership),
            });
        }

        let mut levels = Vec::with_capacity(pending.len());
        let mut offset = 0;
        for level in pending.into_iter().rev() {
            let len = level.labels.len();
            levels.push(Level {
                name: level.name,
                key_columns: level.key_columns,
                labels: level.labels,
                rows: offset..offset + len,
                membership: level.membership,
            });
            offset += len;
        }

        Ok(AggregatedHierarchy {
            time_series: series,
            aggregation,
            levels,
        })
    }

    /// Restrict the input to hierarchy columns, in hierarchy order.
    fn leaf_table(&self, table: &HierarchyTable) -> Result<HierarchyTable> {
        let (names, indices): (Vec<String>, Vec<usize>) = self
            .hierarchy
            .iter()
            .filter_map(|h| table.column_index(h).map(|i| (h.clone(), i)))
            .unzip();
        let attributes = (0..table.n_rows())
            .map(|r| indices.iter().map(|&c| table.attribute(r, c).to_string()).collect())
            .collect();
        HierarchyTable::new(names, attributes, table.values().clone())
    }
}

struct PendingLevel {
    name: String,
    key_columns: Vec<String>,
    labels: Vec<Vec<String>>,
    membership: Option<Array2<f64>>,
}

struct Group {
    key: Vec<String>,
    members: Vec<usize>,
}

fn level_name(key_columns: &[String]) -> String {
    key_columns
        .last()
        .cloned()
        .unwrap_or_else(|| "leaf".to_string())
}

fn group_rows(table: &HierarchyTable, key_cols: &[usize], order: GroupOrder) -> Vec<Group> {
    let key_of = |row: usize| {
        key_cols
            .iter()
            .map(|&c| table.attribute(row, c))
            .collect::<Vec<_>>()
    };

    match order {
        GroupOrder::Lexicographic => {
            let mut groups: BTreeMap<Vec<&str>, Vec<usize>> = BTreeMap::new();
            for row in 0..table.n_rows() {
                groups.entry(key_of(row)).or_default().push(row);
            }
            groups
                .into_iter()
                .map(|(key, members)| Group {
                    key: owned(key),
                    members,
                })
                .collect()
        }
        GroupOrder::FirstAppearance => {
            let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
            let mut groups: Vec<(Vec<&str>, Vec<usize>)> = Vec::new();
            for row in 0..table.n_rows() {
                let key = key_of(row);
                match index.get(&key) {
                    Some(&g) => groups[g].1.push(row),
                    None => {
                        index.insert(key.clone(), groups.len());
                        groups.push((key, vec![row]));
                    }
                }
            }
            groups
                .into_iter()
                .map(|(key, members)| Group {
                    key: owned(key),
                    members,
                })
                .collect()
        }
    }
}

fn owned(key: Vec<&str>) -> Vec<String> {
    key.into_iter().map(str::to_string).collect()
}

fn membership_matrix(groups: &[Group], n_children: usize) -> Array2<f64> {
    let mut membership = Array2::<f64>::zeros((groups.len(), n_children));
    for (g, group) in groups.iter().enumerate() {
        for &child in &group.members {
            membership[[g, child]] = 1.0;
        }
    }
    membership
}

/// Place `top` (`[groups, previous_total]`) above `previous`, zero elsewhere.
fn stack_level(previous: &Array2<f64>, top: &Array2<f64>) -> Array2<f64> {
    let groups = top.nrows();
    let total = groups + previous.nrows();
    let mut grown = Array2::<f64>::zeros((total, total));
    grown.slice_mut(s![..groups, groups..]).assign(top);
    grown.slice_mut(s![groups.., groups..]).assign(previous);
    grown
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn two_region_table() -> Result<HierarchyTable> {
        HierarchyTable::from_records(
            &["Country", "Region"],
            vec![
                (vec!["X", "A"], vec![1.0, 2.0]),
                (vec!["X", "A"], vec![3.0, 4.0]),
                (vec!["X", "B"], vec![5.0, 6.0]),
                (vec!["X", "B"], vec![7.0, 8.0]),
            ],
        )
    }

    fn retail_table() -> Result<HierarchyTable> {
        HierarchyTable::from_records(
            &["Country", "Region", "Store"],
            vec![
                (vec!["US", "West", "s3"], vec![1.0, 1.0, 1.0]),
                (vec!["US", "East", "s1"], vec![2.0, 0.0, 1.0]),
                (vec!["US", "West", "s4"], vec![4.0, 2.0, 0.0]),
                (vec!["US", "East", "s2"], vec![8.0, 3.0, 5.0]),
                (vec!["US", "North", "s5"], vec![16.0, 4.0, 2.0]),
            ],
        )
    }

    fn assert_reconstructs(agg: &AggregatedHierarchy) {
        let rebuilt = agg.leaf_columns().dot(&agg.leaf_series());
        for (a, b) in rebuilt.iter().zip(agg.time_series().iter()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn test_country_over_regions() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region"]).aggregate(&two_region_table()?)?;

        assert_eq!(agg.total_series(), 5);
        assert_eq!(agg.time_series().row(0).to_vec(), vec![16.0, 20.0]);

        let country = agg.level("Country").map(|l| l.membership().cloned());
        assert_eq!(country, Some(Some(array![[1.0, 1.0, 1.0, 1.0]])));

        let expected = array![
            [0.0, 1.0, 1.0, 1.0, 1.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0],
        ];
        assert_eq!(agg.aggregation(), &expected);
        assert_reconstructs(&agg);
        Ok(())
    }

    #[test]
    fn test_three_levels_reconstruct_from_leaves() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"])
            .aggregate(&retail_table()?)?;

        let names: Vec<&str> = agg.levels().iter().map(Level::name).collect();
        assert_eq!(names, vec!["Country", "Region", "Store"]);
        assert_eq!(agg.total_series(), 1 + 3 + 5);

        // Lexicographic: East, North, West.
        let region = agg.level("Region").map(|l| l.labels().to_vec());
        assert_eq!(
            region,
            Some(vec![
                vec!["US".to_string(), "East".to_string()],
                vec!["US".to_string(), "North".to_string()],
                vec!["US".to_string(), "West".to_string()],
            ])
        );
        assert_eq!(agg.time_series().row(1).to_vec(), vec![10.0, 3.0, 6.0]);
        assert_eq!(agg.time_series().row(0).to_vec(), vec![31.0, 10.0, 9.0]);

        // Country row reaches leaves directly, not through the region rows.
        assert_eq!(
            agg.aggregation().row(0).to_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
        assert_reconstructs(&agg);
        Ok(())
    }

    #[test]
    fn test_leaf_block_is_identity_and_leaves_are_last() -> Result<()> {
        let table = retail_table()?;
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"]).aggregate(&table)?;
        let leaf = agg.leaf_level();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.rows(), 4..9);
        assert_eq!(agg.leaf_series(), table.values().view());
        let block = agg.aggregation().slice(s![4.., 4..]).to_owned();
        assert_eq!(block, Array2::<f64>::eye(5));
        Ok(())
    }

    #[test]
    fn test_first_appearance_order() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"])
            .with_group_order(GroupOrder::FirstAppearance)
            .aggregate(&retail_table()?)?;
        let regions: Vec<String> = agg
            .level("Region")
            .map(|l| l.labels().iter().map(|k| k[1].clone()).collect())
            .unwrap_or_default();
        assert_eq!(regions, vec!["West", "East", "North"]);
        assert_reconstructs(&agg);
        Ok(())
    }

    #[test]
    fn test_orders_are_value_equivalent() -> Result<()> {
        let table = retail_table()?;
        let hierarchy = ["Country", "Region", "Store"];
        let lex = HierarchyAggregator::new(hierarchy).aggregate(&table)?;
        let seen = HierarchyAggregator::new(hierarchy)
            .with_group_order(GroupOrder::FirstAppearance)
            .aggregate(&table)?;

        let sorted_rows = |agg: &AggregatedHierarchy| {
            let mut rows: Vec<Vec<u64>> = agg
                .time_series()
                .rows()
                .into_iter()
                .map(|r| r.iter().map(|v| v.to_bits()).collect())
                .collect();
            rows.sort();
            rows
        };
        assert_eq!(sorted_rows(&lex), sorted_rows(&seen));
        Ok(())
    }

    #[test]
    fn test_aggregation_is_deterministic() -> Result<()> {
        let table = retail_table()?;
        let aggregator = HierarchyAggregator::new(["Country", "Region", "Store"]);
        assert_eq!(aggregator.aggregate(&table)?, aggregator.aggregate(&table)?);
        Ok(())
    }

    #[test]
    fn test_single_member_group() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"])
            .aggregate(&retail_table()?)?;
        // North holds only s5.
        let region = agg.level("Region").and_then(|l| l.membership().cloned());
        assert_eq!(
            region.map(|m| m.row(1).to_vec()),
            Some(vec![0.0, 0.0, 0.0, 0.0, 1.0])
        );
        Ok(())
    }

    #[test]
    fn test_absent_column_is_skipped() -> Result<()> {
        let table = HierarchyTable::from_records(
            &["Country", "Store"],
            vec![(vec!["US", "s1"], vec![1.0]), (vec!["US", "s2"], vec![2.0])],
        )?;
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"]).aggregate(&table)?;
        assert_eq!(agg.levels().len(), 2);
        assert_eq!(agg.time_series().column(0).to_vec(), vec![3.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_extra_attribute_columns_are_ignored() -> Result<()> {
        let table = HierarchyTable::from_records(
            &["Country", "Colour", "Region"],
            vec![
                (vec!["X", "red", "A"], vec![1.0]),
                (vec!["X", "blue", "B"], vec![2.0]),
            ],
        )?;
        let agg = HierarchyAggregator::new(["Country", "Region"]).aggregate(&table)?;
        assert_eq!(agg.total_series(), 3);
        assert_eq!(agg.leaf_level().key_columns(), ["Country", "Region"]);
        Ok(())
    }

    #[test]
    fn test_no_grouping_columns() -> Result<()> {
        // Root absent: nothing is left to group by once Region is dropped.
        let table = HierarchyTable::from_records(&["Region"], vec![(vec!["A"], vec![1.0])])?;
        let result = HierarchyAggregator::new(["Country", "Region"]).aggregate(&table);
        assert_eq!(
            result.err(),
            Some(Error::MissingHierarchyColumn {
                column: "Region".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn test_no_hierarchy_column_in_table() -> Result<()> {
        let table = HierarchyTable::from_records(
            &["Foo"],
            vec![(vec!["a"], vec![1.0]), (vec!["b"], vec![2.0])],
        )?;
        assert_eq!(
            HierarchyAggregator::new(["Country", "Region"])
                .aggregate(&table)
                .err(),
            Some(Error::MissingHierarchyColumn {
                column: "Region".to_string()
            })
        );
        assert!(matches!(
            HierarchyAggregator::new(Vec::<String>::new()).aggregate(&table),
            Err(Error::MissingHierarchyColumn { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_root_only_hierarchy() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country"]).aggregate(&two_region_table()?)?;
        assert_eq!(agg.total_series(), 4);
        assert_eq!(agg.aggregation(), &Array2::<f64>::eye(4));
        Ok(())
    }

    #[test]
    fn test_empty_table() -> Result<()> {
        let table = HierarchyTable::new(vec!["Country".into()], vec![], Array2::zeros((0, 2)))?;
        assert_eq!(
            HierarchyAggregator::new(["Country"]).aggregate(&table).err(),
            Some(Error::EmptyInput)
        );
        Ok(())
    }

    #[test]
    fn test_parent_matrix_points_at_direct_children() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region", "Store"])
            .aggregate(&retail_table()?)?;
        let parents = agg.parent_matrix();
        // Country -> the three regions, not the stores.
        assert_eq!(
            parents.row(0).to_vec(),
            vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        // East -> s1 (row 1 in leaves) and s2 (row 3).
        assert_eq!(
            parents.row(1).to_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(parents.slice(s![4.., 4..]).to_owned(), Array2::<f64>::eye(5));
        Ok(())
    }

    #[test]
    fn test_aggregate_leaves_and_window() -> Result<()> {
        let agg = HierarchyAggregator::new(["Country", "Region"]).aggregate(&two_region_table()?)?;
        let all = agg.aggregate_leaves(agg.leaf_series())?;
        assert_eq!(&all, agg.time_series());
        assert!(agg.aggregate_leaves(Array2::<f64>::zeros((3, 2)).view()).is_err());

        let window = agg.to_window();
        assert_eq!(window.dim(), (1, 2, 5));
        assert_eq!(window[[0, 1, 0]], 20.0);
        Ok(())
    }

    fn table_strategy() -> impl Strategy<Value = HierarchyTable> {
        (1usize..30, 1usize..6).prop_flat_map(|(rows, steps)| {
            proptest::collection::vec(
                ((0u8..2, 0u8..3, 0u8..4), proptest::collection::vec(-100.0..100.0_f64, steps)),
                rows,
            )
            .prop_map(|records| {
                let records = records
                    .into_iter()
                    .map(|((a, b, c), values)| {
                        (vec![format!("a{a}"), format!("b{b}"), format!("c{c}")], values)
                    })
                    .collect();
                HierarchyTable::from_records(&["A", "B", "C"], records)
            })
            .prop_filter_map("valid table", |t| t.ok())
        })
    }

    proptest! {
        #[test]
        fn leaf_columns_reconstruct_every_level(
            table in table_strategy(),
            first_appearance in any::<bool>(),
        ) {
            let order = if first_appearance {
                GroupOrder::FirstAppearance
            } else {
                GroupOrder::Lexicographic
            };
            let agg = HierarchyAggregator::new(["A", "B", "C"])
                .with_group_order(order)
                .aggregate(&table)
                .unwrap();

            let rebuilt = agg.leaf_columns().dot(&agg.leaf_series());
            for (x, y) in rebuilt.iter().zip(agg.time_series().iter()) {
                prop_assert!((x - y).abs() < 1e-9);
            }
        }

        #[test]
        fn memberships_partition_children(table in table_strategy()) {
            let agg = HierarchyAggregator::new(["A", "B", "C"]).aggregate(&table).unwrap();
            for level in agg.levels() {
                if let Some(m) = level.membership() {
                    for row in m.rows() {
                        prop_assert!(row.sum() >= 1.0);
                    }
                    for col in m.columns() {
                        prop_assert_eq!(col.sum(), 1.0);
                    }
                }
            }
        }
    }
}
