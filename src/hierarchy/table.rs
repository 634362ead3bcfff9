//! Leaf-level input table.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;

/// Categorical attribute columns plus time-indexed numeric values.
///
/// Row `i` of `attributes` and row `i` of `values` describe the same entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HierarchyTable {
    columns: Vec<String>,
    attributes: Vec<Vec<String>>,
    values: Array2<f64>,
}

impl HierarchyTable {
    /// Create a table from attribute rows and a `[rows, time]` value matrix.
    ///
    /// Every attribute row must hold exactly one value per column.
    pub fn new(
        columns: Vec<String>,
        attributes: Vec<Vec<String>>,
        values: Array2<f64>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        if !columns.iter().all(|c| seen.insert(c.as_str())) {
            return Err(Error::InvalidParameter {
                name: "columns",
                message: "column names must be unique",
            });
        }
        if attributes.len() != values.nrows() {
            return Err(Error::DimensionMismatch {
                expected: attributes.len(),
                found: values.nrows(),
            });
        }
        if let Some(row) = attributes.iter().find(|row| row.len() != columns.len()) {
            return Err(Error::ShapeMismatch {
                expected: format!("{} attribute values per row", columns.len()),
                actual: format!("{} attribute values", row.len()),
            });
        }
        Ok(Self {
            columns,
            attributes,
            values,
        })
    }

    /// Create a table from `(attributes, values)` records.
    pub fn from_records<C, A>(columns: &[C], records: Vec<(Vec<A>, Vec<f64>)>) -> Result<Self>
    where
        C: AsRef<str>,
        A: Into<String>,
    {
        let steps = records.first().map_or(0, |(_, v)| v.len());
        let mut attributes = Vec::with_capacity(records.len());
        let mut flat = Vec::with_capacity(records.len() * steps);
        for (attrs, values) in records {
            if values.len() != steps {
                return Err(Error::DimensionMismatch {
                    expected: steps,
                    found: values.len(),
                });
            }
            attributes.push(attrs.into_iter().map(Into::into).collect());
            flat.extend(values);
        }
        let values = Array2::from_shape_vec((attributes.len(), steps), flat)?;
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Self::new(columns, attributes, values)
    }

    /// Number of rows (entities).
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of time steps.
    pub fn n_steps(&self) -> usize {
        self.values.ncols()
    }

    /// Attribute column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of an attribute column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Attribute value at `(row, column)`.
    pub fn attribute(&self, row: usize, column: usize) -> &str {
        &self.attributes[row][column]
    }

    /// All attribute values of one row.
    pub fn attributes(&self, row: usize) -> &[String] {
        &self.attributes[row]
    }

    /// The `[rows, time]` value matrix.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Time series of one row.
    pub fn series(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }
}
