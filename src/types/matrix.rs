//! Dense, column-named feature matrix

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Row-major `f64` matrix with named columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Empty matrix with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a matrix, checking every row has one value per column
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let mut matrix = Self::new(columns);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::InvalidInput(format!(
                "row has {} values, matrix has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a column; `values` must have one entry per row
    pub fn append_column(&mut self, name: &str, values: &[f64]) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::InvalidInput(format!(
                "column {name} has {} values, matrix has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(*value);
        }
        Ok(())
    }

    /// Reorder columns by name (byte order)
    pub fn sort_columns(&mut self) {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by(|&a, &b| self.columns[a].cmp(&self.columns[b]));

        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at (row, column name)
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_sort_columns_moves_values() {
        let mut matrix = FeatureMatrix::from_rows(
            names(&["transactionamt", "card4_visa", "m1_T"]),
            vec![vec![30.0, 1.0, 0.0], vec![12.5, 0.0, 1.0]],
        )
        .unwrap();

        matrix.sort_columns();

        assert_eq!(matrix.columns(), &names(&["card4_visa", "m1_T", "transactionamt"])[..]);
        assert_eq!(matrix.rows()[0], vec![1.0, 0.0, 30.0]);
        assert_eq!(matrix.value(1, "transactionamt"), Some(12.5));
    }

    #[test]
    fn test_width_is_checked() {
        let mut matrix = FeatureMatrix::new(names(&["a", "b"]));
        assert!(matrix.push_row(vec![1.0]).is_err());
        matrix.push_row(vec![1.0, 2.0]).unwrap();
        assert!(matrix.append_column("c", &[1.0, 2.0]).is_err());
        matrix.append_column("c", &[3.0]).unwrap();
        assert_eq!(matrix.rows()[0], vec![1.0, 2.0, 3.0]);
    }
}
