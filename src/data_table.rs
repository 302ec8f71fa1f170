// Ordered rows of named, heterogeneously typed fields. This is the
// representation behind the sample table, the quantification frame, free-form
// metadata, and the spectra variables.

use crate::error::ExperimentError;
use anyhow::Result;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DataTable {
    n_rows: usize,
    column_order: Vec<String>,
    columns: HashMap<String, Vec<Value>>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from (name, values) pairs. All columns must have the
    /// same length and names must be unique.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, ExperimentError> {
        let mut ret = Self::new();
        for (name, values) in columns {
            ret.set_column(&name, values)?;
        }
        Ok(ret)
    }

    /// Reads a delimited text file with a header row. Every cell is kept as
    /// a string value; typed interpretation is up to the caller.
    pub fn from_csv_path(path: &str, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new().delimiter(delimiter).from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    eprintln!("Bad row in {path}: {e}");
                    continue;
                }
            };
            if record.len() != headers.len() {
                eprintln!(
                    "Bad row in {path}: {} fields, expected {}",
                    record.len(),
                    headers.len()
                );
                continue;
            }
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.push(Value::String(cell.to_string()));
            }
        }
        let table = Self::from_columns(headers.into_iter().zip(columns).collect())?;
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.column_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn get_column(&self, name: &str) -> Option<&Vec<Value>> {
        self.columns.get(name)
    }

    /// Assigns a column, creating it if absent. On a table that already has
    /// rows the value count must match the row count.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), ExperimentError> {
        if self.column_order.is_empty() {
            self.n_rows = values.len();
        } else if values.len() != self.n_rows {
            return Err(ExperimentError::InvalidValue(format!(
                "column '{name}' has {} values but the table has {} rows",
                values.len(),
                self.n_rows
            )));
        }
        if !self.columns.contains_key(name) {
            self.column_order.push(name.to_string());
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Returns a new table containing the rows at the given 1-based indices,
    /// in that order. Repeated indices produce repeated rows.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, ExperimentError> {
        for &i in indices {
            if i < 1 || i > self.n_rows {
                return Err(ExperimentError::OutOfRangeLink(format!(
                    "row index {i} outside 1..={}",
                    self.n_rows
                )));
            }
        }
        let mut ret = Self {
            n_rows: indices.len(),
            column_order: self.column_order.clone(),
            columns: HashMap::new(),
        };
        for (name, values) in &self.columns {
            let selected: Vec<Value> = indices.iter().map(|&i| values[i - 1].clone()).collect();
            ret.columns.insert(name.clone(), selected);
        }
        Ok(ret)
    }

    /// The row at the given 1-based index as (field, value) pairs in column
    /// order, or `None` if out of bounds.
    pub fn row(&self, index: usize) -> Option<Vec<(String, Value)>> {
        if index < 1 || index > self.n_rows {
            return None;
        }
        Some(
            self.column_order
                .iter()
                .map(|name| (name.clone(), self.columns[name][index - 1].clone()))
                .collect(),
        )
    }
}
