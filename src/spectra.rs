// Spectra-level metadata: one row per spectrum, spectra variables as
// columns. The peak data itself lives with the acquisition backend; the
// container only needs lengths, variable values for join matching, and
// duplicating selection.

use crate::data_table::DataTable;
use crate::error::ExperimentError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const VAR_SCAN_INDEX: &str = "scan_index";
pub const VAR_MS_LEVEL: &str = "ms_level";
pub const VAR_RTIME: &str = "rtime";
pub const VAR_DATA_ORIGIN: &str = "data_origin";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Spectra {
    variables: DataTable,
}

impl Spectra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables(variables: DataTable) -> Self {
        Self { variables }
    }

    /// Minimal spectra collection carrying only data origins, with scan
    /// indices numbered per origin in input order.
    pub fn from_data_origins(origins: Vec<String>) -> Self {
        let mut scan_index: Vec<Value> = Vec::with_capacity(origins.len());
        let mut seen: Vec<(String, usize)> = Vec::new();
        for origin in &origins {
            let count = match seen.iter_mut().find(|(name, _)| name == origin) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    seen.push((origin.clone(), 1));
                    1
                }
            };
            scan_index.push(json!(count));
        }
        let origins: Vec<Value> = origins.into_iter().map(Value::String).collect();
        let variables = DataTable::from_columns(vec![
            (VAR_SCAN_INDEX.to_string(), scan_index),
            (VAR_DATA_ORIGIN.to_string(), origins),
        ])
        .unwrap_or_default();
        Self { variables }
    }

    pub fn len(&self) -> usize {
        self.variables.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &DataTable {
        &self.variables
    }

    pub fn variable_names(&self) -> &[String] {
        self.variables.column_names()
    }

    pub fn get_variable(&self, name: &str) -> Option<&Vec<Value>> {
        self.variables.get_column(name)
    }

    pub fn set_variable(&mut self, name: &str, values: Vec<Value>) -> Result<(), ExperimentError> {
        self.variables.set_column(name, values)
    }

    /// Spectra at the given 1-based indices, in that order, repeats kept.
    pub fn select(&self, indices: &[usize]) -> Result<Self, ExperimentError> {
        Ok(Self {
            variables: self.variables.select_rows(indices)?,
        })
    }

    /// Distinct data origins in first-seen order; empty if the variable is
    /// not recorded.
    pub fn data_origins(&self) -> Vec<String> {
        match self.get_variable(VAR_DATA_ORIGIN) {
            Some(values) => values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .unique()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_origins_scan_numbering() {
        let spectra = Spectra::from_data_origins(vec![
            "a.mzML".to_string(),
            "a.mzML".to_string(),
            "b.mzML".to_string(),
            "a.mzML".to_string(),
        ]);
        assert_eq!(spectra.len(), 4);
        assert_eq!(
            spectra.get_variable(VAR_SCAN_INDEX).unwrap(),
            &vec![json!(1), json!(2), json!(1), json!(3)]
        );
        assert_eq!(spectra.data_origins(), vec!["a.mzML", "b.mzML"]);
    }

    #[test]
    fn test_select_preserves_repeats() {
        let spectra =
            Spectra::from_data_origins(vec!["a.mzML".to_string(), "b.mzML".to_string()]);
        let selected = spectra.select(&[2, 2, 1]).unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(
            selected.get_variable(VAR_DATA_ORIGIN).unwrap(),
            &vec![json!("b.mzML"), json!("b.mzML"), json!("a.mzML")]
        );
    }

    #[test]
    fn test_set_variable_length_check() {
        let mut spectra =
            Spectra::from_data_origins(vec!["a.mzML".to_string(), "b.mzML".to_string()]);
        spectra
            .set_variable(VAR_RTIME, vec![json!(12.5), json!(13.1)])
            .unwrap();
        assert!(spectra.set_variable(VAR_MS_LEVEL, vec![json!(1)]).is_err());
    }
}
