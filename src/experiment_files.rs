// Named lists of experiment file paths (raw data, annotations, method
// files). Each named list is one linkable collection; its elements are the
// paths. File existence is the caller's concern, not checked here.

use crate::error::ExperimentError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentFiles {
    files: HashMap<String, Vec<String>>,
}

impl ExperimentFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the named file list, creating or replacing it.
    pub fn set(&mut self, name: &str, paths: Vec<String>) {
        self.files.insert(name.to_string(), paths);
    }

    pub fn get(&self, name: &str) -> Option<&Vec<String>> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn len_of(&self, name: &str) -> Option<usize> {
        self.files.get(name).map(|paths| paths.len())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// List names in sorted order.
    pub fn names(&self) -> Vec<&String> {
        self.files.keys().sorted().collect()
    }

    /// Elements of the named list at the given 1-based indices, preserving
    /// repeats.
    pub fn select(&self, name: &str, indices: &[usize]) -> Result<Vec<String>, ExperimentError> {
        let paths = self.files.get(name).ok_or_else(|| {
            ExperimentError::UnknownSlot(format!("no experiment file list named '{name}'"))
        })?;
        for &i in indices {
            if i < 1 || i > paths.len() {
                return Err(ExperimentError::OutOfRangeLink(format!(
                    "file index {i} outside 1..={} for list '{name}'",
                    paths.len()
                )));
            }
        }
        Ok(indices.iter().map(|&i| paths[i - 1].clone()).collect())
    }
}
