// Two-column table of 1-based (sample index, element index) pairs recording
// the relationship between the sample table and one collection.

use crate::error::ExperimentError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkMatrix {
    pairs: Vec<(usize, usize)>,
}

/// Result of a first-match owner lookup. Ambiguously mapped elements still
/// resolve deterministically to their first link row; the condition is
/// reported through `warnings` instead of aborting.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OwnerLookup {
    pub owners: Vec<Option<usize>>,
    pub warnings: Vec<String>,
}

impl LinkMatrix {
    pub fn from_pairs(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    /// Combines a sample-index column and an element-index column into pairs.
    /// Both sequences must have the same length.
    pub fn from_columns(
        sample_index: &[usize],
        with_index: &[usize],
    ) -> Result<Self, ExperimentError> {
        if sample_index.len() != with_index.len() {
            return Err(ExperimentError::MalformedLink(format!(
                "sample_index has {} entries, with_index has {}",
                sample_index.len(),
                with_index.len()
            )));
        }
        Ok(Self {
            pairs: sample_index
                .iter()
                .copied()
                .zip(with_index.iter().copied())
                .collect(),
        })
    }

    /// All pairs `(i, j)` (1-based) where `from_keys[i] == to_keys[j]`, the
    /// full cross product on ties, ordered by `i` then `j`. Unmatched keys on
    /// either side contribute nothing.
    pub fn build(from_keys: &[Value], to_keys: &[Value]) -> Self {
        let pairs: Vec<(usize, usize)> = from_keys
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, from)| {
                to_keys
                    .iter()
                    .enumerate()
                    .filter_map(move |(j, to)| (from == to).then_some((i + 1, j + 1)))
            })
            .collect();
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Checks that every pair is positive and within
    /// `1..=max_from` / `1..=max_to`.
    pub fn validate(&self, max_from: usize, max_to: usize) -> Result<(), ExperimentError> {
        for &(sample, element) in &self.pairs {
            if sample == 0 || element == 0 {
                return Err(ExperimentError::MalformedLink(format!(
                    "link indices are 1-based, found pair ({sample}, {element})"
                )));
            }
            if sample > max_from {
                return Err(ExperimentError::OutOfRangeLink(format!(
                    "sample index {sample} exceeds sample count {max_from}"
                )));
            }
            if element > max_to {
                return Err(ExperimentError::OutOfRangeLink(format!(
                    "element index {element} exceeds collection length {max_to}"
                )));
            }
        }
        Ok(())
    }

    /// Element indices linked to the given sample, in link row order.
    pub fn elements_for_sample(&self, sample: usize) -> Vec<usize> {
        self.pairs
            .iter()
            .filter(|&&(s, _)| s == sample)
            .map(|&(_, e)| e)
            .collect()
    }

    /// For each element position `1..=n_elements`, the sample index of its
    /// first mapping in row order, or `None` if unmapped. Duplicate element
    /// mappings produce a warning and keep the first match.
    pub fn first_owner(&self, n_elements: usize) -> OwnerLookup {
        let mut owners: Vec<Option<usize>> = vec![None; n_elements];
        let mut duplicates: Vec<usize> = Vec::new();
        for &(sample, element) in &self.pairs {
            if element == 0 || element > n_elements {
                continue;
            }
            match owners[element - 1] {
                None => owners[element - 1] = Some(sample),
                Some(_) => duplicates.push(element),
            }
        }
        let mut warnings = Vec::new();
        if !duplicates.is_empty() {
            duplicates.sort_unstable();
            duplicates.dedup();
            warnings.push(format!(
                "ambiguous mapping: element(s) {duplicates:?} are linked to more than one sample, keeping the first match"
            ));
        }
        OwnerLookup { owners, warnings }
    }

    /// For each element position `1..=n_elements`, every sample index linked
    /// to it, as a (possibly empty) set.
    pub fn all_owners(&self, n_elements: usize) -> Vec<BTreeSet<usize>> {
        let mut owners: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_elements];
        for &(sample, element) in &self.pairs {
            if element == 0 || element > n_elements {
                continue;
            }
            owners[element - 1].insert(sample);
        }
        owners
    }
}
