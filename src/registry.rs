// The link registry: one link matrix per linked collection address, plus the
// policy tag controlling how subsetting treats elements shared by samples.

use crate::error::ExperimentError;
use crate::link_matrix::LinkMatrix;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Subsetting policy for one linked collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsetBy {
    /// Re-materialize the collection by concatenating the elements referenced
    /// per selected sample, duplicating shared elements (tag 1, the default).
    #[default]
    Duplicate,
    /// Select each distinct referenced element once, first-seen order,
    /// for collections whose elements align 1:1 with a sample key (tag 2).
    Aligned,
}

impl SubsetBy {
    pub fn tag(&self) -> u8 {
        match self {
            SubsetBy::Duplicate => 1,
            SubsetBy::Aligned => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SubsetBy::Duplicate),
            2 => Some(SubsetBy::Aligned),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub matrix: LinkMatrix,
    pub subset_by: SubsetBy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRegistry {
    links: HashMap<String, LinkEntry>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a link for an address, replacing any previous entry.
    pub fn insert(&mut self, address: &str, entry: LinkEntry) {
        self.links.insert(address.to_string(), entry);
    }

    pub fn get(&self, address: &str) -> Option<&LinkEntry> {
        self.links.get(address)
    }

    pub fn remove(&mut self, address: &str) -> Option<LinkEntry> {
        self.links.remove(address)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Registered addresses in sorted order.
    pub fn addresses(&self) -> Vec<&String> {
        self.links.keys().sorted().collect()
    }

    /// Entries in address order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&String, &LinkEntry)> {
        self.links.iter().sorted_by(|a, b| a.0.cmp(b.0))
    }

    /// Validates one entry against the current sample count and the length of
    /// the collection it addresses.
    pub fn validate_entry(
        &self,
        address: &str,
        n_samples: usize,
        collection_len: usize,
    ) -> Result<(), ExperimentError> {
        match self.links.get(address) {
            Some(entry) => entry.matrix.validate(n_samples, collection_len),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_previous_entry() {
        let mut registry = LinkRegistry::new();
        registry.insert(
            "spectra",
            LinkEntry {
                matrix: LinkMatrix::from_pairs(vec![(1, 1)]),
                subset_by: SubsetBy::Duplicate,
            },
        );
        registry.insert(
            "spectra",
            LinkEntry {
                matrix: LinkMatrix::from_pairs(vec![(1, 2), (2, 1)]),
                subset_by: SubsetBy::Duplicate,
            },
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("spectra").unwrap().matrix.len(), 2);
    }

    #[test]
    fn test_addresses_sorted() {
        let mut registry = LinkRegistry::new();
        for addr in ["spectra", "experiment_files.annotations", "quantification"] {
            registry.insert(
                addr,
                LinkEntry {
                    matrix: LinkMatrix::from_pairs(vec![(1, 1)]),
                    subset_by: SubsetBy::Duplicate,
                },
            );
        }
        assert_eq!(
            registry.addresses(),
            vec!["experiment_files.annotations", "quantification", "spectra"]
        );
    }

    #[test]
    fn test_subset_by_tags() {
        assert_eq!(SubsetBy::Duplicate.tag(), 1);
        assert_eq!(SubsetBy::Aligned.tag(), 2);
        assert_eq!(SubsetBy::from_tag(1), Some(SubsetBy::Duplicate));
        assert_eq!(SubsetBy::from_tag(2), Some(SubsetBy::Aligned));
        assert_eq!(SubsetBy::from_tag(3), None);
    }

    #[test]
    fn test_validate_entry() {
        let mut registry = LinkRegistry::new();
        registry.insert(
            "quantification",
            LinkEntry {
                matrix: LinkMatrix::from_pairs(vec![(2, 4)]),
                subset_by: SubsetBy::Aligned,
            },
        );
        assert!(registry.validate_entry("quantification", 2, 4).is_ok());
        assert!(registry.validate_entry("quantification", 1, 4).is_err());
        assert!(registry.validate_entry("unlinked", 0, 0).is_ok());
    }
}
