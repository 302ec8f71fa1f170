// The experiment container: one sample table, the secondary collections
// (file lists, spectra, quantification, metadata), and the link registry
// relating samples to collection elements. Every mutating operation returns
// a new container; callers may keep prior values.

use crate::address::{Address, SlotKind};
use crate::data_table::DataTable;
use crate::error::ExperimentError;
use crate::experiment_files::ExperimentFiles;
use crate::join::JoinExpr;
use crate::link_matrix::{LinkMatrix, OwnerLookup};
use crate::registry::{LinkEntry, LinkRegistry, SubsetBy};
use crate::spectra::Spectra;
use anyhow::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Content addressed by a slot/field string: a whole table-like slot, one
/// file list, the spectra collection, or a single field's values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ElementValue {
    Table(DataTable),
    FileLists(ExperimentFiles),
    Files(Vec<String>),
    Spectra(Spectra),
    Column(Vec<Value>),
}

/// How a link is specified: explicit index pairs, or a declarative join
/// matching a sample-table field against a collection field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum LinkWith {
    Indices {
        sample_index: Vec<usize>,
        with_index: Vec<usize>,
    },
    Join(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Experiment {
    pub sample_data: DataTable,
    pub experiment_files: ExperimentFiles,
    pub spectra: Spectra,
    pub quantification: DataTable,
    pub metadata: DataTable,
    pub sample_data_links: LinkRegistry,
}

impl Experiment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_data.n_rows()
    }

    /// Builds a container from a delimited sample sheet; each row becomes
    /// one sample.
    pub fn from_sample_sheet(path: &str, delimiter: u8) -> Result<Self> {
        let sample_data = DataTable::from_csv_path(path, delimiter)?;
        Ok(Self {
            sample_data,
            ..Self::default()
        })
    }

    pub fn load_from_path(path: &str) -> Result<Self, ExperimentError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), ExperimentError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Resolves an address for reading. A bare slot returns the whole slot
    /// content; `slot.field` returns the named field. A missing field is
    /// absence (`Ok(None)`); an unknown slot is an error.
    pub fn get_element(&self, addr: &str) -> Result<Option<ElementValue>, ExperimentError> {
        let addr = Address::parse(addr)?;
        let ret = match (addr.slot, &addr.field) {
            (SlotKind::SampleData, None) => Some(ElementValue::Table(self.sample_data.clone())),
            (SlotKind::SampleData, Some(field)) => self
                .sample_data
                .get_column(field)
                .map(|values| ElementValue::Column(values.clone())),
            (SlotKind::ExperimentFiles, None) => {
                Some(ElementValue::FileLists(self.experiment_files.clone()))
            }
            (SlotKind::ExperimentFiles, Some(name)) => self
                .experiment_files
                .get(name)
                .map(|paths| ElementValue::Files(paths.clone())),
            (SlotKind::Spectra, None) => Some(ElementValue::Spectra(self.spectra.clone())),
            (SlotKind::Spectra, Some(var)) => self
                .spectra
                .get_variable(var)
                .map(|values| ElementValue::Column(values.clone())),
            (SlotKind::Quantification, None) => {
                Some(ElementValue::Table(self.quantification.clone()))
            }
            (SlotKind::Quantification, Some(field)) => self
                .quantification
                .get_column(field)
                .map(|values| ElementValue::Column(values.clone())),
            (SlotKind::Metadata, None) => Some(ElementValue::Table(self.metadata.clone())),
            (SlotKind::Metadata, Some(field)) => self
                .metadata
                .get_column(field)
                .map(|values| ElementValue::Column(values.clone())),
        };
        Ok(ret)
    }

    /// Resolves an address for writing and returns the updated container.
    /// Fields are auto-created in slots that support it; a value whose shape
    /// does not fit the destination is rejected.
    pub fn set_element(
        &self,
        addr: &str,
        value: ElementValue,
    ) -> Result<Experiment, ExperimentError> {
        let addr = Address::parse(addr)?;
        let mut ret = self.clone();
        match (addr.slot, &addr.field, value) {
            (SlotKind::SampleData, None, ElementValue::Table(table)) => ret.sample_data = table,
            (SlotKind::SampleData, Some(field), ElementValue::Column(values)) => {
                ret.sample_data.set_column(field, values)?;
            }
            (SlotKind::ExperimentFiles, None, ElementValue::FileLists(files)) => {
                ret.experiment_files = files;
            }
            (SlotKind::ExperimentFiles, Some(name), ElementValue::Files(paths)) => {
                ret.experiment_files.set(name, paths);
            }
            (SlotKind::Spectra, None, ElementValue::Spectra(spectra)) => ret.spectra = spectra,
            (SlotKind::Spectra, Some(var), ElementValue::Column(values)) => {
                ret.spectra.set_variable(var, values)?;
            }
            (SlotKind::Quantification, None, ElementValue::Table(table)) => {
                ret.quantification = table;
            }
            (SlotKind::Quantification, Some(field), ElementValue::Column(values)) => {
                ret.quantification.set_column(field, values)?;
            }
            (SlotKind::Metadata, None, ElementValue::Table(table)) => ret.metadata = table,
            (SlotKind::Metadata, Some(field), ElementValue::Column(values)) => {
                ret.metadata.set_column(field, values)?;
            }
            (slot, field, value) => {
                let addr = Address::new(slot, field.clone());
                return Err(ExperimentError::InvalidValue(format!(
                    "value of kind {} cannot be assigned to '{addr}'",
                    element_kind(&value)
                )));
            }
        }
        Ok(ret)
    }

    /// The values behind an address that names a field, converted to a key
    /// vector for join matching. `Ok(None)` if the field is absent.
    fn field_values(&self, addr: &Address) -> Result<Option<Vec<Value>>, ExperimentError> {
        let element = self.get_element(&addr.to_string())?;
        Ok(match element {
            Some(ElementValue::Column(values)) => Some(values),
            Some(ElementValue::Files(paths)) => {
                Some(paths.into_iter().map(Value::String).collect())
            }
            _ => None,
        })
    }

    /// The length of the linkable collection a target address names.
    fn link_target_len(&self, addr: &Address) -> Result<usize, ExperimentError> {
        match (addr.slot, &addr.field) {
            (SlotKind::SampleData, _) => Err(ExperimentError::InvalidValue(
                "the sample table cannot be linked to itself".to_string(),
            )),
            (SlotKind::ExperimentFiles, Some(name)) => {
                self.experiment_files.len_of(name).ok_or_else(|| {
                    ExperimentError::UnknownSlot(format!(
                        "no experiment file list named '{name}'"
                    ))
                })
            }
            (SlotKind::ExperimentFiles, None) => Err(ExperimentError::InvalidValue(
                "link target must name one file list, e.g. 'experiment_files.mzml'".to_string(),
            )),
            (SlotKind::Spectra, None) => Ok(self.spectra.len()),
            (SlotKind::Quantification, None) => Ok(self.quantification.n_rows()),
            (SlotKind::Metadata, None) => Ok(self.metadata.n_rows()),
            (slot, Some(field)) => Err(ExperimentError::InvalidValue(format!(
                "link target must name the whole collection, not field '{}.{field}'",
                slot.as_str()
            ))),
        }
    }

    /// Records a link between samples and the target collection, replacing
    /// any previous link for that address. An empty result records nothing.
    pub fn add_link(
        &self,
        target: &str,
        with: LinkWith,
        subset_by: Option<SubsetBy>,
    ) -> Result<Experiment, ExperimentError> {
        let target_addr = Address::parse(target)?;
        let target_len = self.link_target_len(&target_addr)?;
        if target_len == 0 {
            return Err(ExperimentError::EmptyTarget(format!(
                "collection '{target_addr}' has no elements to link against"
            )));
        }
        let matrix = match with {
            LinkWith::Indices {
                sample_index,
                with_index,
            } => LinkMatrix::from_columns(&sample_index, &with_index)?,
            LinkWith::Join(expr) => self.resolve_join(&target_addr, &expr)?,
        };
        matrix.validate(self.n_samples(), target_len)?;
        if matrix.is_empty() {
            return Ok(self.clone());
        }
        let mut ret = self.clone();
        ret.sample_data_links.insert(
            &target_addr.to_string(),
            LinkEntry {
                matrix,
                subset_by: subset_by.unwrap_or_default(),
            },
        );
        Ok(ret)
    }

    /// Resolves a join expression against the container into a link matrix
    /// for the given target collection.
    fn resolve_join(
        &self,
        target_addr: &Address,
        expr: &str,
    ) -> Result<LinkMatrix, ExperimentError> {
        let join = JoinExpr::parse(expr)?;
        let (sample_side, collection_side) = join.orient()?;
        let side_matches_target = match target_addr.slot {
            SlotKind::ExperimentFiles => collection_side == target_addr,
            _ => collection_side.slot == target_addr.slot,
        };
        if !side_matches_target {
            return Err(ExperimentError::UnsupportedJoinFormat(format!(
                "join side '{collection_side}' does not belong to link target '{target_addr}'"
            )));
        }
        let from_keys = self.field_values(sample_side)?.ok_or_else(|| {
            ExperimentError::MalformedLink(format!("'{sample_side}' does not resolve to values"))
        })?;
        let to_keys = self.field_values(collection_side)?.ok_or_else(|| {
            ExperimentError::MalformedLink(format!(
                "'{collection_side}' does not resolve to values"
            ))
        })?;
        Ok(LinkMatrix::build(&from_keys, &to_keys))
    }

    /// The elements of a linked collection at the given 1-based indices.
    fn select_collection(
        &self,
        addr: &Address,
        indices: &[usize],
    ) -> Result<ElementValue, ExperimentError> {
        match (addr.slot, &addr.field) {
            (SlotKind::ExperimentFiles, Some(name)) => Ok(ElementValue::Files(
                self.experiment_files.select(name, indices)?,
            )),
            (SlotKind::Spectra, None) => Ok(ElementValue::Spectra(self.spectra.select(indices)?)),
            (SlotKind::Quantification, None) => Ok(ElementValue::Table(
                self.quantification.select_rows(indices)?,
            )),
            (SlotKind::Metadata, None) => {
                Ok(ElementValue::Table(self.metadata.select_rows(indices)?))
            }
            _ => Err(ExperimentError::InvalidValue(format!(
                "'{addr}' is not a linkable collection"
            ))),
        }
    }

    /// Returns a new container holding the samples at `indices`, in that
    /// order. Repeats are legal and duplicate samples. Every linked
    /// collection is re-materialized to stay consistent with the new sample
    /// order; unlinked collections are carried over verbatim.
    pub fn extract_samples(&self, indices: &[usize]) -> Result<Experiment, ExperimentError> {
        let n_samples = self.n_samples();
        for &i in indices {
            if i < 1 || i > n_samples {
                return Err(ExperimentError::OutOfRangeLink(format!(
                    "sample index {i} outside 1..={n_samples}"
                )));
            }
        }
        let mut ret = self.clone();
        ret.sample_data = self.sample_data.select_rows(indices)?;
        for (address, entry) in self.sample_data_links.iter_sorted() {
            let addr = Address::parse(address)?;
            // Matched link rows per new sample position, in link row order
            // within each position.
            let mut selected: Vec<(usize, usize)> = Vec::new();
            for (k, &sample) in indices.iter().enumerate() {
                for element in entry.matrix.elements_for_sample(sample) {
                    selected.push((k + 1, element));
                }
            }
            let (take, new_pairs) = match entry.subset_by {
                SubsetBy::Duplicate => {
                    // One physical copy per matched row; shared elements get
                    // duplicated, unreferenced elements get dropped.
                    let take: Vec<usize> = selected.iter().map(|&(_, e)| e).collect();
                    let pairs: Vec<(usize, usize)> = selected
                        .iter()
                        .enumerate()
                        .map(|(pos, &(k, _))| (k, pos + 1))
                        .collect();
                    (take, pairs)
                }
                SubsetBy::Aligned => {
                    // Each distinct referenced element once, first-seen
                    // order; the matrix is renumbered against that selection.
                    let take: Vec<usize> =
                        selected.iter().map(|&(_, e)| e).unique().collect();
                    let position: HashMap<usize, usize> = take
                        .iter()
                        .enumerate()
                        .map(|(pos, &e)| (e, pos + 1))
                        .collect();
                    let pairs: Vec<(usize, usize)> = selected
                        .iter()
                        .map(|&(k, e)| (k, position[&e]))
                        .collect();
                    (take, pairs)
                }
            };
            let new_value = self.select_collection(&addr, &take)?;
            ret = ret.set_element(address, new_value)?;
            ret.sample_data_links.insert(
                address,
                LinkEntry {
                    matrix: LinkMatrix::from_pairs(new_pairs),
                    subset_by: entry.subset_by,
                },
            );
        }
        Ok(ret)
    }

    /// Positional single-sample extraction; `extract_samples` with one index.
    pub fn extract_sample(&self, index: usize) -> Result<Experiment, ExperimentError> {
        self.extract_samples(&[index])
    }

    /// First-match owner per spectrum, with ambiguity warnings. Without a
    /// recorded spectra link, every spectrum is unmapped.
    pub fn spectra_sample_index(&self) -> OwnerLookup {
        match self.sample_data_links.get(SlotKind::Spectra.as_str()) {
            Some(entry) => entry.matrix.first_owner(self.spectra.len()),
            None => OwnerLookup {
                owners: vec![None; self.spectra.len()],
                warnings: vec!["no link recorded between samples and spectra".to_string()],
            },
        }
    }

    /// All owners per spectrum, as a set per position.
    pub fn spectra_sample_sets(&self) -> Vec<BTreeSet<usize>> {
        match self.sample_data_links.get(SlotKind::Spectra.as_str()) {
            Some(entry) => entry.matrix.all_owners(self.spectra.len()),
            None => vec![BTreeSet::new(); self.spectra.len()],
        }
    }

    /// Spectra element indices linked to the given sample, in link row order.
    pub fn spectra_indices_for_sample(&self, sample: usize) -> Vec<usize> {
        self.sample_data_links
            .get(SlotKind::Spectra.as_str())
            .map(|entry| entry.matrix.elements_for_sample(sample))
            .unwrap_or_default()
    }

    pub fn summary(&self) -> ExperimentSummary {
        let links = self
            .sample_data_links
            .iter_sorted()
            .map(|(address, entry)| {
                let collection_len = Address::parse(address)
                    .and_then(|addr| self.link_target_len(&addr))
                    .unwrap_or(0);
                LinkSummary {
                    address: address.clone(),
                    n_link_rows: entry.matrix.len(),
                    subset_by: entry.subset_by.tag(),
                    collection_len,
                    n_distinct_elements: entry
                        .matrix
                        .pairs()
                        .iter()
                        .map(|&(_, e)| e)
                        .unique()
                        .count(),
                }
            })
            .collect();
        ExperimentSummary {
            n_samples: self.n_samples(),
            sample_fields: self.sample_data.column_names().to_vec(),
            file_lists: self
                .experiment_files
                .names()
                .into_iter()
                .map(|name| FileListSummary {
                    name: name.clone(),
                    n_files: self.experiment_files.len_of(name).unwrap_or(0),
                })
                .collect(),
            n_spectra: self.spectra.len(),
            spectra_data_origins: self.spectra.data_origins(),
            n_quantification_rows: self.quantification.n_rows(),
            n_metadata_rows: self.metadata.n_rows(),
            links,
        }
    }
}

fn element_kind(value: &ElementValue) -> &'static str {
    match value {
        ElementValue::Table(_) => "table",
        ElementValue::FileLists(_) => "file lists",
        ElementValue::Files(_) => "files",
        ElementValue::Spectra(_) => "spectra",
        ElementValue::Column(_) => "column",
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FileListSummary {
    pub name: String,
    pub n_files: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LinkSummary {
    pub address: String,
    pub n_link_rows: usize,
    pub subset_by: u8,
    pub collection_len: usize,
    pub n_distinct_elements: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExperimentSummary {
    pub n_samples: usize,
    pub sample_fields: Vec<String>,
    pub file_lists: Vec<FileListSummary>,
    pub n_spectra: usize,
    pub spectra_data_origins: Vec<String>,
    pub n_quantification_rows: usize,
    pub n_metadata_rows: usize,
    pub links: Vec<LinkSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Two QC samples, their raw files, one shared annotation file, three
    /// spectra (two from QC1, one from QC2), and a row-per-sample
    /// quantification frame.
    fn qc_experiment() -> Experiment {
        let sample_data = DataTable::from_columns(vec![
            ("sample_name".to_string(), vec![json!("QC1"), json!("QC2")]),
            (
                "raw_file".to_string(),
                vec![json!("qc1.mzML"), json!("qc2.mzML")],
            ),
        ])
        .unwrap();
        let mut experiment_files = ExperimentFiles::new();
        experiment_files.set(
            "mzml",
            vec!["qc1.mzML".to_string(), "qc2.mzML".to_string()],
        );
        experiment_files.set("annotations", vec!["compounds.txt".to_string()]);
        let spectra = Spectra::from_data_origins(vec![
            "qc1.mzML".to_string(),
            "qc1.mzML".to_string(),
            "qc2.mzML".to_string(),
        ]);
        let quantification = DataTable::from_columns(vec![
            ("sample_name".to_string(), vec![json!("QC1"), json!("QC2")]),
            ("total_area".to_string(), vec![json!(1200.5), json!(980.0)]),
        ])
        .unwrap();
        Experiment {
            sample_data,
            experiment_files,
            spectra,
            quantification,
            ..Experiment::default()
        }
    }

    fn linked_annotations() -> Experiment {
        qc_experiment()
            .add_link(
                "experiment_files.annotations",
                LinkWith::Indices {
                    sample_index: vec![1, 2],
                    with_index: vec![1, 1],
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_add_link_records_matrix() {
        let exp = linked_annotations();
        let entry = exp
            .sample_data_links
            .get("experiment_files.annotations")
            .unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1), (2, 1)]);
        assert_eq!(entry.subset_by, SubsetBy::Duplicate);
    }

    #[test]
    fn test_add_link_replaces_previous_entry() {
        let exp = linked_annotations()
            .add_link(
                "experiment_files.annotations",
                LinkWith::Indices {
                    sample_index: vec![2],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap();
        let entry = exp
            .sample_data_links
            .get("experiment_files.annotations")
            .unwrap();
        assert_eq!(entry.matrix.pairs(), &[(2, 1)]);
    }

    #[test]
    fn test_add_link_validation_errors() {
        let exp = qc_experiment();
        assert!(matches!(
            exp.add_link(
                "experiment_files.annotations",
                LinkWith::Indices {
                    sample_index: vec![1, 2],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap_err(),
            ExperimentError::MalformedLink(_)
        ));
        assert!(matches!(
            exp.add_link(
                "experiment_files.annotations",
                LinkWith::Indices {
                    sample_index: vec![3],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap_err(),
            ExperimentError::OutOfRangeLink(_)
        ));
        assert!(matches!(
            exp.add_link(
                "experiment_files.annotations",
                LinkWith::Indices {
                    sample_index: vec![1],
                    with_index: vec![2],
                },
                None,
            )
            .unwrap_err(),
            ExperimentError::OutOfRangeLink(_)
        ));
    }

    #[test]
    fn test_add_link_empty_target() {
        let exp = qc_experiment();
        assert!(matches!(
            exp.add_link(
                "metadata",
                LinkWith::Indices {
                    sample_index: vec![1],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap_err(),
            ExperimentError::EmptyTarget(_)
        ));
        assert!(matches!(
            exp.add_link(
                "experiment_files.missing",
                LinkWith::Indices {
                    sample_index: vec![1],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap_err(),
            ExperimentError::UnknownSlot(_)
        ));
    }

    #[test]
    fn test_add_link_by_join() {
        let exp = qc_experiment()
            .add_link(
                "spectra",
                LinkWith::Join("sample_data.raw_file = spectra.data_origin".to_string()),
                None,
            )
            .unwrap();
        let entry = exp.sample_data_links.get("spectra").unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_add_link_join_target_mismatch() {
        let exp = qc_experiment();
        let err = exp
            .add_link(
                "spectra",
                LinkWith::Join("sample_data.raw_file = experiment_files.mzml".to_string()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ExperimentError::UnsupportedJoinFormat(_)));
    }

    #[test]
    fn test_add_link_empty_join_result_records_nothing() {
        let exp = qc_experiment();
        let linked = exp
            .add_link(
                "spectra",
                LinkWith::Join("sample_data.sample_name = spectra.data_origin".to_string()),
                None,
            )
            .unwrap();
        // Sample names never match data origins; no link is recorded.
        assert!(linked.sample_data_links.is_empty());
        assert_eq!(linked, exp);
    }

    #[test]
    fn test_extract_shared_annotation_file() {
        let exp = linked_annotations();

        let one = exp.extract_samples(&[2]).unwrap();
        assert_eq!(one.n_samples(), 1);
        assert_eq!(
            one.experiment_files.get("annotations").unwrap(),
            &vec!["compounds.txt".to_string()]
        );
        let entry = one
            .sample_data_links
            .get("experiment_files.annotations")
            .unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1)]);

        let both = exp.extract_samples(&[2, 1]).unwrap();
        assert_eq!(both.n_samples(), 2);
        assert_eq!(
            both.experiment_files.get("annotations").unwrap(),
            &vec!["compounds.txt".to_string(), "compounds.txt".to_string()]
        );
        let entry = both
            .sample_data_links
            .get("experiment_files.annotations")
            .unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1), (2, 2)]);
    }

    #[test]
    fn test_extract_reorders_one_to_one_link() {
        let exp = qc_experiment()
            .add_link(
                "experiment_files.mzml",
                LinkWith::Indices {
                    sample_index: vec![1, 2],
                    with_index: vec![1, 2],
                },
                None,
            )
            .unwrap();
        let reversed = exp.extract_samples(&[2, 1]).unwrap();
        assert_eq!(
            reversed.sample_data.get_column("sample_name").unwrap(),
            &vec![json!("QC2"), json!("QC1")]
        );
        assert_eq!(
            reversed.experiment_files.get("mzml").unwrap(),
            &vec!["qc2.mzML".to_string(), "qc1.mzML".to_string()]
        );
        let entry = reversed.sample_data_links.get("experiment_files.mzml").unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1), (2, 2)]);
    }

    #[test]
    fn test_extract_identity_permutation() {
        let exp = qc_experiment()
            .add_link(
                "experiment_files.mzml",
                LinkWith::Indices {
                    sample_index: vec![1, 2],
                    with_index: vec![1, 2],
                },
                None,
            )
            .unwrap();
        let same = exp.extract_samples(&[1, 2]).unwrap();
        assert_eq!(same, exp);
    }

    #[test]
    fn test_extract_drops_unreferenced_spectra() {
        let exp = qc_experiment()
            .add_link(
                "spectra",
                LinkWith::Join("sample_data.raw_file = spectra.data_origin".to_string()),
                None,
            )
            .unwrap();
        let qc2 = exp.extract_samples(&[2]).unwrap();
        assert_eq!(qc2.spectra.len(), 1);
        assert_eq!(qc2.spectra.data_origins(), vec!["qc2.mzML"]);
        let entry = qc2.sample_data_links.get("spectra").unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1)]);
    }

    #[test]
    fn test_extract_unlinked_collections_are_invariant() {
        let exp = linked_annotations();
        let subset = exp.extract_samples(&[2, 1, 2]).unwrap();
        // Never linked: spectra, quantification, mzml files.
        assert_eq!(subset.spectra, exp.spectra);
        assert_eq!(subset.quantification, exp.quantification);
        assert_eq!(
            subset.experiment_files.get("mzml"),
            exp.experiment_files.get("mzml")
        );
    }

    #[test]
    fn test_extract_sample_with_no_linked_elements() {
        let exp = qc_experiment()
            .add_link(
                "experiment_files.mzml",
                LinkWith::Indices {
                    sample_index: vec![1],
                    with_index: vec![1],
                },
                None,
            )
            .unwrap();
        let subset = exp.extract_samples(&[2, 1]).unwrap();
        // QC2 has no file; only QC1 (new position 2) contributes one.
        assert_eq!(
            subset.experiment_files.get("mzml").unwrap(),
            &vec!["qc1.mzML".to_string()]
        );
        let entry = subset.sample_data_links.get("experiment_files.mzml").unwrap();
        assert_eq!(entry.matrix.pairs(), &[(2, 1)]);
    }

    #[test]
    fn test_extract_empty_indices() {
        let exp = linked_annotations();
        let empty = exp.extract_samples(&[]).unwrap();
        assert_eq!(empty.n_samples(), 0);
        assert!(
            empty
                .experiment_files
                .get("annotations")
                .unwrap()
                .is_empty()
        );
        let entry = empty
            .sample_data_links
            .get("experiment_files.annotations")
            .unwrap();
        assert!(entry.matrix.is_empty());
    }

    #[test]
    fn test_extract_out_of_range() {
        let exp = qc_experiment();
        assert!(matches!(
            exp.extract_samples(&[0]).unwrap_err(),
            ExperimentError::OutOfRangeLink(_)
        ));
        assert!(matches!(
            exp.extract_samples(&[3]).unwrap_err(),
            ExperimentError::OutOfRangeLink(_)
        ));
    }

    #[test]
    fn test_extract_aligned_quantification() {
        let exp = qc_experiment()
            .add_link(
                "quantification",
                LinkWith::Join(
                    "sample_data.sample_name = quantification.sample_name".to_string(),
                ),
                Some(SubsetBy::Aligned),
            )
            .unwrap();
        let subset = exp.extract_samples(&[2, 1, 2]).unwrap();
        // Rows are selected once per distinct key, not duplicated per sample.
        assert_eq!(subset.n_samples(), 3);
        assert_eq!(subset.quantification.n_rows(), 2);
        assert_eq!(
            subset.quantification.get_column("sample_name").unwrap(),
            &vec![json!("QC2"), json!("QC1")]
        );
        let entry = subset.sample_data_links.get("quantification").unwrap();
        assert_eq!(entry.matrix.pairs(), &[(1, 1), (2, 2), (3, 1)]);
        assert_eq!(entry.subset_by, SubsetBy::Aligned);
    }

    #[test]
    fn test_get_element() {
        let exp = qc_experiment();
        assert!(matches!(
            exp.get_element("sample_data").unwrap(),
            Some(ElementValue::Table(_))
        ));
        assert_eq!(
            exp.get_element("sample_data.sample_name").unwrap(),
            Some(ElementValue::Column(vec![json!("QC1"), json!("QC2")]))
        );
        // Absent field on an existing slot is absence, not an error.
        assert_eq!(exp.get_element("metadata.x").unwrap(), None);
        assert!(matches!(
            exp.get_element("assays.x").unwrap_err(),
            ExperimentError::UnknownSlot(_)
        ));
    }

    #[test]
    fn test_set_element_field_auto_creation() {
        let exp = qc_experiment();
        let updated = exp
            .set_element(
                "sample_data.group",
                ElementValue::Column(vec![json!("a"), json!("b")]),
            )
            .unwrap();
        assert_eq!(
            updated.get_element("sample_data.group").unwrap(),
            Some(ElementValue::Column(vec![json!("a"), json!("b")]))
        );
        // The original container is unchanged.
        assert_eq!(exp.get_element("sample_data.group").unwrap(), None);
    }

    #[test]
    fn test_set_element_errors() {
        let exp = qc_experiment();
        assert!(matches!(
            exp.set_element("assays", ElementValue::Column(vec![]))
                .unwrap_err(),
            ExperimentError::UnknownSlot(_)
        ));
        assert!(matches!(
            exp.set_element("spectra", ElementValue::Files(vec![]))
                .unwrap_err(),
            ExperimentError::InvalidValue(_)
        ));
        assert!(matches!(
            exp.set_element(
                "sample_data.group",
                ElementValue::Column(vec![json!("a")]),
            )
            .unwrap_err(),
            ExperimentError::InvalidValue(_)
        ));
    }

    #[test]
    fn test_spectra_sample_index() {
        let exp = qc_experiment()
            .add_link(
                "spectra",
                LinkWith::Join("sample_data.raw_file = spectra.data_origin".to_string()),
                None,
            )
            .unwrap();
        let lookup = exp.spectra_sample_index();
        assert_eq!(lookup.owners, vec![Some(1), Some(1), Some(2)]);
        assert!(lookup.warnings.is_empty());
        let sets = exp.spectra_sample_sets();
        assert_eq!(sets[0], BTreeSet::from([1]));
        assert_eq!(sets[2], BTreeSet::from([2]));
        assert_eq!(exp.spectra_indices_for_sample(1), vec![1, 2]);
        assert_eq!(exp.spectra_indices_for_sample(2), vec![3]);
    }

    #[test]
    fn test_spectra_sample_index_without_link() {
        let exp = qc_experiment();
        let lookup = exp.spectra_sample_index();
        assert_eq!(lookup.owners, vec![None, None, None]);
        assert_eq!(lookup.warnings.len(), 1);
        assert!(exp.spectra_sample_sets().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_summary() {
        let exp = linked_annotations();
        let summary = exp.summary();
        assert_eq!(summary.n_samples, 2);
        assert_eq!(summary.n_spectra, 3);
        assert_eq!(summary.links.len(), 1);
        let link = &summary.links[0];
        assert_eq!(link.address, "experiment_files.annotations");
        assert_eq!(link.n_link_rows, 2);
        assert_eq!(link.collection_len, 1);
        assert_eq!(link.n_distinct_elements, 1);
        assert_eq!(link.subset_by, 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let exp = linked_annotations();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");
        exp.save_to_path(path.to_str().unwrap()).unwrap();
        let loaded = Experiment::load_from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded, exp);
    }
}
