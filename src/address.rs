// Dotted address strings ("slot" or "slot.field") resolved against the
// closed set of container slots. Only the first dot separates slot from
// field, so field names may themselves contain dots.

use crate::error::ExperimentError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    SampleData,
    ExperimentFiles,
    Spectra,
    Quantification,
    Metadata,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::SampleData => "sample_data",
            SlotKind::ExperimentFiles => "experiment_files",
            SlotKind::Spectra => "spectra",
            SlotKind::Quantification => "quantification",
            SlotKind::Metadata => "metadata",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sample_data" => Some(SlotKind::SampleData),
            "experiment_files" => Some(SlotKind::ExperimentFiles),
            "spectra" => Some(SlotKind::Spectra),
            "quantification" => Some(SlotKind::Quantification),
            "metadata" => Some(SlotKind::Metadata),
            _ => None,
        }
    }

    pub fn all() -> [SlotKind; 5] {
        [
            SlotKind::SampleData,
            SlotKind::ExperimentFiles,
            SlotKind::Spectra,
            SlotKind::Quantification,
            SlotKind::Metadata,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub slot: SlotKind,
    pub field: Option<String>,
}

impl Address {
    pub fn new(slot: SlotKind, field: Option<String>) -> Self {
        Self { slot, field }
    }

    pub fn parse(addr: &str) -> Result<Self, ExperimentError> {
        let addr = addr.trim();
        let (slot_name, field) = match addr.split_once('.') {
            Some((slot_name, rest)) if !rest.is_empty() => (slot_name, Some(rest.to_string())),
            Some((slot_name, _)) => (slot_name, None),
            None => (addr, None),
        };
        let slot = SlotKind::parse(slot_name).ok_or_else(|| {
            let known: Vec<&str> = SlotKind::all().iter().map(|s| s.as_str()).collect();
            ExperimentError::UnknownSlot(format!(
                "'{slot_name}' is not a declared slot (expected one of {})",
                known.join(", ")
            ))
        })?;
        Ok(Self { slot, field })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.slot.as_str(), field),
            None => write!(f, "{}", self.slot.as_str()),
        }
    }
}
