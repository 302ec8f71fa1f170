// Declarative join expressions: "<address> = <address>", matching values of
// one sample-table field against one collection field.

use crate::address::{Address, SlotKind};
use crate::error::ExperimentError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinExpr {
    pub left: Address,
    pub right: Address,
}

impl JoinExpr {
    /// Accepts exactly `<address> = <address>` with a single `=` and
    /// arbitrary surrounding whitespace. Both sides must name a field.
    pub fn parse(expr: &str) -> Result<Self, ExperimentError> {
        let mut parts = expr.split('=');
        let (left, right) = match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) => (left.trim(), right.trim()),
            _ => {
                return Err(ExperimentError::UnsupportedJoinFormat(format!(
                    "expected '<address> = <address>', got '{expr}'"
                )));
            }
        };
        if left.is_empty() || right.is_empty() {
            return Err(ExperimentError::UnsupportedJoinFormat(format!(
                "expected '<address> = <address>', got '{expr}'"
            )));
        }
        let left = Address::parse(left)?;
        let right = Address::parse(right)?;
        for side in [&left, &right] {
            if side.field.is_none() {
                return Err(ExperimentError::UnsupportedJoinFormat(format!(
                    "join side '{side}' does not name a field"
                )));
            }
        }
        Ok(Self { left, right })
    }

    /// Splits the join into (sample side, collection side). Exactly one side
    /// must address the sample table.
    pub fn orient(&self) -> Result<(&Address, &Address), ExperimentError> {
        match (
            self.left.slot == SlotKind::SampleData,
            self.right.slot == SlotKind::SampleData,
        ) {
            (true, false) => Ok((&self.left, &self.right)),
            (false, true) => Ok((&self.right, &self.left)),
            (true, true) => Err(ExperimentError::UnsupportedJoinFormat(
                "both join sides address the sample table".to_string(),
            )),
            (false, false) => Err(ExperimentError::UnsupportedJoinFormat(format!(
                "neither side of '{self}' addresses the sample table"
            ))),
        }
    }
}

impl fmt::Display for JoinExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}
