//! Serializable operation specs
//!
//! JSON shape used by batch files:
//!
//! ```text
//! [
//!   {"index_id": 1, "op": "=", "keys": ["a"], "limit": 1},
//!   {"index_id": 1, "op": "=", "keys": ["a"], "modifier": {"op": "U", "values": ["a", "2"]}},
//!   {"index_id": 1, "op": "+", "keys": ["b", null]}
//! ]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HsError, Result};
use crate::protocol::Field;

use super::{Operation, OperationBuilder};

/// Modifier part of an [`OperationSpec`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierSpec {
    pub op: String,

    #[serde(default)]
    pub values: Vec<Option<String>>,
}

/// Loosely-typed operation, as read from a file or the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub index_id: i32,

    pub op: String,

    #[serde(default)]
    pub keys: Vec<Option<String>>,

    #[serde(default)]
    pub limit: u32,

    #[serde(default)]
    pub skip: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ModifierSpec>,
}

fn to_fields(values: Vec<Option<String>>) -> Vec<Field> {
    values.into_iter().map(|v| v.map(String::into_bytes)).collect()
}

impl TryFrom<OperationSpec> for Operation {
    type Error = HsError;

    fn try_from(spec: OperationSpec) -> Result<Self> {
        let mut builder = OperationBuilder::generic(spec.index_id, spec.op, to_fields(spec.keys))
            .limit(spec.limit)
            .skip(spec.skip);

        if let Some(modifier) = spec.modifier {
            builder = builder.modifier(modifier.op, to_fields(modifier.values));
        }

        builder.build()
    }
}

/// Parse a JSON array of specs; every entry is validated before any is returned
pub fn parse_batch(json: &str) -> Result<Vec<Operation>> {
    let specs: Vec<OperationSpec> = serde_json::from_str(json)
        .map_err(|e| HsError::InvalidArgument(format!("batch is not valid JSON: {}", e)))?;

    specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| {
            Operation::try_from(spec).map_err(|e| match e {
                HsError::InvalidArgument(msg) => {
                    HsError::InvalidArgument(format!("operation {}: {}", i, msg))
                }
                other => other,
            })
        })
        .collect()
}

/// Read and parse a batch file
pub fn load_batch(path: &Path) -> Result<Vec<Operation>> {
    let json = fs::read_to_string(path)?;
    parse_batch(&json)
}
