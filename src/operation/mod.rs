//! Operation Module
//!
//! Canonical operation descriptors and the builder that validates them.
//!
//! ## Responsibilities
//! - Normalize find/insert/update/delete into one generic-execute shape
//! - Reject malformed input before anything reaches the network
//! - Load batches from JSON files for the CLI

mod builder;
mod spec;

pub use builder::OperationBuilder;
pub use spec::{load_batch, parse_batch, ModifierSpec, OperationSpec};

use std::fmt;
use std::str::FromStr;

use crate::error::HsError;
use crate::protocol::Field;

/// Operator used by inserts
pub const INSERT_OPERATOR: &str = "+";

/// Modification applied to the rows a find matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOp {
    /// `U`: overwrite the opened fields
    Update,

    /// `D`: remove the matched rows
    Delete,

    /// `+`: add the values to numeric fields
    Increment,

    /// `-`: subtract the values from numeric fields
    Decrement,
}

impl ModifyOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyOp::Update => "U",
            ModifyOp::Delete => "D",
            ModifyOp::Increment => "+",
            ModifyOp::Decrement => "-",
        }
    }

    /// Whether the modifier carries values
    pub fn takes_values(&self) -> bool {
        !matches!(self, ModifyOp::Delete)
    }
}

impl FromStr for ModifyOp {
    type Err = HsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U" => Ok(ModifyOp::Update),
            "D" => Ok(ModifyOp::Delete),
            "+" => Ok(ModifyOp::Increment),
            "-" => Ok(ModifyOp::Decrement),
            other => Err(HsError::InvalidArgument(format!(
                "unknown modifier op: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ModifyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier part of a find-and-modify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub op: ModifyOp,
    pub values: Vec<Field>,
}

/// A validated generic-execute descriptor; one descriptor is one request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    index_id: u32,
    operator: String,
    keys: Vec<Field>,
    limit: u32,
    skip: u32,
    modifier: Option<Modifier>,
}

impl Operation {
    /// Assemble a descriptor from already-checked parts
    pub(crate) fn from_parts(
        index_id: u32,
        operator: String,
        keys: Vec<Field>,
        limit: u32,
        skip: u32,
        modifier: Option<Modifier>,
    ) -> Self {
        Self {
            index_id,
            operator,
            keys,
            limit,
            skip,
            modifier,
        }
    }

    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn keys(&self) -> &[Field] {
        &self.keys
    }

    /// Row limit; 0 means unbounded
    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u32 {
        self.skip
    }

    pub fn modifier(&self) -> Option<&Modifier> {
        self.modifier.as_ref()
    }

    /// Inserts use the `+` operator with the row values as keys and no modifier
    pub fn is_insert(&self) -> bool {
        self.operator == INSERT_OPERATOR && self.modifier.is_none()
    }
}
