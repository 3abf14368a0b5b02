//! Operation builder
//!
//! One constructor per logical verb; `build()` performs every check.

use crate::error::{HsError, Result};
use crate::protocol::Field;

use super::{Modifier, ModifyOp, Operation, INSERT_OPERATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Find,
    Insert,
    Generic,
}

/// Builder for Operation
///
/// ```
/// use hsclient::operation::OperationBuilder;
/// use hsclient::protocol::fields;
///
/// let op = OperationBuilder::find(1, "=", fields(["a"])).limit(1).build().unwrap();
/// assert_eq!(op.limit(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    verb: Verb,
    index_id: i32,
    operator: String,
    keys: Vec<Field>,
    limit: u32,
    skip: u32,
    modifier: Option<(String, Vec<Field>)>,
}

impl OperationBuilder {
    fn new(verb: Verb, index_id: i32, operator: String, keys: Vec<Field>) -> Self {
        Self {
            verb,
            index_id,
            operator,
            keys,
            limit: 0,
            skip: 0,
            modifier: None,
        }
    }

    /// Plain lookup without a modifier
    pub fn find(index_id: i32, operator: impl Into<String>, keys: Vec<Field>) -> Self {
        Self::new(Verb::Find, index_id, operator.into(), keys)
    }

    /// Overwrite the opened fields of every matched row with `values`
    pub fn update(
        index_id: i32,
        operator: impl Into<String>,
        keys: Vec<Field>,
        values: Vec<Field>,
    ) -> Self {
        let mut builder = Self::new(Verb::Find, index_id, operator.into(), keys);
        builder.modifier = Some((ModifyOp::Update.as_str().to_string(), values));
        builder
    }

    /// Remove every matched row
    pub fn delete(index_id: i32, operator: impl Into<String>, keys: Vec<Field>) -> Self {
        let mut builder = Self::new(Verb::Find, index_id, operator.into(), keys);
        builder.modifier = Some((ModifyOp::Delete.as_str().to_string(), Vec::new()));
        builder
    }

    /// Insert one row; `values` follow the field order of the opened index
    pub fn insert(index_id: i32, values: Vec<Field>) -> Self {
        Self::new(Verb::Insert, index_id, INSERT_OPERATOR.to_string(), values)
    }

    /// Any operator, with an optional modifier set through [`Self::modifier`]
    pub fn generic(index_id: i32, operator: impl Into<String>, keys: Vec<Field>) -> Self {
        Self::new(Verb::Generic, index_id, operator.into(), keys)
    }

    /// Maximum rows to match (0 = unbounded)
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Rows to skip before matching starts
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    /// Attach or replace the modifier, given as its wire string
    pub fn modifier(mut self, op: impl Into<String>, values: Vec<Field>) -> Self {
        self.modifier = Some((op.into(), values));
        self
    }

    /// Validate and produce the descriptor
    pub fn build(self) -> Result<Operation> {
        if self.index_id < 0 {
            return Err(HsError::InvalidArgument(format!(
                "index id must be non-negative, got {}",
                self.index_id
            )));
        }

        if self.operator.is_empty() {
            return Err(HsError::InvalidArgument(
                "operator must not be empty".to_string(),
            ));
        }
        if self.operator.bytes().any(|b| b == b'\t' || b == b'\n') {
            return Err(HsError::InvalidArgument(format!(
                "operator contains a separator: {:?}",
                self.operator
            )));
        }

        if self.verb == Verb::Insert && (self.limit != 0 || self.skip != 0 || self.modifier.is_some()) {
            return Err(HsError::InvalidArgument(
                "insert takes neither limit, skip nor a modifier".to_string(),
            ));
        }

        let modifier = match self.modifier {
            Some((op, values)) => {
                let op: ModifyOp = op.parse()?;
                if !op.takes_values() && !values.is_empty() {
                    return Err(HsError::InvalidArgument(format!(
                        "modifier {} takes no values, got {}",
                        op,
                        values.len()
                    )));
                }
                Some(Modifier { op, values })
            }
            None => None,
        };

        Ok(Operation::from_parts(
            self.index_id as u32,
            self.operator,
            self.keys,
            self.limit,
            self.skip,
            modifier,
        ))
    }
}
