//! Index Module
//!
//! Index handles and the per-connection registry of opened handles.
//!
//! ## Responsibilities
//! - Describe which (database, table, index, fields) an id is bound to
//! - Send the open request on its own and wait for its single response
//! - Keep the caller's bookkeeping; the server stays authoritative

mod registry;

pub use registry::IndexRegistry;

use crate::error::{HsError, Result};

/// An index bound to a caller-chosen id on one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    pub id: u32,
    pub database: String,
    pub table: String,
    pub index_name: String,
    pub fields: Vec<String>,
}

impl IndexHandle {
    /// Validate and build a handle
    pub fn new<S: AsRef<str>>(
        id: i32,
        database: impl Into<String>,
        table: impl Into<String>,
        index_name: impl Into<String>,
        fields: &[S],
    ) -> Result<Self> {
        if id < 0 {
            return Err(HsError::InvalidArgument(format!(
                "index id must be non-negative, got {}",
                id
            )));
        }

        let database = database.into();
        let table = table.into();
        let index_name = index_name.into();

        for (what, name) in [("database", &database), ("table", &table), ("index", &index_name)] {
            check_name(what, name)?;
        }

        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        if fields.is_empty() {
            return Err(HsError::InvalidArgument(
                "at least one field is required".to_string(),
            ));
        }
        for name in &fields {
            check_name("field", name)?;
            if name.contains(',') {
                return Err(HsError::InvalidArgument(format!(
                    "field name contains a comma: {:?}",
                    name
                )));
            }
        }

        Ok(Self {
            id: id as u32,
            database,
            table,
            index_name,
            fields,
        })
    }

    /// Number of values each row of this index carries
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Comma-joined field list as sent on the wire
    pub fn field_list(&self) -> String {
        self.fields.join(",")
    }
}

fn check_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HsError::InvalidArgument(format!("{} name must not be empty", what)));
    }
    if name.bytes().any(|b| b < 0x10) {
        return Err(HsError::InvalidArgument(format!(
            "{} name contains control bytes: {:?}",
            what, name
        )));
    }
    Ok(())
}
