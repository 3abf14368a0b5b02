//! Table implementation
//!
//! Column-ordered rows plus named indexes over column positions.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{HsError, Result};
use crate::protocol::{Field, Row};

use super::PRIMARY_INDEX;

/// One in-memory table
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,

    /// Index name -> column positions, in key order
    indexes: HashMap<String, Vec<usize>>,

    /// Full-width rows, in insertion order
    rows: Vec<Row>,
}

impl Table {
    /// Create a table whose `PRIMARY` index covers `primary_key`
    pub fn new<S: AsRef<str>>(columns: &[S], primary_key: &[S]) -> Result<Self> {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        if columns.is_empty() {
            return Err(HsError::InvalidArgument(
                "a table needs at least one column".to_string(),
            ));
        }

        let mut table = Self {
            columns,
            indexes: HashMap::new(),
            rows: Vec::new(),
        };
        table.add_index(PRIMARY_INDEX, primary_key)?;
        Ok(table)
    }

    /// Add (or replace) a named index
    pub fn add_index<S: AsRef<str>>(&mut self, name: &str, columns: &[S]) -> Result<()> {
        if columns.is_empty() {
            return Err(HsError::InvalidArgument(format!(
                "index {} needs at least one column",
                name
            )));
        }

        let positions = columns
            .iter()
            .map(|c| {
                self.column_position(c.as_ref()).ok_or_else(|| {
                    HsError::InvalidArgument(format!("unknown column: {}", c.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.indexes.insert(name.to_string(), positions);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn index(&self, name: &str) -> Option<&[usize]> {
        self.indexes.get(name).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether another row already holds the primary key of `row`
    pub fn violates_primary(&self, row: &Row, ignore: Option<usize>) -> bool {
        let Some(primary) = self.index(PRIMARY_INDEX) else {
            return false;
        };

        self.rows.iter().enumerate().any(|(i, existing)| {
            Some(i) != ignore && primary.iter().all(|&p| existing[p] == row[p])
        })
    }

    /// Positions of rows matching `op` against `keys` on `index`, ordered the
    /// way the server scans: ascending for `=`, `>`, `>=`; descending for `<`, `<=`
    pub fn scan(&self, index: &[usize], op: &str, keys: &[Field]) -> Vec<usize> {
        let wanted: fn(Ordering) -> bool = match op {
            "=" => |o| o == Ordering::Equal,
            ">" => |o| o == Ordering::Greater,
            ">=" => |o| o != Ordering::Less,
            "<" => |o| o == Ordering::Less,
            "<=" => |o| o != Ordering::Greater,
            _ => return Vec::new(),
        };

        let mut matched: Vec<usize> = (0..self.rows.len())
            .filter(|&i| wanted(compare_prefix(&self.rows[i], index, keys)))
            .collect();

        matched.sort_by(|&a, &b| compare_rows(&self.rows[a], &self.rows[b], index));
        if op.starts_with('<') {
            matched.reverse();
        }
        matched
    }
}

/// Compare the leading index columns of `row` with `keys`
fn compare_prefix(row: &Row, index: &[usize], keys: &[Field]) -> Ordering {
    index
        .iter()
        .zip(keys)
        .map(|(&p, key)| row[p].cmp(key))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn compare_rows(a: &Row, b: &Row, index: &[usize]) -> Ordering {
    index
        .iter()
        .map(|&p| a[p].cmp(&b[p]))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
