//! In-memory request executor
//!
//! `MemoryServer` owns the tables; each client gets a `ServerConnection` that
//! remembers which ids it opened, exactly as a real server scopes open
//! indexes to one socket.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::RwLock;

use crate::error::{HsError, Result};
use crate::index::IndexHandle;
use crate::operation::{ModifyOp, Operation};
use crate::protocol::{decode_request, encode_response, split_line, Field, Request, Row, WireResponse};

use super::{
    Table, ERR_DUP_KEY, ERR_FIELD, ERR_KPNUM, ERR_MODOP, ERR_OPEN_TABLE, ERR_OP, ERR_STMTNUM,
};

/// Code for failures tied to the data (missing table, duplicate key)
const CODE_DATA: i32 = 1;

/// Code for malformed or out-of-context requests
const CODE_REQUEST: i32 = 2;

type TableKey = (String, String);

/// Shared in-memory database; cloning shares the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    tables: Arc<RwLock<HashMap<TableKey, Table>>>,
}

impl MemoryServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a table with a `PRIMARY` index over `primary_key`
    pub fn create_table<S: AsRef<str>>(
        &self,
        database: &str,
        table: &str,
        columns: &[S],
        primary_key: &[S],
    ) -> Result<()> {
        let created = Table::new(columns, primary_key)?;
        self.tables
            .write()
            .insert((database.to_string(), table.to_string()), created);
        Ok(())
    }

    /// Add a secondary index to an existing table
    pub fn create_index<S: AsRef<str>>(
        &self,
        database: &str,
        table: &str,
        index_name: &str,
        columns: &[S],
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let target = tables
            .get_mut(&(database.to_string(), table.to_string()))
            .ok_or_else(|| HsError::InvalidArgument(format!("unknown table {}.{}", database, table)))?;
        target.add_index(index_name, columns)
    }

    /// Number of rows in a table, `None` if it does not exist
    pub fn row_count(&self, database: &str, table: &str) -> Option<usize> {
        self.tables
            .read()
            .get(&(database.to_string(), table.to_string()))
            .map(Table::len)
    }

    /// Start a new connection scope
    pub fn connect(&self) -> ServerConnection {
        ServerConnection {
            server: self.clone(),
            open: HashMap::new(),
        }
    }
}

/// An index opened on one connection
#[derive(Debug, Clone)]
struct OpenedIndex {
    table: TableKey,
    index: Vec<usize>,
    fields: Vec<usize>,
}

/// Per-connection request handler
#[derive(Debug)]
pub struct ServerConnection {
    server: MemoryServer,
    open: HashMap<u32, OpenedIndex>,
}

impl ServerConnection {
    /// Serve every complete request line in `input`, appending one response
    /// line per request to `output`; returns how many were served
    pub fn serve(&mut self, input: &mut BytesMut, output: &mut BytesMut) -> usize {
        let mut served = 0;
        while let Some(line) = split_line(input) {
            let response = self.handle_line(&line);
            encode_response(output, &response);
            served += 1;
        }
        served
    }

    /// Serve one request line (LF stripped)
    pub fn handle_line(&mut self, line: &[u8]) -> WireResponse {
        match decode_request(line) {
            Ok(request) => self.handle(request),
            Err(HsError::Codec(message)) => WireResponse::error(CODE_REQUEST, &message),
            Err(e) => WireResponse::error(CODE_REQUEST, &e.to_string()),
        }
    }

    /// Serve one decoded request
    pub fn handle(&mut self, request: Request) -> WireResponse {
        match request {
            Request::OpenIndex(handle) => self.open_index(handle),
            Request::Execute(operation) => match self.open.get(&operation.index_id()) {
                Some(opened) => {
                    let opened = opened.clone();
                    if operation.is_insert() {
                        self.insert(&opened, operation.keys())
                    } else {
                        self.find_modify(&opened, &operation)
                    }
                }
                None => WireResponse::error(CODE_REQUEST, ERR_STMTNUM),
            },
        }
    }

    fn open_index(&mut self, handle: IndexHandle) -> WireResponse {
        let key = (handle.database.clone(), handle.table.clone());
        let tables = self.server.tables.read();

        let Some(table) = tables.get(&key) else {
            return WireResponse::error(CODE_DATA, ERR_OPEN_TABLE);
        };
        let Some(index) = table.index(&handle.index_name) else {
            return WireResponse::error(CODE_DATA, ERR_OPEN_TABLE);
        };
        let Some(fields) = handle
            .fields
            .iter()
            .map(|f| table.column_position(f))
            .collect::<Option<Vec<_>>>()
        else {
            return WireResponse::error(CODE_DATA, ERR_FIELD);
        };

        let opened = OpenedIndex {
            table: key,
            index: index.to_vec(),
            fields,
        };
        drop(tables);

        self.open.insert(handle.id, opened);
        WireResponse::ack()
    }

    fn insert(&self, opened: &OpenedIndex, values: &[Field]) -> WireResponse {
        if values.len() > opened.fields.len() {
            return WireResponse::error(CODE_REQUEST, ERR_FIELD);
        }

        let mut tables = self.server.tables.write();
        let Some(table) = tables.get_mut(&opened.table) else {
            return WireResponse::error(CODE_DATA, ERR_OPEN_TABLE);
        };

        let mut row: Row = vec![None; table.columns().len()];
        for (&position, value) in opened.fields.iter().zip(values) {
            row[position] = value.clone();
        }

        if table.violates_primary(&row, None) {
            return WireResponse::error(CODE_DATA, ERR_DUP_KEY);
        }

        table.rows_mut().push(row);
        WireResponse::ack()
    }

    fn find_modify(&self, opened: &OpenedIndex, operation: &Operation) -> WireResponse {
        if !matches!(operation.operator(), "=" | ">" | ">=" | "<" | "<=") {
            return WireResponse::error(CODE_REQUEST, ERR_OP);
        }
        if operation.keys().is_empty() || operation.keys().len() > opened.index.len() {
            return WireResponse::error(CODE_REQUEST, ERR_KPNUM);
        }
        if let Some(modifier) = operation.modifier() {
            if modifier.values.len() > opened.fields.len() {
                return WireResponse::error(CODE_REQUEST, ERR_MODOP);
            }
        }

        let mut tables = self.server.tables.write();
        let Some(table) = tables.get_mut(&opened.table) else {
            return WireResponse::error(CODE_DATA, ERR_OPEN_TABLE);
        };

        let limit = match operation.limit() {
            0 => usize::MAX,
            n => n as usize,
        };
        let matched: Vec<usize> = table
            .scan(&opened.index, operation.operator(), operation.keys())
            .into_iter()
            .skip(operation.skip() as usize)
            .take(limit)
            .collect();

        let Some(modifier) = operation.modifier() else {
            let rows: Vec<Row> = matched
                .iter()
                .map(|&i| {
                    opened
                        .fields
                        .iter()
                        .map(|&p| table.rows()[i][p].clone())
                        .collect::<Row>()
                })
                .collect();
            return WireResponse::rows(opened.fields.len(), rows);
        };

        match modifier.op {
            ModifyOp::Delete => {
                let mut doomed = matched;
                doomed.sort_unstable_by(|a, b| b.cmp(a));
                for i in doomed {
                    table.rows_mut().remove(i);
                }
            }
            ModifyOp::Update => {
                for &i in &matched {
                    let mut row = table.rows()[i].clone();
                    for (&p, value) in opened.fields.iter().zip(&modifier.values) {
                        row[p] = value.clone();
                    }
                    if table.violates_primary(&row, Some(i)) {
                        return WireResponse::error(CODE_DATA, ERR_DUP_KEY);
                    }
                    table.rows_mut()[i] = row;
                }
            }
            ModifyOp::Increment | ModifyOp::Decrement => {
                let increment = modifier.op == ModifyOp::Increment;
                let Some(deltas) = modifier.values.iter().map(parse_i64).collect::<Option<Vec<_>>>()
                else {
                    return WireResponse::error(CODE_REQUEST, ERR_MODOP);
                };
                // Computed up front so an overflow leaves every row untouched
                let mut updates = Vec::with_capacity(matched.len());
                for &i in &matched {
                    let row = &table.rows()[i];
                    for (&p, &delta) in opened.fields.iter().zip(&deltas) {
                        let current = parse_i64(&row[p]).unwrap_or(0);
                        let next = if increment {
                            current.checked_add(delta)
                        } else {
                            current.checked_sub(delta)
                        };
                        let Some(next) = next else {
                            return WireResponse::error(CODE_REQUEST, ERR_MODOP);
                        };
                        updates.push((i, p, next));
                    }
                }
                for (i, p, next) in updates {
                    table.rows_mut()[i][p] = Some(next.to_string().into_bytes());
                }
            }
        }

        WireResponse::ack()
    }
}

fn parse_i64(field: &Field) -> Option<i64> {
    let bytes = field.as_deref()?;
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}
