//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Lines
//! ```text
//! ┌───┬────┬────┬───────┬───────┬───────────┐
//! │ P │ id │ db │ table │ index │ f1,f2,... │ LF
//! └───┴────┴────┴───────┴───────┴───────────┘
//! ┌────┬────┬───────┬─────────┬─────────────────┬───────────────────┐
//! │ id │ op │ nkeys │ k1 ..kn │ [limit skip]    │ [mop v1 .. vm]    │ LF
//! └────┴────┴───────┴─────────┴─────────────────┴───────────────────┘
//! ```
//!
//! ### Response Lines
//! ```text
//! ┌──────┬───────┬─────────────────────┐
//! │ code │ nflds │ v1 .. vk            │ LF
//! └──────┴───────┴─────────────────────┘
//! ```
//!
//! Every cell is separated by TAB. `[limit skip]` is written whenever either
//! is nonzero or a modifier follows.

use std::io::{self, BufRead, Read, Write};
use std::str::FromStr;

use bytes::{BufMut, BytesMut};

use crate::error::{HsError, Result};
use crate::index::IndexHandle;
use crate::operation::{Modifier, ModifyOp, Operation};

use super::{Field, Request, WireResponse};

/// Upper bound for one response or request line (64 MB)
pub const MAX_LINE_SIZE: usize = 64 * 1024 * 1024;

const TAB: u8 = b'\t';
const LF: u8 = b'\n';
const NULL_MARKER: u8 = 0x00;
const ESCAPE_PREFIX: u8 = 0x01;
const ESCAPE_SHIFT: u8 = 0x40;

// =============================================================================
// Field Encoding/Decoding
// =============================================================================

/// Encode one value, escaping bytes below 0x10
pub fn encode_field(buf: &mut BytesMut, field: &Field) {
    match field {
        None => buf.put_u8(NULL_MARKER),
        Some(value) => {
            buf.reserve(value.len());
            for &b in value {
                if b < 0x10 {
                    buf.put_u8(ESCAPE_PREFIX);
                    buf.put_u8(b + ESCAPE_SHIFT);
                } else {
                    buf.put_u8(b);
                }
            }
        }
    }
}

/// Decode one cell; a lone 0x00 is NULL
pub fn decode_field(token: &[u8]) -> Field {
    if token == [NULL_MARKER] {
        return None;
    }

    let mut value = Vec::with_capacity(token.len());
    let mut bytes = token.iter();
    while let Some(&b) = bytes.next() {
        if b == ESCAPE_PREFIX {
            match bytes.next() {
                Some(&next) => value.push(next.wrapping_sub(ESCAPE_SHIFT)),
                None => value.push(b),
            }
        } else {
            value.push(b);
        }
    }
    Some(value)
}

fn put_number<T: ToString>(buf: &mut BytesMut, n: T) {
    buf.extend_from_slice(n.to_string().as_bytes());
}

fn put_text(buf: &mut BytesMut, text: &str) {
    encode_field(buf, &Some(text.as_bytes().to_vec()));
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Append an open-index request line
pub fn encode_open_index(buf: &mut BytesMut, handle: &IndexHandle) {
    buf.extend_from_slice(b"P");
    buf.put_u8(TAB);
    put_number(buf, handle.id);
    for name in [&handle.database, &handle.table, &handle.index_name] {
        buf.put_u8(TAB);
        put_text(buf, name);
    }
    buf.put_u8(TAB);
    put_text(buf, &handle.field_list());
    buf.put_u8(LF);
}

/// Append a generic-execute request line
pub fn encode_execute(buf: &mut BytesMut, operation: &Operation) {
    put_number(buf, operation.index_id());
    buf.put_u8(TAB);
    put_text(buf, operation.operator());
    buf.put_u8(TAB);
    put_number(buf, operation.keys().len());
    for key in operation.keys() {
        buf.put_u8(TAB);
        encode_field(buf, key);
    }

    let modifier = operation.modifier();
    if operation.limit() != 0 || operation.skip() != 0 || modifier.is_some() {
        buf.put_u8(TAB);
        put_number(buf, operation.limit());
        buf.put_u8(TAB);
        put_number(buf, operation.skip());
    }

    if let Some(modifier) = modifier {
        buf.put_u8(TAB);
        buf.extend_from_slice(modifier.op.as_str().as_bytes());
        for value in &modifier.values {
            buf.put_u8(TAB);
            encode_field(buf, value);
        }
    }

    buf.put_u8(LF);
}

/// Append any request line
pub fn encode_request(buf: &mut BytesMut, request: &Request) {
    match request {
        Request::OpenIndex(handle) => encode_open_index(buf, handle),
        Request::Execute(operation) => encode_execute(buf, operation),
    }
}

fn text(token: &[u8], what: &str) -> Result<String> {
    let value = decode_field(token)
        .ok_or_else(|| HsError::Codec(format!("{}: unexpected NULL", what)))?;
    String::from_utf8(value).map_err(|_| HsError::Codec(format!("{}: not valid UTF-8", what)))
}

fn number<T: FromStr>(token: &[u8], what: &str) -> Result<T> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            HsError::Codec(format!(
                "{}: expected a number, got {:?}",
                what,
                String::from_utf8_lossy(token)
            ))
        })
}

/// Decode one request line (without its LF)
pub fn decode_request(line: &[u8]) -> Result<Request> {
    let tokens: Vec<&[u8]> = line.split(|&b| b == TAB).collect();

    if tokens[0] == b"P" {
        return decode_open_index(&tokens);
    }

    if tokens.len() < 3 {
        return Err(HsError::Codec(format!(
            "execute request: expected at least 3 cells, got {}",
            tokens.len()
        )));
    }

    let index_id: u32 = number(tokens[0], "index id")?;
    let operator = text(tokens[1], "operator")?;
    let key_count: usize = number(tokens[2], "key count")?;

    let keys_end = match 3usize.checked_add(key_count) {
        Some(end) if end <= tokens.len() => end,
        _ => {
            return Err(HsError::Codec(format!(
                "execute request: expected {} keys, got {}",
                key_count,
                tokens.len() - 3
            )))
        }
    };
    let keys: Vec<Field> = tokens[3..keys_end].iter().map(|t| decode_field(t)).collect();

    let mut rest = &tokens[keys_end..];
    let mut limit = 0;
    let mut skip = 0;
    if rest.len() >= 2 {
        if let (Ok(l), Ok(s)) = (number::<u32>(rest[0], "limit"), number::<u32>(rest[1], "skip")) {
            limit = l;
            skip = s;
            rest = &rest[2..];
        }
    }

    let modifier = match rest.split_first() {
        Some((op, values)) => {
            let op: ModifyOp = text(op, "modifier")?
                .parse()
                .map_err(|_| HsError::Codec("modop".to_string()))?;
            Some(Modifier {
                op,
                values: values.iter().map(|t| decode_field(t)).collect(),
            })
        }
        None => None,
    };

    Ok(Request::Execute(Operation::from_parts(
        index_id, operator, keys, limit, skip, modifier,
    )))
}

fn decode_open_index(tokens: &[&[u8]]) -> Result<Request> {
    if tokens.len() < 6 {
        return Err(HsError::Codec(format!(
            "open index request: expected 6 cells, got {}",
            tokens.len()
        )));
    }

    let fields = text(tokens[5], "field list")?
        .split(',')
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Request::OpenIndex(IndexHandle {
        id: number(tokens[1], "index id")?,
        database: text(tokens[2], "database")?,
        table: text(tokens[3], "table")?,
        index_name: text(tokens[4], "index")?,
        fields,
    }))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Append a response line
pub fn encode_response(buf: &mut BytesMut, response: &WireResponse) {
    put_number(buf, response.code);
    buf.put_u8(TAB);
    put_number(buf, response.field_count);
    for value in &response.values {
        buf.put_u8(TAB);
        encode_field(buf, value);
    }
    buf.put_u8(LF);
}

/// Decode one response line (without its LF)
///
/// Row arity is not checked here; the result decoder owns that rule.
pub fn decode_response(line: &[u8]) -> Result<WireResponse> {
    let mut tokens = line.split(|&b| b == TAB);

    let code = match tokens.next() {
        Some(t) if !t.is_empty() => number(t, "response code")?,
        _ => return Err(HsError::Codec("empty response line".to_string())),
    };
    let field_count = match tokens.next() {
        Some(t) => number(t, "field count")?,
        None => {
            return Err(HsError::Codec(
                "response line: missing field count".to_string(),
            ))
        }
    };

    Ok(WireResponse {
        code,
        field_count,
        values: tokens.map(decode_field).collect(),
    })
}

// =============================================================================
// Buffer and Stream helpers
// =============================================================================

/// Detach the first complete line (LF stripped) from `buf`, if there is one
pub fn split_line(buf: &mut BytesMut) -> Option<BytesMut> {
    let end = buf.iter().position(|&b| b == LF)?;
    let mut line = buf.split_to(end + 1);
    line.truncate(end);
    Some(line)
}

/// Read one line (LF stripped) into `line`
///
/// Blocks until a complete line is received or an error occurs
pub fn read_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> Result<()> {
    line.clear();

    let limit = MAX_LINE_SIZE as u64 + 1;
    let read = reader.by_ref().take(limit).read_until(LF, line)?;
    if read == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    if line.last() != Some(&LF) {
        if line.len() > MAX_LINE_SIZE {
            return Err(HsError::Codec(format!(
                "line too large: more than {} bytes",
                MAX_LINE_SIZE
            )));
        }
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    line.pop();
    Ok(())
}

/// Write pre-encoded lines to a stream and flush
pub fn write_line<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
