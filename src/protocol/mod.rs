//! Protocol Module
//!
//! Defines the HandlerSocket wire protocol spoken between client and server.
//!
//! ## Protocol Format (text lines)
//!
//! Every request and every response is one line: tokens separated by TAB
//! (0x09), terminated by LF (0x0a).
//!
//! ### Requests
//! ```text
//! P  <id> <db> <table> <index> <f1,f2,...>                     open index
//! <id> <op> <nkeys> <k1> ... <kn> [<limit> <skip>] [<mop> <v1> ... <vm>]
//! ```
//!
//! ### Responses
//! ```text
//! <code> <nflds> <v1> ... <vk>        success, k is a multiple of nflds
//! <code> 1 <message>                  failure
//! ```
//!
//! ### Value Encoding
//! - NULL: the single byte 0x00
//! - bytes 0x00..=0x0f: 0x01 followed by (byte + 0x40)
//! - everything else: literal

mod codec;
mod request;
mod response;

pub use codec::{
    decode_field, decode_request, decode_response, encode_execute, encode_field,
    encode_open_index, encode_request, encode_response, read_line, split_line, write_line,
    MAX_LINE_SIZE,
};
pub use request::Request;
pub use response::{ResponseRecord, WireResponse};

/// One column value. `None` is SQL NULL and is distinct from an empty value.
pub type Field = Option<Vec<u8>>;

/// One result row, ordered like the fields the index was opened with
pub type Row = Vec<Field>;

/// Build a non-null field from anything byte-like
pub fn field(value: impl AsRef<[u8]>) -> Field {
    Some(value.as_ref().to_vec())
}

/// Build a list of non-null fields
pub fn fields<I, S>(values: I) -> Vec<Field>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    values.into_iter().map(field).collect()
}
