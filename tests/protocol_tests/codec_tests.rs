//! Codec Tests
//!
//! Tests for request and response line encoding/decoding.

use std::io::Cursor;

use bytes::BytesMut;
use hsclient::index::IndexHandle;
use hsclient::operation::OperationBuilder;
use hsclient::protocol::{
    decode_field, decode_request, decode_response, encode_execute, encode_field,
    encode_open_index, encode_request, encode_response, fields, read_line, write_line, Request,
    WireResponse,
};
use hsclient::HsError;

// =============================================================================
// Helper Functions
// =============================================================================

fn encoded_execute(op: &hsclient::Operation) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_execute(&mut buf, op);
    buf.to_vec()
}

fn encoded_field(field: &hsclient::Field) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_field(&mut buf, field);
    buf.to_vec()
}

// =============================================================================
// Field Encoding Tests
// =============================================================================

#[test]
fn test_null_is_single_zero_byte() {
    assert_eq!(encoded_field(&None), vec![0x00]);
    assert_eq!(decode_field(&[0x00]), None);
}

#[test]
fn test_empty_value_is_distinct_from_null() {
    assert!(encoded_field(&Some(Vec::new())).is_empty());
    assert_eq!(decode_field(b""), Some(Vec::new()));
}

#[test]
fn test_control_bytes_are_escaped() {
    let value = Some(vec![b'a', b'\t', b'\n', 0x00, 0x0f, 0x10, b'z']);
    let encoded = encoded_field(&value);

    assert_eq!(
        encoded,
        vec![b'a', 0x01, 0x49, 0x01, 0x4a, 0x01, 0x40, 0x01, 0x4f, 0x10, b'z']
    );
    assert!(!encoded.contains(&b'\t'));
    assert!(!encoded.contains(&b'\n'));
    assert_eq!(decode_field(&encoded), value);
}

#[test]
fn test_binary_values_survive() {
    let value: Vec<u8> = (0u8..=255).collect();
    let encoded = encoded_field(&Some(value.clone()));
    assert_eq!(decode_field(&encoded), Some(value));
}

// =============================================================================
// Request Encoding Tests
// =============================================================================

#[test]
fn test_encode_open_index() {
    let handle = IndexHandle::new(1, "db", "t", "PRIMARY", &["k", "v"]).unwrap();
    let mut buf = BytesMut::new();
    encode_open_index(&mut buf, &handle);

    assert_eq!(&buf[..], b"P\t1\tdb\tt\tPRIMARY\tk,v\n");
}

#[test]
fn test_encode_find_without_limit() {
    let op = OperationBuilder::find(1, "=", fields(["a"])).build().unwrap();
    assert_eq!(encoded_execute(&op), b"1\t=\t1\ta\n");
}

#[test]
fn test_encode_find_with_limit_and_skip() {
    let op = OperationBuilder::find(2, ">=", fields(["a", "b"]))
        .limit(10)
        .skip(5)
        .build()
        .unwrap();
    assert_eq!(encoded_execute(&op), b"2\t>=\t2\ta\tb\t10\t5\n");
}

#[test]
fn test_encode_modifier_forces_limit_and_skip() {
    let op = OperationBuilder::delete(1, "=", fields(["a"])).build().unwrap();
    assert_eq!(encoded_execute(&op), b"1\t=\t1\ta\t0\t0\tD\n");

    let op = OperationBuilder::update(1, "=", fields(["a"]), fields(["a", "2"]))
        .limit(1)
        .build()
        .unwrap();
    assert_eq!(encoded_execute(&op), b"1\t=\t1\ta\t1\t0\tU\ta\t2\n");
}

#[test]
fn test_encode_insert() {
    let op = OperationBuilder::insert(1, vec![Some(b"a".to_vec()), None]).build().unwrap();
    assert_eq!(encoded_execute(&op), b"1\t+\t2\ta\t\x00\n");
}

#[test]
fn test_encode_request_dispatches() {
    let handle = IndexHandle::new(3, "db", "t", "PRIMARY", &["k"]).unwrap();
    let mut buf = BytesMut::new();
    encode_request(&mut buf, &Request::from(handle.clone()));

    let mut expected = BytesMut::new();
    encode_open_index(&mut expected, &handle);
    assert_eq!(buf, expected);
}

// =============================================================================
// Request Decoding Tests
// =============================================================================

#[test]
fn test_decode_open_index() {
    let request = decode_request(b"P\t7\tdb\tt\tidx\ta,b,c").unwrap();
    match request {
        Request::OpenIndex(handle) => {
            assert_eq!(handle.id, 7);
            assert_eq!(handle.database, "db");
            assert_eq!(handle.table, "t");
            assert_eq!(handle.index_name, "idx");
            assert_eq!(handle.fields, vec!["a", "b", "c"]);
        }
        _ => panic!("Expected open index request"),
    }
}

#[test]
fn test_decode_execute_matches_encoder() {
    let op = OperationBuilder::update(4, "<=", vec![None, Some(b"x\ty".to_vec())], fields(["1"]))
        .limit(3)
        .skip(1)
        .build()
        .unwrap();
    let mut line = encoded_execute(&op);
    line.pop();

    match decode_request(&line).unwrap() {
        Request::Execute(decoded) => assert_eq!(decoded, op),
        _ => panic!("Expected execute request"),
    }
}

#[test]
fn test_decode_execute_rejects_short_key_list() {
    let err = decode_request(b"1\t=\t3\ta").unwrap_err();
    assert!(matches!(err, HsError::Codec(_)));
}

#[test]
fn test_decode_execute_rejects_overflowing_key_count() {
    let err = decode_request(b"1\t=\t18446744073709551615").unwrap_err();
    assert!(matches!(err, HsError::Codec(_)));

    let err = decode_request(b"1\t=\t18446744073709551613\ta\tb").unwrap_err();
    assert!(matches!(err, HsError::Codec(_)));
}

#[test]
fn test_decode_execute_rejects_unknown_modifier() {
    let err = decode_request(b"1\t=\t1\ta\t1\t0\tX\tv").unwrap_err();
    match err {
        HsError::Codec(message) => assert_eq!(message, "modop"),
        other => panic!("Expected codec error, got {:?}", other),
    }
}

#[test]
fn test_decode_empty_request_fails() {
    assert!(decode_request(b"").is_err());
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_decode_success_response() {
    let response = decode_response(b"0\t2\ta\t1\tb\t\x00").unwrap();
    assert_eq!(response.code, 0);
    assert_eq!(response.field_count, 2);
    assert_eq!(
        response.values,
        vec![Some(b"a".to_vec()), Some(b"1".to_vec()), Some(b"b".to_vec()), None]
    );
}

#[test]
fn test_decode_error_response() {
    let response = decode_response(b"2\t1\tstmtnum").unwrap();
    assert_eq!(response.code, 2);
    assert_eq!(response.message(), "stmtnum");
}

#[test]
fn test_decode_write_acknowledgement() {
    let response = decode_response(b"0\t1").unwrap();
    assert_eq!(response, WireResponse::ack());
}

#[test]
fn test_decode_malformed_response() {
    assert!(decode_response(b"").is_err());
    assert!(decode_response(b"0").is_err());
    assert!(decode_response(b"x\t1").is_err());
}

#[test]
fn test_encode_response_rows() {
    let response = WireResponse::rows(2, vec![fields(["a", "1"]), vec![None, Some(Vec::new())]]);
    let mut buf = BytesMut::new();
    encode_response(&mut buf, &response);
    assert_eq!(&buf[..], b"0\t2\ta\t1\t\x00\t\n");
}

// =============================================================================
// Line Framing Tests
// =============================================================================

#[test]
fn test_read_write_line_over_stream() {
    let mut wire = Vec::new();
    write_line(&mut wire, b"0\t1\tx\n").unwrap();
    write_line(&mut wire, b"0\t1\n").unwrap();

    let mut reader = Cursor::new(wire);
    let mut line = Vec::new();

    read_line(&mut reader, &mut line).unwrap();
    assert_eq!(line, b"0\t1\tx");
    read_line(&mut reader, &mut line).unwrap();
    assert_eq!(line, b"0\t1");
}

#[test]
fn test_read_line_eof_is_io_error() {
    let mut reader = Cursor::new(b"0\t1".to_vec());
    let mut line = Vec::new();

    let err = read_line(&mut reader, &mut line).unwrap_err();
    match err {
        HsError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected IO error, got {:?}", other),
    }
}
