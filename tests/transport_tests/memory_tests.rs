//! Tests for MemoryServer and MemoryTransport
//!
//! These tests verify:
//! - Raw request lines are answered one response line each
//! - Server-side rejections carry the expected codes and messages
//! - MemoryTransport bookkeeping and fault injection

use bytes::BytesMut;
use hsclient::index::IndexHandle;
use hsclient::memory::{
    MemoryServer, ServerConnection, ERR_DUP_KEY, ERR_FIELD, ERR_KPNUM, ERR_MODOP, ERR_OP,
};
use hsclient::operation::OperationBuilder;
use hsclient::protocol::{fields, WireResponse};
use hsclient::transport::{MemoryTransport, Transport};
use hsclient::HsError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_connection() -> (MemoryServer, ServerConnection) {
    let server = MemoryServer::new();
    server.create_table("db", "t", &["k", "v"], &["k"]).unwrap();

    let mut conn = server.connect();
    assert_eq!(conn.handle_line(b"P\t1\tdb\tt\tPRIMARY\tk,v"), WireResponse::ack());
    (server, conn)
}

fn rejected(response: &WireResponse) -> (i32, String) {
    assert_ne!(response.code, 0, "expected a rejection, got {:?}", response);
    (response.code, response.message())
}

// =============================================================================
// Raw Line Tests
// =============================================================================

#[test]
fn test_insert_then_find_raw() {
    let (_server, mut conn) = setup_connection();

    assert_eq!(conn.handle_line(b"1\t+\t2\ta\t1"), WireResponse::ack());

    let found = conn.handle_line(b"1\t=\t1\ta\t1\t0");
    assert_eq!(found, WireResponse::rows(2, vec![fields(["a", "1"])]));
}

#[test]
fn test_serve_answers_every_complete_line() {
    let (_server, mut conn) = setup_connection();
    let mut input = BytesMut::from(&b"1\t+\t2\ta\t1\n1\t=\t1\ta\n1\t=\t1"[..]);
    let mut output = BytesMut::new();

    let served = conn.serve(&mut input, &mut output);

    assert_eq!(served, 2);
    assert_eq!(&output[..], b"0\t1\n0\t2\ta\t1\n");
    assert_eq!(&input[..], b"1\t=\t1");
}

#[test]
fn test_malformed_line_is_rejected() {
    let (_server, mut conn) = setup_connection();

    let (code, _) = rejected(&conn.handle_line(b"garbage"));
    assert_eq!(code, 2);

    let (code, message) = rejected(&conn.handle_line(b"1\t=\t1\ta\t0\t0\tQ"));
    assert_eq!(code, 2);
    assert_eq!(message, "modop");

    let (code, _) = rejected(&conn.handle_line(b"1\t=\t18446744073709551615"));
    assert_eq!(code, 2);
}

#[test]
fn test_bad_operator_and_key_count() {
    let (_server, mut conn) = setup_connection();

    let (_, message) = rejected(&conn.handle_line(b"1\t!=\t1\ta"));
    assert_eq!(message, ERR_OP);

    let (_, message) = rejected(&conn.handle_line(b"1\t=\t2\ta\tb"));
    assert_eq!(message, ERR_KPNUM);

    let (_, message) = rejected(&conn.handle_line(b"1\t=\t0"));
    assert_eq!(message, ERR_KPNUM);
}

#[test]
fn test_insert_with_too_many_values() {
    let (_server, mut conn) = setup_connection();

    let (_, message) = rejected(&conn.handle_line(b"1\t+\t3\ta\t1\textra"));
    assert_eq!(message, ERR_FIELD);
}

#[test]
fn test_update_into_duplicate_key() {
    let (server, mut conn) = setup_connection();
    conn.handle_line(b"1\t+\t2\ta\t1");
    conn.handle_line(b"1\t+\t2\tb\t2");

    let (code, message) = rejected(&conn.handle_line(b"1\t=\t1\tb\t1\t0\tU\ta\t9"));
    assert_eq!(code, 1);
    assert_eq!(message, ERR_DUP_KEY);
    assert_eq!(server.row_count("db", "t"), Some(2));
}

#[test]
fn test_update_with_no_values_leaves_row() {
    let (_server, mut conn) = setup_connection();
    conn.handle_line(b"1\t+\t2\ta\t1");

    assert_eq!(conn.handle_line(b"1\t=\t1\ta\t1\t0\tU"), WireResponse::ack());
    let found = conn.handle_line(b"1\t=\t1\ta");
    assert_eq!(found, WireResponse::rows(2, vec![fields(["a", "1"])]));
}

#[test]
fn test_decrement_and_delete_range() {
    let (server, mut conn) = setup_connection();
    assert_eq!(conn.handle_line(b"P\t2\tdb\tt\tPRIMARY\tv"), WireResponse::ack());
    for line in [&b"1\t+\t2\ta\t5"[..], b"1\t+\t2\tb\t7", b"1\t+\t2\tc\t9"] {
        assert_eq!(conn.handle_line(line), WireResponse::ack());
    }

    conn.handle_line(b"2\t>=\t1\tb\t0\t0\t-\t2");
    let found = conn.handle_line(b"1\t>=\t1\ta");
    assert_eq!(
        found,
        WireResponse::rows(2, vec![fields(["a", "5"]), fields(["b", "5"]), fields(["c", "7"])])
    );

    conn.handle_line(b"1\t<\t1\tc\t1\t0\tD");
    assert_eq!(server.row_count("db", "t"), Some(2));
    let found = conn.handle_line(b"1\t>=\t1\ta");
    assert_eq!(found, WireResponse::rows(2, vec![fields(["a", "5"]), fields(["c", "7"])]));
}

#[test]
fn test_increment_overflow_is_rejected() {
    let (_server, mut conn) = setup_connection();
    assert_eq!(conn.handle_line(b"P\t2\tdb\tt\tPRIMARY\tv"), WireResponse::ack());
    assert_eq!(conn.handle_line(b"1\t+\t2\ta\t9223372036854775807"), WireResponse::ack());
    assert_eq!(conn.handle_line(b"1\t+\t2\tb\t-9223372036854775808"), WireResponse::ack());

    let (code, message) = rejected(&conn.handle_line(b"2\t=\t1\ta\t1\t0\t+\t1"));
    assert_eq!(code, 2);
    assert_eq!(message, ERR_MODOP);

    let (_, message) = rejected(&conn.handle_line(b"2\t=\t1\tb\t1\t0\t-\t1"));
    assert_eq!(message, ERR_MODOP);

    let found = conn.handle_line(b"1\t=\t1\ta");
    assert_eq!(found, WireResponse::rows(2, vec![fields(["a", "9223372036854775807"])]));
}

#[test]
fn test_secondary_index_lookup() {
    let server = MemoryServer::new();
    server.create_table("db", "users", &["id", "email"], &["id"]).unwrap();
    server.create_index("db", "users", "by_email", &["email"]).unwrap();

    let mut conn = server.connect();
    conn.handle_line(b"P\t1\tdb\tusers\tPRIMARY\tid,email");
    conn.handle_line(b"P\t2\tdb\tusers\tby_email\tid");
    conn.handle_line(b"1\t+\t2\t1\tx@example.com");
    conn.handle_line(b"1\t+\t2\t2\ty@example.com");

    let found = conn.handle_line(b"2\t=\t1\ty@example.com");
    assert_eq!(found, WireResponse::rows(1, vec![fields(["2"])]));
}

#[test]
fn test_schema_errors() {
    let server = MemoryServer::new();
    assert!(server.create_index("db", "missing", "i", &["a"]).is_err());
    assert!(server.create_table("db", "t", &["a"], &["b"]).is_err());
    assert_eq!(server.row_count("db", "missing"), None);
}

// =============================================================================
// MemoryTransport Tests
// =============================================================================

#[test]
fn test_receive_without_request_is_transport_error() {
    let server = MemoryServer::new();
    let mut transport = MemoryTransport::connect(&server);

    let err = transport.receive_response().unwrap_err();

    assert!(matches!(err, HsError::Transport { code: -1, .. }));
    assert_eq!(transport.last_error_message(), "response_recv: no request sent");
}

#[test]
fn test_counts_requests_and_flushes() {
    let (server, _conn) = setup_connection();
    let mut transport = MemoryTransport::connect(&server);
    let handle = IndexHandle::new(1, "db", "t", "PRIMARY", &["k", "v"]).unwrap();
    let find = OperationBuilder::find(1, "=", fields(["a"])).build().unwrap();

    transport.buffer_open_index(&handle);
    transport.buffer_execute(&find);
    transport.buffer_execute(&find);
    assert!(!transport.is_stable_point());

    transport.flush_send().unwrap();
    assert_eq!(transport.flush_count(), 1);
    assert_eq!(transport.requests_sent(), 3);

    for _ in 0..3 {
        let header = transport.receive_response().unwrap();
        assert_eq!(header.code, 0);
        transport.release_response();
    }
    assert!(transport.is_stable_point());
}

#[test]
fn test_rejection_sets_last_error() {
    let server = MemoryServer::new();
    let mut transport = MemoryTransport::connect(&server);
    let find = OperationBuilder::find(3, "=", fields(["a"])).build().unwrap();

    transport.buffer_execute(&find);
    transport.flush_send().unwrap();
    let header = transport.receive_response().unwrap();

    assert_eq!(header.code, 2);
    assert_eq!(transport.last_error_code(), 2);
    assert_eq!(transport.last_error_message(), "stmtnum");
    assert_eq!(transport.next_row().unwrap(), None);
}

#[test]
fn test_closed_transport_fails_and_reconnects() {
    let server = MemoryServer::new();
    let mut transport = MemoryTransport::connect(&server);
    let find = OperationBuilder::find(1, "=", fields(["a"])).build().unwrap();

    transport.close();
    assert!(!transport.is_connected());

    transport.buffer_execute(&find);
    assert!(transport.flush_send().is_err());
    assert!(transport.is_stable_point());

    transport.reconnect().unwrap();
    assert!(transport.is_connected());
    assert_eq!(transport.last_error_code(), 0);
}
