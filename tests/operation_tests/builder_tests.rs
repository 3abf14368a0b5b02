//! Tests for OperationBuilder
//!
//! These tests verify:
//! - Each verb normalizes into the generic-execute shape
//! - Invalid input is rejected before any I/O
//! - JSON batch files load into validated operations

use std::io::Write;

use hsclient::operation::{load_batch, parse_batch, ModifyOp, OperationBuilder, OperationSpec};
use hsclient::protocol::fields;
use hsclient::{HsError, Operation};
use tempfile::NamedTempFile;

// =============================================================================
// Helper Functions
// =============================================================================

fn assert_invalid(result: hsclient::Result<Operation>) {
    match result {
        Err(HsError::InvalidArgument(_)) => {}
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

// =============================================================================
// Verb Tests
// =============================================================================

#[test]
fn test_find_shape() {
    let op = OperationBuilder::find(1, "=", fields(["a"]))
        .limit(1)
        .build()
        .unwrap();

    assert_eq!(op.index_id(), 1);
    assert_eq!(op.operator(), "=");
    assert_eq!(op.keys(), &fields(["a"])[..]);
    assert_eq!(op.limit(), 1);
    assert_eq!(op.skip(), 0);
    assert!(op.modifier().is_none());
    assert!(!op.is_insert());
}

#[test]
fn test_insert_uses_plus_operator() {
    let op = OperationBuilder::insert(1, fields(["a", "1"])).build().unwrap();

    assert_eq!(op.operator(), "+");
    assert_eq!(op.keys(), &fields(["a", "1"])[..]);
    assert!(op.modifier().is_none());
    assert!(op.is_insert());
}

#[test]
fn test_update_carries_values() {
    let op = OperationBuilder::update(2, ">", fields(["a"]), fields(["b", "2"]))
        .limit(5)
        .skip(1)
        .build()
        .unwrap();

    let modifier = op.modifier().unwrap();
    assert_eq!(modifier.op, ModifyOp::Update);
    assert_eq!(modifier.values, fields(["b", "2"]));
    assert_eq!((op.limit(), op.skip()), (5, 1));
}

#[test]
fn test_generic_accepts_increment() {
    let op = OperationBuilder::generic(1, "=", fields(["a"]))
        .modifier("+", fields(["3"]))
        .build()
        .unwrap();

    assert_eq!(op.modifier().unwrap().op, ModifyOp::Increment);
    assert!(!op.is_insert());
}

#[test]
fn test_null_keys_are_kept() {
    let null: hsclient::Field = None;
    let op = OperationBuilder::find(1, "=", vec![null.clone()]).build().unwrap();
    assert_eq!(op.keys(), &[null]);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_rejects_negative_index_id() {
    assert_invalid(OperationBuilder::find(-1, "=", fields(["a"])).build());
    assert_invalid(OperationBuilder::insert(-5, fields(["a"])).build());
}

#[test]
fn test_rejects_bad_operator() {
    assert_invalid(OperationBuilder::find(1, "", fields(["a"])).build());
    assert_invalid(OperationBuilder::find(1, "=\t", fields(["a"])).build());
    assert_invalid(OperationBuilder::find(1, ">\n", fields(["a"])).build());
}

#[test]
fn test_rejects_insert_with_limit_or_modifier() {
    assert_invalid(OperationBuilder::insert(1, fields(["a"])).limit(1).build());
    assert_invalid(OperationBuilder::insert(1, fields(["a"])).skip(1).build());
    assert_invalid(
        OperationBuilder::insert(1, fields(["a"]))
            .modifier("D", Vec::new())
            .build(),
    );
}

#[test]
fn test_rejects_unknown_modifier() {
    assert_invalid(
        OperationBuilder::generic(1, "=", fields(["a"]))
            .modifier("X", fields(["1"]))
            .build(),
    );
}

#[test]
fn test_rejects_delete_with_values() {
    assert_invalid(
        OperationBuilder::generic(1, "=", fields(["a"]))
            .modifier("D", fields(["1"]))
            .build(),
    );
}

#[test]
fn test_update_with_empty_value_list() {
    let op = OperationBuilder::update(1, "=", fields(["a"]), Vec::new()).build().unwrap();
    let modifier = op.modifier().unwrap();
    assert_eq!(modifier.op, ModifyOp::Update);
    assert!(modifier.values.is_empty());

    let op = OperationBuilder::generic(1, "=", fields(["a"]))
        .modifier("-", Vec::new())
        .build()
        .unwrap();
    assert_eq!(op.modifier().unwrap().op, ModifyOp::Decrement);
}

// =============================================================================
// Batch File Tests
// =============================================================================

#[test]
fn test_parse_batch() {
    let json = r#"[
        {"index_id": 1, "op": "+", "keys": ["a", null]},
        {"index_id": 1, "op": "=", "keys": ["a"], "limit": 1},
        {"index_id": 1, "op": "=", "keys": ["a"], "modifier": {"op": "U", "values": ["a", "2"]}},
        {"index_id": 1, "op": "=", "keys": ["a"], "modifier": {"op": "D"}}
    ]"#;

    let ops = parse_batch(json).unwrap();
    assert_eq!(ops.len(), 4);

    assert!(ops[0].is_insert());
    assert_eq!(ops[0].keys(), &[Some(b"a".to_vec()), None]);
    assert_eq!(ops[1].limit(), 1);
    assert_eq!(ops[2].modifier().unwrap().op, ModifyOp::Update);
    assert_eq!(ops[3].modifier().unwrap().op, ModifyOp::Delete);
}

#[test]
fn test_parse_batch_names_failing_entry() {
    let json = r#"[
        {"index_id": 1, "op": "=", "keys": ["a"]},
        {"index_id": -2, "op": "=", "keys": ["a"]}
    ]"#;

    match parse_batch(json) {
        Err(HsError::InvalidArgument(message)) => assert!(message.starts_with("operation 1:")),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_parse_batch_rejects_bad_json() {
    assert!(matches!(parse_batch("{"), Err(HsError::InvalidArgument(_))));
}

#[test]
fn test_spec_serializes_without_empty_modifier() {
    let spec = OperationSpec {
        index_id: 1,
        op: "=".to_string(),
        keys: vec![Some("a".to_string())],
        limit: 1,
        skip: 0,
        modifier: None,
    };

    let json = serde_json::to_string(&spec).unwrap();
    assert!(!json.contains("modifier"));

    let parsed: OperationSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, spec);
}

#[test]
fn test_load_batch_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"index_id": 3, "op": ">=", "keys": ["m"], "limit": 10, "skip": 2}}]"#
    )
    .unwrap();
    file.flush().unwrap();

    let ops = load_batch(file.path()).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].index_id(), 3);
    assert_eq!(ops[0].operator(), ">=");
    assert_eq!((ops[0].limit(), ops[0].skip()), (10, 2));
}

#[test]
fn test_load_batch_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_batch(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(HsError::Io(_))));
}
