//! Loading state files from disk

use std::fs;

use schema_gitops::{Compatibility, GitopsError, SchemaDefinition, SchemaType, StateLoader};
use tempfile::tempdir;

#[test]
fn test_schema_files_resolve_relative_to_state() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("schemas")).unwrap();
    fs::write(
        dir.path().join("schemas/orders.avsc"),
        r#"{"type": "record", "name": "Order", "fields": [{"name": "id", "type": "string"}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("schemas/payment.proto"),
        "syntax = \"proto3\";\n\nmessage Payment {\n  string id = 1;\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("state.yaml"),
        r#"
compatibility: FULL
normalize: true
subjects:
  - name: orders-value
    compatibility: BACKWARD_TRANSITIVE
    file: schemas/orders.avsc
  - name: payments-value
    type: PROTOBUF
    file: schemas/payment.proto
"#,
    )
    .unwrap();

    let state = StateLoader::load(dir.path().join("state.yaml")).unwrap();

    assert_eq!(state.global_compatibility(), Some(Compatibility::Full));
    assert_eq!(state.normalize(), Some(true));

    let orders = state.subject("orders-value").unwrap();
    assert_eq!(orders.compatibility, Some(Compatibility::BackwardTransitive));
    let inline = SchemaDefinition::parse(
        "orders-value",
        SchemaType::Avro,
        r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"string"}]}"#,
        vec![],
    )
    .unwrap();
    assert_eq!(orders.schema, inline);

    let payments = state.subject("payments-value").unwrap();
    assert_eq!(payments.schema.schema_type(), SchemaType::Protobuf);
    assert_eq!(
        payments.schema.canonical(),
        "syntax = \"proto3\"; message Payment { string id = 1; }"
    );
}

#[test]
fn test_references_are_loaded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    fs::write(
        &path,
        r#"
subjects:
  - name: orders-value
    schema: '{"type": "record", "name": "Order", "fields": [{"name": "total", "type": "common.Money"}]}'
    references:
      - name: common.Money
        subject: money-value
        version: 3
"#,
    )
    .unwrap();

    let state = StateLoader::load(&path).unwrap();
    let references = state.subject("orders-value").unwrap().schema.references();

    assert_eq!(references.len(), 1);
    assert_eq!(references[0].subject, "money-value");
    assert_eq!(references[0].version, 3);
}

#[test]
fn test_missing_schema_file_names_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    fs::write(&path, "subjects:\n  - name: foo\n    file: nowhere.avsc\n").unwrap();

    let err = StateLoader::load(&path).unwrap_err();

    assert!(matches!(&err, GitopsError::Io { path, .. } if path.ends_with("nowhere.avsc")));
    assert!(err.to_string().contains("nowhere.avsc"));
}

#[test]
fn test_missing_state_file() {
    let dir = tempdir().unwrap();
    let err = StateLoader::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, GitopsError::Io { .. }));
}

#[test]
fn test_invalid_schema_names_subject() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    fs::write(&path, "subjects:\n  - name: broken\n    schema: '{\"type\": \"record\"'\n").unwrap();

    let err = StateLoader::load(&path).unwrap_err();

    assert!(matches!(err, GitopsError::InvalidSchema { subject, .. } if subject == "broken"));
}

#[test]
fn test_duplicate_subjects_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    fs::write(
        &path,
        r#"
subjects:
  - name: foo
    schema: '{"type": "string"}'
  - name: foo
    schema: '{"type": "long"}'
"#,
    )
    .unwrap();

    let err = StateLoader::load(&path).unwrap_err();

    assert!(matches!(err, GitopsError::DuplicateSubject(name) if name == "foo"));
}
