use std::fs;

use serde_json::json;
use tempfile::tempdir;

use typedparser::{Engine, ErrorKind, SchemaDocument, SchemaError, TypedParser};

const SCHEMA: &str = r#"{
    "name": "build",
    "options": {"strict": true},
    "fields": [
        {"name": "target", "type": "str", "argument": {"flags": ["target"]}},
        {"name": "jobs", "type": "int",
         "argument": {"shortcut": "-j", "type": "int", "default": 1}},
        {"name": "out_dir", "type": "path",
         "argument": {"flags": ["-o", "--out-dir"], "type": "path", "default": "target"}},
        {"name": "features", "type": "optional<list<str>>", "argument": {"action": "append"}}
    ]
}"#;

#[test]
fn schema_document_drives_a_parser() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("build.json");
    fs::write(&path, SCHEMA).unwrap();

    let document = SchemaDocument::from_json_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(document.options.strict);
    let parser =
        TypedParser::build(Engine::new("build"), document.schema, document.options).unwrap();

    let namespace = parser
        .parse_namespace(["release", "-j", "4", "--features", "a", "--features", "b"])
        .unwrap();
    assert_eq!(
        namespace.to_value(),
        json!({"target": "release", "jobs": 4, "out_dir": "target", "features": ["a", "b"]})
    );

    let namespace = parser.parse_namespace(["debug", "-o", "/tmp/out"]).unwrap();
    assert_eq!(namespace.get("out_dir"), Some(&json!("/tmp/out")));

    let err = parser.parse_namespace(["debug", "-j", "many"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn malformed_document_reports_the_json_path() {
    let raw = r#"{"name": "x", "fields": [
        {"name": "a", "type": "int", "argument": {"action": "store_maybe"}}
    ]}"#;
    let err = SchemaDocument::from_json_str(raw).unwrap_err();
    match err {
        SchemaError::Malformed { path, .. } => assert_eq!(path, "fields[0].argument.action"),
        other => panic!("unexpected error: {other}"),
    }
}
