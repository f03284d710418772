use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[test]
fn test_row_to_map_keeps_column_order() {
    let row = Row::new(
        vec!["zeta".into(), "alpha".into()],
        vec![Value::Int32(1), Value::String("a".into())],
    );
    let map = row.to_map();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
    assert_eq!(row.get_by_name("alpha"), Some(&Value::String("a".into())));
    assert_eq!(row.get_by_name("missing"), None);
}

#[test]
fn test_value_from_json() {
    let value = Value::from(json!({"id": 7, "tags": ["a"], "ratio": 0.5, "gone": null}));
    let mut expected = IndexMap::new();
    expected.insert("id".to_string(), Value::Int64(7));
    expected.insert(
        "tags".to_string(),
        Value::Array(vec![Value::String("a".into())]),
    );
    expected.insert("ratio".to_string(), Value::Float64(0.5));
    expected.insert("gone".to_string(), Value::Null);

    let fields = value.as_object().expect("object");
    for (key, expected_value) in &expected {
        assert_eq!(fields.get(key), Some(expected_value), "field {key}");
    }
}

#[test]
fn test_value_from_option() {
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::String("x".into()));
}

#[test]
fn test_display_of_composite_values() {
    assert_eq!(Value::Array(vec![Value::Null, Value::Null]).to_string(), "[2 items]");
    let mut fields = IndexMap::new();
    fields.insert("a".to_string(), Value::Bool(true));
    assert_eq!(Value::Object(fields).to_string(), "{1 fields}");
}

#[test]
fn test_default_value_is_null() {
    assert_eq!(Value::default(), Value::Null);
    assert!(Value::default().is_null());
}
