//! End-to-end invocation through the public adapter API

mod support;

use std::sync::Arc;

use indoc::indoc;
use pretty_assertions::assert_eq;
use zqlz_core::Value;
use zqlz_procedure::{ProcedureConfig, ProcedureError, RequestContext, StoredProcedure};

use support::{CounterDatabase, init_tracing};

const INCREMENT: &str = indoc! {r#"
    procedure = "increment"

    [[parameters]]
    name = "key"
    mode = "in"
    type = "varchar"
    value_from = "body"

    [[parameters]]
    name = "step"
    mode = "in"
    type = "bigint"

    [[parameters]]
    name = "value"
    mode = "out"
    type = "bigint"

    [[parameters]]
    name = "history"
    mode = "out"
    type = "cursor"
    row_mapper = "single_column"
"#};

fn increment(database: &Arc<CounterDatabase>) -> StoredProcedure {
    let config = ProcedureConfig::from_toml_str(INCREMENT).unwrap();
    StoredProcedure::from_config(&config, database.data_source()).unwrap()
}

#[tokio::test]
async fn test_repeated_invocations_share_one_definition() {
    init_tracing();
    let database = Arc::new(CounterDatabase::default());
    let procedure = increment(&database);

    for _ in 0..2 {
        procedure
            .process(&RequestContext::new("visits").with_field("step", 2))
            .await
            .unwrap();
    }
    let result = procedure
        .process(&RequestContext::new("visits").with_field("step", 2))
        .await
        .unwrap();

    assert_eq!(database.counter("visits"), Some(6));
    assert_eq!(result.get("value"), Some(&Value::Int64(6)));
    assert_eq!(
        result.get("history").and_then(Value::as_array).map(<[Value]>::len),
        Some(6)
    );
    // single_column maps each history row to its first column
    assert_eq!(
        result.get("history").and_then(|v| v.as_array()?.first().cloned()),
        Some(Value::String("visits".into()))
    );
}

#[tokio::test]
async fn test_missing_step_is_reported_before_the_call() {
    init_tracing();
    let database = Arc::new(CounterDatabase::default());
    let procedure = increment(&database);

    let err = procedure
        .process(&RequestContext::new("visits"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert_eq!(database.counter("visits"), None);
}

#[tokio::test]
async fn test_connection_errors_surface_as_execution_failures() {
    init_tracing();
    let database = Arc::new(CounterDatabase::default());
    let procedure = increment(&database);

    // A non-string body cannot be used as the key
    let err = procedure
        .process(&RequestContext::new(42).with_field("step", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert!(err.to_string().contains("key must be a string"));
}

#[test]
fn test_in_parameter_names_are_exposed() {
    let database = Arc::new(CounterDatabase::default());
    let procedure = increment(&database);

    let mut names: Vec<&str> = procedure
        .in_parameter_names()
        .iter()
        .map(String::as_str)
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["key", "step"]);
}
