//! Tests for binding and invoking compiled definitions

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use zqlz_core::{CallOutput, Result as CoreResult, Row, Value};

use crate::test_support::{data_source, idle_data_source, RecordingConnection};
use crate::{
    bind_inputs, invoke, CompiledCallDefinition, ParameterSpec, ProcedureError, RequestContext,
    StoredProcedure,
};

fn definition(specs: &[ParameterSpec]) -> CompiledCallDefinition {
    CompiledCallDefinition::build(idle_data_source(), None, "proc", false, specs).unwrap()
}

fn inputs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_undeclared_fields_are_dropped() {
    let definition = definition(&[
        ParameterSpec::input("id", "integer"),
        ParameterSpec::output("status", "varchar"),
    ]);
    let request = RequestContext::new(Value::Null)
        .with_field("id", 1)
        .with_field("status", "should not bind")
        .with_field("TraceId", "abc");

    assert_eq!(
        bind_inputs(&definition, &request),
        inputs(&[("id", Value::Int32(1))])
    );
}

#[test]
fn test_value_from_body_wins_over_same_named_field() {
    let definition = definition(&[ParameterSpec::input("payload", "varchar").value_from("BODY")]);
    let request = RequestContext::new("from body").with_field("payload", "from field");

    assert_eq!(
        bind_inputs(&definition, &request),
        inputs(&[("payload", Value::String("from body".into()))])
    );
}

#[test]
fn test_default_request_binds_body_as_null() {
    let request = RequestContext::default();
    assert_eq!(request.body(), &Value::Null);
    assert!(request.fields().is_empty());

    let definition = definition(&[ParameterSpec::in_out("payload", "varchar").value_from("body")]);
    assert_eq!(
        bind_inputs(&definition, &request),
        inputs(&[("payload", Value::Null)])
    );
}

#[test]
fn test_value_from_other_field() {
    let definition = definition(&[
        ParameterSpec::input("customer", "integer").value_from("customerId"),
        ParameterSpec::in_out("region", "varchar").value_from("missingField"),
    ]);
    let request = RequestContext::new(Value::Null)
        .with_field("customer", 1)
        .with_field("customerId", 77);

    assert_eq!(
        bind_inputs(&definition, &request),
        inputs(&[
            ("customer", Value::Int32(77)),
            ("region", Value::Null),
        ])
    );
}

#[test]
fn test_value_from_field_not_declared_as_parameter() {
    // The source field itself is not a parameter and must not be bound.
    let definition = definition(&[ParameterSpec::input("id", "integer").value_from("header_id")]);
    let request = RequestContext::new(Value::Null).with_field("header_id", 5);

    assert_eq!(
        bind_inputs(&definition, &request),
        inputs(&[("id", Value::Int32(5))])
    );
}

#[tokio::test]
async fn test_scenario_in_parameter_binding() {
    let connection = RecordingConnection::new().into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "find_user",
        false,
        &[ParameterSpec::new("id", "in", "integer")],
    )
    .unwrap();
    let request = RequestContext::from_parts(
        Value::Null,
        [("id", Value::Int32(42)), ("noise", Value::from("x"))],
    );

    let result = invoke(&definition, &request).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(
        connection.recorded_inputs(),
        vec![inputs(&[("id", Value::Int32(42))])]
    );
}

#[tokio::test]
async fn test_scenario_inout_and_out_results() {
    let connection = RecordingConnection::new()
        .returning("id", CallOutput::Scalar(Value::Int32(8)))
        .returning("status", CallOutput::Scalar(Value::String("bumped".into())))
        .returning("undeclared", CallOutput::Scalar(Value::Bool(true)))
        .into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "bump",
        false,
        &[
            ParameterSpec::new("id", "inout", "integer"),
            ParameterSpec::new("status", "out", "varchar"),
        ],
    )
    .unwrap();
    let request = RequestContext::new(Value::Null).with_field("id", 7);

    let result = invoke(&definition, &request).await.unwrap();

    assert_eq!(result.names().collect::<Vec<_>>(), vec!["id", "status"]);
    assert_eq!(result.get("id"), Some(&Value::Int32(8)));
    assert_eq!(result.get("status"), Some(&Value::String("bumped".into())));
    assert_eq!(
        connection.recorded_inputs(),
        vec![inputs(&[("id", Value::Int32(7))])]
    );
}

#[tokio::test]
async fn test_scenario_cursor_rows_become_column_maps() {
    let rows = vec![
        Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int32(1), Value::String("ada".into())],
        ),
        Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int32(2), Value::String("grace".into())],
        ),
    ];
    let connection = RecordingConnection::new()
        .returning("cur", CallOutput::Rows(rows.clone()))
        .into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "list_users",
        false,
        &[ParameterSpec::new("cur", "out", "cursor")],
    )
    .unwrap();

    let result = invoke(&definition, &RequestContext::default()).await.unwrap();

    let expected: Vec<Value> = rows.iter().map(|row| Value::Object(row.to_map())).collect();
    assert_eq!(result.get("cur"), Some(&Value::Array(expected)));
}

#[tokio::test]
async fn test_custom_row_mapper_and_missing_outputs() {
    let rows = vec![Row::new(vec!["total".into()], vec![Value::Int64(10)])];
    let connection = RecordingConnection::new()
        .returning("totals", CallOutput::Rows(rows))
        .into_arc();
    let doubler = |row: &Row, _: usize| -> CoreResult<Value> {
        Ok(Value::Int64(row.get(0).and_then(Value::as_i64).unwrap_or(0) * 2))
    };
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "totals",
        false,
        &[
            ParameterSpec::output("totals", "resultset").row_mapper(Arc::new(doubler)),
            ParameterSpec::output("note", "varchar"),
        ],
    )
    .unwrap();

    let result = invoke(&definition, &RequestContext::default()).await.unwrap();

    assert_eq!(result.get("totals"), Some(&Value::Array(vec![Value::Int64(20)])));
    assert_eq!(result.get("note"), Some(&Value::Null));
}

#[tokio::test]
async fn test_missing_in_parameter_fails_before_call() {
    let connection = RecordingConnection::new().into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "find_user",
        false,
        &[ParameterSpec::input("id", "integer")],
    )
    .unwrap();

    let err = invoke(&definition, &RequestContext::default())
        .await
        .expect_err("id is required");

    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert!(!err.is_build_error());
    assert!(err.to_string().contains("'id'"));
    assert_eq!(connection.call_count(), 0);
}

#[tokio::test]
async fn test_missing_inout_parameter_is_not_bound() {
    let connection = RecordingConnection::new().into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "counter",
        false,
        &[ParameterSpec::in_out("count", "integer")],
    )
    .unwrap();

    let result = invoke(&definition, &RequestContext::default()).await.unwrap();

    assert_eq!(connection.recorded_inputs(), vec![HashMap::new()]);
    assert_eq!(result.get("count"), Some(&Value::Null));
}

#[tokio::test]
async fn test_execution_failure_propagates_without_result() {
    let connection = RecordingConnection::new()
        .returning("status", CallOutput::Scalar(Value::from("partial")))
        .failing("permission denied for procedure")
        .into_arc();
    let procedure = StoredProcedure::new(
        CompiledCallDefinition::build(
            data_source(&connection),
            None,
            "secure_proc",
            false,
            &[ParameterSpec::output("status", "varchar")],
        )
        .unwrap(),
    );

    let err = procedure
        .process(&RequestContext::default())
        .await
        .expect_err("call fails");

    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert!(err.to_string().contains("permission denied"));

    // The definition stays usable after a failed invocation.
    let err = procedure.process(&RequestContext::default()).await.unwrap_err();
    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert_eq!(connection.call_count(), 2);
}

#[tokio::test]
async fn test_closed_connection_is_an_execution_failure() {
    let connection = RecordingConnection::new().into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "noop",
        false,
        &[],
    )
    .unwrap();
    zqlz_core::Connection::close(connection.as_ref()).await.unwrap();

    let err = invoke(&definition, &RequestContext::default()).await.unwrap_err();

    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
    assert_eq!(connection.call_count(), 0);
}

#[tokio::test]
async fn test_row_mapper_failure_is_execution_failure() {
    let rows = vec![Row::new(vec!["a".into()], vec![Value::Null])];
    let connection = RecordingConnection::new()
        .returning("rows", CallOutput::Rows(rows))
        .into_arc();
    let definition = CompiledCallDefinition::build(
        data_source(&connection),
        None,
        "rows",
        false,
        &[ParameterSpec::output("rows", "cursor")
            .row_mapper(Arc::new(crate::SingleColumnRowMapper::named("b")))],
    )
    .unwrap();

    let err = invoke(&definition, &RequestContext::default()).await.unwrap_err();
    assert!(matches!(err, ProcedureError::ExecutionFailure(_)));
}

#[tokio::test]
async fn test_concurrent_invocations_share_definition() {
    let connection = RecordingConnection::new()
        .returning("echo", CallOutput::Scalar(Value::from("ok")))
        .into_arc();
    let procedure = StoredProcedure::new(
        CompiledCallDefinition::build(
            data_source(&connection),
            None,
            "echo",
            false,
            &[
                ParameterSpec::input("n", "integer"),
                ParameterSpec::output("echo", "varchar"),
            ],
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let procedure = procedure.clone();
            tokio::spawn(async move {
                procedure
                    .process(&RequestContext::new(Value::Null).with_field("n", n))
                    .await
            })
        })
        .collect();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.get("echo"), Some(&Value::String("ok".into())));
    }

    let mut seen: Vec<i64> = connection
        .recorded_inputs()
        .iter()
        .filter_map(|inputs| inputs.get("n").and_then(Value::as_i64))
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<i64>>());
}
