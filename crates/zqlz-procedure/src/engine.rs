//! Invocation of compiled call definitions

use std::collections::HashMap;

use indexmap::IndexMap;
use zqlz_core::{CallOutput, CallOutputs, ParameterDirection, Value, ZqlzError};

use crate::row_mapper::map_rows;
use crate::{
    ColumnMapRowMapper, CompiledCallDefinition, InvocationResult, RequestContext, Result,
    ValueSource,
};

/// Compute the input bindings of one invocation.
///
/// Only IN and INOUT parameter names survive; every other request field is
/// dropped. Parameters with a value source take the body or the named field
/// (Null when that field is absent) instead of the same-named field.
pub fn bind_inputs(
    definition: &CompiledCallDefinition,
    request: &RequestContext,
) -> HashMap<String, Value> {
    let mut inputs: HashMap<String, Value> = request
        .fields()
        .iter()
        .filter(|(name, _)| definition.in_parameter_names().contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    for (name, source) in definition.value_sources() {
        let value = match source {
            ValueSource::Body => request.body().clone(),
            ValueSource::Field(field) => request.field(field).cloned().unwrap_or(Value::Null),
        };
        inputs.insert(name.clone(), value);
    }

    inputs
}

/// Bind the request, execute the call and collect its outputs
#[tracing::instrument(skip_all, fields(procedure = %definition.procedure_name()))]
pub async fn invoke(
    definition: &CompiledCallDefinition,
    request: &RequestContext,
) -> Result<InvocationResult> {
    let inputs = bind_inputs(definition, request);
    check_required_inputs(definition, &inputs)?;

    tracing::debug!(
        call = %definition.signature(),
        bound = inputs.len(),
        "invoking stored call"
    );

    let connection = definition.data_source().connection().await?;
    let outputs = connection.call(definition.signature(), &inputs).await?;

    let result = collect_outputs(definition, outputs)?;
    tracing::debug!(outputs = result.len(), "stored call completed");
    Ok(result)
}

/// IN parameters must be bound; an unbound INOUT is sent as NULL.
fn check_required_inputs(
    definition: &CompiledCallDefinition,
    inputs: &HashMap<String, Value>,
) -> Result<()> {
    let missing = definition
        .parameters()
        .iter()
        .find(|p| p.direction == ParameterDirection::In && !inputs.contains_key(&p.name));

    match missing {
        Some(parameter) => Err(ZqlzError::Query(format!(
            "required input parameter '{}' is missing",
            parameter.name
        ))
        .into()),
        None => Ok(()),
    }
}

fn collect_outputs(
    definition: &CompiledCallDefinition,
    mut outputs: CallOutputs,
) -> Result<InvocationResult> {
    let mut result = IndexMap::new();

    for parameter in definition.signature().outputs() {
        let value = match outputs.remove(&parameter.name) {
            Some(CallOutput::Scalar(value)) => value,
            Some(CallOutput::Rows(rows)) => {
                let mapped = match definition.row_mapper(&parameter.name) {
                    Some(mapper) => map_rows(mapper.as_ref(), &rows)?,
                    None => map_rows(&ColumnMapRowMapper, &rows)?,
                };
                Value::Array(mapped)
            }
            None => {
                tracing::debug!(parameter = %parameter.name, "no value returned for output parameter");
                Value::Null
            }
        };
        result.insert(parameter.name.clone(), value);
    }

    if !outputs.is_empty() {
        tracing::debug!(
            dropped = outputs.len(),
            "connection returned undeclared outputs"
        );
    }

    Ok(InvocationResult::new(result))
}
