//! Rendering call signatures as PostgreSQL statements and reading their
//! outputs back

use zqlz_core::{CallOutput, CallOutputs, CallParameter, CallSignature, Row, SqlType, Value};

use crate::type_catalog::{POSTGRES_TYPE_CATALOG, PostgresTypeCatalog};

/// SQL text for one call plus the parameter bound to each `$n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallStatement {
    pub sql: String,
    pub bindings: Vec<String>,
}

/// Render a signature as `CALL name(...)` or `SELECT * FROM name(...)`.
///
/// IN and INOUT parameters become placeholders in declaration order.
/// Procedures take a `NULL` for every OUT argument, functions omit them, and
/// result sets never take an argument.
pub(crate) fn render_call(signature: &CallSignature) -> CallStatement {
    let typed = signature.type_catalog() == POSTGRES_TYPE_CATALOG;
    let mut bindings = Vec::new();
    let mut arguments = Vec::new();

    for parameter in signature.parameters() {
        if !parameter.takes_placeholder() {
            continue;
        }
        if parameter.is_input() {
            bindings.push(parameter.name.clone());
            let placeholder = format!("${}", bindings.len());
            arguments.push(match cast_for(parameter, typed) {
                Some(cast) => format!("{placeholder}::{cast}"),
                None => placeholder,
            });
        } else if !signature.is_function() {
            arguments.push(match cast_for(parameter, typed) {
                Some(cast) => format!("NULL::{cast}"),
                None => "NULL".to_string(),
            });
        }
    }

    let arguments = arguments.join(", ");
    let sql = if signature.is_function() {
        format!("SELECT * FROM {}({arguments})", signature.name())
    } else {
        format!("CALL {}({arguments})", signature.name())
    };
    CallStatement { sql, bindings }
}

/// Cursors are always `refcursor`; other parameters are only cast when their
/// codes are PostgreSQL OIDs.
fn cast_for(parameter: &CallParameter, typed: bool) -> Option<String> {
    match parameter.sql_type {
        SqlType::Cursor => Some("refcursor".to_string()),
        SqlType::Code(code) if typed => {
            PostgresTypeCatalog::type_for_code(code).map(|ty| ty.name().to_string())
        }
        _ => None,
    }
}

/// Outputs found in a call's returned rows
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ReturnedOutputs {
    pub outputs: CallOutputs,
    /// Cursor parameters and the portal each one names
    pub cursors: Vec<(String, String)>,
}

/// Pick the output values out of the rows a call returned.
///
/// Scalar outputs are read from the first row by case-insensitive column
/// name. A function with a single scalar output also accepts the only
/// column under whatever name the server gave it. A result-set parameter
/// receives every row.
pub(crate) fn read_outputs(signature: &CallSignature, rows: Vec<Row>) -> ReturnedOutputs {
    let mut returned = ReturnedOutputs::default();
    let scalars: Vec<&CallParameter> = signature
        .outputs()
        .filter(|p| p.sql_type != SqlType::ResultSet)
        .collect();
    let single_return = signature.is_function() && scalars.len() == 1;

    if let Some(row) = rows.first() {
        for parameter in &scalars {
            let value = column(row, &parameter.name).or_else(|| match row.len() {
                1 if single_return => row.get(0),
                _ => None,
            });
            match (parameter.sql_type, value) {
                (_, None) => {}
                (SqlType::Cursor, Some(Value::String(portal))) => returned
                    .cursors
                    .push((parameter.name.clone(), portal.clone())),
                (SqlType::Cursor, Some(_)) => {
                    tracing::debug!(parameter = %parameter.name, "cursor output holds no portal");
                }
                (_, Some(value)) => {
                    returned
                        .outputs
                        .insert(parameter.name.clone(), CallOutput::Scalar(value.clone()));
                }
            }
        }
    }

    let mut result_sets = signature
        .outputs()
        .filter(|p| p.sql_type == SqlType::ResultSet);
    if let Some(parameter) = result_sets.next() {
        returned
            .outputs
            .insert(parameter.name.clone(), CallOutput::Rows(rows));
    }
    for parameter in result_sets {
        tracing::debug!(
            parameter = %parameter.name,
            "only the first result-set parameter receives rows"
        );
    }

    returned
}

fn column<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    row.columns()
        .iter()
        .position(|column| column.eq_ignore_ascii_case(name))
        .and_then(|idx| row.get(idx))
}
