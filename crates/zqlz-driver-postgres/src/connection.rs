//! PostgreSQL connection implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, GenericClient, NoTls};
use zqlz_core::{CallOutput, CallOutputs, CallSignature, Connection, Result, Value, ZqlzError};

use crate::call::{CallStatement, ReturnedOutputs, read_outputs, render_call};
use crate::value::{PgValue, convert_rows};

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code().code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {})", hint));
    }

    match code {
        "42883" => format!("no matching procedure or function: {}", message),
        "42809" => format!("wrong routine kind: {}", message),
        "P0001" => format!("raised by routine: {}", message),
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "23503" => format!("foreign key violation: {}", message),
        "23502" => format!("null value violates not-null constraint: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        _ => format!("{} (SQLSTATE {})", message, code),
    }
}

fn query_error(context: &'static str) -> impl Fn(tokio_postgres::Error) -> ZqlzError {
    move |e| ZqlzError::Query(format!("{}: {}", context, format_postgres_error(&e)))
}

/// PostgreSQL connection wrapper
///
/// Calls on one connection are serialized by the client lock.
pub struct PostgresConnection {
    client: Mutex<Client>,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect with a libpq-style connection string, e.g.
    /// `host=localhost user=postgres dbname=app` or `postgres://...`
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config: Config = connection_string.parse().map_err(|e| {
            ZqlzError::Configuration(format!("invalid PostgreSQL connection string: {}", e))
        })?;
        Self::connect_with(&config).await
    }

    pub async fn connect_with(config: &Config) -> Result<Self> {
        tracing::info!(
            hosts = ?config.get_hosts(),
            database = ?config.get_dbname(),
            "connecting to PostgreSQL database"
        );

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            ZqlzError::Connection(format!(
                "Failed to connect to PostgreSQL: {}",
                format_postgres_error(&e)
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        tracing::info!("PostgreSQL connection established");
        Ok(Self {
            client: Mutex::new(client),
            closed: AtomicBool::new(false),
        })
    }
}

/// Prepare and run the call, then fetch every cursor it opened
async fn run_call<C>(
    client: &C,
    signature: &CallSignature,
    statement: &CallStatement,
    values: &[Value],
) -> Result<CallOutputs>
where
    C: GenericClient + Sync,
{
    // Prepare first so we know the argument types for each placeholder
    let prepared = client
        .prepare(&statement.sql)
        .await
        .map_err(query_error("Failed to prepare call"))?;

    let param_types = prepared.params();
    let pg_params: Vec<PgValue> = values
        .iter()
        .enumerate()
        .map(|(i, value)| match param_types.get(i) {
            Some(target_type) => PgValue::from_value_for_type(value, target_type),
            None => PgValue::from_value(value),
        })
        .collect();
    let param_refs: Vec<&(dyn ToSql + Sync)> =
        pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let pg_rows = client
        .query(&prepared, &param_refs)
        .await
        .map_err(query_error("Failed to execute call"))?;

    let ReturnedOutputs {
        mut outputs,
        cursors,
    } = read_outputs(signature, convert_rows(&pg_rows)?);

    for (parameter, portal) in cursors {
        let fetch = format!("FETCH ALL FROM {}", escape_identifier_pg(&portal));
        let fetched = client
            .query(fetch.as_str(), &[])
            .await
            .map_err(query_error("Failed to fetch cursor"))?;
        tracing::debug!(parameter = %parameter, rows = fetched.len(), "cursor fetched");
        outputs.insert(parameter, CallOutput::Rows(convert_rows(&fetched)?));
    }

    Ok(outputs)
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, signature, inputs), fields(routine = %signature.name()))]
    async fn call(
        &self,
        signature: &CallSignature,
        inputs: &HashMap<String, Value>,
    ) -> Result<CallOutputs> {
        if self.is_closed() {
            return Err(ZqlzError::Connection("PostgreSQL connection is closed".into()));
        }

        let statement = render_call(signature);
        let values: Vec<Value> = statement
            .bindings
            .iter()
            .map(|name| inputs.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        tracing::debug!(sql = %statement.sql, bound = values.len(), "executing call");

        let mut client = self.client.lock().await;

        // Portals only live until the end of their transaction
        if signature.has_cursor_outputs() {
            let transaction = client
                .transaction()
                .await
                .map_err(query_error("Failed to begin transaction"))?;
            let outputs = run_call(&transaction, signature, &statement, &values).await?;
            transaction
                .commit()
                .await
                .map_err(query_error("Failed to commit transaction"))?;
            Ok(outputs)
        } else {
            run_call(&*client, signature, &statement, &values).await
        }
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing PostgreSQL connection");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        // A locked client is in use, so it is still open
        self.client
            .try_lock()
            .map(|client| client.is_closed())
            .unwrap_or(false)
    }
}

/// Escape a PostgreSQL identifier (column name, portal name, etc.)
fn escape_identifier_pg(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier_pg("<unnamed portal 1>"), "\"<unnamed portal 1>\"");
        assert_eq!(escape_identifier_pg("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_invalid_connection_string() {
        let result = PostgresConnection::connect("host=localhost port=notaport").await;
        assert!(matches!(result, Err(ZqlzError::Configuration(_))));
    }
}
