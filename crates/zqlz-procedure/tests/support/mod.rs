//! Shared helpers for procedure adapter integration tests

use std::collections::HashMap;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use parking_lot::Mutex;
use zqlz_core::{
    CallOutput, CallOutputs, CallSignature, Connection, DataSource, Result, Row, SharedConnection,
    Value, ZqlzError,
};

/// Install a test-writer subscriber once; filtered by `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An in-memory "database" holding one routine: a counter per key
#[derive(Default)]
pub struct CounterDatabase {
    counters: Mutex<HashMap<String, i64>>,
}

impl CounterDatabase {
    pub fn data_source(self: &Arc<Self>) -> Arc<dyn DataSource> {
        let connection = CounterConnection {
            database: Arc::clone(self),
        };
        Arc::new(SharedConnection::new(Arc::new(connection)))
    }

    pub fn counter(&self, key: &str) -> Option<i64> {
        self.counters.lock().get(key).copied()
    }
}

/// Connection executing `increment(IN key, IN step, OUT value, OUT history)`
struct CounterConnection {
    database: Arc<CounterDatabase>,
}

#[async_trait]
impl Connection for CounterConnection {
    fn driver_name(&self) -> &str {
        "counter"
    }

    async fn call(
        &self,
        signature: &CallSignature,
        inputs: &HashMap<String, Value>,
    ) -> Result<CallOutputs> {
        if signature.name() != "increment" {
            return Err(ZqlzError::NotFound(format!("routine {}", signature.name())));
        }
        let key = inputs
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| ZqlzError::Query("key must be a string".into()))?
            .to_string();
        let step = inputs.get("step").and_then(Value::as_i64).unwrap_or(1);

        let value = {
            let mut counters = self.database.counters.lock();
            let counter = counters.entry(key.clone()).or_insert(0);
            *counter += step;
            *counter
        };

        let history = (1..=value)
            .map(|n| {
                Row::new(
                    vec!["key".into(), "n".into()],
                    vec![Value::String(key.clone()), Value::Int64(n)],
                )
            })
            .collect();

        Ok(HashMap::from([
            ("value".to_string(), CallOutput::Scalar(Value::Int64(value))),
            ("history".to_string(), CallOutput::Rows(history)),
        ]))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}
