//! In-memory connection used by the unit tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use zqlz_core::{
    CallOutput, CallOutputs, CallSignature, Connection, DataSource, Result, SharedConnection,
    Value, ZqlzError,
};

/// Records every call and answers with canned outputs
pub struct RecordingConnection {
    outputs: CallOutputs,
    failure: Option<String>,
    calls: Mutex<Vec<(CallSignature, HashMap<String, Value>)>>,
    closed: AtomicBool,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            failure: None,
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn returning(mut self, name: &str, output: CallOutput) -> Self {
        self.outputs.insert(name.to_string(), output);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Inputs of every call made so far
    pub fn recorded_inputs(&self) -> Vec<HashMap<String, Value>> {
        self.calls.lock().iter().map(|(_, inputs)| inputs.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn driver_name(&self) -> &str {
        "recording"
    }

    async fn call(
        &self,
        signature: &CallSignature,
        inputs: &HashMap<String, Value>,
    ) -> Result<CallOutputs> {
        self.calls.lock().push((signature.clone(), inputs.clone()));
        match &self.failure {
            Some(message) => Err(ZqlzError::Query(message.clone())),
            None => Ok(self.outputs.clone()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Wrap a recording connection into a data source
pub fn data_source(connection: &Arc<RecordingConnection>) -> Arc<dyn DataSource> {
    let connection: Arc<dyn Connection> = connection.clone();
    Arc::new(SharedConnection::new(connection))
}

/// A data source whose connection is never used
pub fn idle_data_source() -> Arc<dyn DataSource> {
    data_source(&RecordingConnection::new().into_arc())
}
