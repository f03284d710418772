//! Connectivity traits used to execute procedure calls

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{CallOutputs, CallSignature, Result, Value};

/// A database session able to execute a named procedure or function call
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a call.
    ///
    /// `inputs` is keyed by parameter name and holds a value for every IN or
    /// INOUT parameter the caller bound. The returned map holds one entry per
    /// OUT or INOUT parameter the call produced; cursor and result-set
    /// parameters come back as [`CallOutput::Rows`](crate::CallOutput::Rows).
    async fn call(
        &self,
        signature: &CallSignature,
        inputs: &HashMap<String, Value>,
    ) -> Result<CallOutputs>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Source of connections for a procedure adapter.
///
/// Pooling and locking are the implementor's concern; the adapter asks for
/// one connection per invocation.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Get a connection to run one call on
    async fn connection(&self) -> Result<Arc<dyn Connection>>;
}

#[async_trait]
impl<T: DataSource> DataSource for Arc<T> {
    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        (**self).connection().await
    }
}

/// A data source that always hands out the same connection
pub struct SharedConnection {
    connection: Arc<dyn Connection>,
}

impl SharedConnection {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl DataSource for SharedConnection {
    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        if self.connection.is_closed() {
            return Err(crate::ZqlzError::Connection(
                "shared connection is closed".into(),
            ));
        }
        Ok(Arc::clone(&self.connection))
    }
}
