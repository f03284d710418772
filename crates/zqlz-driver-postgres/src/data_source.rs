//! Data source handing out a shared PostgreSQL connection

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::Config;
use zqlz_core::{Connection, DataSource, Result, ZqlzError};

use crate::PostgresConnection;

/// Data source that keeps one PostgreSQL connection open and reconnects
/// when it has been closed
pub struct PostgresDataSource {
    config: Config,
    connection: Mutex<Option<Arc<PostgresConnection>>>,
}

impl PostgresDataSource {
    /// Create a data source that connects on first use
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Parse the connection string and open the first connection eagerly
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config: Config = connection_string.parse().map_err(|e| {
            ZqlzError::Configuration(format!("invalid PostgreSQL connection string: {}", e))
        })?;
        let data_source = Self::new(config);
        data_source.connection().await?;
        Ok(data_source)
    }
}

#[async_trait]
impl DataSource for PostgresDataSource {
    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref().filter(|c| !c.is_closed()) {
            return Ok(Arc::clone(connection) as Arc<dyn Connection>);
        }

        if slot.is_some() {
            tracing::warn!("PostgreSQL connection was closed, reconnecting");
        }
        let connection = Arc::new(PostgresConnection::connect_with(&self.config).await?);
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }
}
