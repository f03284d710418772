//! The stored procedure adapter

use std::collections::HashSet;
use std::sync::Arc;

use zqlz_core::DataSource;

use crate::{
    engine, CompiledCallDefinition, InvocationResult, ProcedureConfig, RequestContext, Result,
    RowMapperRegistry, TypeCatalogRegistry,
};

/// Invokes one stored procedure or function for each request it is given.
///
/// A `StoredProcedure` only exists once its definition compiled, so every
/// instance is ready to process requests. Cloning shares the definition.
#[derive(Debug, Clone)]
pub struct StoredProcedure {
    definition: Arc<CompiledCallDefinition>,
}

impl StoredProcedure {
    pub fn new(definition: CompiledCallDefinition) -> Self {
        tracing::info!(
            procedure = %definition.procedure_name(),
            is_function = definition.is_function(),
            "stored procedure adapter ready"
        );
        Self {
            definition: Arc::new(definition),
        }
    }

    /// Compile a configuration with the default catalogs and row mappers
    pub fn from_config(config: &ProcedureConfig, data_source: Arc<dyn DataSource>) -> Result<Self> {
        Self::from_config_with(
            config,
            data_source,
            &TypeCatalogRegistry::default(),
            &RowMapperRegistry::default(),
        )
    }

    pub fn from_config_with(
        config: &ProcedureConfig,
        data_source: Arc<dyn DataSource>,
        catalogs: &TypeCatalogRegistry,
        mappers: &RowMapperRegistry,
    ) -> Result<Self> {
        let definition = config.compile(data_source, catalogs, mappers)?;
        Ok(Self::new(definition))
    }

    pub fn definition(&self) -> &CompiledCallDefinition {
        &self.definition
    }

    /// Names of the parameters a request can bind
    pub fn in_parameter_names(&self) -> &HashSet<String> {
        self.definition.in_parameter_names()
    }

    /// Run the call for one request and return its outputs
    pub async fn process(&self, request: &RequestContext) -> Result<InvocationResult> {
        engine::invoke(&self.definition, request).await
    }
}
