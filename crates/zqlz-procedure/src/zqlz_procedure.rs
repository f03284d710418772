//! Stored procedure adapter for ZQLZ
//!
//! Compiles a declarative list of procedure parameters into a
//! [`CompiledCallDefinition`] once, then binds each request's body and
//! fields to the call, executes it through a [`zqlz_core::DataSource`] and
//! returns the named outputs.
//!
//! ```ignore
//! let config = ProcedureConfig::from_toml_str(source)?;
//! let procedure = StoredProcedure::from_config(&config, data_source)?;
//! let result = procedure
//!     .process(&RequestContext::new(Value::Null).with_field("id", 42))
//!     .await?;
//! ```

mod config;
mod definition;
mod engine;
mod error;
mod parameter;
mod procedure;
mod request;
mod row_mapper;
mod type_catalog;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod definition_tests;
#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod test_support;

pub use config::{ParameterConfig, ProcedureConfig};
pub use definition::{CallDefinitionBuilder, CompiledCallDefinition};
pub use engine::{bind_inputs, invoke};
pub use error::{ProcedureError, Result};
pub use parameter::{ParameterSpec, ValueSource};
pub use procedure::StoredProcedure;
pub use request::{InvocationResult, RequestContext};
pub use row_mapper::{
    map_rows, ColumnMapRowMapper, RowMapper, RowMapperRegistry, SingleColumnRowMapper,
};
pub use type_catalog::TypeCatalogRegistry;
