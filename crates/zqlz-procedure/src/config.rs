//! Declarative procedure configuration
//!
//! A procedure is configured as a TOML or JSON document:
//!
//! ```toml
//! procedure = "billing.close_invoice"
//! is_function = false
//! type_catalog = "standard"
//!
//! [[parameters]]
//! name = "invoice_id"
//! mode = "in"
//! type = "integer"
//! value_from = "body"
//!
//! [[parameters]]
//! name = "lines"
//! mode = "out"
//! type = "cursor"
//! row_mapper = "column_map"
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zqlz_core::DataSource;

use crate::{
    CompiledCallDefinition, ParameterSpec, ProcedureError, Result, RowMapperRegistry,
    TypeCatalogRegistry,
};

/// Construction-time configuration of one stored procedure adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureConfig {
    /// Procedure or function name
    #[serde(alias = "procedureName")]
    pub procedure: String,
    /// Call a function rather than a procedure
    #[serde(default, alias = "isFunction")]
    pub is_function: bool,
    /// Catalog parameter types resolve in; the standard catalog when absent
    #[serde(default, alias = "typeCatalog", skip_serializing_if = "Option::is_none")]
    pub type_catalog: Option<String>,
    /// Parameters in call order
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

/// One configured parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, alias = "valueFrom", skip_serializing_if = "Option::is_none")]
    pub value_from: Option<String>,
    /// Name of a mapper in the [`RowMapperRegistry`]
    #[serde(default, alias = "rowMapper", skip_serializing_if = "Option::is_none")]
    pub row_mapper: Option<String>,
}

impl ProcedureConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Turn the configured parameters into specifications, resolving row
    /// mapper names in `mappers`
    pub fn parameter_specs(&self, mappers: &RowMapperRegistry) -> Result<Vec<ParameterSpec>> {
        self.parameters
            .iter()
            .map(|parameter| {
                let row_mapper = parameter
                    .row_mapper
                    .as_deref()
                    .map(|name| {
                        mappers
                            .get(name)
                            .ok_or_else(|| ProcedureError::UnknownRowMapper(name.to_string()))
                    })
                    .transpose()?;
                Ok(ParameterSpec {
                    name: parameter.name.clone(),
                    mode: parameter.mode.clone(),
                    type_name: parameter.type_name.clone(),
                    value_from: parameter.value_from.clone(),
                    row_mapper,
                })
            })
            .collect()
    }

    /// Compile the configuration into a call definition
    pub fn compile(
        &self,
        data_source: Arc<dyn DataSource>,
        catalogs: &TypeCatalogRegistry,
        mappers: &RowMapperRegistry,
    ) -> Result<CompiledCallDefinition> {
        let mut builder = CompiledCallDefinition::builder(data_source, self.procedure.as_str())
            .function(self.is_function)
            .catalogs(catalogs.clone())
            .parameters(self.parameter_specs(mappers)?);
        if let Some(catalog) = &self.type_catalog {
            builder = builder.type_catalog(catalog.as_str());
        }
        builder.build()
    }
}
