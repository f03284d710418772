//! Compilation of parameter specifications into call definitions
//!
//! [`CallDefinitionBuilder`] validates an ordered list of
//! [`ParameterSpec`]s and folds it into one immutable
//! [`CompiledCallDefinition`]. A definition exists only if every
//! specification compiled; the first configuration error aborts the build.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use zqlz_core::{
    CallParameter, CallSignature, DataSource, ParameterDirection, SqlType, TypeCatalog,
};

use crate::{
    ColumnMapRowMapper, ParameterSpec, ProcedureError, Result, RowMapper, TypeCatalogRegistry,
    ValueSource,
};

/// An executable procedure or function call, compiled once at configuration
/// time and shared read-only by every invocation
pub struct CompiledCallDefinition {
    data_source: Arc<dyn DataSource>,
    signature: CallSignature,
    in_parameter_names: HashSet<String>,
    value_sources: HashMap<String, ValueSource>,
    row_mappers: HashMap<String, Arc<dyn RowMapper>>,
}

impl CompiledCallDefinition {
    /// Compile a definition against the default type catalog registry.
    ///
    /// `type_catalog` selects the catalog that type names resolve in;
    /// `None` selects the standard catalog.
    pub fn build(
        data_source: Arc<dyn DataSource>,
        type_catalog: Option<&str>,
        procedure_name: &str,
        is_function: bool,
        parameters: &[ParameterSpec],
    ) -> Result<Self> {
        let mut builder = Self::builder(data_source, procedure_name)
            .function(is_function)
            .parameters(parameters.iter().cloned());
        if let Some(catalog) = type_catalog {
            builder = builder.type_catalog(catalog);
        }
        builder.build()
    }

    pub fn builder(
        data_source: Arc<dyn DataSource>,
        procedure_name: impl Into<String>,
    ) -> CallDefinitionBuilder {
        CallDefinitionBuilder::new(data_source, procedure_name)
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Driver-facing signature: routine name and ordered parameters
    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    pub fn procedure_name(&self) -> &str {
        self.signature.name()
    }

    pub fn is_function(&self) -> bool {
        self.signature.is_function()
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[CallParameter] {
        self.signature.parameters()
    }

    /// Names of IN and INOUT parameters
    pub fn in_parameter_names(&self) -> &HashSet<String> {
        &self.in_parameter_names
    }

    /// Value source overrides, keyed by IN or INOUT parameter name
    pub fn value_sources(&self) -> &HashMap<String, ValueSource> {
        &self.value_sources
    }

    /// Row mapper of a cursor or result-set output
    pub fn row_mapper(&self, parameter: &str) -> Option<&Arc<dyn RowMapper>> {
        self.row_mappers.get(parameter)
    }
}

impl fmt::Debug for CompiledCallDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut row_mapped: Vec<&String> = self.row_mappers.keys().collect();
        row_mapped.sort();
        f.debug_struct("CompiledCallDefinition")
            .field("signature", &self.signature)
            .field("in_parameter_names", &self.in_parameter_names)
            .field("value_sources", &self.value_sources)
            .field("row_mapped", &row_mapped)
            .finish_non_exhaustive()
    }
}

/// Collects the configuration of one call definition
pub struct CallDefinitionBuilder {
    data_source: Arc<dyn DataSource>,
    procedure_name: String,
    type_catalog: Option<String>,
    is_function: bool,
    parameters: Vec<ParameterSpec>,
    catalogs: TypeCatalogRegistry,
}

impl CallDefinitionBuilder {
    pub fn new(data_source: Arc<dyn DataSource>, procedure_name: impl Into<String>) -> Self {
        Self {
            data_source,
            procedure_name: procedure_name.into(),
            type_catalog: None,
            is_function: false,
            parameters: Vec::new(),
            catalogs: TypeCatalogRegistry::default(),
        }
    }

    /// Resolve parameter types in the named catalog instead of the standard one
    pub fn type_catalog(mut self, name: impl Into<String>) -> Self {
        self.type_catalog = Some(name.into());
        self
    }

    /// Registry the type catalog name is looked up in
    pub fn catalogs(mut self, catalogs: TypeCatalogRegistry) -> Self {
        self.catalogs = catalogs;
        self
    }

    /// Call a function rather than a procedure
    pub fn function(mut self, is_function: bool) -> Self {
        self.is_function = is_function;
        self
    }

    pub fn parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn parameters(mut self, specs: impl IntoIterator<Item = ParameterSpec>) -> Self {
        self.parameters.extend(specs);
        self
    }

    /// Validate every parameter and compile the definition
    pub fn build(self) -> Result<CompiledCallDefinition> {
        let catalog = self.catalogs.resolve(self.type_catalog.as_deref())?;

        let compiled = self
            .parameters
            .iter()
            .enumerate()
            .try_fold(Compilation::default(), |compilation, (index, spec)| {
                compilation.push(compile_parameter(index, spec, catalog.as_ref())?)
            })?;

        validate_routine_name(&self.procedure_name)?;

        let signature = CallSignature::new(
            self.procedure_name.trim(),
            self.is_function,
            catalog.name(),
            compiled.parameters,
        );

        tracing::debug!(
            procedure = %signature.name(),
            is_function = signature.is_function(),
            type_catalog = %signature.type_catalog(),
            parameters = signature.parameters().len(),
            call = %signature,
            "compiled call definition"
        );

        Ok(CompiledCallDefinition {
            data_source: self.data_source,
            signature,
            in_parameter_names: compiled.in_parameter_names,
            value_sources: compiled.value_sources,
            row_mappers: compiled.row_mappers,
        })
    }
}

/// A single validated parameter
struct CompiledParameter {
    call: CallParameter,
    value_source: Option<ValueSource>,
    row_mapper: Option<Arc<dyn RowMapper>>,
}

/// Accumulator of the parameter fold
#[derive(Default)]
struct Compilation {
    parameters: Vec<CallParameter>,
    in_parameter_names: HashSet<String>,
    value_sources: HashMap<String, ValueSource>,
    row_mappers: HashMap<String, Arc<dyn RowMapper>>,
}

impl Compilation {
    fn push(mut self, parameter: CompiledParameter) -> Result<Self> {
        let name = parameter.call.name.clone();
        if self
            .parameters
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&name))
        {
            return Err(ProcedureError::DuplicateParameter(name));
        }

        if parameter.call.is_input() {
            self.in_parameter_names.insert(name.clone());
            if let Some(source) = parameter.value_source {
                self.value_sources.insert(name.clone(), source);
            }
        }
        if let Some(mapper) = parameter.row_mapper {
            self.row_mappers.insert(name, mapper);
        }
        self.parameters.push(parameter.call);
        Ok(self)
    }
}

fn required<'a>(
    index: usize,
    field: &'a Option<String>,
    missing: &'static str,
) -> Result<&'a str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ProcedureError::IncompleteParameter { index, missing })
}

fn compile_parameter(
    index: usize,
    spec: &ParameterSpec,
    catalog: &dyn TypeCatalog,
) -> Result<CompiledParameter> {
    let name = required(index, &spec.name, "name")?;
    let mode = required(index, &spec.mode, "mode")?;
    let type_name = required(index, &spec.type_name, "type")?;

    // Row tokens never reach the catalog.
    let sql_type = match SqlType::from_row_token(type_name) {
        Some(row_type) => row_type,
        None => catalog.resolve(type_name).map(SqlType::Code).ok_or_else(|| {
            ProcedureError::UnknownParameterType {
                name: name.to_string(),
                type_name: type_name.to_string(),
                catalog: catalog.name().to_string(),
            }
        })?,
    };

    let direction =
        ParameterDirection::parse(mode).ok_or_else(|| ProcedureError::InvalidParameterMode {
            name: name.to_string(),
            mode: mode.to_string(),
        })?;

    let row_mapper = match direction {
        ParameterDirection::In | ParameterDirection::InOut if sql_type.is_row_producing() => {
            return Err(ProcedureError::InvalidRowParameter {
                name: name.to_string(),
                mode: direction.to_string(),
            });
        }
        ParameterDirection::Out if sql_type.is_row_producing() => Some(
            spec.row_mapper
                .clone()
                .unwrap_or_else(|| Arc::new(ColumnMapRowMapper)),
        ),
        _ => {
            if spec.row_mapper.is_some() {
                tracing::debug!(parameter = %name, "row mapper ignored for scalar parameter");
            }
            None
        }
    };

    let value_from = spec
        .value_from
        .as_deref()
        .filter(|source| !source.trim().is_empty());
    let value_source = match value_from {
        Some(source) if direction.is_input() => Some(ValueSource::parse(source)),
        Some(_) => {
            tracing::debug!(parameter = %name, "value source ignored for OUT parameter");
            None
        }
        None => None,
    };

    Ok(CompiledParameter {
        call: CallParameter::new(name, direction, sql_type, type_name),
        value_source,
        row_mapper,
    })
}

/// Routine names go into call statements verbatim, so only identifier
/// characters, schema dots and identifier quotes are accepted.
fn validate_routine_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProcedureError::InvalidCallDefinition(
            "procedure name is empty".into(),
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '"')))
    {
        return Err(ProcedureError::InvalidCallDefinition(format!(
            "procedure name '{}' contains '{}'",
            name, c
        )));
    }
    if name.split('.').any(|part| part.is_empty()) {
        return Err(ProcedureError::InvalidCallDefinition(format!(
            "procedure name '{}' has an empty qualifier",
            name
        )));
    }
    Ok(())
}
