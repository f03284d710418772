//! Error types for procedure definition and invocation

use thiserror::Error;
use zqlz_core::ZqlzError;

/// Errors raised while compiling a procedure definition or invoking it
#[derive(Error, Debug)]
pub enum ProcedureError {
    #[error("parameter #{index} is not sufficiently configured: missing {missing}")]
    IncompleteParameter { index: usize, missing: &'static str },

    #[error("invalid mode '{mode}' for parameter '{name}'")]
    InvalidParameterMode { name: String, mode: String },

    #[error("unknown type '{type_name}' for parameter '{name}' in type catalog '{catalog}'")]
    UnknownParameterType {
        name: String,
        type_name: String,
        catalog: String,
    },

    #[error("type catalog '{0}' could not be located")]
    TypeCatalogResolutionFailure(String),

    #[error("parameter '{name}' is declared {mode} but row types can only be OUT")]
    InvalidRowParameter { name: String, mode: String },

    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    #[error("invalid call definition: {0}")]
    InvalidCallDefinition(String),

    #[error("unknown row mapper '{0}'")]
    UnknownRowMapper(String),

    #[error("invalid procedure configuration: {0}")]
    Configuration(String),

    #[error("procedure execution failed: {0}")]
    ExecutionFailure(#[from] ZqlzError),
}

impl ProcedureError {
    /// Whether this error comes from compiling a definition rather than
    /// from running it
    pub fn is_build_error(&self) -> bool {
        !matches!(self, ProcedureError::ExecutionFailure(_))
    }
}

impl From<toml::de::Error> for ProcedureError {
    fn from(error: toml::de::Error) -> Self {
        ProcedureError::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for ProcedureError {
    fn from(error: serde_json::Error) -> Self {
        ProcedureError::Configuration(error.to_string())
    }
}

/// Result type alias for procedure operations
pub type Result<T> = std::result::Result<T, ProcedureError>;
