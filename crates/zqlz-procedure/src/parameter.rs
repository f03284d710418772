//! Declarative parameter specifications

use std::fmt;
use std::sync::Arc;

use crate::RowMapper;

/// One parameter as configured, before validation.
///
/// Every field is optional here so that incomplete specifications can be
/// reported by the builder instead of being unrepresentable.
#[derive(Clone, Default)]
pub struct ParameterSpec {
    /// Parameter name
    pub name: Option<String>,
    /// `in`, `out` or `inout`, any case
    pub mode: Option<String>,
    /// Type name in the definition's type catalog, or `cursor` / `resultset`
    pub type_name: Option<String>,
    /// `body` or the name of a request field to bind from
    pub value_from: Option<String>,
    /// Row mapper for cursor and result-set outputs
    pub row_mapper: Option<Arc<dyn RowMapper>>,
}

impl ParameterSpec {
    pub fn new(
        name: impl Into<String>,
        mode: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            mode: Some(mode.into()),
            type_name: Some(type_name.into()),
            value_from: None,
            row_mapper: None,
        }
    }

    pub fn input(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, "in", type_name)
    }

    pub fn output(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, "out", type_name)
    }

    pub fn in_out(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, "inout", type_name)
    }

    pub fn value_from(mut self, source: impl Into<String>) -> Self {
        self.value_from = Some(source.into());
        self
    }

    pub fn row_mapper(mut self, mapper: Arc<dyn RowMapper>) -> Self {
        self.row_mapper = Some(mapper);
        self
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("type_name", &self.type_name)
            .field("value_from", &self.value_from)
            .field("row_mapper", &self.row_mapper.as_ref().map(|_| "<row mapper>"))
            .finish()
    }
}

/// Where an IN or INOUT parameter takes its value from, when not from the
/// request field of the same name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// The request body
    Body,
    /// Another request field
    Field(String),
}

impl ValueSource {
    /// Token selecting the request body
    pub const BODY_TOKEN: &'static str = "body";

    /// `body` in any case selects the body; anything else names a field
    pub fn parse(source: &str) -> Self {
        if source.trim().eq_ignore_ascii_case(Self::BODY_TOKEN) {
            ValueSource::Body
        } else {
            ValueSource::Field(source.to_string())
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Body => f.write_str(Self::BODY_TOKEN),
            ValueSource::Field(name) => write!(f, "field '{}'", name),
        }
    }
}
