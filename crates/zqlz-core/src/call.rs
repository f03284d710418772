//! Stored procedure and function call signatures
//!
//! A [`CallSignature`] is the driver-facing half of a compiled procedure
//! definition: the routine name, whether it is a function, and the ordered
//! list of parameters with their direction and resolved SQL type. Drivers
//! receive it together with the bound input values and answer with one
//! [`CallOutput`] per output parameter.

use std::collections::HashMap;
use std::fmt;

use crate::{Row, Value};

/// Direction of a call parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterDirection {
    /// Supplied by the caller, never read back
    In,
    /// Produced by the call
    Out,
    /// Supplied by the caller and produced by the call
    InOut,
}

impl ParameterDirection {
    /// Parse a mode keyword (`in`, `out`, `inout`), ignoring ASCII case
    pub fn parse(mode: &str) -> Option<Self> {
        let mode = mode.trim();
        if mode.eq_ignore_ascii_case("in") {
            Some(Self::In)
        } else if mode.eq_ignore_ascii_case("out") {
            Some(Self::Out)
        } else if mode.eq_ignore_ascii_case("inout") {
            Some(Self::InOut)
        } else {
            None
        }
    }

    /// Whether the caller supplies a value for this direction
    pub fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    /// Whether the call produces a value for this direction
    pub fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        }
    }
}

impl fmt::Display for ParameterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved SQL type of a call parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Numeric code from a type catalog
    Code(i32),
    /// An OUT parameter holding an open cursor
    Cursor,
    /// Rows returned by the call itself rather than through a parameter
    ResultSet,
}

impl SqlType {
    /// Token that declares a cursor parameter
    pub const CURSOR_TOKEN: &'static str = "cursor";
    /// Token that declares a result-set parameter
    pub const RESULT_SET_TOKEN: &'static str = "resultset";

    /// Recognize the `cursor` / `resultset` tokens, ignoring ASCII case
    pub fn from_row_token(type_name: &str) -> Option<Self> {
        let type_name = type_name.trim();
        if type_name.eq_ignore_ascii_case(Self::CURSOR_TOKEN) {
            Some(Self::Cursor)
        } else if type_name.eq_ignore_ascii_case(Self::RESULT_SET_TOKEN) {
            Some(Self::ResultSet)
        } else {
            None
        }
    }

    /// Whether values of this type are sequences of rows
    pub fn is_row_producing(self) -> bool {
        matches!(self, Self::Cursor | Self::ResultSet)
    }

    /// The catalog code, if this is a plain SQL type
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }
}

/// One declared parameter of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParameter {
    /// Parameter name, also the binding key
    pub name: String,
    /// Parameter direction
    pub direction: ParameterDirection,
    /// Resolved type
    pub sql_type: SqlType,
    /// Type name as declared, before resolution
    pub type_name: String,
}

impl CallParameter {
    pub fn new(
        name: impl Into<String>,
        direction: ParameterDirection,
        sql_type: SqlType,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            sql_type,
            type_name: type_name.into(),
        }
    }

    /// Whether the caller binds a value for this parameter
    pub fn is_input(&self) -> bool {
        self.direction.is_input()
    }

    /// Whether the call reports a value for this parameter
    pub fn is_output(&self) -> bool {
        self.direction.is_output()
    }

    /// Whether this parameter occupies a placeholder in the call statement.
    /// Result sets come back from the call itself and take no slot.
    pub fn takes_placeholder(&self) -> bool {
        self.sql_type != SqlType::ResultSet
    }
}

/// A compiled, driver-facing description of a procedure or function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    name: String,
    is_function: bool,
    type_catalog: String,
    parameters: Vec<CallParameter>,
}

impl CallSignature {
    pub fn new(
        name: impl Into<String>,
        is_function: bool,
        type_catalog: impl Into<String>,
        parameters: Vec<CallParameter>,
    ) -> Self {
        Self {
            name: name.into(),
            is_function,
            type_catalog: type_catalog.into(),
            parameters,
        }
    }

    /// Procedure or function name, possibly schema-qualified
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_function(&self) -> bool {
        self.is_function
    }

    /// Name of the catalog the parameter type codes were resolved against
    pub fn type_catalog(&self) -> &str {
        &self.type_catalog
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[CallParameter] {
        &self.parameters
    }

    /// Find a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&CallParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// IN and INOUT parameters in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &CallParameter> {
        self.parameters.iter().filter(|p| p.is_input())
    }

    /// OUT and INOUT parameters in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &CallParameter> {
        self.parameters.iter().filter(|p| p.is_output())
    }

    /// Whether any output is an open cursor
    pub fn has_cursor_outputs(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.sql_type == SqlType::Cursor)
    }
}

/// Renders the portable escape syntax, e.g. `{? = call f(?, ?)}`.
///
/// For functions the first placeholder-taking OUT parameter is the return
/// value.
impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots = self.parameters.iter().filter(|p| p.takes_placeholder());
        let returns_value = self.is_function
            && self
                .parameters
                .iter()
                .find(|p| p.takes_placeholder())
                .is_some_and(|p| p.direction == ParameterDirection::Out);

        if returns_value {
            slots.next();
            write!(f, "{{? = call {}(", self.name)?;
        } else {
            write!(f, "{{call {}(", self.name)?;
        }
        let placeholders: Vec<&str> = slots.map(|_| "?").collect();
        write!(f, "{})}}", placeholders.join(", "))
    }
}

/// Value a connection produced for one output parameter
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    /// A scalar as mapped by the driver
    Scalar(Value),
    /// Rows read from a cursor or a result set
    Rows(Vec<Row>),
}

/// Outputs of one call, keyed by parameter name
pub type CallOutputs = HashMap<String, CallOutput>;
