//! Per-invocation inputs and outputs

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use zqlz_core::Value;

/// What the calling framework hands over for one invocation: the message
/// body and its named fields (headers, attributes)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    body: Value,
    fields: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            fields: HashMap::new(),
        }
    }

    /// Build a context from a body and an existing field map
    pub fn from_parts<K, V>(body: impl Into<Value>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            body: body.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Output values of one invocation, keyed by parameter name in declaration
/// order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InvocationResult {
    outputs: IndexMap<String, Value>,
}

impl InvocationResult {
    pub(crate) fn new(outputs: IndexMap<String, Value>) -> Self {
        Self { outputs }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.outputs.iter()
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        self.outputs
    }
}

impl IntoIterator for InvocationResult {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.into_iter()
    }
}
