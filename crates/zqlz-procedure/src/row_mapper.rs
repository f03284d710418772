//! Row mapping strategies for cursor and result-set outputs

use std::collections::HashMap;
use std::sync::Arc;

use zqlz_core::{Result, Row, Value, ZqlzError};

/// Converts one result row into one application-level value
pub trait RowMapper: Send + Sync {
    /// Map the row at `row_index` (0-based) of a cursor or result set
    fn map_row(&self, row: &Row, row_index: usize) -> Result<Value>;
}

impl<F> RowMapper for F
where
    F: Fn(&Row, usize) -> Result<Value> + Send + Sync,
{
    fn map_row(&self, row: &Row, row_index: usize) -> Result<Value> {
        self(row, row_index)
    }
}

/// Maps each row to a `Value::Object` of column name to value.
///
/// This is the mapper used when a cursor or result-set parameter does not
/// configure one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnMapRowMapper;

impl RowMapper for ColumnMapRowMapper {
    fn map_row(&self, row: &Row, _row_index: usize) -> Result<Value> {
        Ok(Value::Object(row.to_map()))
    }
}

/// Maps each row to the value of a single column
#[derive(Debug, Clone, Default)]
pub struct SingleColumnRowMapper {
    column: Option<String>,
}

impl SingleColumnRowMapper {
    /// Take the first column of every row
    pub fn first() -> Self {
        Self { column: None }
    }

    /// Take the named column of every row
    pub fn named(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
        }
    }
}

impl RowMapper for SingleColumnRowMapper {
    fn map_row(&self, row: &Row, row_index: usize) -> Result<Value> {
        let value = match &self.column {
            Some(column) => row.get_by_name(column).ok_or_else(|| {
                ZqlzError::NotFound(format!("column '{}' in row {}", column, row_index))
            })?,
            None => row
                .get(0)
                .ok_or_else(|| ZqlzError::NotFound(format!("any column in row {}", row_index)))?,
        };
        Ok(value.clone())
    }
}

/// Apply a mapper to every row, stopping at the first failure
pub fn map_rows(mapper: &dyn RowMapper, rows: &[Row]) -> Result<Vec<Value>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| mapper.map_row(row, index))
        .collect()
}

/// Row mappers addressable by name from procedure configuration
#[derive(Clone)]
pub struct RowMapperRegistry {
    mappers: HashMap<String, Arc<dyn RowMapper>>,
}

impl RowMapperRegistry {
    /// Name of [`ColumnMapRowMapper`] in the default registry
    pub const COLUMN_MAP: &'static str = "column_map";
    /// Name of [`SingleColumnRowMapper::first`] in the default registry
    pub const SINGLE_COLUMN: &'static str = "single_column";

    /// An empty registry
    pub fn empty() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    /// Register a mapper; names are matched ignoring ASCII case
    pub fn register(&mut self, name: &str, mapper: Arc<dyn RowMapper>) -> &mut Self {
        self.mappers.insert(name.to_ascii_lowercase(), mapper);
        self
    }

    pub fn with(mut self, name: &str, mapper: Arc<dyn RowMapper>) -> Self {
        self.register(name, mapper);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RowMapper>> {
        self.mappers.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappers.contains_key(&name.to_ascii_lowercase())
    }
}

impl Default for RowMapperRegistry {
    fn default() -> Self {
        Self::empty()
            .with(Self::COLUMN_MAP, Arc::new(ColumnMapRowMapper))
            .with(Self::SINGLE_COLUMN, Arc::new(SingleColumnRowMapper::first()))
    }
}
