//! PostgreSQL type catalog
//!
//! Resolves PostgreSQL type names and their common SQL spellings to type
//! OIDs, so a definition compiled against the `postgres` catalog carries the
//! exact server types of its parameters.

use tokio_postgres::types::Type;
use zqlz_core::TypeCatalog;

pub const POSTGRES_TYPE_CATALOG: &str = "postgres";

/// SQL spellings that differ from the server's internal type names
const ALIASES: &[(&str, &str)] = &[
    ("smallint", "int2"),
    ("integer", "int4"),
    ("int", "int4"),
    ("bigint", "int8"),
    ("real", "float4"),
    ("double precision", "float8"),
    ("double", "float8"),
    ("decimal", "numeric"),
    ("boolean", "bool"),
    ("character varying", "varchar"),
    ("character", "bpchar"),
    ("char", "bpchar"),
    ("timestamp without time zone", "timestamp"),
    ("timestamp with time zone", "timestamptz"),
    ("time without time zone", "time"),
    ("time with time zone", "timetz"),
    ("cursor", "refcursor"),
];

/// Built-in PostgreSQL types a parameter can be declared with
fn builtin_types() -> Vec<Type> {
    vec![
        Type::BOOL,
        Type::BYTEA,
        Type::NAME,
        Type::INT2,
        Type::INT4,
        Type::INT8,
        Type::OID,
        Type::TEXT,
        Type::JSON,
        Type::JSONB,
        Type::XML,
        Type::FLOAT4,
        Type::FLOAT8,
        Type::MONEY,
        Type::BPCHAR,
        Type::VARCHAR,
        Type::DATE,
        Type::TIME,
        Type::TIMETZ,
        Type::TIMESTAMP,
        Type::TIMESTAMPTZ,
        Type::INTERVAL,
        Type::NUMERIC,
        Type::UUID,
        Type::INET,
        Type::CIDR,
        Type::REFCURSOR,
        Type::RECORD,
        Type::VOID,
        Type::INT4_ARRAY,
        Type::INT8_ARRAY,
        Type::TEXT_ARRAY,
        Type::VARCHAR_ARRAY,
    ]
}

/// Catalog of PostgreSQL types, keyed case-insensitively by name
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresTypeCatalog;

impl PostgresTypeCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Look up the server type for a name
    pub fn lookup(type_name: &str) -> Option<Type> {
        let normalized = type_name.trim().to_ascii_lowercase();
        let internal = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map_or(normalized.as_str(), |(_, internal)| *internal);
        builtin_types().into_iter().find(|ty| ty.name() == internal)
    }

    /// The server type for an OID produced by this catalog
    pub fn type_for_code(code: i32) -> Option<Type> {
        u32::try_from(code).ok().and_then(Type::from_oid)
    }
}

impl TypeCatalog for PostgresTypeCatalog {
    fn name(&self) -> &str {
        POSTGRES_TYPE_CATALOG
    }

    fn resolve(&self, type_name: &str) -> Option<i32> {
        Self::lookup(type_name).and_then(|ty| i32::try_from(ty.oid()).ok())
    }
}

#[cfg(test)]
mod tests;
