//! Type catalogs: lookup tables from SQL type names to numeric type codes

/// Name of the catalog used when a procedure does not choose one
pub const STANDARD_TYPE_CATALOG: &str = "standard";

/// A namespace of logical SQL type names and their numeric codes.
///
/// Implementations must treat type names case-insensitively.
pub trait TypeCatalog: Send + Sync {
    /// Catalog identifier used in procedure configuration
    fn name(&self) -> &str;

    /// Resolve a type name to its code, or `None` if the catalog has no such type
    fn resolve(&self, type_name: &str) -> Option<i32>;
}

/// The ANSI/ODBC type codes most drivers accept for parameter declaration
const STANDARD_TYPES: &[(&str, i32)] = &[
    ("BIT", -7),
    ("TINYINT", -6),
    ("SMALLINT", 5),
    ("INTEGER", 4),
    ("BIGINT", -5),
    ("FLOAT", 6),
    ("REAL", 7),
    ("DOUBLE", 8),
    ("NUMERIC", 2),
    ("DECIMAL", 3),
    ("CHAR", 1),
    ("VARCHAR", 12),
    ("LONGVARCHAR", -1),
    ("DATE", 91),
    ("TIME", 92),
    ("TIMESTAMP", 93),
    ("BINARY", -2),
    ("VARBINARY", -3),
    ("LONGVARBINARY", -4),
    ("NULL", 0),
    ("OTHER", 1111),
    ("JAVA_OBJECT", 2000),
    ("DISTINCT", 2001),
    ("STRUCT", 2002),
    ("ARRAY", 2003),
    ("BLOB", 2004),
    ("CLOB", 2005),
    ("REF", 2006),
    ("DATALINK", 70),
    ("BOOLEAN", 16),
    ("ROWID", -8),
    ("NCHAR", -15),
    ("NVARCHAR", -9),
    ("LONGNVARCHAR", -16),
    ("NCLOB", 2011),
    ("SQLXML", 2009),
    ("REF_CURSOR", 2012),
    ("TIME_WITH_TIMEZONE", 2013),
    ("TIMESTAMP_WITH_TIMEZONE", 2014),
];

/// The default catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTypeCatalog;

impl StandardTypeCatalog {
    pub fn new() -> Self {
        Self
    }

    /// All type names in the catalog
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> {
        STANDARD_TYPES.iter().map(|(name, _)| *name)
    }
}

impl TypeCatalog for StandardTypeCatalog {
    fn name(&self) -> &str {
        STANDARD_TYPE_CATALOG
    }

    fn resolve(&self, type_name: &str) -> Option<i32> {
        let type_name = type_name.trim();
        STANDARD_TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(type_name))
            .map(|(_, code)| *code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_resolves_case_insensitively() {
        let catalog = StandardTypeCatalog::new();
        assert_eq!(catalog.resolve("integer"), Some(4));
        assert_eq!(catalog.resolve("INTEGER"), Some(4));
        assert_eq!(catalog.resolve("VarChar"), Some(12));
        assert_eq!(catalog.resolve("timestamp_with_timezone"), Some(2014));
    }

    #[test]
    fn test_standard_catalog_unknown_types() {
        let catalog = StandardTypeCatalog::new();
        assert_eq!(catalog.resolve("NOTATYPE"), None);
        assert_eq!(catalog.resolve("cursor"), None);
        assert_eq!(catalog.resolve(""), None);
    }

    #[test]
    fn test_standard_catalog_names_are_unique() {
        let catalog = StandardTypeCatalog::new();
        let mut names: Vec<_> = catalog.type_names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(catalog.name(), "standard");
    }
}
