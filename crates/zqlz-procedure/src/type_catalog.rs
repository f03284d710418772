//! Registry of type catalogs available to procedure definitions

use std::collections::HashMap;
use std::sync::Arc;

use zqlz_core::{StandardTypeCatalog, TypeCatalog, STANDARD_TYPE_CATALOG};

use crate::{ProcedureError, Result};

/// Type catalogs addressable by name.
///
/// The default registry holds only the standard catalog; vendor catalogs
/// are added with [`register`](Self::register).
#[derive(Clone)]
pub struct TypeCatalogRegistry {
    catalogs: HashMap<String, Arc<dyn TypeCatalog>>,
}

impl TypeCatalogRegistry {
    pub fn empty() -> Self {
        Self {
            catalogs: HashMap::new(),
        }
    }

    /// Register a catalog under its own name, replacing any previous one
    pub fn register(&mut self, catalog: Arc<dyn TypeCatalog>) -> &mut Self {
        self.catalogs
            .insert(catalog.name().to_ascii_lowercase(), catalog);
        self
    }

    pub fn with(mut self, catalog: Arc<dyn TypeCatalog>) -> Self {
        self.register(catalog);
        self
    }

    /// Locate a catalog; `None` selects the standard catalog
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn TypeCatalog>> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(STANDARD_TYPE_CATALOG);
        self.catalogs
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ProcedureError::TypeCatalogResolutionFailure(name.to_string()))
    }
}

impl Default for TypeCatalogRegistry {
    fn default() -> Self {
        Self::empty().with(Arc::new(StandardTypeCatalog::new()))
    }
}
