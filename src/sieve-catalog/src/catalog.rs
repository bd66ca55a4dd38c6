//! Catalog of table metadata.

use std::collections::HashMap;
use std::sync::Arc;

use crate::metadata::TableMetadata;

/// Table metadata by name.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Arc<TableMetadata>>,
}

impl Catalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its own name, returning the metadata it replaces.
    pub fn register(&mut self, metadata: TableMetadata) -> Option<Arc<TableMetadata>> {
        self.tables
            .insert(metadata.name().to_string(), Arc::new(metadata))
    }

    /// Get a table by name.
    pub fn get(&self, name: &str) -> Option<&Arc<TableMetadata>> {
        self.tables.get(name)
    }

    /// Remove a table.
    pub fn remove(&mut self, name: &str) -> Option<Arc<TableMetadata>> {
        self.tables.remove(name)
    }

    /// List all table names.
    pub fn list(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Check if a table exists.
    pub fn exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_operations() {
        let mut catalog = Catalog::new();

        let metadata = TableMetadata::builder("orders").build().unwrap();
        assert!(catalog.register(metadata).is_none());

        assert!(catalog.exists("orders"));
        assert!(!catalog.exists("customers"));
        assert_eq!(catalog.list(), vec!["orders"]);

        let first = catalog.get("orders").unwrap().snapshot_id();
        let replaced = catalog
            .register(TableMetadata::builder("orders").build().unwrap())
            .unwrap();
        assert_eq!(replaced.snapshot_id(), first);
        assert_ne!(catalog.get("orders").unwrap().snapshot_id(), first);

        assert!(catalog.remove("orders").is_some());
        assert!(catalog.list().is_empty());
    }
}
