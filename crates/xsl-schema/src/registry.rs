//! Schema registry keyed by URI and version

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::model::Schema;
use crate::{Error, Result};

/// Read access to committed schema versions
pub trait SchemaManager: Send + Sync {
    /// Schema for `uri` at `version`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the version is unknown.
    fn get_schema(&self, uri: &str, version: u32) -> Result<Arc<Schema>>;

    /// Highest registered version of `uri`
    fn latest_version(&self, uri: &str) -> Option<u32>;
}

/// Concurrent registry of schema versions, shared between analyses
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<(String, u32), Arc<Schema>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Register a schema, replacing any previous schema with the same URI and version
    pub fn register(&self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        debug!("Registering schema {}", schema.qualified_name());
        self.schemas
            .insert((schema.uri.clone(), schema.version), Arc::clone(&schema));
        schema
    }

    /// Get a schema by URI and version
    pub fn get(&self, uri: &str, version: u32) -> Option<Arc<Schema>> {
        let found = self
            .schemas
            .get(&(uri.to_string(), version))
            .map(|entry| Arc::clone(entry.value()));
        trace!(uri, version, hit = found.is_some(), "Schema lookup");
        found
    }

    /// Check if a schema version exists
    pub fn contains(&self, uri: &str, version: u32) -> bool {
        self.schemas.contains_key(&(uri.to_string(), version))
    }

    /// Number of registered schema versions
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaManager for SchemaRegistry {
    fn get_schema(&self, uri: &str, version: u32) -> Result<Arc<Schema>> {
        self.get(uri, version)
            .ok_or_else(|| Error::not_found(uri, version))
    }

    fn latest_version(&self, uri: &str) -> Option<u32> {
        self.schemas
            .iter()
            .filter(|entry| entry.key().0 == uri)
            .map(|entry| entry.key().1)
            .max()
    }
}
