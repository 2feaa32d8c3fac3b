//! Schema loader for YAML and JSON schema files
//!
//! Files use the model's serialized form. Ids may be omitted; the loader
//! derives stable ones from names (`catalogType`, `catalogType/entry`,
//! `catalogType@lang`, `/catalog`, `$title`) and resolves element type
//! references given by name.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::model::{ElementReference, Schema};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};

/// Loads schema files and registers them
pub struct SchemaLoader {
    registry: Arc<SchemaRegistry>,
}

impl SchemaLoader {
    /// Create a loader with its own registry
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SchemaRegistry::new()),
        }
    }

    /// Create a loader that registers into an existing registry
    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Registry the loader registers into
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Load, normalize and register a schema file; `.yaml`/`.yml` files are
    /// read as YAML, anything else as JSON
    pub fn load_from_file(&self, path: &Path) -> Result<Arc<Schema>> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        let schema = if is_yaml(path) {
            self.load_from_yaml(&content)?
        } else {
            self.load_from_json(&content)?
        };

        info!(
            "Loaded schema {} ({} types)",
            schema.qualified_name(),
            schema.element_types.len()
        );
        Ok(self.registry.register(schema))
    }

    /// Parse and normalize a schema from a JSON string
    pub fn load_from_json(&self, json: &str) -> Result<Schema> {
        let schema: Schema = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        normalize(schema)
    }

    /// Parse and normalize a schema from a YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Schema> {
        let schema: Schema = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        normalize(schema)
    }

    /// Write a schema, choosing YAML or JSON by extension
    pub fn save_to_file(schema: &Schema, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(schema).map_err(|e| Error::Parse(e.to_string()))?
        } else {
            serde_json::to_string_pretty(schema).map_err(|e| Error::Parse(e.to_string()))?
        };
        std::fs::write(path, content)?;
        debug!("Wrote schema {} to {:?}", schema.qualified_name(), path);
        Ok(())
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
}

/// Fill in missing ids and resolve type references given by name
fn normalize(mut schema: Schema) -> Result<Schema> {
    let mut type_ids = HashSet::new();
    for element_type in &mut schema.element_types {
        if element_type.id.is_empty() {
            element_type.id.clone_from(&element_type.name);
        }
        if !type_ids.insert(element_type.id.clone()) {
            return Err(Error::InvalidFormat(format!(
                "duplicate element type id '{}'",
                element_type.id
            )));
        }
    }

    let ids_by_name: HashMap<String, String> = schema
        .element_types
        .iter()
        .map(|t| (t.name.clone(), t.id.clone()))
        .collect();

    let resolve = |reference: &mut ElementReference| -> Result<()> {
        if type_ids.contains(&reference.element_type) {
            return Ok(());
        }
        match ids_by_name.get(&reference.element_type) {
            Some(id) => {
                reference.element_type.clone_from(id);
                Ok(())
            }
            None => Err(Error::InvalidFormat(format!(
                "element '{}' references unknown type '{}'",
                reference.name, reference.element_type
            ))),
        }
    };

    for reference in &mut schema.root_elements {
        if reference.id.is_empty() {
            reference.id = format!("/{}", reference.name);
        }
        resolve(reference)?;
    }

    for element_type in &mut schema.element_types {
        for attribute in &mut element_type.attributes {
            if attribute.id.is_empty() {
                attribute.id = format!("{}@{}", element_type.id, attribute.name);
            }
        }
        for reference in &mut element_type.sub_elements {
            if reference.id.is_empty() {
                reference.id = format!("{}/{}", element_type.id, reference.name);
            }
            resolve(reference)?;
        }
    }

    for parameter in &mut schema.parameters {
        if parameter.id.is_empty() {
            parameter.id = format!("${}", parameter.name);
        }
    }

    Ok(schema)
}
