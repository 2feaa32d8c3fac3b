//! # xsl-schema
//!
//! Schema meta-model for the XML inputs of an XSLT stylesheet, the schema
//! modifier delta language, and the services around them: a concurrent
//! schema registry, a YAML/JSON loader and the modification processor that
//! materializes the next schema version from a consolidated modifier set.

pub mod loader;
pub mod model;
pub mod modifier;
pub mod processor;
pub mod registry;

pub use loader::SchemaLoader;
pub use model::{
    Attribute, AttributeUsage, ContentType, DataType, ElementReference, ElementType, Parameter,
    Schema,
};
pub use modifier::{ProposedAttribute, ProposedElement, ProposedParameter, SchemaModifier, Structural};
pub use processor::SchemaModificationProcessor;
pub use registry::{SchemaManager, SchemaRegistry};

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {uri} version {version}")]
    NotFound { uri: String, version: u32 },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error(
        "Modifier for {found_uri} version {found_version} does not apply to {expected_uri} version {expected_version}"
    )]
    SchemaMismatch {
        expected_uri: String,
        expected_version: u32,
        found_uri: String,
        found_version: u32,
    },

    #[error("Modifier '{modifier}' references unknown element '{element_id}'")]
    UnresolvedReference { modifier: String, element_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Build a not-found error for a schema version.
    pub fn not_found(uri: impl Into<String>, version: u32) -> Self {
        Self::NotFound {
            uri: uri.into(),
            version,
        }
    }

    /// Build a schema-mismatch error from the expected and offending scopes.
    pub fn schema_mismatch(
        expected_uri: impl Into<String>,
        expected_version: u32,
        found_uri: impl Into<String>,
        found_version: u32,
    ) -> Self {
        Self::SchemaMismatch {
            expected_uri: expected_uri.into(),
            expected_version,
            found_uri: found_uri.into(),
            found_version,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
