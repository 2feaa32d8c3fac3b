#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # xsl-ir
//!
//! Intermediate representation of the query expressions an XSLT engine
//! evaluates while transforming a probe document, together with the trace
//! events and document containers that carry them.
//!
//! Expressions are a closed enumeration of the shapes the schema-evolution
//! interpreter understands, plus an explicit `Other` arm so that traces from
//! a richer engine still deserialize.

/// Probe document and rendered output containers.
pub mod document;
/// Expression and node-test trees.
pub mod expression;
/// Qualified names.
pub mod name;
/// Trace events captured during a transformation.
pub mod trace;

pub use document::{HtmlDocumentContainer, XmlDocumentContainer};
pub use expression::{
    Axis, ComparisonOperator, Expression, NodeKind, NodeTest, SetOperator, UnaryKind,
};
pub use name::QName;
pub use trace::{ContextPath, TraceEvent};

use thiserror::Error;

/// Errors that can occur when working with the IR
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid qualified name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid context path '{path}': {reason}")]
    InvalidContextPath { path: String, reason: String },
}

impl Error {
    /// Build an invalid-name error with the rejected input.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid-context-path error with the rejected input.
    pub fn invalid_context_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidContextPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
