//! # xsl-evolution
//!
//! Type-level interpreter for traced XSLT query expressions.
//!
//! Expressions are replayed against a schema instead of a document: every
//! step navigates [`SchemaElementProxy`] values, and any access to an
//! attribute, child element or parameter the schema does not model yet is
//! turned into a [`SchemaModifier`](xsl_schema::SchemaModifier) proposal by
//! the [`ModifierCreationCoordinator`].

pub mod coordinator;
pub mod factory;
pub mod functions;
pub mod items;
pub mod proxy;

pub use coordinator::{CoordinatorReport, ModifierCreationCoordinator, ModifierSink};
pub use factory::{ItemFactory, ItemId};
pub use functions::{FunctionClass, classify_function};
pub use items::EvaluationTreeItem;
pub use proxy::{ProxyKey, ProxyKind, ProxySet, SchemaElementProxy};

use thiserror::Error;

/// Errors that can occur during symbolic evaluation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Expected a {expected} proxy, found {found}")]
    WrongProxyKind { expected: ProxyKind, found: ProxyKind },

    #[error("Unknown evaluation item {0}")]
    UnknownItem(usize),

    #[error("Evaluation item {0} was evaluated before initialization")]
    Uninitialized(usize),
}

impl Error {
    /// Build a wrong-kind error for a payload requested from a proxy.
    pub fn wrong_proxy_kind(expected: ProxyKind, found: ProxyKind) -> Self {
        Self::WrongProxyKind { expected, found }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
