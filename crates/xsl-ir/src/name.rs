//! Qualified names
#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// An expanded XML name: optional namespace URI plus local part.
///
/// Renders in Clark notation (`{uri}local`) when a namespace is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI, `None` for the null namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Local part
    pub local_name: String,
}

impl QName {
    /// Create a name in the null namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a namespaced name
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Local part of the name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Whether this name is in the null namespace
    pub fn is_unqualified(&self) -> bool {
        self.namespace.is_none()
    }

    /// Whether a schema object named `name` (schema names live in the null
    /// namespace) is denoted by this qualified name.
    pub fn matches(&self, name: &str) -> bool {
        self.is_unqualified() && self.local_name == name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

impl FromStr for QName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix('{') {
            let (ns, local) = rest
                .split_once('}')
                .ok_or_else(|| Error::invalid_name(s, "unterminated namespace"))?;
            if local.is_empty() {
                return Err(Error::invalid_name(s, "empty local name"));
            }
            return Ok(Self::namespaced(ns, local));
        }
        if s.is_empty() {
            return Err(Error::invalid_name(s, "empty local name"));
        }
        if s.contains(['{', '}', '/', '@']) {
            return Err(Error::invalid_name(s, "unexpected character"));
        }
        Ok(Self::local(s))
    }
}

impl From<&str> for QName {
    fn from(local_name: &str) -> Self {
        Self::local(local_name)
    }
}
