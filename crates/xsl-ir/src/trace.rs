//! Trace events captured while an XSLT engine transformed a probe document

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::expression::Expression;
use crate::{Error, Result};

/// Location of the context node an expression was evaluated against,
/// written as an absolute path of element names (`/catalog/entry`), optionally
/// ending in an attribute (`/catalog/entry/@href`). `/` alone is the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextPath {
    elements: Vec<String>,
    attribute: Option<String>,
}

impl ContextPath {
    /// The document node
    #[must_use]
    pub fn document() -> Self {
        Self::default()
    }

    /// Path of nested elements starting at a root element
    pub fn elements<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: names.into_iter().map(Into::into).collect(),
            attribute: None,
        }
    }

    /// Extend this path with an attribute of its last element
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Element names from the root element down
    #[must_use]
    pub fn element_names(&self) -> &[String] {
        &self.elements
    }

    /// Trailing attribute name, if the context is an attribute
    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Whether this path denotes the document node
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.elements.is_empty() && self.attribute.is_none()
    }
}

impl fmt::Display for ContextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_document() {
            return f.write_str("/");
        }
        for name in &self.elements {
            write!(f, "/{name}")?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "/@{attribute}")?;
        }
        Ok(())
    }
}

impl FromStr for ContextPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| Error::invalid_context_path(s, "path must be absolute"))?;
        let mut path = ContextPath::document();
        if rest.is_empty() {
            return Ok(path);
        }

        let segments: Vec<&str> = rest.split('/').collect();
        for (idx, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(Error::invalid_context_path(s, "empty step"));
            }
            if let Some(attribute) = segment.strip_prefix('@') {
                if idx + 1 != segments.len() {
                    return Err(Error::invalid_context_path(
                        s,
                        "attribute step must be last",
                    ));
                }
                if attribute.is_empty() || path.elements.is_empty() {
                    return Err(Error::invalid_context_path(
                        s,
                        "attribute step needs a name and an owning element",
                    ));
                }
                path.attribute = Some(attribute.to_string());
            } else {
                path.elements.push((*segment).to_string());
            }
        }
        Ok(path)
    }
}

impl TryFrom<String> for ContextPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContextPath> for String {
    fn from(path: ContextPath) -> Self {
        path.to_string()
    }
}

/// One expression evaluation reported by the XSLT engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Context node at evaluation time
    pub context: ContextPath,

    /// Expression that was evaluated
    pub expression: Expression,
}

impl TraceEvent {
    /// Create a new trace event
    #[must_use]
    pub fn new(context: ContextPath, expression: Expression) -> Self {
        Self {
            context,
            expression,
        }
    }
}
