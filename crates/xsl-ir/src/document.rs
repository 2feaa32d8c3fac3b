//! Probe document and rendered output containers
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use serde::{Deserialize, Serialize};

use crate::trace::TraceEvent;

/// A generated probe XML document and the schema it was generated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlDocumentContainer {
    /// Identifier of the probe document
    pub document_id: String,

    /// URI of the stylesheet schema the document was generated from
    pub schema_uri: String,

    /// Schema version the document was generated from
    pub schema_version: u32,
}

impl XmlDocumentContainer {
    /// Create a new container
    pub fn new(document_id: impl Into<String>, schema_uri: impl Into<String>, schema_version: u32) -> Self {
        Self {
            document_id: document_id.into(),
            schema_uri: schema_uri.into(),
            schema_version,
        }
    }
}

/// HTML produced by transforming a probe document, plus the engine trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlDocumentContainer {
    /// Identifier of the rendered output
    pub id: String,

    /// The probe document that was transformed
    pub source: XmlDocumentContainer,

    /// Rendered HTML, when retained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Expression evaluations in engine order
    #[serde(default)]
    pub trace: Vec<TraceEvent>,
}

impl HtmlDocumentContainer {
    /// Create a container without a trace
    pub fn new(id: impl Into<String>, source: XmlDocumentContainer) -> Self {
        Self {
            id: id.into(),
            source,
            html: None,
            trace: Vec::new(),
        }
    }

    /// Attach rendered HTML
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Append a trace event
    pub fn with_event(mut self, event: TraceEvent) -> Self {
        self.trace.push(event);
        self
    }

    /// The originating probe document
    pub fn source(&self) -> &XmlDocumentContainer {
        &self.source
    }

    /// Captured trace events
    pub fn trace_events(&self) -> &[TraceEvent] {
        &self.trace
    }
}
