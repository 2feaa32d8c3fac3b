//! Trace preprocessing
//!
//! Turns a document's raw trace into the interpreter's input: for every
//! schema object that was in context when expressions fired, the list of
//! those expressions.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

use xsl_evolution::SchemaElementProxy;
use xsl_ir::{ContextPath, Expression, HtmlDocumentContainer, QName};
use xsl_schema::Schema;

use crate::Result;

/// Expressions grouped by the proxy they were evaluated against, in
/// first-seen order
pub type PreparedEvents = IndexMap<SchemaElementProxy, Vec<Expression>>;

/// Groups a document's trace events by context object
pub trait TracePreprocessor: Send + Sync {
    /// Group the trace of `document`, whose contexts are resolved in `schema`
    ///
    /// # Errors
    ///
    /// Implementations fail on traces they cannot interpret at all; single
    /// unusable events are skipped instead.
    fn prepare_events(
        &self,
        document: &HtmlDocumentContainer,
        schema: &Arc<Schema>,
    ) -> Result<PreparedEvents>;
}

/// Resolves each event's context path by navigating from the document root
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTracePreprocessor;

impl PathTracePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Proxy `path` denotes in `schema`, if the schema models every step
    pub fn resolve(path: &ContextPath, schema: &Arc<Schema>) -> Option<SchemaElementProxy> {
        let mut proxy = SchemaElementProxy::document(Arc::clone(schema));
        for name in path.element_names() {
            proxy = proxy.sub_element(&QName::local(name.as_str()))?.clone();
        }
        match path.attribute_name() {
            Some(attribute) => proxy.sub_attribute(&QName::local(attribute)).cloned(),
            None => Some(proxy),
        }
    }
}

impl TracePreprocessor for PathTracePreprocessor {
    fn prepare_events(
        &self,
        document: &HtmlDocumentContainer,
        schema: &Arc<Schema>,
    ) -> Result<PreparedEvents> {
        let mut prepared = PreparedEvents::new();
        let mut skipped = 0usize;

        for event in document.trace_events() {
            let Some(context) = Self::resolve(&event.context, schema) else {
                skipped += 1;
                debug!(
                    "Context {} of document '{}' is not in {}, skipping event",
                    event.context,
                    document.id,
                    schema.qualified_name()
                );
                continue;
            };
            prepared
                .entry(context)
                .or_default()
                .push(event.expression.clone());
        }

        trace!(
            document = %document.id,
            contexts = prepared.len(),
            skipped,
            "Prepared trace events"
        );
        Ok(prepared)
    }
}
