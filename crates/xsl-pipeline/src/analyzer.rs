//! Value-trace analyzer
//!
//! Runs one probe document's trace through the interpreter: resolve the
//! schema the document was generated against, group the trace by context,
//! evaluate every expression against its context and hand accepted
//! proposals to the caller's sink. Nothing is kept between documents.

use std::sync::Arc;
use tracing::{debug, warn};

use xsl_evolution::{CoordinatorReport, ItemFactory, ModifierCreationCoordinator, ModifierSink};
use xsl_ir::HtmlDocumentContainer;
use xsl_schema::SchemaManager;

use crate::preprocess::TracePreprocessor;
use crate::Result;

/// Outcome of analyzing one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Distinct contexts in the usable trace
    pub contexts: usize,
    /// Expressions evaluated
    pub expressions: usize,
    pub coordinator: CoordinatorReport,
}

impl AnalysisSummary {
    /// Whether the document had any usable trace
    pub fn has_trace(&self) -> bool {
        self.contexts > 0
    }

    /// Proposals handed to the sink
    pub fn proposals(&self) -> usize {
        self.coordinator.accepted
    }
}

/// Drives the interpreter over one document's trace
pub struct ValueTraceAnalyzer {
    schemas: Arc<dyn SchemaManager>,
    preprocessor: Arc<dyn TracePreprocessor>,
}

impl ValueTraceAnalyzer {
    pub fn new(schemas: Arc<dyn SchemaManager>, preprocessor: Arc<dyn TracePreprocessor>) -> Self {
        Self {
            schemas,
            preprocessor,
        }
    }

    /// Analyze `document`, forwarding every accepted proposal to `sink`
    ///
    /// A document without usable trace is not an error: it is logged and
    /// yields an empty summary.
    ///
    /// # Errors
    ///
    /// Fails if the document's schema version is unknown or the
    /// preprocessor rejects the trace.
    pub fn analyze<S: ModifierSink>(
        &self,
        document: &HtmlDocumentContainer,
        sink: S,
    ) -> Result<AnalysisSummary> {
        let source = document.source();
        let schema = self
            .schemas
            .get_schema(&source.schema_uri, source.schema_version)?;

        let events = self.preprocessor.prepare_events(document, &schema)?;
        if events.is_empty() {
            warn!(
                "Document '{}' has no usable trace for {}, nothing to analyze",
                document.id,
                schema.qualified_name()
            );
            return Ok(AnalysisSummary::default());
        }

        let mut factory = ItemFactory::new(ModifierCreationCoordinator::new(Arc::clone(&schema), sink));
        let mut summary = AnalysisSummary {
            contexts: events.len(),
            ..AnalysisSummary::default()
        };
        for (context, expressions) in &events {
            for expression in expressions {
                let item = factory.create_item_for_expression(expression);
                factory.initialize_all_created_items();
                factory.evaluate(item, context)?;
                summary.expressions += 1;
            }
        }

        let (_, report) = factory.into_coordinator().flush();
        summary.coordinator = report;
        debug!(
            document = %document.id,
            contexts = summary.contexts,
            expressions = summary.expressions,
            proposals = report.accepted,
            "Analyzed document"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::PathTracePreprocessor;
    use crate::Error;
    use xsl_ir::{ContextPath, Expression, TraceEvent, XmlDocumentContainer};
    use xsl_schema::{ElementReference, ElementType, Schema, SchemaModifier, SchemaRegistry};

    const URI: &str = "urn:stylesheet:catalog";

    fn analyzer() -> ValueTraceAnalyzer {
        let registry = SchemaRegistry::new();
        registry.register(
            Schema::new(URI, 1)
                .with_root(ElementReference::new("/catalog", "catalog", "catalogType"))
                .with_type(ElementType::new("catalogType", "catalogType")),
        );
        ValueTraceAnalyzer::new(Arc::new(registry), Arc::new(PathTracePreprocessor::new()))
    }

    fn document(version: u32) -> HtmlDocumentContainer {
        HtmlDocumentContainer::new("probe-1", XmlDocumentContainer::new("doc-1", URI, version))
    }

    #[test]
    fn test_trace_produces_proposals() {
        let document = document(1)
            .with_event(TraceEvent::new(
                ContextPath::elements(["catalog"]),
                Expression::path(Expression::child("entry"), Expression::attribute("href")),
            ))
            .with_event(TraceEvent::new(ContextPath::document(), Expression::child("catalog")));

        let mut proposals = Vec::new();
        let summary = analyzer()
            .analyze(&document, |m: SchemaModifier| proposals.push(m))
            .unwrap();

        assert!(summary.has_trace());
        assert_eq!(summary.contexts, 2);
        assert_eq!(summary.expressions, 2);
        assert_eq!(summary.proposals(), 2);
        let names: Vec<&str> = proposals.iter().map(SchemaModifier::name).collect();
        assert_eq!(names, vec!["entry", "href"]);
    }

    #[test]
    fn test_missing_trace_is_not_an_error() {
        let mut proposals = Vec::new();
        let summary = analyzer()
            .analyze(&document(1), |m: SchemaModifier| proposals.push(m))
            .unwrap();

        assert!(!summary.has_trace());
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_unknown_schema_version_propagates() {
        let err = analyzer()
            .analyze(&document(9), Vec::<SchemaModifier>::new())
            .unwrap_err();
        assert!(matches!(err, Error::Schema(xsl_schema::Error::NotFound { version: 9, .. })));
    }
}
