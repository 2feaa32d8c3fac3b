//! Modifier creation coordinator
//!
//! Receives access events from evaluation items and turns accesses the
//! schema does not model into schema modifier proposals. One coordinator
//! serves one analysis pass over one schema version; repeated accesses to
//! the same gap within that pass yield the proxy of the first proposal
//! instead of a second one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use xsl_ir::QName;
use xsl_schema::{ProposedAttribute, ProposedElement, ProposedParameter, Schema, SchemaModifier};

use crate::proxy::{ProxyKey, SchemaElementProxy};

/// Receiver of accepted proposals
pub trait ModifierSink {
    fn handle(&mut self, modifier: SchemaModifier);
}

impl<F> ModifierSink for F
where
    F: FnMut(SchemaModifier),
{
    fn handle(&mut self, modifier: SchemaModifier) {
        self(modifier);
    }
}

impl ModifierSink for Vec<SchemaModifier> {
    fn handle(&mut self, modifier: SchemaModifier) {
        self.push(modifier);
    }
}

/// Counters reported when a coordinator is flushed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    /// Proposals forwarded to the sink
    pub accepted: usize,
    /// Accesses answered by an earlier proposal of this pass
    pub suppressed: usize,
    /// Accesses the schema already models
    pub modelled: usize,
    /// Accesses that cannot be expressed as a modifier
    pub ignored: usize,
}

/// Turns unmodelled accesses into deduplicated modifier proposals
pub struct ModifierCreationCoordinator<S: ModifierSink> {
    schema: Arc<Schema>,
    sink: S,
    elements: HashMap<(ProxyKey, String), SchemaElementProxy>,
    attributes: HashMap<(ProxyKey, String), SchemaElementProxy>,
    parameters: HashSet<String>,
    report: CoordinatorReport,
}

impl<S: ModifierSink> ModifierCreationCoordinator<S> {
    /// Create a coordinator for `schema` forwarding proposals to `sink`
    pub fn new(schema: Arc<Schema>, sink: S) -> Self {
        Self {
            schema,
            sink,
            elements: HashMap::new(),
            attributes: HashMap::new(),
            parameters: HashSet::new(),
            report: CoordinatorReport::default(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn report(&self) -> CoordinatorReport {
        self.report
    }

    /// `context` reads attribute `name`
    ///
    /// Returns the proxy the access lands on: the modelled attribute, or a
    /// proposed one. An attribute context reading its own name is modelled
    /// and lands on itself. Returns `None` when `context` cannot carry
    /// attributes.
    pub fn handle_attribute_access(
        &mut self,
        context: &SchemaElementProxy,
        name: &QName,
    ) -> Option<SchemaElementProxy> {
        if let Some(existing) = context.sub_attribute(name) {
            self.report.modelled += 1;
            return Some(existing.clone());
        }
        if context.is_attribute() && names_itself(context, name) {
            self.report.modelled += 1;
            return Some(context.clone());
        }
        let element_id = self.attachment_point(context, name)?;

        let key = (context.key(), name.local_name().to_string());
        if let Some(proposed) = self.attributes.get(&key) {
            self.report.suppressed += 1;
            trace!("Attribute '{}' on {} already proposed", name, context);
            return Some(proposed.clone());
        }

        let attribute = ProposedAttribute::new(
            &self.schema.uri,
            self.schema.version,
            Some(element_id),
            name.local_name(),
        );
        debug!("Proposing attribute '{}' on {}", name, context);
        let proxy = SchemaElementProxy::attribute_modifier(Arc::clone(&self.schema), attribute.clone());
        self.accept(SchemaModifier::Attribute(attribute));
        self.attributes.insert(key, proxy.clone());
        Some(proxy)
    }

    /// `context` navigates into child element `name`
    ///
    /// Returns the modelled or proposed child. An element context naming
    /// itself without a modelled child of that name is modelled and lands on
    /// itself. On the document, a missing name becomes a proposed root
    /// element.
    pub fn handle_element_access(
        &mut self,
        context: &SchemaElementProxy,
        name: &QName,
    ) -> Option<SchemaElementProxy> {
        if let Some(existing) = context.sub_element(name) {
            self.report.modelled += 1;
            return Some(existing.clone());
        }
        if context.is_element() && names_itself(context, name) {
            self.report.modelled += 1;
            return Some(context.clone());
        }
        let parent = if context.is_document() {
            if !name.is_unqualified() {
                self.report.ignored += 1;
                debug!("Not proposing namespaced root element '{}'", name);
                return None;
            }
            None
        } else {
            Some(self.attachment_point(context, name)?)
        };

        let key = (context.key(), name.local_name().to_string());
        if let Some(proposed) = self.elements.get(&key) {
            self.report.suppressed += 1;
            trace!("Element '{}' under {} already proposed", name, context);
            return Some(proposed.clone());
        }

        let element = ProposedElement::new(
            &self.schema.uri,
            self.schema.version,
            parent,
            name.local_name(),
        );
        debug!("Proposing element '{}' under {}", name, context);
        let proxy = SchemaElementProxy::element_modifier(Arc::clone(&self.schema), element.clone());
        self.accept(SchemaModifier::Element(element));
        self.elements.insert(key, proxy.clone());
        Some(proxy)
    }

    /// The expression reads stylesheet parameter `name`
    pub fn handle_parameter_access(&mut self, name: &QName) {
        if !name.is_unqualified() {
            self.report.ignored += 1;
            debug!("Not proposing namespaced parameter '{}'", name);
            return;
        }
        let local = name.local_name();
        if self.schema.parameter(local).is_some() {
            self.report.modelled += 1;
            return;
        }
        if !self.parameters.insert(local.to_string()) {
            self.report.suppressed += 1;
            return;
        }
        debug!("Proposing parameter '{}'", local);
        let parameter = ProposedParameter::new(&self.schema.uri, self.schema.version, local);
        self.accept(SchemaModifier::Parameter(parameter));
    }

    /// End the pass, handing back the sink and the pass counters
    pub fn flush(self) -> (S, CoordinatorReport) {
        debug!(
            accepted = self.report.accepted,
            suppressed = self.report.suppressed,
            "Coordinator flushed"
        );
        (self.sink, self.report)
    }

    /// Element id a modifier for `name` under `context` attaches to
    fn attachment_point(&mut self, context: &SchemaElementProxy, name: &QName) -> Option<String> {
        if !name.is_unqualified() {
            self.report.ignored += 1;
            debug!("Not proposing namespaced name '{}' on {}", name, context);
            return None;
        }
        match context.element_id() {
            Some(id) => Some(id.to_string()),
            None => {
                self.report.ignored += 1;
                trace!("{} cannot carry '{}'", context, name);
                None
            }
        }
    }

    fn accept(&mut self, modifier: SchemaModifier) {
        self.report.accepted += 1;
        self.sink.handle(modifier);
    }
}

/// `name` is the context's own unqualified name
fn names_itself(context: &SchemaElementProxy, name: &QName) -> bool {
    name.is_unqualified() && context.name() == Some(name.local_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsl_schema::{Attribute, ElementReference, ElementType, Parameter};

    const URI: &str = "urn:stylesheet:catalog";

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(URI, 3)
                .with_root(ElementReference::new("/catalog", "catalog", "catalogType"))
                .with_type(
                    ElementType::new("catalogType", "catalogType")
                        .with_attribute(Attribute::new("catalogType@lang", "lang")),
                )
                .with_parameter(Parameter::new("$title", "title")),
        )
    }

    fn catalog(schema: &Arc<Schema>) -> SchemaElementProxy {
        SchemaElementProxy::document(Arc::clone(schema)).sub_elements()[0].clone()
    }

    #[test]
    fn test_modelled_attribute_is_returned_without_proposal() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());

        let lang = coordinator
            .handle_attribute_access(&catalog(&schema), &QName::local("lang"))
            .unwrap();

        assert_eq!(lang.attribute_name().unwrap(), "lang");
        let (proposals, report) = coordinator.flush();
        assert!(proposals.is_empty());
        assert_eq!(report.modelled, 1);
    }

    #[test]
    fn test_missing_attribute_is_proposed_once() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());
        let context = catalog(&schema);

        let first = coordinator
            .handle_attribute_access(&context, &QName::local("missing"))
            .unwrap();
        let second = coordinator
            .handle_attribute_access(&context, &QName::local("missing"))
            .unwrap();

        assert_eq!(first, second);
        let (proposals, report) = coordinator.flush();
        assert_eq!(proposals.len(), 1);
        assert_eq!(report.suppressed, 1);
        match &proposals[0] {
            SchemaModifier::Attribute(a) => {
                assert_eq!(a.name, "missing");
                assert_eq!(a.element_id.as_deref(), Some("/catalog"));
                assert_eq!(a.schema_version, 3);
            }
            other => panic!("expected attribute proposal, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_gaps_attach_to_proposed_parent() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());

        let child = coordinator
            .handle_element_access(&catalog(&schema), &QName::local("newChild"))
            .unwrap();
        coordinator.handle_attribute_access(&child, &QName::local("newAttrib"));

        let (proposals, _) = coordinator.flush();
        assert_eq!(proposals.len(), 2);
        let parent_id = match &proposals[0] {
            SchemaModifier::Element(e) => e.reference_id.clone(),
            other => panic!("expected element proposal, got {other:?}"),
        };
        assert_eq!(proposals[1].element_id(), Some(parent_id.as_str()));
    }

    #[test]
    fn test_document_accesses() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());
        let document = SchemaElementProxy::document(Arc::clone(&schema));

        assert!(coordinator.handle_attribute_access(&document, &QName::local("x")).is_none());
        let root = coordinator
            .handle_element_access(&document, &QName::local("feed"))
            .unwrap();

        assert!(root.proposed_element().unwrap().element_id.is_none());
        let (proposals, report) = coordinator.flush();
        assert_eq!(proposals.len(), 1);
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn test_parameters_and_closure_sink() {
        let schema = schema();
        let mut seen = Vec::new();
        let mut coordinator =
            ModifierCreationCoordinator::new(Arc::clone(&schema), |m: SchemaModifier| {
                seen.push(m.name().to_string());
            });

        coordinator.handle_parameter_access(&QName::local("title"));
        coordinator.handle_parameter_access(&QName::local("mode"));
        coordinator.handle_parameter_access(&QName::local("mode"));
        let (_, report) = coordinator.flush();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.modelled, 1);
        assert_eq!(report.suppressed, 1);
        assert_eq!(seen, vec!["mode".to_string()]);
    }

    #[test]
    fn test_context_reading_its_own_name_is_modelled() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());
        let catalog = catalog(&schema);
        let lang = catalog.sub_attributes()[0].clone();

        let element = coordinator
            .handle_element_access(&catalog, &QName::local("catalog"))
            .unwrap();
        let attribute = coordinator
            .handle_attribute_access(&lang, &QName::local("lang"))
            .unwrap();

        assert_eq!(element, catalog);
        assert_eq!(attribute, lang);
        let (proposals, report) = coordinator.flush();
        assert!(proposals.is_empty());
        assert_eq!(report.modelled, 2);
    }

    #[test]
    fn test_proposed_context_reading_its_own_name_is_not_proposed_again() {
        let schema = schema();
        let mut coordinator = ModifierCreationCoordinator::new(Arc::clone(&schema), Vec::new());
        let shelf = coordinator
            .handle_element_access(&catalog(&schema), &QName::local("shelf"))
            .unwrap();

        let again = coordinator
            .handle_element_access(&shelf, &QName::local("shelf"))
            .unwrap();

        assert_eq!(again, shelf);
        let (proposals, report) = coordinator.flush();
        assert_eq!(proposals.len(), 1);
        assert_eq!(report.modelled, 1);
    }
}
