//! Evaluation tree item factory
//!
//! Maps expression and node-test nodes to item variants and owns the item
//! arena. Items are not initialized when created; they are queued and
//! [`ItemFactory::initialize_all_created_items`] drains the queue, creating
//! children for each item in turn. Deep or wide expression trees therefore
//! never recurse during construction.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use xsl_ir::{Axis, Expression, NodeTest};
use xsl_schema::Schema;

use crate::coordinator::{ModifierCreationCoordinator, ModifierSink};
use crate::functions::{FunctionClass, classify_function};
use crate::items::{self, Dependency, EvaluationTreeItem, ItemKind};
use crate::proxy::{ProxySet, SchemaElementProxy};
use crate::Result;

/// Index of an item in its factory's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Creates, initializes and evaluates items for one schema and one coordinator
pub struct ItemFactory<'e, S: ModifierSink> {
    schema: Arc<Schema>,
    coordinator: ModifierCreationCoordinator<S>,
    items: Vec<EvaluationTreeItem<'e>>,
    uninitialized: VecDeque<ItemId>,
}

impl<'e, S: ModifierSink> ItemFactory<'e, S> {
    /// Create a factory evaluating against the coordinator's schema
    pub fn new(coordinator: ModifierCreationCoordinator<S>) -> Self {
        Self {
            schema: Arc::clone(coordinator.schema()),
            coordinator,
            items: Vec::new(),
            uninitialized: VecDeque::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn coordinator(&self) -> &ModifierCreationCoordinator<S> {
        &self.coordinator
    }

    /// Give up the factory, keeping the coordinator for flushing
    pub fn into_coordinator(self) -> ModifierCreationCoordinator<S> {
        self.coordinator
    }

    pub fn item(&self, id: ItemId) -> Option<&EvaluationTreeItem<'e>> {
        self.items.get(id.index())
    }

    /// Number of items created so far
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items still waiting for initialization
    pub fn pending(&self) -> usize {
        self.uninitialized.len()
    }

    /// Create (and queue for initialization) the item for `expression`
    pub fn create_item_for_expression(&mut self, expression: &'e Expression) -> ItemId {
        let kind = match expression {
            Expression::AttributeGetter { name } => ItemKind::AttributeGetter { name },
            Expression::AxisStep { axis, node_test } => match axis {
                Axis::Attribute | Axis::Child | Axis::SelfAxis => ItemKind::AxisStep {
                    axis: *axis,
                    node_test: node_test.as_ref(),
                },
                other => ItemKind::UnsupportedExpression {
                    description: format!("{}:: axis step", other.as_str()),
                },
            },
            Expression::Path { first, remaining } => ItemKind::Path { first, remaining },
            Expression::Filter { base, predicate } => ItemKind::Filter { base, predicate },
            Expression::Block { expressions } => ItemKind::Block { expressions },
            Expression::Unary { operand, .. } => ItemKind::Unary { operand },
            Expression::Comparison { left, right, .. } => {
                ItemKind::IndependentBinary { left, right }
            }
            Expression::SetOperation { op, left, right } => ItemKind::SetOperation {
                op: *op,
                left,
                right,
            },
            Expression::ValueOf { select } => ItemKind::ValueOf { select },
            Expression::FunctionCall { name, arguments } => match classify_function(name) {
                FunctionClass::Current => ItemKind::CurrentFunction,
                FunctionClass::Transparent => ItemKind::TransparentFunction { name, arguments },
                FunctionClass::Unsupported | FunctionClass::Unknown => {
                    ItemKind::UnsupportedFunction { name }
                }
            },
            Expression::ParameterReference { name } => ItemKind::ParameterReference { name },
            Expression::Literal { .. } | Expression::ContextItem => ItemKind::Constant,
            Expression::Other { kind } => ItemKind::UnsupportedExpression {
                description: kind.clone(),
            },
        };
        self.push(kind)
    }

    /// Create (and queue for initialization) the item for `test`
    pub fn create_item_for_node_test(&mut self, test: &'e NodeTest) -> ItemId {
        let kind = match test {
            NodeTest::Name { name } => ItemKind::NameTest { name },
            NodeTest::AnyName => ItemKind::AnyNameTest,
            NodeTest::Kind { kind } => ItemKind::KindTest { kind: *kind },
            NodeTest::Combined { .. } => ItemKind::UnsupportedNodeTest {
                description: test.to_string(),
            },
            NodeTest::Other { description } => ItemKind::UnsupportedNodeTest {
                description: description.clone(),
            },
        };
        self.push(kind)
    }

    fn push(&mut self, kind: ItemKind<'e>) -> ItemId {
        let id = ItemId(self.items.len());
        trace!("Created {} item {}", kind.name(), id);
        self.items.push(EvaluationTreeItem::new(kind));
        self.uninitialized.push_back(id);
        id
    }

    /// Initialize every queued item, including the items their
    /// initialization creates, until the queue is empty
    pub fn initialize_all_created_items(&mut self) {
        while let Some(id) = self.uninitialized.pop_front() {
            self.initialize(id);
        }
    }

    fn initialize(&mut self, id: ItemId) {
        let dependencies = match self.items.get(id.index()) {
            Some(item) if !item.is_initialized() => item.dependencies(),
            _ => return,
        };
        let children = dependencies
            .into_iter()
            .map(|dependency| match dependency {
                Dependency::Expression(expression) => self.create_item_for_expression(expression),
                Dependency::NodeTest(test) => self.create_item_for_node_test(test),
            })
            .collect();
        if let Some(item) = self.items.get_mut(id.index()) {
            item.complete_initialization(children);
        }
    }

    /// Evaluate item `id` against `context`
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown or some item reachable from it has not been
    /// initialized yet.
    pub fn evaluate(&mut self, id: ItemId, context: &SchemaElementProxy) -> Result<ProxySet> {
        items::evaluate(&self.items, &mut self.coordinator, id, context)
    }

    /// Create, initialize and evaluate `expression` in one go
    pub fn evaluate_expression(
        &mut self,
        expression: &'e Expression,
        context: &SchemaElementProxy,
    ) -> Result<ProxySet> {
        let id = self.create_item_for_expression(expression);
        self.initialize_all_created_items();
        self.evaluate(id, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use xsl_ir::{ComparisonOperator, NodeKind, QName};
    use xsl_schema::{Attribute, ElementReference, ElementType, SchemaModifier};

    const URI: &str = "urn:stylesheet:catalog";

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(URI, 1)
                .with_root(ElementReference::new("/catalog", "catalog", "catalogType"))
                .with_type(
                    ElementType::new("catalogType", "catalogType")
                        .with_attribute(Attribute::new("catalogType@lang", "lang"))
                        .with_attribute(Attribute::new("catalogType@owner", "owner"))
                        .with_attribute(Attribute::new("catalogType@since", "since"))
                        .with_sub_element(ElementReference::new(
                            "catalogType/entry",
                            "entry",
                            "entryType",
                        )),
                )
                .with_type(
                    ElementType::new("entryType", "entryType")
                        .with_attribute(Attribute::new("entryType@href", "href")),
                ),
        )
    }

    fn factory<'e>(schema: &Arc<Schema>) -> ItemFactory<'e, Vec<SchemaModifier>> {
        ItemFactory::new(ModifierCreationCoordinator::new(Arc::clone(schema), Vec::new()))
    }

    fn catalog(schema: &Arc<Schema>) -> SchemaElementProxy {
        SchemaElementProxy::document(Arc::clone(schema)).sub_elements()[0].clone()
    }

    fn names(set: &ProxySet) -> Vec<&str> {
        set.iter().filter_map(SchemaElementProxy::name).collect()
    }

    #[test]
    fn test_attribute_axis_without_test_yields_all_attributes() {
        let schema = schema();
        let expression = Expression::step(Axis::Attribute, None);
        let mut factory = factory(&schema);

        let result = factory.evaluate_expression(&expression, &catalog(&schema)).unwrap();

        let mut found = names(&result);
        found.sort_unstable();
        assert_eq!(found, vec!["lang", "owner", "since"]);
    }

    #[test]
    fn test_kind_test_keeps_matching_subset() {
        let schema = schema();
        let all = Expression::step(Axis::Child, Some(NodeTest::kind(NodeKind::Element)));
        let text = Expression::step(Axis::Child, Some(NodeTest::kind(NodeKind::Text)));
        let mut factory = factory(&schema);

        let elements = factory.evaluate_expression(&all, &catalog(&schema)).unwrap();
        let texts = factory.evaluate_expression(&text, &catalog(&schema)).unwrap();

        assert_eq!(names(&elements), vec!["entry"]);
        assert!(texts.is_empty());
    }

    #[test]
    fn test_initialization_is_breadth_first_and_complete() {
        let schema = schema();
        let expression = Expression::compare(
            ComparisonOperator::Eq,
            Expression::path(Expression::child("entry"), Expression::attribute("href")),
            Expression::Literal {
                value: "x".to_string(),
            },
        );
        let mut factory = factory(&schema);
        let root = factory.create_item_for_expression(&expression);
        assert_eq!(factory.pending(), 1);

        factory.initialize_all_created_items();

        // comparison, path, literal, two steps, two name tests
        assert_eq!(factory.len(), 7);
        assert_eq!(factory.pending(), 0);
        assert!((0..factory.len()).all(|i| factory.item(ItemId(i)).unwrap().is_initialized()));
        assert_eq!(factory.item(root).unwrap().children().len(), 2);
    }

    #[test]
    fn test_evaluating_before_initialization_is_an_error() {
        let schema = schema();
        let expression = Expression::child("entry");
        let mut factory = factory(&schema);
        let id = factory.create_item_for_expression(&expression);

        let err = factory.evaluate(id, &catalog(&schema)).unwrap_err();
        assert!(matches!(err, Error::Uninitialized(0)));
        assert!(matches!(
            factory.evaluate(ItemId(42), &catalog(&schema)),
            Err(Error::UnknownItem(42))
        ));
    }

    #[test]
    fn test_unsupported_shapes_return_context() {
        let schema = schema();
        let context = catalog(&schema);
        let expressions = [
            Expression::Other {
                kind: "for-expression".to_string(),
            },
            Expression::step(Axis::Parent, None),
            Expression::call("document", vec![Expression::Literal {
                value: "other.xml".to_string(),
            }]),
            Expression::step(
                Axis::Child,
                Some(NodeTest::Other {
                    description: "schema-element(entry)".to_string(),
                }),
            ),
        ];
        let mut factory = factory(&schema);

        for expression in &expressions[..3] {
            let result = factory.evaluate_expression(expression, &context).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0], context);
        }
        // an unsupported node test keeps the axis candidates
        let result = factory.evaluate_expression(&expressions[3], &context).unwrap();
        assert_eq!(names(&result), vec!["entry"]);

        let (proposals, _) = factory.into_coordinator().flush();
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_missing_child_then_attribute_yields_two_linked_proposals() {
        let schema = schema();
        let expression = Expression::path(
            Expression::child("newChild"),
            Expression::attribute("newAttrib"),
        );
        let mut factory = factory(&schema);

        let result = factory.evaluate_expression(&expression, &catalog(&schema)).unwrap();
        assert_eq!(names(&result), vec!["newAttrib"]);

        let (proposals, report) = factory.into_coordinator().flush();
        assert_eq!(report.accepted, 2);
        let SchemaModifier::Element(element) = &proposals[0] else {
            panic!("expected element proposal first, got {:?}", proposals[0]);
        };
        assert_eq!(element.element_id.as_deref(), Some("/catalog"));
        assert_eq!(proposals[1].name(), "newAttrib");
        assert_eq!(proposals[1].element_id(), Some(element.reference_id.as_str()));
    }

    #[test]
    fn test_parameter_reference_proposes_parameter() {
        let schema = schema();
        let expression = Expression::ParameterReference {
            name: QName::local("mode"),
        };
        let mut factory = factory(&schema);
        factory.evaluate_expression(&expression, &catalog(&schema)).unwrap();

        let (proposals, _) = factory.into_coordinator().flush();
        assert!(matches!(&proposals[..], [SchemaModifier::Parameter(p)] if p.name == "mode"));
    }
}
