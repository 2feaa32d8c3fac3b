//! Evaluation tree items
//!
//! One item per expression or node-test node. Items live in the factory's
//! arena and refer to their children by [`ItemId`]. Evaluation is symbolic:
//! an item receives the proxy the expression runs against and returns the
//! proxies a real evaluation would stand on, reporting accesses to the
//! coordinator on the way.

use tracing::{debug, warn};

use xsl_ir::{Axis, Expression, NodeKind, NodeTest, QName, SetOperator};

use crate::coordinator::{ModifierCreationCoordinator, ModifierSink};
use crate::factory::ItemId;
use crate::proxy::{ProxySet, SchemaElementProxy};
use crate::{Error, Result};

/// Variant-specific payload of an item, borrowing the tree it was built from
#[derive(Debug, Clone)]
pub enum ItemKind<'e> {
    /// `attribute::`, `child::` or `self::` step
    AxisStep {
        axis: Axis,
        node_test: Option<&'e NodeTest>,
    },
    AttributeGetter { name: &'e QName },
    Path {
        first: &'e Expression,
        remaining: &'e Expression,
    },
    Filter {
        base: &'e Expression,
        predicate: &'e Expression,
    },
    Block { expressions: &'e [Expression] },
    /// Type coercion or atomization around one operand
    Unary { operand: &'e Expression },
    /// Comparison whose operands do not depend on each other
    IndependentBinary {
        left: &'e Expression,
        right: &'e Expression,
    },
    SetOperation {
        op: SetOperator,
        left: &'e Expression,
        right: &'e Expression,
    },
    ValueOf { select: &'e Expression },
    TransparentFunction {
        name: &'e QName,
        arguments: &'e [Expression],
    },
    CurrentFunction,
    ParameterReference { name: &'e QName },
    /// Literal or context item
    Constant,
    UnsupportedFunction { name: &'e QName },
    UnsupportedExpression { description: String },

    NameTest { name: &'e QName },
    AnyNameTest,
    KindTest { kind: NodeKind },
    UnsupportedNodeTest { description: String },
}

impl ItemKind<'_> {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::AxisStep { .. } => "axis step",
            ItemKind::AttributeGetter { .. } => "attribute getter",
            ItemKind::Path { .. } => "path",
            ItemKind::Filter { .. } => "filter",
            ItemKind::Block { .. } => "block",
            ItemKind::Unary { .. } => "unary",
            ItemKind::IndependentBinary { .. } => "independent binary",
            ItemKind::SetOperation { .. } => "set operation",
            ItemKind::ValueOf { .. } => "value-of",
            ItemKind::TransparentFunction { .. } => "transparent function",
            ItemKind::CurrentFunction => "current()",
            ItemKind::ParameterReference { .. } => "parameter reference",
            ItemKind::Constant => "constant",
            ItemKind::UnsupportedFunction { .. } => "unsupported function",
            ItemKind::UnsupportedExpression { .. } => "unsupported expression",
            ItemKind::NameTest { .. } => "name test",
            ItemKind::AnyNameTest => "any-name test",
            ItemKind::KindTest { .. } => "kind test",
            ItemKind::UnsupportedNodeTest { .. } => "unsupported node test",
        }
    }

    pub fn is_node_test(&self) -> bool {
        matches!(
            self,
            ItemKind::NameTest { .. }
                | ItemKind::AnyNameTest
                | ItemKind::KindTest { .. }
                | ItemKind::UnsupportedNodeTest { .. }
        )
    }
}

/// A tree node an item depends on
#[derive(Debug, Clone, Copy)]
pub enum Dependency<'e> {
    Expression(&'e Expression),
    NodeTest(&'e NodeTest),
}

/// One node of the evaluation tree
#[derive(Debug, Clone)]
pub struct EvaluationTreeItem<'e> {
    kind: ItemKind<'e>,
    children: Vec<ItemId>,
    initialized: bool,
}

impl<'e> EvaluationTreeItem<'e> {
    pub(crate) fn new(kind: ItemKind<'e>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            initialized: false,
        }
    }

    pub fn kind(&self) -> &ItemKind<'e> {
        &self.kind
    }

    /// Items created for this item's dependencies, in dependency order
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Sub-expressions and node tests this item needs items for
    pub fn dependencies(&self) -> Vec<Dependency<'e>> {
        match &self.kind {
            ItemKind::AxisStep { node_test, .. } => {
                node_test.map(Dependency::NodeTest).into_iter().collect()
            }
            ItemKind::Path { first, remaining } => vec![
                Dependency::Expression(*first),
                Dependency::Expression(*remaining),
            ],
            ItemKind::Filter { base, predicate } => vec![
                Dependency::Expression(*base),
                Dependency::Expression(*predicate),
            ],
            ItemKind::IndependentBinary { left, right } | ItemKind::SetOperation { left, right, .. } => {
                vec![Dependency::Expression(*left), Dependency::Expression(*right)]
            }
            ItemKind::Block { expressions } => {
                expressions.iter().map(Dependency::Expression).collect()
            }
            ItemKind::TransparentFunction { arguments, .. } => {
                arguments.iter().map(Dependency::Expression).collect()
            }
            ItemKind::Unary { operand } => vec![Dependency::Expression(*operand)],
            ItemKind::ValueOf { select } => vec![Dependency::Expression(*select)],
            ItemKind::AttributeGetter { .. }
            | ItemKind::CurrentFunction
            | ItemKind::ParameterReference { .. }
            | ItemKind::Constant
            | ItemKind::UnsupportedFunction { .. }
            | ItemKind::UnsupportedExpression { .. }
            | ItemKind::NameTest { .. }
            | ItemKind::AnyNameTest
            | ItemKind::KindTest { .. }
            | ItemKind::UnsupportedNodeTest { .. } => Vec::new(),
        }
    }

    pub(crate) fn complete_initialization(&mut self, children: Vec<ItemId>) {
        self.children = children;
        self.initialized = true;
    }

    fn child(&self, id: ItemId, position: usize) -> Result<ItemId> {
        self.children
            .get(position)
            .copied()
            .ok_or(Error::Uninitialized(id.index()))
    }
}

fn single(context: &SchemaElementProxy) -> ProxySet {
    let mut set = ProxySet::with_capacity(1);
    set.insert(context.clone());
    set
}

fn lookup<'a, 'e>(items: &'a [EvaluationTreeItem<'e>], id: ItemId) -> Result<&'a EvaluationTreeItem<'e>> {
    let item = items
        .get(id.index())
        .ok_or(Error::UnknownItem(id.index()))?;
    if item.initialized {
        Ok(item)
    } else {
        Err(Error::Uninitialized(id.index()))
    }
}

/// Evaluate item `id` against `context`
pub(crate) fn evaluate<S: ModifierSink>(
    items: &[EvaluationTreeItem<'_>],
    coordinator: &mut ModifierCreationCoordinator<S>,
    id: ItemId,
    context: &SchemaElementProxy,
) -> Result<ProxySet> {
    let item = lookup(items, id)?;
    match &item.kind {
        ItemKind::AxisStep { axis, .. } => {
            let candidates: ProxySet = match axis {
                Axis::Attribute => context.sub_attributes().iter().cloned().collect(),
                Axis::Child => context.sub_elements().iter().cloned().collect(),
                _ => single(context),
            };
            match item.children.first() {
                Some(&test) => filter(items, coordinator, test, context, *axis, candidates),
                None => Ok(candidates),
            }
        }
        ItemKind::AttributeGetter { name } => {
            coordinator.handle_attribute_access(context, name);
            Ok(single(context))
        }
        ItemKind::Path { .. } | ItemKind::Filter { .. } => {
            // Path and filter differ only in intent: the second child runs
            // once per result of the first, so accesses inside a predicate
            // are attributed to the right candidate.
            let outer = item.child(id, 0)?;
            let inner = item.child(id, 1)?;
            let mut result = ProxySet::new();
            for candidate in evaluate(items, coordinator, outer, context)? {
                result.extend(evaluate(items, coordinator, inner, &candidate)?);
            }
            Ok(result)
        }
        ItemKind::Unary { .. } => evaluate(items, coordinator, item.child(id, 0)?, context),
        ItemKind::SetOperation { op, .. } => {
            let mut left = evaluate(items, coordinator, item.child(id, 0)?, context)?;
            let right = evaluate(items, coordinator, item.child(id, 1)?, context)?;
            // intersect and except can only narrow the left operand; keep it whole
            if *op == SetOperator::Union {
                left.extend(right);
            }
            Ok(left)
        }
        ItemKind::Block { .. }
        | ItemKind::IndependentBinary { .. }
        | ItemKind::ValueOf { .. }
        | ItemKind::TransparentFunction { .. } => {
            for &child in &item.children {
                evaluate(items, coordinator, child, context)?;
            }
            Ok(single(context))
        }
        ItemKind::CurrentFunction => {
            // the context re-reads itself; the document has no name to report
            if let Ok(name) = context.attribute_name() {
                coordinator.handle_attribute_access(context, &QName::local(name));
            } else if let Ok(name) = context.element_name() {
                coordinator.handle_element_access(context, &QName::local(name));
            }
            Ok(single(context))
        }
        ItemKind::ParameterReference { name } => {
            coordinator.handle_parameter_access(name);
            Ok(single(context))
        }
        ItemKind::Constant => Ok(single(context)),
        ItemKind::UnsupportedFunction { name } => {
            warn!("Function {}() is not supported, ignoring it on {}", name, context);
            Ok(single(context))
        }
        ItemKind::UnsupportedExpression { description } => {
            warn!("Unsupported expression {}, ignoring it on {}", description, context);
            Ok(single(context))
        }
        ItemKind::NameTest { .. }
        | ItemKind::AnyNameTest
        | ItemKind::KindTest { .. }
        | ItemKind::UnsupportedNodeTest { .. } => {
            filter(items, coordinator, id, context, Axis::SelfAxis, single(context))
        }
    }
}

/// Narrow `candidates`, selected from `context` along `axis`, through node-test item `id`
///
/// A name test that matches nothing on the attribute or child axis is an
/// access to something the schema lacks, and is reported to the coordinator;
/// the proxy it answers with becomes the match.
pub(crate) fn filter<S: ModifierSink>(
    items: &[EvaluationTreeItem<'_>],
    coordinator: &mut ModifierCreationCoordinator<S>,
    id: ItemId,
    context: &SchemaElementProxy,
    axis: Axis,
    candidates: ProxySet,
) -> Result<ProxySet> {
    let item = lookup(items, id)?;
    let principal = |p: &SchemaElementProxy| {
        if axis == Axis::Attribute {
            p.is_attribute()
        } else {
            p.is_element()
        }
    };

    match &item.kind {
        ItemKind::NameTest { name } => {
            let mut matches: ProxySet = candidates
                .into_iter()
                .filter(|p| principal(p) && p.name().is_some_and(|n| name.matches(n)))
                .collect();
            if matches.is_empty() {
                let accessed = match axis {
                    Axis::Attribute => coordinator.handle_attribute_access(context, name),
                    Axis::Child => coordinator.handle_element_access(context, name),
                    _ => None,
                };
                matches.extend(accessed);
            }
            Ok(matches)
        }
        ItemKind::AnyNameTest => Ok(candidates.into_iter().filter(|p| principal(p)).collect()),
        ItemKind::KindTest { kind } => Ok(candidates
            .into_iter()
            .filter(|p| match kind {
                NodeKind::Node => true,
                NodeKind::Element => p.is_element(),
                NodeKind::Attribute => p.is_attribute(),
                // text nodes are not schema objects
                NodeKind::Text => false,
            })
            .collect()),
        ItemKind::UnsupportedNodeTest { description } => {
            warn!("Unsupported node test {}, keeping all candidates", description);
            Ok(candidates)
        }
        other => {
            debug!("{} used as a node test, keeping all candidates", other.name());
            Ok(candidates)
        }
    }
}
