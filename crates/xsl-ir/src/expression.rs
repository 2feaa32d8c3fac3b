//! Expression and node-test trees
//!
//! These mirror the compiled expression tree an XSLT engine reports in its
//! trace. Only the shapes relevant to schema navigation are modelled in
//! detail; anything else arrives as [`Expression::Other`] or
//! [`NodeTest::Other`].
#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::name::QName;

/// Navigation axis of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Attribute,
    Child,
    #[serde(rename = "self")]
    SelfAxis,
    Parent,
    Descendant,
    DescendantOrSelf,
    Ancestor,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    /// XPath spelling of the axis
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::SelfAxis => "self",
            Axis::Parent => "parent",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Ancestor => "ancestor",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
        }
    }
}

/// Kind tests (`node()`, `element()`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Node,
    Element,
    Attribute,
    Text,
}

/// Operator joining two node tests (`element(a) | element(b)` and friends)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    fn as_str(self) -> &'static str {
        match self {
            SetOperator::Union => "|",
            SetOperator::Intersect => "intersect",
            SetOperator::Except => "except",
        }
    }
}

/// A node test applied to the nodes selected by an axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeTest {
    /// Matches nodes with the given name
    Name { name: QName },

    /// `*`
    AnyName,

    /// `node()`, `element()`, `attribute()`, `text()`
    Kind { kind: NodeKind },

    /// Two tests joined by a set operator
    Combined {
        op: SetOperator,
        left: Box<NodeTest>,
        right: Box<NodeTest>,
    },

    /// A test shape the trace exporter could not express
    Other { description: String },
}

impl NodeTest {
    /// Name test shorthand
    pub fn name(name: impl Into<QName>) -> Self {
        NodeTest::Name { name: name.into() }
    }

    /// Kind test shorthand
    pub fn kind(kind: NodeKind) -> Self {
        NodeTest::Kind { kind }
    }
}

/// Single-operand wrappers inserted by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryKind {
    Atomize,
    TypeCheck,
    CardinalityCheck,
    UntypedAtomicConversion,
    FirstItem,
    Negate,
}

impl UnaryKind {
    fn as_str(self) -> &'static str {
        match self {
            UnaryKind::Atomize => "data",
            UnaryKind::TypeCheck => "treat",
            UnaryKind::CardinalityCheck => "cardinality",
            UnaryKind::UntypedAtomicConversion => "convert",
            UnaryKind::FirstItem => "first",
            UnaryKind::Negate => "-",
        }
    }
}

/// Binary operators whose operands are evaluated independently of each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl ComparisonOperator {
    fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::And => "and",
            ComparisonOperator::Or => "or",
        }
    }
}

/// A traced query expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// `axis::test`
    AxisStep {
        axis: Axis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_test: Option<NodeTest>,
    },

    /// Direct accessor for a statically known attribute (`@name` on the
    /// context item, compiled without an axis step)
    AttributeGetter { name: QName },

    /// `first/remaining`
    Path {
        first: Box<Expression>,
        remaining: Box<Expression>,
    },

    /// `base[predicate]`
    Filter {
        base: Box<Expression>,
        predicate: Box<Expression>,
    },

    /// Sequence constructor or `(a, b, ...)`
    Block {
        #[serde(default)]
        expressions: Vec<Expression>,
    },

    /// Compiler-inserted wrapper around one operand
    Unary {
        kind: UnaryKind,
        operand: Box<Expression>,
    },

    /// Comparison or boolean connective
    Comparison {
        op: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `a | b`, `a intersect b`, `a except b`
    SetOperation {
        op: SetOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `xsl:value-of select="..."`
    ValueOf { select: Box<Expression> },

    /// Built-in function call
    FunctionCall {
        name: QName,
        #[serde(default)]
        arguments: Vec<Expression>,
    },

    /// String or numeric literal
    Literal { value: String },

    /// `.`
    ContextItem,

    /// `$name` bound to a global stylesheet parameter
    ParameterReference { name: QName },

    /// Any expression shape the trace exporter could not express
    Other { kind: String },
}

impl Expression {
    /// `child::name`
    pub fn child(name: impl Into<QName>) -> Self {
        Expression::AxisStep {
            axis: Axis::Child,
            node_test: Some(NodeTest::name(name)),
        }
    }

    /// `attribute::name`
    pub fn attribute(name: impl Into<QName>) -> Self {
        Expression::AxisStep {
            axis: Axis::Attribute,
            node_test: Some(NodeTest::name(name)),
        }
    }

    /// Axis step with an optional node test
    pub fn step(axis: Axis, node_test: Option<NodeTest>) -> Self {
        Expression::AxisStep { axis, node_test }
    }

    /// `first/remaining`
    pub fn path(first: Expression, remaining: Expression) -> Self {
        Expression::Path {
            first: Box::new(first),
            remaining: Box::new(remaining),
        }
    }

    /// Right-nested path over `steps`; `None` when `steps` is empty
    pub fn path_of(steps: impl IntoIterator<Item = Expression>) -> Option<Self> {
        let mut steps: Vec<Expression> = steps.into_iter().collect();
        let mut result = steps.pop()?;
        while let Some(step) = steps.pop() {
            result = Expression::path(step, result);
        }
        Some(result)
    }

    /// `base[predicate]`
    pub fn filter(base: Expression, predicate: Expression) -> Self {
        Expression::Filter {
            base: Box::new(base),
            predicate: Box::new(predicate),
        }
    }

    /// Call of a built-in function in the null namespace
    pub fn call(name: &str, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: QName::local(name),
            arguments,
        }
    }

    /// `left op right`
    pub fn compare(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Short name of the expression shape, used in log output
    pub fn kind_name(&self) -> &str {
        match self {
            Expression::AxisStep { .. } => "axis_step",
            Expression::AttributeGetter { .. } => "attribute_getter",
            Expression::Path { .. } => "path",
            Expression::Filter { .. } => "filter",
            Expression::Block { .. } => "block",
            Expression::Unary { .. } => "unary",
            Expression::Comparison { .. } => "comparison",
            Expression::SetOperation { .. } => "set_operation",
            Expression::ValueOf { .. } => "value_of",
            Expression::FunctionCall { .. } => "function_call",
            Expression::Literal { .. } => "literal",
            Expression::ContextItem => "context_item",
            Expression::ParameterReference { .. } => "parameter_reference",
            Expression::Other { kind } => kind.as_str(),
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Name { name } => write!(f, "{name}"),
            NodeTest::AnyName => f.write_str("*"),
            NodeTest::Kind { kind } => match kind {
                NodeKind::Node => f.write_str("node()"),
                NodeKind::Element => f.write_str("element()"),
                NodeKind::Attribute => f.write_str("attribute()"),
                NodeKind::Text => f.write_str("text()"),
            },
            NodeTest::Combined { op, left, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            NodeTest::Other { description } => write!(f, "<{description}>"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::AxisStep { axis, node_test } => match (axis, node_test) {
                (Axis::Child, Some(test)) => write!(f, "{test}"),
                (Axis::Attribute, Some(test)) => write!(f, "@{test}"),
                (axis, Some(test)) => write!(f, "{}::{test}", axis.as_str()),
                (axis, None) => write!(f, "{}::node()", axis.as_str()),
            },
            Expression::AttributeGetter { name } => write!(f, "@{name}"),
            Expression::Path { first, remaining } => write!(f, "{first}/{remaining}"),
            Expression::Filter { base, predicate } => write!(f, "{base}[{predicate}]"),
            Expression::Block { expressions } => {
                f.write_str("(")?;
                for (idx, expr) in expressions.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                f.write_str(")")
            }
            Expression::Unary {
                kind: UnaryKind::Negate,
                operand,
            } => write!(f, "-{operand}"),
            Expression::Unary { kind, operand } => write!(f, "{}({operand})", kind.as_str()),
            Expression::Comparison { op, left, right } => {
                write!(f, "{left} {} {right}", op.as_str())
            }
            Expression::SetOperation { op, left, right } => {
                write!(f, "{left} {} {right}", op.as_str())
            }
            Expression::ValueOf { select } => write!(f, "value-of({select})"),
            Expression::FunctionCall { name, arguments } => {
                write!(f, "{name}(")?;
                for (idx, arg) in arguments.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expression::Literal { value } => write!(f, "'{value}'"),
            Expression::ContextItem => f.write_str("."),
            Expression::ParameterReference { name } => write!(f, "${name}"),
            Expression::Other { kind } => write!(f, "<{kind}>"),
        }
    }
}
