//! Schema modifiers
//!
//! A modifier proposes a schema object that does not exist yet. Modifiers are
//! immutable values: they are created once per discovered gap, merged by the
//! collector and finally materialized by the
//! [`SchemaModificationProcessor`](crate::SchemaModificationProcessor).
//!
//! Every modifier carries a generated identity so that other modifiers can
//! reference it (a proposed attribute on a proposed element names the
//! element's reference id as its `element_id`). Two comparisons exist:
//! the derived `PartialEq`/`Hash`, which include generated ids, and
//! [`SchemaModifier::equals_ignoring_ids`]/[`SchemaModifier::hash_ignoring_ids`],
//! which compare structure only and drive consolidation.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use crate::model::{AttributeUsage, ContentType, DataType};

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// A proposed attribute on an existing or proposed element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposedAttribute {
    pub schema_uri: String,
    pub schema_version: u32,
    /// Element reference (existing or proposed) the attribute attaches to
    pub element_id: Option<String>,
    pub attribute_id: String,
    pub name: String,
    pub data_type: DataType,
    pub usage: AttributeUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A proposed element, optionally carrying its own proposed children
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposedElement {
    pub schema_uri: String,
    pub schema_version: u32,
    /// Parent element reference; `None` proposes a new root element
    pub element_id: Option<String>,
    pub reference_id: String,
    pub type_id: String,
    pub name: String,
    pub min_occurs: u32,
    pub max_occurs: Option<u32>,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Unordered
    #[serde(default)]
    pub attributes: Vec<ProposedAttribute>,
    /// Ordered
    #[serde(default)]
    pub sub_elements: Vec<ProposedElement>,
}

/// A proposed global stylesheet parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposedParameter {
    pub schema_uri: String,
    pub schema_version: u32,
    pub parameter_id: String,
    pub name: String,
    pub data_type: DataType,
}

/// Any proposed schema change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaModifier {
    Attribute(ProposedAttribute),
    Element(ProposedElement),
    Parameter(ProposedParameter),
}

impl ProposedAttribute {
    /// Propose an optional string attribute with a fresh id
    pub fn new(
        schema_uri: impl Into<String>,
        schema_version: u32,
        element_id: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema_uri: schema_uri.into(),
            schema_version,
            element_id,
            attribute_id: generate_id(),
            name: name.into(),
            data_type: DataType::String,
            usage: AttributeUsage::Optional,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Structural equality, `element_id` included
    pub fn equals_ignoring_ids(&self, other: &Self) -> bool {
        self.element_id == other.element_id && self.same_shape(other)
    }

    /// Hash consistent with [`Self::equals_ignoring_ids`]
    pub fn hash_ignoring_ids<H: Hasher>(&self, state: &mut H) {
        self.element_id.hash(state);
        self.hash_shape(state);
    }

    // Equality of everything except generated ids and the parent link, which
    // nested attributes get from their position in the tree.
    fn same_shape(&self, other: &Self) -> bool {
        self.schema_uri == other.schema_uri
            && self.schema_version == other.schema_version
            && self.name == other.name
            && self.data_type == other.data_type
            && self.usage == other.usage
            && self.comment == other.comment
    }

    fn hash_shape<H: Hasher>(&self, state: &mut H) {
        self.schema_uri.hash(state);
        self.schema_version.hash(state);
        self.name.hash(state);
        self.data_type.hash(state);
        self.usage.hash(state);
        self.comment.hash(state);
    }
}

impl ProposedElement {
    /// Propose an optional, non-repeating mixed-content element with fresh ids
    pub fn new(
        schema_uri: impl Into<String>,
        schema_version: u32,
        element_id: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema_uri: schema_uri.into(),
            schema_version,
            element_id,
            reference_id: generate_id(),
            type_id: generate_id(),
            name: name.into(),
            min_occurs: 0,
            max_occurs: Some(1),
            content_type: ContentType::Mixed,
            comment: None,
            attributes: Vec::new(),
            sub_elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: Option<u32>) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Nest a proposed attribute, re-parenting it onto this element
    #[must_use]
    pub fn with_attribute(mut self, mut attribute: ProposedAttribute) -> Self {
        attribute.element_id = Some(self.reference_id.clone());
        self.attributes.push(attribute);
        self
    }

    /// Nest a proposed child element, re-parenting it onto this element
    #[must_use]
    pub fn with_sub_element(mut self, mut element: ProposedElement) -> Self {
        element.element_id = Some(self.reference_id.clone());
        self.sub_elements.push(element);
        self
    }

    /// Nested attribute by name
    pub fn attribute(&self, name: &str) -> Option<&ProposedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Nested child element by name
    pub fn sub_element(&self, name: &str) -> Option<&ProposedElement> {
        self.sub_elements.iter().find(|e| e.name == name)
    }

    /// This element plus every nested attribute and element
    pub fn count(&self) -> usize {
        1 + self.attributes.len()
            + self
                .sub_elements
                .iter()
                .map(ProposedElement::count)
                .sum::<usize>()
    }

    /// Structural equality, including nested attributes (as a multiset) and
    /// nested elements (in order)
    pub fn equals_ignoring_ids(&self, other: &Self) -> bool {
        self.element_id == other.element_id && self.same_shape(other)
    }

    /// Hash consistent with [`Self::equals_ignoring_ids`]
    pub fn hash_ignoring_ids<H: Hasher>(&self, state: &mut H) {
        self.element_id.hash(state);
        self.hash_shape(state);
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.schema_uri == other.schema_uri
            && self.schema_version == other.schema_version
            && self.name == other.name
            && self.min_occurs == other.min_occurs
            && self.max_occurs == other.max_occurs
            && self.content_type == other.content_type
            && self.comment == other.comment
            && same_attribute_multiset(&self.attributes, &other.attributes)
            && self.sub_elements.len() == other.sub_elements.len()
            && self
                .sub_elements
                .iter()
                .zip(&other.sub_elements)
                .all(|(a, b)| a.same_shape(b))
    }

    fn hash_shape<H: Hasher>(&self, state: &mut H) {
        self.schema_uri.hash(state);
        self.schema_version.hash(state);
        self.name.hash(state);
        self.min_occurs.hash(state);
        self.max_occurs.hash(state);
        self.content_type.hash(state);
        self.comment.hash(state);

        let mut attribute_hashes: Vec<u64> = self
            .attributes
            .iter()
            .map(|a| {
                let mut hasher = DefaultHasher::new();
                a.hash_shape(&mut hasher);
                hasher.finish()
            })
            .collect();
        attribute_hashes.sort_unstable();
        attribute_hashes.hash(state);

        self.sub_elements.len().hash(state);
        for element in &self.sub_elements {
            element.hash_shape(state);
        }
    }
}

fn same_attribute_multiset(left: &[ProposedAttribute], right: &[ProposedAttribute]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut unmatched: Vec<&ProposedAttribute> = right.iter().collect();
    for attribute in left {
        match unmatched.iter().position(|candidate| attribute.same_shape(candidate)) {
            Some(idx) => {
                unmatched.swap_remove(idx);
            }
            None => return false,
        }
    }
    true
}

impl ProposedParameter {
    /// Propose a string parameter with a fresh id
    pub fn new(schema_uri: impl Into<String>, schema_version: u32, name: impl Into<String>) -> Self {
        Self {
            schema_uri: schema_uri.into(),
            schema_version,
            parameter_id: generate_id(),
            name: name.into(),
            data_type: DataType::String,
        }
    }

    pub fn equals_ignoring_ids(&self, other: &Self) -> bool {
        self.schema_uri == other.schema_uri
            && self.schema_version == other.schema_version
            && self.name == other.name
            && self.data_type == other.data_type
    }

    pub fn hash_ignoring_ids<H: Hasher>(&self, state: &mut H) {
        self.schema_uri.hash(state);
        self.schema_version.hash(state);
        self.name.hash(state);
        self.data_type.hash(state);
    }
}

impl SchemaModifier {
    pub fn schema_uri(&self) -> &str {
        match self {
            SchemaModifier::Attribute(a) => &a.schema_uri,
            SchemaModifier::Element(e) => &e.schema_uri,
            SchemaModifier::Parameter(p) => &p.schema_uri,
        }
    }

    pub fn schema_version(&self) -> u32 {
        match self {
            SchemaModifier::Attribute(a) => a.schema_version,
            SchemaModifier::Element(e) => e.schema_version,
            SchemaModifier::Parameter(p) => p.schema_version,
        }
    }

    /// Element the change attaches to; `None` for parameters and new roots
    pub fn element_id(&self) -> Option<&str> {
        match self {
            SchemaModifier::Attribute(a) => a.element_id.as_deref(),
            SchemaModifier::Element(e) => e.element_id.as_deref(),
            SchemaModifier::Parameter(_) => None,
        }
    }

    /// Generated identity other modifiers may reference
    pub fn id(&self) -> &str {
        match self {
            SchemaModifier::Attribute(a) => &a.attribute_id,
            SchemaModifier::Element(e) => &e.reference_id,
            SchemaModifier::Parameter(p) => &p.parameter_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaModifier::Attribute(a) => &a.name,
            SchemaModifier::Element(e) => &e.name,
            SchemaModifier::Parameter(p) => &p.name,
        }
    }

    /// Short kind label for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaModifier::Attribute(_) => "attribute",
            SchemaModifier::Element(_) => "element",
            SchemaModifier::Parameter(_) => "parameter",
        }
    }

    /// Number of schema objects this modifier proposes
    pub fn count(&self) -> usize {
        match self {
            SchemaModifier::Element(e) => e.count(),
            SchemaModifier::Attribute(_) | SchemaModifier::Parameter(_) => 1,
        }
    }

    /// Whether this modifier targets `uri` at `version`
    pub fn applies_to(&self, uri: &str, version: u32) -> bool {
        self.schema_uri() == uri && self.schema_version() == version
    }

    pub fn equals_ignoring_ids(&self, other: &Self) -> bool {
        match (self, other) {
            (SchemaModifier::Attribute(a), SchemaModifier::Attribute(b)) => {
                a.equals_ignoring_ids(b)
            }
            (SchemaModifier::Element(a), SchemaModifier::Element(b)) => a.equals_ignoring_ids(b),
            (SchemaModifier::Parameter(a), SchemaModifier::Parameter(b)) => {
                a.equals_ignoring_ids(b)
            }
            _ => false,
        }
    }

    pub fn hash_ignoring_ids<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SchemaModifier::Attribute(a) => a.hash_ignoring_ids(state),
            SchemaModifier::Element(e) => e.hash_ignoring_ids(state),
            SchemaModifier::Parameter(p) => p.hash_ignoring_ids(state),
        }
    }

    /// Standalone structural hash code
    pub fn hash_code_ignoring_ids(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_ignoring_ids(&mut hasher);
        hasher.finish()
    }

    /// Copy of this modifier attached to `element_id` instead
    #[must_use]
    pub fn with_element_id(&self, element_id: Option<String>) -> Self {
        match self {
            SchemaModifier::Attribute(a) => SchemaModifier::Attribute(ProposedAttribute {
                element_id,
                ..a.clone()
            }),
            SchemaModifier::Element(e) => SchemaModifier::Element(ProposedElement {
                element_id,
                ..e.clone()
            }),
            SchemaModifier::Parameter(p) => SchemaModifier::Parameter(p.clone()),
        }
    }
}

impl From<ProposedAttribute> for SchemaModifier {
    fn from(value: ProposedAttribute) -> Self {
        SchemaModifier::Attribute(value)
    }
}

impl From<ProposedElement> for SchemaModifier {
    fn from(value: ProposedElement) -> Self {
        SchemaModifier::Element(value)
    }
}

impl From<ProposedParameter> for SchemaModifier {
    fn from(value: ProposedParameter) -> Self {
        SchemaModifier::Parameter(value)
    }
}

/// Adapts the ignoring-ids comparison to `Hash`/`Eq` for set membership
#[derive(Debug, Clone)]
pub struct Structural(pub SchemaModifier);

impl Structural {
    pub fn into_inner(self) -> SchemaModifier {
        self.0
    }
}

impl PartialEq for Structural {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals_ignoring_ids(&other.0)
    }
}

impl Eq for Structural {}

impl Hash for Structural {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_ignoring_ids(state);
    }
}
