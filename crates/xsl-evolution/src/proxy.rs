//! Schema element proxy
//!
//! A proxy wraps one schema object (committed or proposed) or the document
//! root and answers navigation questions about it. Interpreter items only
//! ever see proxies, so a path like `new/@attr` walks through a proposed
//! element exactly as it would through a committed one.
//!
//! Child lists are computed lazily, once per proxy, and shared between
//! clones.

use indexmap::IndexSet;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use xsl_ir::QName;
use xsl_schema::{Attribute, ElementReference, ProposedAttribute, ProposedElement, Schema};

use crate::{Error, Result};

/// Insertion-ordered set of proxies, the result type of every evaluation
pub type ProxySet = IndexSet<SchemaElementProxy>;

/// Discriminator of a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    Element,
    ElementModifier,
    Attribute,
    AttributeModifier,
    Document,
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyKind::Element => "element",
            ProxyKind::ElementModifier => "proposed element",
            ProxyKind::Attribute => "attribute",
            ProxyKind::AttributeModifier => "proposed attribute",
            ProxyKind::Document => "document",
        };
        f.write_str(name)
    }
}

/// Owned identity of a proxy, usable as a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    pub kind: ProxyKind,
    pub id: String,
}

/// The object a proxy stands for
#[derive(Debug, Clone)]
pub enum ProxyTarget {
    Element(ElementReference),
    ElementModifier(Arc<ProposedElement>),
    Attribute(Attribute),
    AttributeModifier(Arc<ProposedAttribute>),
    Document,
}

struct ProxyInner {
    schema: Arc<Schema>,
    target: ProxyTarget,
    sub_elements: OnceLock<Vec<SchemaElementProxy>>,
    sub_attributes: OnceLock<Vec<SchemaElementProxy>>,
}

/// Uniform navigation handle over schema objects and proposals
///
/// Cloning is cheap. Equality and hashing use the discriminator and the
/// wrapped object's id, never its name.
#[derive(Clone)]
pub struct SchemaElementProxy {
    inner: Arc<ProxyInner>,
}

impl SchemaElementProxy {
    /// Proxy for the document root of `schema`
    pub fn document(schema: Arc<Schema>) -> Self {
        Self::new(schema, ProxyTarget::Document)
    }

    /// Proxy for a committed element reference
    pub fn element(schema: Arc<Schema>, reference: ElementReference) -> Self {
        Self::new(schema, ProxyTarget::Element(reference))
    }

    /// Proxy for a proposed element
    pub fn element_modifier(schema: Arc<Schema>, element: impl Into<Arc<ProposedElement>>) -> Self {
        Self::new(schema, ProxyTarget::ElementModifier(element.into()))
    }

    /// Proxy for a committed attribute
    pub fn attribute(schema: Arc<Schema>, attribute: Attribute) -> Self {
        Self::new(schema, ProxyTarget::Attribute(attribute))
    }

    /// Proxy for a proposed attribute
    pub fn attribute_modifier(
        schema: Arc<Schema>,
        attribute: impl Into<Arc<ProposedAttribute>>,
    ) -> Self {
        Self::new(schema, ProxyTarget::AttributeModifier(attribute.into()))
    }

    fn new(schema: Arc<Schema>, target: ProxyTarget) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                schema,
                target,
                sub_elements: OnceLock::new(),
                sub_attributes: OnceLock::new(),
            }),
        }
    }

    pub fn kind(&self) -> ProxyKind {
        match &self.inner.target {
            ProxyTarget::Element(_) => ProxyKind::Element,
            ProxyTarget::ElementModifier(_) => ProxyKind::ElementModifier,
            ProxyTarget::Attribute(_) => ProxyKind::Attribute,
            ProxyTarget::AttributeModifier(_) => ProxyKind::AttributeModifier,
            ProxyTarget::Document => ProxyKind::Document,
        }
    }

    pub fn target(&self) -> &ProxyTarget {
        &self.inner.target
    }

    /// Schema this proxy navigates
    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn is_document(&self) -> bool {
        matches!(self.inner.target, ProxyTarget::Document)
    }

    /// True for committed and proposed elements
    pub fn is_element(&self) -> bool {
        matches!(
            self.inner.target,
            ProxyTarget::Element(_) | ProxyTarget::ElementModifier(_)
        )
    }

    /// True for committed and proposed attributes
    pub fn is_attribute(&self) -> bool {
        matches!(
            self.inner.target,
            ProxyTarget::Attribute(_) | ProxyTarget::AttributeModifier(_)
        )
    }

    /// Name of the wrapped element or attribute; the document has none
    pub fn name(&self) -> Option<&str> {
        match &self.inner.target {
            ProxyTarget::Element(r) => Some(&r.name),
            ProxyTarget::ElementModifier(e) => Some(&e.name),
            ProxyTarget::Attribute(a) => Some(&a.name),
            ProxyTarget::AttributeModifier(a) => Some(&a.name),
            ProxyTarget::Document => None,
        }
    }

    /// Name of the wrapped element
    ///
    /// # Errors
    ///
    /// Fails if the proxy does not wrap an element or proposed element.
    pub fn element_name(&self) -> Result<&str> {
        match &self.inner.target {
            ProxyTarget::Element(r) => Ok(&r.name),
            ProxyTarget::ElementModifier(e) => Ok(&e.name),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::Element, self.kind())),
        }
    }

    /// Name of the wrapped attribute
    ///
    /// # Errors
    ///
    /// Fails if the proxy does not wrap an attribute or proposed attribute.
    pub fn attribute_name(&self) -> Result<&str> {
        match &self.inner.target {
            ProxyTarget::Attribute(a) => Ok(&a.name),
            ProxyTarget::AttributeModifier(a) => Ok(&a.name),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::Attribute, self.kind())),
        }
    }

    /// Id a modifier attaches to when it extends this object; only elements
    /// can carry attributes and children
    pub fn element_id(&self) -> Option<&str> {
        match &self.inner.target {
            ProxyTarget::Element(r) => Some(&r.id),
            ProxyTarget::ElementModifier(e) => Some(&e.reference_id),
            _ => None,
        }
    }

    pub fn element_reference(&self) -> Result<&ElementReference> {
        match &self.inner.target {
            ProxyTarget::Element(r) => Ok(r),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::Element, self.kind())),
        }
    }

    pub fn proposed_element(&self) -> Result<&ProposedElement> {
        match &self.inner.target {
            ProxyTarget::ElementModifier(e) => Ok(e),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::ElementModifier, self.kind())),
        }
    }

    pub fn schema_attribute(&self) -> Result<&Attribute> {
        match &self.inner.target {
            ProxyTarget::Attribute(a) => Ok(a),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::Attribute, self.kind())),
        }
    }

    pub fn proposed_attribute(&self) -> Result<&ProposedAttribute> {
        match &self.inner.target {
            ProxyTarget::AttributeModifier(a) => Ok(a),
            _ => Err(Error::wrong_proxy_kind(ProxyKind::AttributeModifier, self.kind())),
        }
    }

    /// Child elements; root elements for the document, nothing for attributes
    pub fn sub_elements(&self) -> &[SchemaElementProxy] {
        self.inner.sub_elements.get_or_init(|| {
            let schema = &self.inner.schema;
            match &self.inner.target {
                ProxyTarget::Element(reference) => schema
                    .sub_elements_of(reference)
                    .iter()
                    .map(|r| Self::element(Arc::clone(schema), r.clone()))
                    .collect(),
                ProxyTarget::ElementModifier(element) => element
                    .sub_elements
                    .iter()
                    .map(|e| Self::element_modifier(Arc::clone(schema), e.clone()))
                    .collect(),
                ProxyTarget::Document => schema
                    .root_elements
                    .iter()
                    .map(|r| Self::element(Arc::clone(schema), r.clone()))
                    .collect(),
                ProxyTarget::Attribute(_) | ProxyTarget::AttributeModifier(_) => Vec::new(),
            }
        })
    }

    /// Attributes; nothing for the document or for attributes
    pub fn sub_attributes(&self) -> &[SchemaElementProxy] {
        self.inner.sub_attributes.get_or_init(|| {
            let schema = &self.inner.schema;
            match &self.inner.target {
                ProxyTarget::Element(reference) => schema
                    .attributes_of(reference)
                    .iter()
                    .map(|a| Self::attribute(Arc::clone(schema), a.clone()))
                    .collect(),
                ProxyTarget::ElementModifier(element) => element
                    .attributes
                    .iter()
                    .map(|a| Self::attribute_modifier(Arc::clone(schema), a.clone()))
                    .collect(),
                ProxyTarget::Attribute(_)
                | ProxyTarget::AttributeModifier(_)
                | ProxyTarget::Document => Vec::new(),
            }
        })
    }

    pub fn sub_element(&self, name: &QName) -> Option<&SchemaElementProxy> {
        self.sub_elements()
            .iter()
            .find(|p| p.name().is_some_and(|n| name.matches(n)))
    }

    pub fn sub_attribute(&self, name: &QName) -> Option<&SchemaElementProxy> {
        self.sub_attributes()
            .iter()
            .find(|p| p.name().is_some_and(|n| name.matches(n)))
    }

    pub fn has_sub_element(&self, name: &QName) -> bool {
        self.sub_element(name).is_some()
    }

    pub fn has_sub_attribute(&self, name: &QName) -> bool {
        self.sub_attribute(name).is_some()
    }

    /// Owned identity, for keying maps across proxy instances
    pub fn key(&self) -> ProxyKey {
        let (kind, id) = self.identity();
        ProxyKey {
            kind,
            id: id.into_owned(),
        }
    }

    /// The document is identified by its schema version, everything else by its id
    fn identity(&self) -> (ProxyKind, Cow<'_, str>) {
        let id = match &self.inner.target {
            ProxyTarget::Element(r) => Cow::Borrowed(r.id.as_str()),
            ProxyTarget::ElementModifier(e) => Cow::Borrowed(e.reference_id.as_str()),
            ProxyTarget::Attribute(a) => Cow::Borrowed(a.id.as_str()),
            ProxyTarget::AttributeModifier(a) => Cow::Borrowed(a.attribute_id.as_str()),
            ProxyTarget::Document => Cow::Owned(self.inner.schema.qualified_name()),
        };
        (self.kind(), id)
    }
}

impl PartialEq for SchemaElementProxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.identity() == other.identity()
    }
}

impl Eq for SchemaElementProxy {}

impl Hash for SchemaElementProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for SchemaElementProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, id) = self.identity();
        f.debug_struct("SchemaElementProxy")
            .field("kind", &kind)
            .field("name", &self.name())
            .field("id", &id)
            .finish()
    }
}

impl fmt::Display for SchemaElementProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} '{}'", self.kind(), name),
            None => write!(f, "document of {}", self.inner.schema.qualified_name()),
        }
    }
}
