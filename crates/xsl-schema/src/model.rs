//! Schema model definitions
//!
//! A schema describes the XML documents a stylesheet consumes: named element
//! types carrying attributes and references to child elements, the root
//! elements a document may start with, and the global stylesheet parameters.
//! Every object carries a stable id; proxies and modifiers refer to schema
//! objects by id, never by name.

use serde::{Deserialize, Serialize};

/// A complete input schema for one stylesheet version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub uri: String,
    pub version: u32,
    #[serde(default)]
    pub root_elements: Vec<ElementReference>,
    #[serde(default)]
    pub element_types: Vec<ElementType>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A named element type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementType {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub sub_elements: Vec<ElementReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Occurrence of an element type under a parent (or at the document root)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementReference {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Id (or, before loading, name) of the referenced element type
    pub element_type: String,
    #[serde(default)]
    pub min_occurs: u32,
    /// `None` means unbounded
    #[serde(default = "default_max_occurs")]
    pub max_occurs: Option<u32>,
}

/// Attribute declared on an element type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub usage: AttributeUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Global stylesheet parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
}

/// Content classification of an element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Empty,
    Simple,
    Complex,
    /// Text interleaved with child elements
    #[default]
    Mixed,
}

/// Value type of attributes and parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    Uri,
    Any,
}

/// Whether an attribute must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeUsage {
    #[default]
    Optional,
    Required,
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_occurs() -> Option<u32> {
    Some(1)
}

impl Schema {
    /// Create an empty schema
    pub fn new(uri: impl Into<String>, version: u32) -> Self {
        Self {
            uri: uri.into(),
            version,
            root_elements: Vec::new(),
            element_types: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// `uri#version`, used in logs and registry keys
    pub fn qualified_name(&self) -> String {
        format!("{}#{}", self.uri, self.version)
    }

    /// Find an element type by id
    pub fn element_type(&self, id: &str) -> Option<&ElementType> {
        self.element_types.iter().find(|t| t.id == id)
    }

    /// Find an element type by id, mutably
    pub fn element_type_mut(&mut self, id: &str) -> Option<&mut ElementType> {
        self.element_types.iter_mut().find(|t| t.id == id)
    }

    /// Find an element reference by id, at the root or under any type
    pub fn element_reference(&self, id: &str) -> Option<&ElementReference> {
        self.root_elements
            .iter()
            .chain(self.element_types.iter().flat_map(|t| t.sub_elements.iter()))
            .find(|r| r.id == id)
    }

    /// Element type a reference points at
    pub fn referenced_type(&self, reference: &ElementReference) -> Option<&ElementType> {
        self.element_type(&reference.element_type)
    }

    /// Child element references available under `reference`
    pub fn sub_elements_of(&self, reference: &ElementReference) -> &[ElementReference] {
        self.referenced_type(reference)
            .map(|t| t.sub_elements.as_slice())
            .unwrap_or_default()
    }

    /// Attributes available on `reference`
    pub fn attributes_of(&self, reference: &ElementReference) -> &[Attribute] {
        self.referenced_type(reference)
            .map(|t| t.attributes.as_slice())
            .unwrap_or_default()
    }

    /// Find a global parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Add an element type
    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_types.push(element_type);
        self
    }

    /// Add a root element reference
    pub fn with_root(mut self, reference: ElementReference) -> Self {
        self.root_elements.push(reference);
        self
    }

    /// Add a global parameter
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl ElementType {
    /// Create an element type without attributes or children
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content_type: ContentType::default(),
            attributes: Vec::new(),
            sub_elements: Vec::new(),
            comment: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_sub_element(mut self, reference: ElementReference) -> Self {
        self.sub_elements.push(reference);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Attribute declared on this type by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Child reference declared on this type by name
    pub fn sub_element(&self, name: &str) -> Option<&ElementReference> {
        self.sub_elements.iter().find(|r| r.name == name)
    }
}

impl ElementReference {
    /// Create a reference occurring at most once
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        element_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_type: element_type.into(),
            min_occurs: 0,
            max_occurs: Some(1),
        }
    }

    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: Option<u32>) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }
}

impl Attribute {
    /// Create an optional string attribute
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: DataType::default(),
            usage: AttributeUsage::default(),
            comment: None,
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }
}

impl Parameter {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: DataType::default(),
        }
    }
}
