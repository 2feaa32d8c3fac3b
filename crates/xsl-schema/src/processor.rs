//! Schema modification processor
//!
//! Materializes the next schema version from a consolidated modifier set.
//! Modifiers may reference each other through generated ids (a proposed
//! attribute on a proposed element), so they are applied parents first:
//! any modifier whose parent is already present is applied, the rest are
//! retried until a round makes no progress.

use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

use crate::model::{Attribute, ElementReference, ElementType, Parameter, Schema};
use crate::modifier::{ProposedAttribute, ProposedElement, SchemaModifier};
use crate::{Error, Result};

/// Applies schema modifiers to produce a new schema version
#[derive(Debug, Default)]
pub struct SchemaModificationProcessor {
    // proposed reference id -> reference id it was materialized as
    materialized: HashMap<String, String>,
}

impl SchemaModificationProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `modifiers` to a copy of `input`, returning version `input.version + 1`
    ///
    /// # Errors
    ///
    /// Fails if a modifier targets another schema or version, or if a
    /// modifier's parent element never materializes.
    pub fn modify_schema(&mut self, input: &Schema, modifiers: &[SchemaModifier]) -> Result<Schema> {
        if let Some(foreign) = modifiers
            .iter()
            .find(|m| !m.applies_to(&input.uri, input.version))
        {
            return Err(Error::schema_mismatch(
                &input.uri,
                input.version,
                foreign.schema_uri(),
                foreign.schema_version(),
            ));
        }

        let mut next = input.clone();
        next.version = input.version + 1;
        self.materialized.clear();

        let mut pending: VecDeque<&SchemaModifier> = modifiers.iter().collect();
        let mut applied = 0usize;
        loop {
            let mut deferred = VecDeque::new();
            let mut progressed = false;

            while let Some(modifier) = pending.pop_front() {
                match modifier.element_id() {
                    Some(parent) if self.resolve(&next, parent).is_none() => {
                        deferred.push_back(modifier);
                    }
                    parent => {
                        let parent = parent.and_then(|p| self.resolve(&next, p));
                        self.apply(&mut next, parent.as_deref(), modifier)?;
                        applied += modifier.count();
                        progressed = true;
                    }
                }
            }

            if deferred.is_empty() {
                break;
            }
            if !progressed {
                let stuck = deferred[0];
                return Err(Error::UnresolvedReference {
                    modifier: stuck.name().to_string(),
                    element_id: stuck.element_id().unwrap_or_default().to_string(),
                });
            }
            pending = deferred;
        }

        info!(
            "Materialized {} from {} modifiers ({} schema objects)",
            next.qualified_name(),
            modifiers.len(),
            applied
        );
        Ok(next)
    }

    /// Reference id `element_id` denotes in `schema`, following materialized proposals
    fn resolve(&self, schema: &Schema, element_id: &str) -> Option<String> {
        let id = self
            .materialized
            .get(element_id)
            .map_or(element_id, String::as_str);
        schema.element_reference(id).map(|r| r.id.clone())
    }

    fn apply(&mut self, schema: &mut Schema, parent: Option<&str>, modifier: &SchemaModifier) -> Result<()> {
        match modifier {
            SchemaModifier::Attribute(attribute) => match parent {
                Some(parent) => attach_attribute(schema, parent, attribute),
                None => {
                    debug!("Skipping attribute '{}' without owning element", attribute.name);
                    Ok(())
                }
            },
            SchemaModifier::Element(element) => self.materialize_element(schema, parent, element),
            SchemaModifier::Parameter(parameter) => {
                if schema.parameter(&parameter.name).is_none() {
                    schema.parameters.push(Parameter {
                        id: parameter.parameter_id.clone(),
                        name: parameter.name.clone(),
                        data_type: parameter.data_type,
                    });
                }
                Ok(())
            }
        }
    }

    fn materialize_element(
        &mut self,
        schema: &mut Schema,
        parent: Option<&str>,
        element: &ProposedElement,
    ) -> Result<()> {
        let existing = match parent {
            None => schema
                .root_elements
                .iter()
                .find(|r| r.name == element.name)
                .map(|r| r.id.clone()),
            Some(parent) => owning_type(schema, parent, &element.name)?
                .sub_element(&element.name)
                .map(|r| r.id.clone()),
        };

        let reference_id = if let Some(id) = existing {
            debug!("Element '{}' already present as {}", element.name, id);
            id
        } else {
            schema.element_types.push(ElementType {
                id: element.type_id.clone(),
                name: element.name.clone(),
                content_type: element.content_type,
                attributes: Vec::new(),
                sub_elements: Vec::new(),
                comment: element.comment.clone(),
            });
            let reference = ElementReference {
                id: element.reference_id.clone(),
                name: element.name.clone(),
                element_type: element.type_id.clone(),
                min_occurs: element.min_occurs,
                max_occurs: element.max_occurs,
            };
            match parent {
                None => schema.root_elements.push(reference),
                Some(parent) => owning_type_mut(schema, parent, &element.name)?
                    .sub_elements
                    .push(reference),
            }
            debug!("Added element '{}' as {}", element.name, element.reference_id);
            element.reference_id.clone()
        };

        self.materialized
            .insert(element.reference_id.clone(), reference_id.clone());

        for attribute in &element.attributes {
            attach_attribute(schema, &reference_id, attribute)?;
        }
        for sub_element in &element.sub_elements {
            self.materialize_element(schema, Some(&reference_id), sub_element)?;
        }
        Ok(())
    }
}

fn owning_type<'a>(schema: &'a Schema, parent: &str, name: &str) -> Result<&'a ElementType> {
    schema
        .element_reference(parent)
        .and_then(|r| schema.referenced_type(r))
        .ok_or_else(|| unresolved(name, parent))
}

fn owning_type_mut<'a>(schema: &'a mut Schema, parent: &str, name: &str) -> Result<&'a mut ElementType> {
    let type_id = schema
        .element_reference(parent)
        .map(|r| r.element_type.clone())
        .ok_or_else(|| unresolved(name, parent))?;
    schema
        .element_type_mut(&type_id)
        .ok_or_else(|| unresolved(name, parent))
}

fn attach_attribute(schema: &mut Schema, parent: &str, attribute: &ProposedAttribute) -> Result<()> {
    let owner = owning_type_mut(schema, parent, &attribute.name)?;
    if owner.attribute(&attribute.name).is_some() {
        debug!("Attribute '{}' already present on {}", attribute.name, owner.id);
        return Ok(());
    }
    owner.attributes.push(Attribute {
        id: attribute.attribute_id.clone(),
        name: attribute.name.clone(),
        data_type: attribute.data_type,
        usage: attribute.usage,
        comment: attribute.comment.clone(),
    });
    Ok(())
}

fn unresolved(name: &str, element_id: &str) -> Error {
    Error::UnresolvedReference {
        modifier: name.to_string(),
        element_id: element_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;
    use crate::modifier::ProposedParameter;

    const URI: &str = "urn:stylesheet:catalog";

    fn base_schema() -> Schema {
        Schema::new(URI, 1)
            .with_root(ElementReference::new("/catalog", "catalog", "catalogType"))
            .with_type(
                ElementType::new("catalogType", "catalogType")
                    .with_attribute(Attribute::new("catalogType@lang", "lang")),
            )
    }

    #[test]
    fn test_child_applied_after_proposed_parent() {
        let parent = ProposedElement::new(URI, 1, Some("/catalog".to_string()), "entry");
        let attribute = ProposedAttribute::new(URI, 1, Some(parent.reference_id.clone()), "href")
            .with_data_type(DataType::Uri);

        // Child first: must be deferred until the parent exists.
        let modifiers = vec![
            SchemaModifier::from(attribute.clone()),
            SchemaModifier::from(parent.clone()),
        ];
        let next = SchemaModificationProcessor::new()
            .modify_schema(&base_schema(), &modifiers)
            .unwrap();

        assert_eq!(next.version, 2);
        let entry = next.element_reference(&parent.reference_id).unwrap();
        let entry_attrs = next.attributes_of(entry);
        assert_eq!(entry_attrs.len(), 1);
        assert_eq!(entry_attrs[0].name, "href");
        assert_eq!(entry_attrs[0].data_type, DataType::Uri);
    }

    #[test]
    fn test_nested_proposals_materialize_recursively() {
        let element = ProposedElement::new(URI, 1, Some("/catalog".to_string()), "meta")
            .with_attribute(ProposedAttribute::new(URI, 1, None, "key"))
            .with_sub_element(ProposedElement::new(URI, 1, None, "value"));

        let next = SchemaModificationProcessor::new()
            .modify_schema(&base_schema(), &[SchemaModifier::from(element.clone())])
            .unwrap();

        let meta = next.element_reference(&element.reference_id).unwrap();
        assert_eq!(next.attributes_of(meta)[0].name, "key");
        assert_eq!(next.sub_elements_of(meta)[0].name, "value");
    }

    #[test]
    fn test_existing_names_are_not_duplicated() {
        let existing = ProposedAttribute::new(URI, 1, Some("/catalog".to_string()), "lang");
        let root = ProposedElement::new(URI, 1, None, "catalog");
        let param = ProposedParameter::new(URI, 1, "mode");

        let next = SchemaModificationProcessor::new()
            .modify_schema(
                &base_schema(),
                &[
                    SchemaModifier::from(existing),
                    SchemaModifier::from(root),
                    SchemaModifier::from(param),
                ],
            )
            .unwrap();

        assert_eq!(next.root_elements.len(), 1);
        assert_eq!(next.element_type("catalogType").unwrap().attributes.len(), 1);
        assert!(next.parameter("mode").is_some());
    }

    #[test]
    fn test_dangling_parent_is_an_error() {
        let orphan = ProposedAttribute::new(URI, 1, Some("no-such-element".to_string()), "x");
        let err = SchemaModificationProcessor::new()
            .modify_schema(&base_schema(), &[SchemaModifier::from(orphan)])
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn test_foreign_version_is_rejected() {
        let foreign = ProposedParameter::new(URI, 5, "mode");
        let err = SchemaModificationProcessor::new()
            .modify_schema(&base_schema(), &[SchemaModifier::from(foreign)])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { found_version: 5, .. }));
    }
}
