//! Schema modifier collector
//!
//! Consolidates the proposals of many independent document analyses into
//! one duplicate-free set for a single schema version. Two proposals are the
//! same when they are structurally equal ignoring generated ids.
//!
//! When an element proposal is dropped as a duplicate, its reference id is
//! recorded as an alias of the kept proposal's id. Later proposals attached
//! to the dropped element are re-parented onto the kept one before they are
//! compared, so the consolidated set never refers to an element it does not
//! contain.

use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use xsl_schema::{ProposedElement, Schema, SchemaModifier, Structural};

use crate::{Error, Result};

#[derive(Debug, Default)]
struct CollectorState {
    modifiers: IndexSet<Structural>,
    // dropped reference id -> reference id of the kept proposal
    aliases: HashMap<String, String>,
}

/// Thread-safe, schema-scoped consolidation of modifier proposals
#[derive(Debug)]
pub struct SchemaModifierCollector {
    schema_uri: String,
    schema_version: u32,
    state: Mutex<CollectorState>,
}

impl SchemaModifierCollector {
    /// Create a collector accepting modifiers for `schema_uri` at `schema_version`
    pub fn new(schema_uri: impl Into<String>, schema_version: u32) -> Self {
        Self {
            schema_uri: schema_uri.into(),
            schema_version,
            state: Mutex::new(CollectorState::default()),
        }
    }

    /// Create a collector scoped to `schema`
    pub fn for_schema(schema: &Schema) -> Self {
        Self::new(schema.uri.clone(), schema.version)
    }

    pub fn schema_uri(&self) -> &str {
        &self.schema_uri
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn lock(&self) -> Result<MutexGuard<'_, CollectorState>> {
        self.state
            .lock()
            .map_err(|_| Error::Collector("Failed to lock modifier collector".to_string()))
    }

    /// Add a proposal; returns `false` if a structurally equal one is already present
    ///
    /// # Errors
    ///
    /// Fails without touching the collected set if `modifier` targets
    /// another schema URI or version, or if the lock is poisoned.
    pub fn add_modifier(&self, modifier: SchemaModifier) -> Result<bool> {
        if !modifier.applies_to(&self.schema_uri, self.schema_version) {
            return Err(xsl_schema::Error::schema_mismatch(
                &self.schema_uri,
                self.schema_version,
                modifier.schema_uri(),
                modifier.schema_version(),
            )
            .into());
        }

        let mut guard = self.lock()?;
        let state = &mut *guard;

        let modifier = match modifier.element_id().and_then(|id| state.aliases.get(id)) {
            Some(canonical) => {
                trace!("Re-parenting {} '{}' onto {}", modifier.kind_name(), modifier.name(), canonical);
                modifier.with_element_id(Some(canonical.clone()))
            }
            None => modifier,
        };

        let candidate = Structural(modifier);
        if let Some(kept) = state.modifiers.get(&candidate) {
            if let (SchemaModifier::Element(dropped), SchemaModifier::Element(kept)) =
                (&candidate.0, &kept.0)
            {
                record_aliases(&mut state.aliases, dropped, kept);
            }
            trace!(
                "Dropping duplicate {} '{}'",
                candidate.0.kind_name(),
                candidate.0.name()
            );
            return Ok(false);
        }

        debug!(
            "Collected {} '{}' for {}#{}",
            candidate.0.kind_name(),
            candidate.0.name(),
            self.schema_uri,
            self.schema_version
        );
        state.modifiers.insert(candidate);
        Ok(true)
    }

    /// Add every modifier in order, returning how many were new
    ///
    /// # Errors
    ///
    /// Stops at the first modifier [`add_modifier`](Self::add_modifier) rejects.
    pub fn add_all(&self, modifiers: impl IntoIterator<Item = SchemaModifier>) -> Result<usize> {
        let mut added = 0;
        for modifier in modifiers {
            if self.add_modifier(modifier)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// The consolidated proposals in first-collected order
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get_consolidated_modifiers(&self) -> Result<Vec<SchemaModifier>> {
        let state = self.lock()?;
        Ok(state.modifiers.iter().map(|m| m.0.clone()).collect())
    }

    /// Number of consolidated proposals
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.modifiers.len())
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Forget every collected proposal and alias
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.modifiers.clear();
        state.aliases.clear();
        Ok(())
    }
}

/// Alias `dropped` and its nested elements onto their structural twins in `kept`
fn record_aliases(aliases: &mut HashMap<String, String>, dropped: &ProposedElement, kept: &ProposedElement) {
    if dropped.reference_id != kept.reference_id {
        aliases.insert(dropped.reference_id.clone(), kept.reference_id.clone());
    }
    for (dropped, kept) in dropped.sub_elements.iter().zip(&kept.sub_elements) {
        record_aliases(aliases, dropped, kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use xsl_schema::{DataType, ProposedAttribute, ProposedParameter};

    const URI: &str = "urn:stylesheet:catalog";

    fn attribute(element_id: &str, name: &str) -> ProposedAttribute {
        ProposedAttribute::new(URI, 1, Some(element_id.to_string()), name)
    }

    #[test]
    fn test_structural_duplicates_collapse() {
        let collector = SchemaModifierCollector::new(URI, 1);

        assert!(collector.add_modifier(attribute("/catalog", "missing").into()).unwrap());
        assert!(!collector.add_modifier(attribute("/catalog", "missing").into()).unwrap());
        assert!(collector.add_modifier(attribute("/other", "missing").into()).unwrap());

        assert_eq!(collector.len().unwrap(), 2);
    }

    #[test]
    fn test_different_declared_type_is_kept() {
        let collector = SchemaModifierCollector::new(URI, 1);
        collector.add_modifier(attribute("/catalog", "when").into()).unwrap();
        collector
            .add_modifier(attribute("/catalog", "when").with_data_type(DataType::Date).into())
            .unwrap();

        assert_eq!(collector.len().unwrap(), 2);
    }

    #[test]
    fn test_same_element_with_different_children_is_kept() {
        let collector = SchemaModifierCollector::new(URI, 1);
        let parent = Some("/catalog".to_string());
        let plain = ProposedElement::new(URI, 1, parent.clone(), "meta");
        let with_key = ProposedElement::new(URI, 1, parent, "meta")
            .with_attribute(ProposedAttribute::new(URI, 1, None, "key"));

        collector.add_modifier(plain.into()).unwrap();
        collector.add_modifier(with_key.into()).unwrap();

        assert_eq!(collector.len().unwrap(), 2);
    }

    #[test]
    fn test_foreign_schema_is_rejected_without_mutation() {
        let collector = SchemaModifierCollector::new(URI, 1);
        collector.add_modifier(attribute("/catalog", "a").into()).unwrap();

        let foreign = ProposedParameter::new(URI, 2, "mode");
        let err = collector.add_modifier(foreign.into()).unwrap_err();

        assert!(matches!(
            err,
            Error::Schema(xsl_schema::Error::SchemaMismatch {
                expected_version: 1,
                found_version: 2,
                ..
            })
        ));
        assert_eq!(collector.len().unwrap(), 1);
    }

    #[test]
    fn test_children_of_dropped_element_are_reparented() {
        let collector = SchemaModifierCollector::new(URI, 1);
        let parent = Some("/catalog".to_string());

        // two analyses discover the same new element and an attribute on it
        let first = ProposedElement::new(URI, 1, parent.clone(), "note");
        let first_attr = attribute(&first.reference_id, "lang");
        let second = ProposedElement::new(URI, 1, parent, "note");
        let second_attr = attribute(&second.reference_id, "lang");
        let second_only = attribute(&second.reference_id, "author");
        let kept_id = first.reference_id.clone();

        collector
            .add_all([SchemaModifier::from(first), SchemaModifier::from(first_attr)])
            .unwrap();
        let added = collector
            .add_all([
                SchemaModifier::from(second),
                SchemaModifier::from(second_attr),
                SchemaModifier::from(second_only),
            ])
            .unwrap();

        assert_eq!(added, 1);
        let consolidated = collector.get_consolidated_modifiers().unwrap();
        assert_eq!(consolidated.len(), 3);
        assert!(
            consolidated[1..]
                .iter()
                .all(|m| m.element_id() == Some(kept_id.as_str()))
        );
    }

    #[test]
    fn test_clear_resets_state() {
        let collector = SchemaModifierCollector::new(URI, 1);
        collector.add_modifier(attribute("/catalog", "a").into()).unwrap();
        collector.clear().unwrap();

        assert!(collector.is_empty().unwrap());
        assert!(collector.add_modifier(attribute("/catalog", "a").into()).unwrap());
    }

    #[test]
    fn test_concurrent_adds_consolidate() {
        let collector = Arc::new(SchemaModifierCollector::new(URI, 1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for name in ["a", "b", "c"] {
                        collector.add_modifier(attribute("/catalog", name).into()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.len().unwrap(), 3);
    }
}
