//! Load a schema, evolve it and load the result back

use std::sync::Arc;

use xsl_schema::{
    DataType, ProposedAttribute, ProposedElement, ProposedParameter, SchemaLoader,
    SchemaManager, SchemaModificationProcessor, SchemaModifier, SchemaRegistry,
};

const URI: &str = "urn:stylesheet:catalog";

const CATALOG_YAML: &str = r"
uri: urn:stylesheet:catalog
version: 1
root_elements:
  - name: catalog
    element_type: catalogType
element_types:
  - name: catalogType
    content_type: complex
    attributes:
      - name: lang
    sub_elements:
      - name: entry
        element_type: entryType
        max_occurs: ~
  - name: entryType
    attributes:
      - name: href
        data_type: uri
";

#[test]
fn test_evolved_schema_round_trips_through_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("catalog.yaml");
    std::fs::write(&source, CATALOG_YAML)?;

    let registry = Arc::new(SchemaRegistry::new());
    let loader = SchemaLoader::with_registry(Arc::clone(&registry));
    let v1 = loader.load_from_file(&source)?;

    let review = ProposedElement::new(URI, 1, Some("catalogType/entry".to_string()), "review")
        .with_attribute(ProposedAttribute::new(URI, 1, None, "stars").with_data_type(DataType::Integer));
    let review_id = review.reference_id.clone();
    let modifiers = vec![
        // listed before its parent on purpose
        SchemaModifier::from(ProposedAttribute::new(URI, 1, Some(review_id.clone()), "author")),
        SchemaModifier::from(review),
        SchemaModifier::from(ProposedAttribute::new(URI, 1, Some("/catalog".to_string()), "edition")),
        SchemaModifier::from(ProposedParameter::new(URI, 1, "page-size")),
    ];

    let v2 = SchemaModificationProcessor::new().modify_schema(&v1, &modifiers)?;
    assert_eq!(v2.version, 2);
    assert_eq!(v1.version, 1);

    let target = dir.path().join("catalog-v2.json");
    SchemaLoader::save_to_file(&v2, &target)?;
    let reloaded = loader.load_from_file(&target)?;
    assert_eq!(*reloaded, v2);

    assert_eq!(registry.latest_version(URI), Some(2));
    let stored = registry.get_schema(URI, 2)?;
    let review = stored
        .element_reference(&review_id)
        .expect("proposed element should be materialized");
    let attributes: Vec<&str> = stored
        .attributes_of(review)
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(attributes, vec!["stars", "author"]);
    assert!(stored.element_type("catalogType").unwrap().attribute("edition").is_some());
    assert!(stored.parameter("page-size").is_some());
    Ok(())
}

#[test]
fn test_yaml_output_is_loadable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = SchemaLoader::new();
    let schema = loader.load_from_yaml(CATALOG_YAML)?;

    let target = dir.path().join("copy.yml");
    SchemaLoader::save_to_file(&schema, &target)?;
    let reloaded = loader.load_from_file(&target)?;

    assert_eq!(*reloaded, schema);
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = SchemaLoader::new()
        .load_from_file(std::path::Path::new("/nonexistent/catalog.yaml"))
        .unwrap_err();
    assert!(matches!(err, xsl_schema::Error::Io(_)));
}
