//! Campaign runs over batches of rendered documents

use std::sync::Arc;

use xsl_ir::{ContextPath, Expression, HtmlDocumentContainer, TraceEvent, XmlDocumentContainer};
use xsl_pipeline::{
    CampaignConfig, EvolutionCampaign, Error, PathTracePreprocessor, SchemaModifierCollector,
    ValueTraceAnalyzer,
};
use xsl_schema::{Attribute, ElementReference, ElementType, Schema, SchemaModifier, SchemaRegistry};

const URI: &str = "urn:stylesheet:catalog";

fn schema() -> Schema {
    Schema::new(URI, 3)
        .with_root(ElementReference::new("/catalog", "catalog", "catalogType"))
        .with_type(
            ElementType::new("catalogType", "catalogType")
                .with_attribute(Attribute::new("catalogType@lang", "lang"))
                .with_sub_element(ElementReference::new(
                    "catalogType/entry",
                    "entry",
                    "entryType",
                )),
        )
        .with_type(ElementType::new("entryType", "entryType"))
}

fn campaign(config: CampaignConfig) -> EvolutionCampaign {
    let collector = Arc::new(SchemaModifierCollector::for_schema(&schema()));
    campaign_with(config, collector)
}

fn campaign_with(config: CampaignConfig, collector: Arc<SchemaModifierCollector>) -> EvolutionCampaign {
    let schema = schema();
    let registry = SchemaRegistry::new();
    registry.register(schema);
    let analyzer = ValueTraceAnalyzer::new(Arc::new(registry), Arc::new(PathTracePreprocessor::new()));
    EvolutionCampaign::new(Arc::new(analyzer), collector, config)
}

fn rendering(id: &str, version: u32) -> HtmlDocumentContainer {
    HtmlDocumentContainer::new(id, XmlDocumentContainer::new(format!("{id}.xml"), URI, version))
}

/// entry/@title and @rating, both unknown to the schema
fn traced_rendering(id: &str) -> HtmlDocumentContainer {
    let entry = ContextPath::elements(["catalog", "entry"]);
    rendering(id, 3)
        .with_event(TraceEvent::new(entry.clone(), Expression::attribute("title")))
        .with_event(TraceEvent::new(entry, Expression::attribute("rating")))
        .with_event(TraceEvent::new(
            ContextPath::elements(["catalog"]),
            Expression::attribute("lang"),
        ))
}

#[tokio::test]
async fn test_proposals_from_many_documents_consolidate() -> anyhow::Result<()> {
    let campaign = campaign(CampaignConfig {
        max_concurrency: 2,
        fail_fast: false,
    });
    let documents = (0..6).map(|i| traced_rendering(&format!("doc-{i}"))).collect();

    let report = campaign.run(documents).await?;

    assert_eq!(report.documents_analyzed, 6);
    assert_eq!(report.documents_failed, 0);
    assert_eq!(report.documents_without_trace, 0);
    assert_eq!(report.proposals_emitted, 12);
    assert_eq!(report.consolidated, 2);

    let mut names: Vec<String> = campaign
        .collector()
        .get_consolidated_modifiers()?
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["rating", "title"]);
    assert!(
        campaign
            .collector()
            .get_consolidated_modifiers()?
            .iter()
            .all(|m| matches!(m, SchemaModifier::Attribute(a) if a.element_id.as_deref() == Some("catalogType/entry")))
    );
    Ok(())
}

#[tokio::test]
async fn test_documents_without_trace_are_counted() -> anyhow::Result<()> {
    let campaign = campaign(CampaignConfig::default());
    let documents = vec![traced_rendering("traced"), rendering("silent-1", 3), rendering("silent-2", 3)];

    let report = campaign.run(documents).await?;

    assert_eq!(report.documents_analyzed, 3);
    assert_eq!(report.documents_without_trace, 2);
    assert_eq!(report.consolidated, 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_documents_are_counted_without_fail_fast() -> anyhow::Result<()> {
    let campaign = campaign(CampaignConfig {
        max_concurrency: 4,
        fail_fast: false,
    });
    let documents = vec![traced_rendering("good"), rendering("stale", 2)];

    let report = campaign.run(documents).await?;

    assert_eq!(report.documents_analyzed, 1);
    assert_eq!(report.documents_failed, 1);
    assert_eq!(report.consolidated, 2);
    Ok(())
}

#[tokio::test]
async fn test_fail_fast_stops_on_first_failure() {
    let campaign = campaign(CampaignConfig {
        max_concurrency: 1,
        fail_fast: true,
    });

    let err = campaign.run(vec![rendering("stale", 2)]).await.unwrap_err();

    assert!(matches!(err, Error::Analysis { ref document, .. } if document == "stale"));
}

/// Many distinct unknown attributes on entry, slow enough to outlive a failed sibling
fn heavy_rendering(id: &str, events: usize) -> HtmlDocumentContainer {
    let entry = ContextPath::elements(["catalog", "entry"]);
    (0..events).fold(rendering(id, 3), |document, i| {
        document.with_event(TraceEvent::new(
            entry.clone(),
            Expression::attribute(format!("a{i}").as_str()),
        ))
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fail_fast_leaves_collector_untouched_after_return() {
    let collector = Arc::new(SchemaModifierCollector::for_schema(&schema()));
    let campaign = campaign_with(
        CampaignConfig {
            max_concurrency: 4,
            fail_fast: true,
        },
        Arc::clone(&collector),
    );
    let mut documents = vec![rendering("stale", 99)];
    documents.extend((0..3).map(|i| heavy_rendering(&format!("heavy-{i}"), 20_000)));

    assert!(campaign.run(documents).await.is_err());
    let at_return = collector.len().unwrap();
    drop(campaign);

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    assert_eq!(collector.len().unwrap(), at_return);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let campaign = campaign(CampaignConfig {
        max_concurrency: 0,
        fail_fast: false,
    });

    let err = campaign.run(vec![traced_rendering("doc")]).await.unwrap_err();
    assert!(matches!(err, Error::Campaign(_)));
}
