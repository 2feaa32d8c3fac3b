//! Subcommand implementations

use anyhow::Context;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use xsl_ir::HtmlDocumentContainer;
use xsl_pipeline::{
    CampaignConfig, CampaignReport, EvolutionCampaign, PathTracePreprocessor,
    SchemaModifierCollector, ValueTraceAnalyzer,
};
use xsl_schema::{SchemaLoader, SchemaManager, SchemaModificationProcessor, SchemaModifier};

/// A trace file holds one rendered document or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum TraceFile {
    Many(Vec<HtmlDocumentContainer>),
    One(Box<HtmlDocumentContainer>),
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<HtmlDocumentContainer>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    let parsed: TraceFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid trace file {}", path.display()))?;
    Ok(match parsed {
        TraceFile::Many(documents) => documents,
        TraceFile::One(document) => vec![*document],
    })
}

/// Analyze trace files against a schema and write the consolidated modifiers
pub async fn analyze(
    schema: &Path,
    traces: &[PathBuf],
    output: Option<&Path>,
    campaign: CampaignConfig,
    pretty: bool,
) -> anyhow::Result<CampaignReport> {
    let loader = SchemaLoader::new();
    let schema = loader
        .load_from_file(schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))?;

    let mut documents = Vec::new();
    for path in traces {
        documents.extend(read_documents(path)?);
    }
    info!(
        "Analyzing {} documents against {}",
        documents.len(),
        schema.qualified_name()
    );

    let schemas: Arc<dyn SchemaManager> = loader.registry().clone();
    let analyzer = ValueTraceAnalyzer::new(schemas, Arc::new(PathTracePreprocessor::new()));
    let collector = Arc::new(SchemaModifierCollector::for_schema(&schema));
    let campaign = EvolutionCampaign::new(Arc::new(analyzer), Arc::clone(&collector), campaign);
    let report = campaign.run(documents).await?;

    let modifiers = collector.get_consolidated_modifiers()?;
    let json = if pretty {
        serde_json::to_string_pretty(&modifiers)?
    } else {
        serde_json::to_string(&modifiers)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} modifiers to {}", modifiers.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(report)
}

/// Apply a modifier file to a schema and write the next version
pub fn evolve(schema: &Path, modifiers: &Path, output: &Path) -> anyhow::Result<()> {
    let schema = SchemaLoader::new()
        .load_from_file(schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))?;

    let content = std::fs::read_to_string(modifiers)
        .with_context(|| format!("Failed to read modifier file {}", modifiers.display()))?;
    let modifiers: Vec<SchemaModifier> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid modifier file {}", modifiers.display()))?;

    let next = SchemaModificationProcessor::new().modify_schema(&schema, &modifiers)?;
    SchemaLoader::save_to_file(&next, output)?;
    info!(
        "Applied {} modifiers: {} -> {} written to {}",
        modifiers.len(),
        schema.qualified_name(),
        next.qualified_name(),
        output.display()
    );
    Ok(())
}
