//! Parallel evolution campaign
//!
//! Analyzes a batch of probe documents generated against one schema
//! version. Each document is analyzed on tokio's blocking pool with its own
//! factory and coordinator. A blocking analysis only buffers its proposals;
//! they reach the shared collector from the join loop of [`EvolutionCampaign::run`],
//! so nothing is collected once a run has returned, even if an aborted
//! analysis is still finishing on the blocking pool.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use xsl_ir::HtmlDocumentContainer;
use xsl_schema::SchemaModifier;

use crate::analyzer::{AnalysisSummary, ValueTraceAnalyzer};
use crate::collector::SchemaModifierCollector;
use crate::{Error, Result};

/// Configuration for a campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Documents analyzed at the same time
    pub max_concurrency: usize,
    /// Abort on the first failed document instead of counting it
    pub fail_fast: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            fail_fast: false,
        }
    }
}

/// Totals of one campaign run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    /// Documents whose analysis completed, with or without trace
    pub documents_analyzed: usize,
    pub documents_without_trace: usize,
    pub documents_failed: usize,
    /// Proposals emitted by all analyses, before consolidation
    pub proposals_emitted: usize,
    /// Size of the collector's consolidated set after the run
    pub consolidated: usize,
}

impl CampaignReport {
    fn record(&mut self, summary: &AnalysisSummary) {
        self.documents_analyzed += 1;
        if !summary.has_trace() {
            self.documents_without_trace += 1;
        }
        self.proposals_emitted += summary.proposals();
    }
}

/// Runs document analyses in parallel and consolidates their proposals
pub struct EvolutionCampaign {
    analyzer: Arc<ValueTraceAnalyzer>,
    collector: Arc<SchemaModifierCollector>,
    config: CampaignConfig,
}

impl EvolutionCampaign {
    pub fn new(
        analyzer: Arc<ValueTraceAnalyzer>,
        collector: Arc<SchemaModifierCollector>,
        config: CampaignConfig,
    ) -> Self {
        Self {
            analyzer,
            collector,
            config,
        }
    }

    pub fn collector(&self) -> &Arc<SchemaModifierCollector> {
        &self.collector
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Analyze `documents`, feeding every document's proposals to the collector
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration. With `fail_fast`, also fails with
    /// the first document error; otherwise failed documents are counted and
    /// logged.
    pub async fn run(&self, documents: Vec<HtmlDocumentContainer>) -> Result<CampaignReport> {
        if self.config.max_concurrency == 0 {
            return Err(Error::Campaign(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }

        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        for document in documents {
            let semaphore = Arc::clone(&semaphore);
            let analyzer = Arc::clone(&self.analyzer);
            tasks.spawn(run_document(semaphore, analyzer, document));
        }

        let mut report = CampaignReport::default();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| Error::Campaign(format!("Analysis task failed: {e}")))
                .and_then(|result| result)
                .and_then(|(summary, proposals)| {
                    self.collector.add_all(proposals)?;
                    Ok(summary)
                });
            match outcome {
                Ok(summary) => report.record(&summary),
                Err(e) if self.config.fail_fast => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    report.documents_failed += 1;
                    warn!("Document analysis failed: {}", e);
                }
            }
        }

        report.consolidated = self.collector.len()?;
        info!(
            "Campaign over {} documents: {} analyzed ({} without trace), {} failed, {} proposals, {} consolidated",
            total,
            report.documents_analyzed,
            report.documents_without_trace,
            report.documents_failed,
            report.proposals_emitted,
            report.consolidated
        );
        Ok(report)
    }
}

async fn run_document(
    semaphore: Arc<Semaphore>,
    analyzer: Arc<ValueTraceAnalyzer>,
    document: HtmlDocumentContainer,
) -> Result<(AnalysisSummary, Vec<SchemaModifier>)> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| Error::Campaign("Campaign semaphore is closed".to_string()))?;
    tokio::task::spawn_blocking(move || analyze_document(&analyzer, &document))
        .await
        .map_err(|e| Error::Campaign(format!("Analysis task failed: {e}")))?
}

fn analyze_document(
    analyzer: &ValueTraceAnalyzer,
    document: &HtmlDocumentContainer,
) -> Result<(AnalysisSummary, Vec<SchemaModifier>)> {
    let mut proposals = Vec::new();
    let summary = analyzer
        .analyze(document, |m: SchemaModifier| proposals.push(m))
        .map_err(|e| Error::analysis(&document.id, e.to_string()))?;
    Ok((summary, proposals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_usable() {
        let config = CampaignConfig::default();
        assert!(config.max_concurrency > 0);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: CampaignConfig = serde_json::from_str(r#"{"fail_fast": true}"#).unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.max_concurrency, CampaignConfig::default().max_concurrency);
    }
}
