#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # xsl-pipeline
//!
//! Orchestration around the schema-evolution interpreter.
//!
//! A [`ValueTraceAnalyzer`] runs one probe document's trace through the
//! interpreter; a [`SchemaModifierCollector`] consolidates the proposals of
//! many documents into one duplicate-free delta; an [`EvolutionCampaign`]
//! analyzes a batch of documents in parallel and feeds the collector.

pub mod analyzer;
pub mod campaign;
pub mod collector;
pub mod preprocess;

pub use analyzer::{AnalysisSummary, ValueTraceAnalyzer};
pub use campaign::{CampaignConfig, CampaignReport, EvolutionCampaign};
pub use collector::SchemaModifierCollector;
pub use preprocess::{PathTracePreprocessor, PreparedEvents, TracePreprocessor};

use thiserror::Error;

/// Errors that can occur in the pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] xsl_schema::Error),

    #[error(transparent)]
    Evaluation(#[from] xsl_evolution::Error),

    #[error("Analysis of document '{document}' failed: {message}")]
    Analysis { document: String, message: String },

    #[error("Collector error: {0}")]
    Collector(String),

    #[error("Campaign error: {0}")]
    Campaign(String),
}

impl Error {
    /// Create an analysis error carrying the document id.
    pub fn analysis(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            document: document.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
