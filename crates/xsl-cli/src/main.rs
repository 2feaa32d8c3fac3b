//! # xsl-cli
//!
//! Command-line front end for schema evolution: analyze the traces of
//! transformed probe documents into a consolidated set of schema modifiers,
//! and apply such a set to produce the next schema version.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "xsl-evolve")]
#[command(about = "Schema evolution for XSLT stylesheet inputs")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive schema modifiers from engine traces
    Analyze {
        /// Schema file the probe documents were generated from
        #[arg(short, long)]
        schema: PathBuf,

        /// Trace files (JSON, one document or a list)
        #[arg(short, long, required = true, num_args = 1..)]
        trace: Vec<PathBuf>,

        /// Write modifiers here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Documents analyzed at the same time
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Stop at the first document that fails
        #[arg(long)]
        fail_fast: bool,

        /// Pretty-print the modifier JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Apply a modifier file and write the next schema version
    Evolve {
        /// Schema file to evolve
        #[arg(short, long)]
        schema: PathBuf,

        /// Modifier file written by `analyze`
        #[arg(short, long)]
        modifiers: PathBuf,

        /// Output schema file (YAML or JSON by extension)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load_or_default(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            schema,
            trace,
            output,
            max_concurrency,
            fail_fast,
            pretty,
        } => {
            let campaign = config.campaign(max_concurrency, fail_fast);
            let report = commands::analyze(
                &schema,
                &trace,
                output.as_deref(),
                campaign,
                pretty || config.pretty,
            )
            .await?;
            tracing::info!(
                "Analyzed {} documents ({} failed), {} modifiers",
                report.documents_analyzed,
                report.documents_failed,
                report.consolidated
            );
        }
        Commands::Evolve {
            schema,
            modifiers,
            output,
        } => {
            tracing::info!("Evolving {} with {}", schema.display(), modifiers.display());
            commands::evolve(&schema, &modifiers, &output)?;
        }
    }
    Ok(())
}
