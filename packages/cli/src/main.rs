#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for mortgage document extraction.
//!
//! Each subcommand maps onto one pipeline operation. Running without a
//! subcommand opens an interactive menu instead.
//!
//! Uses `indicatif-log-bridge` (via [`loan_docs_cli_utils::init_logger`])
//! so log lines and progress bars never fight for the terminal.

mod commands;
mod inputs;
mod interactive;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use loan_docs_document_models::DocumentType;

use crate::commands::{ExtractRequest, PipelineArgs};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "loan_docs",
    about = "Classify mortgage PDFs and extract structured loan fields"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify documents and extract their fields
    Extract {
        /// PDF files, or folders whose `*.pdf` files are processed
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write records here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Print `Field: value` lines per document to stderr
        #[arg(long)]
        summary: bool,
    },
    /// Print the detected document type of each PDF
    Classify {
        /// PDF files or folders
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Print the canonical output schema
    Fields,
    /// List the extraction rules in effect
    Rules {
        /// Only show this document type (e.g. "Loan Estimate")
        #[arg(long, value_parser = commands::parse_document_type)]
        document_type: Option<DocumentType>,
        /// Directory of rule-table overrides
        #[arg(long, value_name = "DIR")]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = loan_docs_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Extract {
            paths,
            pipeline,
            format,
            output,
            summary,
        } => {
            let config = pipeline.resolve()?;
            let request = ExtractRequest {
                paths,
                format,
                output,
                summary,
            };
            commands::extract(&multi, config, request).await?;
        }
        Commands::Classify { paths, pipeline } => {
            commands::classify(pipeline.resolve()?, &paths).await?;
        }
        Commands::Fields => commands::fields(&mut std::io::stdout().lock())?,
        Commands::Rules {
            document_type,
            rules,
        } => commands::rules(&mut std::io::stdout().lock(), rules.as_deref(), document_type)?,
    }

    Ok(())
}
