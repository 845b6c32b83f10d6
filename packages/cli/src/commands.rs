//! Subcommand implementations shared by the flag-driven and interactive
//! front ends.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use loan_docs_cli_utils::{IndicatifProgress, MultiProgress};
use loan_docs_document_models::{DocumentType, FieldSchema, StructuredRecord};
use loan_docs_extract::{
    ConfigError, ExtractedDocument, MiscellaneousPolicy, Pipeline, PipelineConfig, RuleRegistry,
};
use strum::IntoEnumIterator as _;

use crate::inputs;
use crate::output::{self, OutputFormat};

/// Pipeline settings that can be overridden from the command line.
#[derive(Debug, Default, Args)]
pub struct PipelineArgs {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Rasterization resolution for OCR
    #[arg(long)]
    pub dpi: Option<u32>,
    /// Maximum concurrent OCR invocations
    #[arg(long)]
    pub ocr_concurrency: Option<usize>,
    /// Documents processed at once
    #[arg(long, short)]
    pub jobs: Option<usize>,
    /// Miscellaneous documents: `skip` or `generic`
    #[arg(long)]
    pub miscellaneous: Option<MiscellaneousPolicy>,
    /// Directory of rule-table overrides (`*.toml`)
    #[arg(long, value_name = "DIR")]
    pub rules: Option<PathBuf>,
    /// Tesseract language
    #[arg(long)]
    pub lang: Option<String>,
}

impl PipelineArgs {
    /// Layers the flags over the config file and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading fails or the result is invalid.
    pub fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(limit) = self.ocr_concurrency {
            config.ocr_concurrency = limit;
        }
        if let Some(jobs) = self.jobs {
            config.document_concurrency = jobs;
        }
        if let Some(policy) = self.miscellaneous {
            config.miscellaneous = policy;
        }
        if let Some(dir) = &self.rules {
            config.rules_dir = Some(dir.clone());
        }
        if let Some(lang) = &self.lang {
            config.language.clone_from(lang);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Everything `extract` needs besides the pipeline settings.
#[derive(Debug)]
pub struct ExtractRequest {
    /// Files or folders to scan.
    pub paths: Vec<PathBuf>,
    /// Serialization of the records.
    pub format: OutputFormat,
    /// Destination file; stdout when `None`.
    pub output: Option<PathBuf>,
    /// Also print `Field: value` lines per document.
    pub summary: bool,
}

/// Extracts records from every PDF under `request.paths`.
///
/// # Errors
///
/// Returns an error if no PDFs were found, output cannot be written, or
/// any document failed.
pub async fn extract(
    multi: &MultiProgress,
    config: PipelineConfig,
    request: ExtractRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = inputs::collect_pdfs(&request.paths)?;
    if files.is_empty() {
        return Err("no PDF files found".into());
    }
    log::info!("Processing {} documents", files.len());

    let documents = inputs::read_documents(&files).await?;
    let pipeline = Pipeline::with_system_tools(config)?;

    let progress = IndicatifProgress::documents_bar(multi, "Extracting");
    let report = pipeline.process_batch(documents, progress).await;

    let records: Vec<&StructuredRecord> = report.records().collect();
    match &request.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            output::write_records(&mut out, request.format, &records, FieldSchema::canonical())?;
            log::info!("Wrote {} records to {}", records.len(), path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            output::write_records(&mut out, request.format, &records, FieldSchema::canonical())?;
        }
    }

    if request.summary {
        let successes: Vec<&ExtractedDocument> = report.successes().collect();
        output::write_summary(&mut io::stderr().lock(), &successes)?;
    }

    match report.failure_count() {
        0 => Ok(()),
        failed => Err(format!(
            "{failed} of {} documents failed",
            report.documents.len()
        )
        .into()),
    }
}

/// Prints each document's detected type.
///
/// # Errors
///
/// Returns an error if inputs cannot be read or any document failed to
/// decode.
pub async fn classify(
    config: PipelineConfig,
    paths: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let files = inputs::collect_pdfs(paths)?;
    let documents = inputs::read_documents(&files).await?;
    let pipeline = Pipeline::with_system_tools(config)?;

    let mut failed = 0_usize;
    for document in documents {
        let filename = document.filename.clone();
        match pipeline.classify_document(document).await {
            Ok(classification) => println!(
                "{filename}\t{}\t{} pages",
                classification.document_type, classification.page_count
            ),
            Err(e) => {
                log::error!("{filename}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} documents failed", files.len()).into());
    }
    Ok(())
}

/// Prints the canonical schema as `label -> identifier` lines.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn fields<W: Write>(out: &mut W) -> io::Result<()> {
    for id in FieldSchema::canonical().ids() {
        writeln!(out, "{} -> {id}", id.label())?;
    }
    Ok(())
}

/// Lists the rule sets in effect, optionally only one document type's.
///
/// # Errors
///
/// Returns an error if a rule table fails to load or writing fails.
pub fn rules<W: Write>(
    out: &mut W,
    rules_dir: Option<&Path>,
    document_type: Option<DocumentType>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = RuleRegistry::builtin()?;
    if let Some(dir) = rules_dir {
        registry = registry.with_overrides_from_dir(dir)?;
    }

    for set in registry
        .iter()
        .filter(|set| document_type.is_none_or(|ty| ty == set.document_type()))
    {
        writeln!(out, "{} ({} rules)", set.document_type(), set.rules().len())?;
        for rule in set.rules() {
            writeln!(
                out,
                "  {:<36} pages {:<10} {:<10} {:<9} {}",
                rule.field(),
                rule.pages().to_string(),
                rule.source().to_string(),
                rule.value().kind(),
                rule.pattern()
            )?;
        }
    }
    Ok(())
}

/// Parses a document type label such as `"Loan Estimate"`, ignoring case.
///
/// # Errors
///
/// Returns a message naming the accepted labels.
pub fn parse_document_type(value: &str) -> Result<DocumentType, String> {
    DocumentType::iter()
        .find(|ty| ty.label().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| {
            let labels: Vec<&str> = DocumentType::iter().map(DocumentType::label).collect();
            format!("unknown document type {value:?}; expected one of: {}", labels.join(", "))
        })
}

/// Loads the pipeline config with no command-line overrides.
///
/// # Errors
///
/// Returns [`ConfigError`] if the environment is invalid.
pub fn default_config() -> Result<PipelineConfig, ConfigError> {
    PipelineArgs::default().resolve()
}
