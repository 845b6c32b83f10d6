//! End-to-end document processing.
//!
//! For each document: decode, sample the footer, classify, then run the
//! document type's rule set page by page and assemble records. Only pages
//! that some rule reads are rendered, and only the texts those rules need
//! (OCR, text layer, or both) are produced.
//!
//! Documents in a batch run concurrently up to
//! [`PipelineConfig::document_concurrency`]. OCR calls from every document
//! share one [`OcrPool`], so total OCR load stays bounded regardless of
//! batch size. A failing document does not affect the others.

use std::{collections::BTreeMap, sync::Arc};

use futures::StreamExt as _;
use loan_docs_document_models::{DocumentType, FieldSchema, RawField, StructuredRecord};
use loan_docs_ocr::{OcrEngine, OcrError, OcrPool, TesseractOcr};
use loan_docs_pdf::{
    PageRenderer, PdfDocument, PdfError, footer::sample_footer, poppler::PopplerRenderer, render,
};

use crate::{
    assembler::Assembler,
    classifier::classify,
    config::PipelineConfig,
    progress::ProgressCallback,
    registry::RuleRegistry,
    rule_def::RuleError,
    rules::{PageText, RuleSet},
};

/// Errors that abort one document.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Decoding or rendering failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// OCR failed.
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// A document submitted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    /// Declared filename; copied into every output record.
    pub filename: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    /// Pairs a filename with its bytes.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Classification result for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Type derived from the footer.
    pub document_type: DocumentType,
    /// Number of pages in the document.
    pub page_count: usize,
    /// The footer text the type was derived from.
    pub footer: String,
}

/// The outcome of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Declared filename.
    pub filename: String,
    /// Type derived from the footer.
    pub document_type: DocumentType,
    /// Number of pages in the document.
    pub page_count: usize,
    /// Raw tuples in extraction order.
    pub fields: Vec<RawField>,
    /// One record per page with at least one tuple.
    pub records: Vec<StructuredRecord>,
}

/// One entry of a [`BatchReport`].
#[derive(Debug)]
pub struct DocumentResult {
    /// Declared filename.
    pub filename: String,
    /// Extraction result, or the error that stopped this document.
    pub outcome: Result<ExtractedDocument, PipelineError>,
}

/// Per-document outcomes of a batch, in submission order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per submitted document.
    pub documents: Vec<DocumentResult>,
}

impl BatchReport {
    /// Records of every successful document, in submission order.
    pub fn records(&self) -> impl Iterator<Item = &StructuredRecord> {
        self.successes().flat_map(|doc| doc.records.iter())
    }

    /// Successfully processed documents.
    pub fn successes(&self) -> impl Iterator<Item = &ExtractedDocument> {
        self.documents.iter().filter_map(|d| d.outcome.as_ref().ok())
    }

    /// Failed documents with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.documents
            .iter()
            .filter_map(|d| d.outcome.as_ref().err().map(|e| (d.filename.as_str(), e)))
    }

    /// Number of failed documents.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// The configured pipeline.
pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    ocr: OcrPool,
    registry: RuleRegistry,
    schema: &'static FieldSchema,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("renderer", &self.renderer.name())
            .field("ocr", &self.ocr)
            .field("rule_sets", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline from explicit collaborators.
    #[must_use]
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        ocr: Arc<dyn OcrEngine>,
        registry: RuleRegistry,
        config: PipelineConfig,
    ) -> Self {
        Self {
            renderer,
            ocr: OcrPool::new(ocr, config.ocr_concurrency),
            registry,
            schema: FieldSchema::canonical(),
            config,
        }
    }

    /// Creates a pipeline backed by Poppler and Tesseract, with the
    /// built-in rules plus any overrides from `config.rules_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the rule tables fail to load.
    pub fn with_system_tools(config: PipelineConfig) -> Result<Self, RuleError> {
        let mut registry = RuleRegistry::builtin()?;
        if let Some(dir) = &config.rules_dir {
            registry = registry.with_overrides_from_dir(dir)?;
        }

        let ocr = TesseractOcr::new(config.tesseract.clone(), config.language.clone());

        Ok(Self::new(
            Arc::new(PopplerRenderer::new()),
            Arc::new(ocr),
            registry,
            config,
        ))
    }

    /// Settings the pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rule sets in effect.
    #[must_use]
    pub const fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Decodes and classifies a document without extracting fields.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Pdf`] if the document cannot be decoded.
    pub async fn classify_document(
        &self,
        input: DocumentInput,
    ) -> Result<Classification, PipelineError> {
        let doc = self.renderer.open(input.bytes).await?;
        self.classify_open(&input.filename, doc.as_ref()).await
    }

    async fn classify_open(
        &self,
        filename: &str,
        doc: &dyn PdfDocument,
    ) -> Result<Classification, PipelineError> {
        let footer = sample_footer(doc, self.config.footer_threshold).await?;
        let document_type = classify(&footer);

        log::info!(
            "Processing {filename} as {document_type} (pages: {})",
            doc.page_count()
        );
        if footer.is_empty() {
            log::debug!("{filename}: no footer text found");
        }

        Ok(Classification {
            document_type,
            page_count: doc.page_count(),
            footer,
        })
    }

    /// Classifies one document and extracts its fields.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if decoding, rendering, or OCR fails. A
    /// rule that does not match is not an error.
    pub async fn process_document(
        &self,
        input: DocumentInput,
    ) -> Result<ExtractedDocument, PipelineError> {
        let DocumentInput { filename, bytes } = input;
        let doc = self.renderer.open(bytes).await?;
        let classification = self.classify_open(&filename, doc.as_ref()).await?;
        let document_type = classification.document_type;

        let fields = match self
            .registry
            .rule_set(document_type, self.config.miscellaneous)
        {
            Some(rule_set) => {
                let pages = self.page_texts(&filename, doc.as_ref(), rule_set).await?;
                rule_set.extract(&pages, &filename)
            }
            None => {
                log::info!("{filename}: no extraction rules for {document_type}");
                Vec::new()
            }
        };

        let document_types = BTreeMap::from([(filename.clone(), document_type)]);
        let records = Assembler::new(self.schema).assemble(&fields, &document_types);

        log::info!(
            "{filename}: extracted {} fields into {} records",
            fields.len(),
            records.len()
        );

        Ok(ExtractedDocument {
            filename,
            document_type,
            page_count: classification.page_count,
            fields,
            records,
        })
    }

    /// Produces the texts `rule_set` needs, page by page in index order.
    async fn page_texts(
        &self,
        filename: &str,
        doc: &dyn PdfDocument,
        rule_set: &RuleSet,
    ) -> Result<Vec<PageText>, PipelineError> {
        let dpi = self.config.dpi;
        let mut pages = Vec::new();

        for index in 0..doc.page_count() {
            let needs = rule_set.needs(index);

            let (image, text_layer) = match (needs.ocr, needs.text_layer) {
                (true, true) => {
                    let page = render(doc, index, dpi).await?;
                    (Some(page.image), Some(page.text_layer))
                }
                (true, false) => (Some(doc.rasterize(index, dpi).await?), None),
                (false, true) => (None, Some(doc.text_layer(index).await?)),
                (false, false) => continue,
            };

            let ocr = match image {
                Some(image) => Some(self.ocr.recognize(&image).await?),
                None => None,
            };

            log::trace!(
                "{filename} page {}: ocr={} chars, text layer={} chars",
                index + 1,
                ocr.as_ref().map_or(0, String::len),
                text_layer.as_ref().map_or(0, String::len)
            );

            pages.push(PageText {
                index,
                ocr,
                text_layer,
            });
        }

        Ok(pages)
    }

    /// Processes `inputs` concurrently and reports each outcome.
    ///
    /// Results are in submission order. Failures are logged and recorded
    /// per document.
    pub async fn process_batch(
        &self,
        inputs: Vec<DocumentInput>,
        progress: Arc<dyn ProgressCallback>,
    ) -> BatchReport {
        let progress = progress.as_ref();
        progress.set_total(inputs.len() as u64);

        let documents = futures::stream::iter(inputs)
            .map(|input| async move {
                let filename = input.filename.clone();
                progress.set_message(filename.clone());

                let outcome = self.process_document(input).await;
                if let Err(e) = &outcome {
                    log::error!("{filename}: {e}");
                }

                progress.inc(1);
                DocumentResult { filename, outcome }
            })
            .buffered(self.config.document_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let report = BatchReport { documents };
        progress.finish(format!(
            "{} documents, {} failed",
            report.documents.len(),
            report.failure_count()
        ));
        report
    }
}
