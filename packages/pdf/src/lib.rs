#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF decoding and per-page rendering for loan documents.
//!
//! Scanned mortgage packages need three things from each page: a raster
//! image for OCR, the embedded text layer (when there is one), and the
//! positioned text blocks used to sample footers for classification. This
//! crate exposes those as the [`PageRenderer`] / [`PdfDocument`] capability
//! traits so the extraction pipeline never talks to a PDF library
//! directly.
//!
//! Two implementations are provided:
//! - [`poppler::PopplerRenderer`] decodes with [`pdf_extract`] and shells
//!   out to Poppler's `pdftoppm` / `pdftotext` for rasterization and block
//!   layout.
//! - [`memory::MemoryRenderer`] serves pre-built pages from memory for
//!   tests and pre-processed inputs.

pub mod bbox;
pub mod footer;
pub mod memory;
pub mod poppler;

use async_trait::async_trait;
use loan_docs_document_models::PageBlocks;

/// Resolution used for OCR rasterization unless configured otherwise.
pub const DEFAULT_DPI: u32 = 300;

/// Errors specific to PDF handling.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The input is not a parseable PDF.
    #[error("PDF decode error: {0}")]
    Decode(String),

    /// A page index past the end of the document was requested.
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested 0-based page index.
        page: usize,
        /// Number of pages in the document.
        count: usize,
    },

    /// An external rendering tool failed.
    #[error("{tool} failed: {message}")]
    Tool {
        /// Name of the tool binary.
        tool: String,
        /// Captured stderr or launch error.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    /// Whether this error means the input itself could not be decoded.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Opens PDF byte streams into [`PdfDocument`]s.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Decodes `bytes` into a document.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Decode`] if the bytes are not a parseable PDF.
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, PdfError>;

    /// Short backend name for log messages (e.g. `"poppler"`).
    fn name(&self) -> &'static str;
}

/// Per-page primitives of a decoded PDF.
///
/// Nothing is cached between calls; each call renders or extracts anew.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterizes `page` at `dpi` and returns PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the page is out of range or rendering fails.
    async fn rasterize(&self, page: usize, dpi: u32) -> Result<Vec<u8>, PdfError>;

    /// Returns the embedded text layer of `page` (empty for image-only
    /// pages).
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the page is out of range or extraction fails.
    async fn text_layer(&self, page: usize) -> Result<String, PdfError>;

    /// Returns the positioned text blocks of `page`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the page is out of range or extraction fails.
    async fn text_blocks(&self, page: usize) -> Result<PageBlocks, PdfError>;
}

/// A rendered page: raster image plus embedded text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// PNG bytes at the requested resolution.
    pub image: Vec<u8>,
    /// Embedded text layer.
    pub text_layer: String,
}

/// Renders the image and text layer of one page concurrently.
///
/// # Errors
///
/// Returns [`PdfError`] if either half fails.
pub async fn render(
    doc: &dyn PdfDocument,
    page: usize,
    dpi: u32,
) -> Result<RenderedPage, PdfError> {
    let (image, text_layer) = tokio::try_join!(doc.rasterize(page, dpi), doc.text_layer(page))?;
    Ok(RenderedPage { image, text_layer })
}

/// Returns [`PdfError::PageOutOfRange`] unless `page < count`.
///
/// # Errors
///
/// Returns [`PdfError::PageOutOfRange`] when `page` is past the end.
pub const fn check_page(page: usize, count: usize) -> Result<(), PdfError> {
    if page < count {
        Ok(())
    } else {
        Err(PdfError::PageOutOfRange { page, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryPage};

    #[tokio::test]
    async fn render_returns_image_and_text_layer() {
        let doc = MemoryDocument::new(vec![
            MemoryPage::new()
                .with_image("scan")
                .with_text_layer("LOAN TYPE\nx FHA"),
        ]);
        let page = render(&doc, 0, DEFAULT_DPI).await.unwrap();
        assert_eq!(page.image, b"scan");
        assert_eq!(page.text_layer, "LOAN TYPE\nx FHA");
    }

    #[tokio::test]
    async fn render_rejects_missing_page() {
        let doc = MemoryDocument::new(vec![MemoryPage::new()]);
        let err = render(&doc, 3, DEFAULT_DPI).await.unwrap_err();
        assert!(matches!(err, PdfError::PageOutOfRange { page: 3, count: 1 }));
        assert!(!err.is_decode());
    }
}
