//! Poppler-backed rendering.
//!
//! Decoding and the text layer come from [`pdf_extract`]. Rasterization and
//! positioned text blocks shell out to Poppler's `pdftoppm` and
//! `pdftotext -bbox-layout`, which both need the document on disk, so the
//! input bytes are spilled to a temporary file that lives as long as the
//! [`PopplerDocument`].

use std::{io::Write as _, path::Path};

use async_trait::async_trait;
use loan_docs_document_models::PageBlocks;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::{PageRenderer, PdfDocument, PdfError, bbox, check_page};

const PDFTOPPM: &str = "pdftoppm";
const PDFTOTEXT: &str = "pdftotext";

/// Opens PDFs with `pdf_extract` and renders pages with Poppler tools.
#[derive(Debug, Clone, Default)]
pub struct PopplerRenderer;

impl PopplerRenderer {
    /// Creates a new renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageRenderer for PopplerRenderer {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, PdfError> {
        let size = bytes.len();

        // pdf_extract panics on some malformed inputs; a panicked blocking
        // task is reported as a decode failure.
        let (pages, file) = tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|e| PdfError::Decode(format!("decoder panicked: {e}")))??;

        log::debug!("Decoded {size}-byte PDF into {} pages", pages.len());

        Ok(Box::new(PopplerDocument { pages, file }))
    }

    fn name(&self) -> &'static str {
        "poppler"
    }
}

fn decode(bytes: &[u8]) -> Result<(Vec<String>, NamedTempFile), PdfError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PdfError::Decode(e.to_string()))?;

    let mut file = tempfile::Builder::new()
        .prefix("loan-docs-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    Ok((pages, file))
}

/// A decoded PDF backed by a temporary file.
#[derive(Debug)]
pub struct PopplerDocument {
    pages: Vec<String>,
    file: NamedTempFile,
}

impl PopplerDocument {
    fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl PdfDocument for PopplerDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn rasterize(&self, page: usize, dpi: u32) -> Result<Vec<u8>, PdfError> {
        check_page(page, self.pages.len())?;

        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");
        let number = (page + 1).to_string();

        let mut cmd = Command::new(PDFTOPPM);
        cmd.args(["-f", &number, "-l", &number])
            .args(["-r", &dpi.to_string()])
            .args(["-png", "-singlefile"])
            .arg(self.path())
            .arg(&prefix);
        run_tool(PDFTOPPM, &mut cmd).await?;

        let image = tokio::fs::read(prefix.with_extension("png")).await?;
        log::trace!("Rasterized page {number} at {dpi} DPI ({} bytes)", image.len());
        Ok(image)
    }

    async fn text_layer(&self, page: usize) -> Result<String, PdfError> {
        check_page(page, self.pages.len())?;
        Ok(self.pages[page].clone())
    }

    async fn text_blocks(&self, page: usize) -> Result<PageBlocks, PdfError> {
        check_page(page, self.pages.len())?;

        let number = (page + 1).to_string();
        let mut cmd = Command::new(PDFTOTEXT);
        cmd.args(["-f", &number, "-l", &number, "-bbox-layout"])
            .arg(self.path())
            .arg("-");
        let stdout = run_tool(PDFTOTEXT, &mut cmd).await?;

        let xhtml = String::from_utf8_lossy(&stdout);
        Ok(bbox::parse_first_page(&xhtml))
    }
}

/// Runs `cmd` to completion and returns its stdout.
///
/// A failure to launch or a non-zero exit becomes [`PdfError::Tool`].
async fn run_tool(tool: &str, cmd: &mut Command) -> Result<Vec<u8>, PdfError> {
    let output = cmd.kill_on_drop(true).output().await.map_err(|e| PdfError::Tool {
        tool: tool.to_owned(),
        message: format!("failed to launch: {e}"),
    })?;

    if !output.status.success() {
        return Err(PdfError::Tool {
            tool: tool.to_owned(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(output.stdout)
}
