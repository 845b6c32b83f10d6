//! In-memory documents.
//!
//! [`MemoryRenderer`] hands out pre-built [`MemoryDocument`]s keyed by the
//! exact input bytes, so pipeline code can be exercised with deterministic
//! page text instead of real scans. Unknown byte streams fail to decode,
//! the same way a corrupt PDF would.

use std::collections::BTreeMap;

use async_trait::async_trait;
use loan_docs_document_models::{PageBlocks, TextBlock};

use crate::{PageRenderer, PdfDocument, PdfError, check_page};

/// US Letter width in points.
const LETTER_WIDTH: f64 = 612.0;
/// US Letter height in points.
const LETTER_HEIGHT: f64 = 792.0;

/// A single page held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPage {
    image: Vec<u8>,
    text_layer: String,
    blocks: PageBlocks,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Creates an empty US Letter page.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            image: Vec::new(),
            text_layer: String::new(),
            blocks: PageBlocks {
                width: LETTER_WIDTH,
                height: LETTER_HEIGHT,
                blocks: Vec::new(),
            },
        }
    }

    /// Sets the bytes returned by rasterization.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the embedded text layer.
    #[must_use]
    pub fn with_text_layer(mut self, text: &str) -> Self {
        text.clone_into(&mut self.text_layer);
        self
    }

    /// Adds a text block at the given vertical position (points from the
    /// top of the page).
    #[must_use]
    pub fn with_block(mut self, y0: f64, text: &str) -> Self {
        self.blocks.blocks.push(TextBlock {
            x0: 36.0,
            y0,
            x1: self.blocks.width - 36.0,
            y1: y0 + 10.0,
            text: text.to_owned(),
        });
        self
    }

    /// Adds a text block in the footer band (95% of page height).
    #[must_use]
    pub fn with_footer(self, text: &str) -> Self {
        let y0 = self.blocks.height * 0.95;
        self.with_block(y0, text)
    }
}

/// A document made of [`MemoryPage`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    /// Creates a document from its pages.
    #[must_use]
    pub const fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    fn page(&self, page: usize) -> Result<&MemoryPage, PdfError> {
        check_page(page, self.pages.len())?;
        Ok(&self.pages[page])
    }
}

#[async_trait]
impl PdfDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn rasterize(&self, page: usize, _dpi: u32) -> Result<Vec<u8>, PdfError> {
        Ok(self.page(page)?.image.clone())
    }

    async fn text_layer(&self, page: usize) -> Result<String, PdfError> {
        Ok(self.page(page)?.text_layer.clone())
    }

    async fn text_blocks(&self, page: usize) -> Result<PageBlocks, PdfError> {
        Ok(self.page(page)?.blocks.clone())
    }
}

/// A [`PageRenderer`] that serves registered [`MemoryDocument`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderer {
    documents: BTreeMap<Vec<u8>, MemoryDocument>,
}

impl MemoryRenderer {
    /// Creates a renderer with no registered documents.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
        }
    }

    /// Registers `document` to be returned when `bytes` is opened.
    #[must_use]
    pub fn with_document(mut self, bytes: impl Into<Vec<u8>>, document: MemoryDocument) -> Self {
        self.documents.insert(bytes.into(), document);
        self
    }
}

#[async_trait]
impl PageRenderer for MemoryRenderer {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, PdfError> {
        self.documents
            .get(&bytes)
            .cloned()
            .map(|doc| Box::new(doc) as Box<dyn PdfDocument>)
            .ok_or_else(|| PdfError::Decode(format!("unrecognized {}-byte input", bytes.len())))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
