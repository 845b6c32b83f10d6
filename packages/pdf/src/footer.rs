//! Footer sampling.
//!
//! The document type of a loan package is printed in the page footers. The
//! footer band of a page is everything whose top edge sits below a fraction
//! of the page height.

use crate::{PdfDocument, PdfError};

/// Fraction of the page height below which text counts as footer.
pub const DEFAULT_FOOTER_THRESHOLD: f64 = 0.85;

/// Returns the footer text of every page of `doc`.
///
/// On each page, blocks whose top edge is strictly below
/// `height * threshold` are kept. Their text is joined with single spaces
/// across all pages in page order and trimmed. A fully scanned document has
/// no blocks and therefore an empty footer.
///
/// # Errors
///
/// Returns [`PdfError`] if the block layout of a page cannot be extracted.
pub async fn sample_footer(doc: &dyn PdfDocument, threshold: f64) -> Result<String, PdfError> {
    let mut parts = Vec::new();

    for index in 0..doc.page_count() {
        let page = doc.text_blocks(index).await?;
        let cutoff = page.height * threshold;

        parts.extend(
            page.blocks
                .into_iter()
                .filter(|b| b.y0 > cutoff)
                .map(|b| b.text.trim().to_owned())
                .filter(|t| !t.is_empty()),
        );
    }

    let footer = parts.join(" ");
    log::trace!("Footer sample ({} pages): {footer:?}", doc.page_count());

    Ok(footer)
}
