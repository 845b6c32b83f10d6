//! Parser for `pdftotext -bbox-layout` output.
//!
//! The XHTML has one `<page width height>` per page, containing `<block>`
//! elements with `xMin`/`yMin`/`xMax`/`yMax` attributes and nested
//! `<word>` elements. Coordinates are in points with a top-left origin.

use loan_docs_document_models::{PageBlocks, TextBlock};
use scraper::{ElementRef, Html, Selector};

/// Parses the first `<page>` in `xhtml` into text blocks.
///
/// Returns an empty [`PageBlocks`] if no page is present.
#[must_use]
pub fn parse_first_page(xhtml: &str) -> PageBlocks {
    parse_pages(xhtml).into_iter().next().unwrap_or_default()
}

/// Parses every `<page>` in `xhtml` into text blocks.
#[must_use]
pub fn parse_pages(xhtml: &str) -> Vec<PageBlocks> {
    let doc = Html::parse_document(xhtml);
    let page_sel = Selector::parse("page").unwrap_or_else(|_| unreachable!());
    let block_sel = Selector::parse("block").unwrap_or_else(|_| unreachable!());
    let word_sel = Selector::parse("word").unwrap_or_else(|_| unreachable!());

    doc.select(&page_sel)
        .map(|page| PageBlocks {
            width: attr(page, "width").unwrap_or_default(),
            height: attr(page, "height").unwrap_or_default(),
            blocks: page
                .select(&block_sel)
                .filter_map(|block| parse_block(block, &word_sel))
                .collect(),
        })
        .collect()
}

fn parse_block(block: ElementRef<'_>, word_sel: &Selector) -> Option<TextBlock> {
    let words: Vec<String> = block
        .select(word_sel)
        .map(|w| w.text().collect::<String>())
        .filter(|w| !w.trim().is_empty())
        .collect();

    if words.is_empty() {
        return None;
    }

    Some(TextBlock {
        x0: attr(block, "xMin")?,
        y0: attr(block, "yMin")?,
        x1: attr(block, "xMax")?,
        y1: attr(block, "yMax")?,
        text: words.join(" "),
    })
}

/// Reads a numeric attribute. The HTML parser lowercases attribute names,
/// so the lowercase spelling is tried first.
fn attr(el: ElementRef<'_>, name: &str) -> Option<f64> {
    let value = el.value();
    value
        .attr(&name.to_ascii_lowercase())
        .or_else(|| value.attr(name))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="72.000000" yMin="90.500000" xMax="300.000000" yMax="102.000000">
        <line xMin="72.000000" yMin="90.500000" xMax="300.000000" yMax="102.000000">
          <word xMin="72.000000" yMin="90.500000" xMax="110.000000" yMax="102.000000">Loan</word>
          <word xMin="112.000000" yMin="90.500000" xMax="160.000000" yMax="102.000000">Amount</word>
        </line>
      </block>
      <block xMin="36.000000" yMin="750.000000" xMax="400.000000" yMax="760.000000">
        <line xMin="36.000000" yMin="750.000000" xMax="400.000000" yMax="760.000000">
          <word xMin="36.000000" yMin="750.000000" xMax="90.000000" yMax="760.000000">LOAN</word>
          <word xMin="92.000000" yMin="750.000000" xMax="160.000000" yMax="760.000000">ESTIMATE</word>
        </line>
      </block>
    </flow>
  </page>
</doc>
</body>
</html>"#;

    #[test]
    fn parses_page_dimensions_and_blocks() {
        let page = parse_first_page(SAMPLE);
        assert!((page.width - 612.0).abs() < f64::EPSILON);
        assert!((page.height - 792.0).abs() < f64::EPSILON);
        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].text, "Loan Amount");
        assert_eq!(page.blocks[1].text, "LOAN ESTIMATE");
        assert!((page.blocks[1].y0 - 750.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_page_yields_empty_blocks() {
        let page = parse_first_page("<html><body></body></html>");
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn blocks_without_words_are_skipped() {
        let xhtml = r#"<doc><page width="100" height="100"><flow>
            <block xMin="0" yMin="90" xMax="10" yMax="95"></block>
        </flow></page></doc>"#;
        assert_eq!(parse_pages(xhtml)[0].blocks.len(), 0);
    }
}
