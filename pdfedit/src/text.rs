//! Plain-text extraction.
//!
//! Text comes from the content streams via `lopdf`, so it is only as good as
//! the fonts' encodings allow. Pages without extractable text yield an empty
//! string rather than an error.

use lopdf::Document;
use serde::Serialize;

use crate::error::{PdfEditError, Result};
use crate::range::PageRange;

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    /// Zero-based page index.
    pub index: usize,
    /// Extracted text; empty if the page has none.
    pub text: String,
}

/// Extract the text of the page at zero-based `index`.
///
/// # Errors
///
/// Returns [`PdfEditError::PageOutOfBounds`] if the page does not exist.
pub fn page_text(doc: &Document, index: usize) -> Result<String> {
    let page_count = doc.get_pages().len();
    if index >= page_count {
        return Err(PdfEditError::page_out_of_bounds(index, page_count));
    }

    let page_number = u32::try_from(index + 1)
        .map_err(|_| PdfEditError::page_out_of_bounds(index, page_count))?;

    match doc.extract_text(&[page_number]) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::debug!(page = page_number, error = %e, "no extractable text");
            Ok(String::new())
        }
    }
}

/// Extract the text of every page selected by `range`, or of all pages.
pub fn extract_text(doc: &Document, range: Option<&PageRange>) -> Result<Vec<PageText>> {
    let page_count = doc.get_pages().len();
    let indices = match range {
        Some(range) => range.to_indices(page_count)?,
        None => (0..page_count).collect(),
    };

    indices
        .into_iter()
        .map(|index| {
            Ok(PageText {
                index,
                text: page_text(doc, index)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::PageEditor;
    use crate::pages::PageSize;
    use crate::pages::tests::create_multi_page_pdf;

    #[test]
    fn test_page_text() {
        let doc = create_multi_page_pdf(3);
        assert!(page_text(&doc, 1).unwrap().contains("Page 2"));
    }

    #[test]
    fn test_page_text_out_of_bounds() {
        let doc = create_multi_page_pdf(1);
        let err = page_text(&doc, 1).unwrap_err();
        assert!(matches!(err, PdfEditError::PageOutOfBounds { index: 1, .. }));
    }

    #[test]
    fn test_blank_page_has_no_text() {
        let mut doc = create_multi_page_pdf(1);
        PageEditor::new()
            .insert_blank_page(&mut doc, 1, PageSize::Letter)
            .unwrap();
        assert_eq!(page_text(&doc, 1).unwrap().trim(), "");
    }

    #[test]
    fn test_extract_text_range() {
        let doc = create_multi_page_pdf(4);
        let range = PageRange::parse("4,2").unwrap();

        let pages = extract_text(&doc, Some(&range)).unwrap();

        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1, 3]);
        assert!(pages[1].text.contains("Page 4"));
        assert_eq!(extract_text(&doc, None).unwrap().len(), 4);
    }
}
