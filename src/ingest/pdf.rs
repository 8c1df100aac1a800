//! PDF text extraction.

use std::path::Path;

use crate::error::{Error, Result};

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
}

/// Extract per-page text from a PDF file.
pub fn load_pdf(path: &Path) -> Result<Vec<PdfPage>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| Error::InvalidArgument(format!("PDF extraction failed: {}", e)))?;
    Ok(split_into_pages(&text))
}

/// Split extracted text into pages on form feeds. Extractors emit one
/// between pages; a document without any yields a single page.
pub fn split_into_pages(text: &str) -> Vec<PdfPage> {
    text.split('\u{0c}')
        .enumerate()
        .filter_map(|(idx, page)| {
            let trimmed = page.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(PdfPage {
                    number: idx + 1,
                    text: trimmed.to_string(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_form_feeds() {
        let pages = split_into_pages("page one text\u{0c}page two text\u{0c}page three");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].text, "page one text");
        assert_eq!(pages[2].number, 3);
    }

    #[test]
    fn no_form_feed_yields_single_page() {
        let pages = split_into_pages("just one blob of text");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
    }

    #[test]
    fn blank_pages_are_dropped_but_numbering_is_kept() {
        let pages = split_into_pages("first\u{0c}   \u{0c}third");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 3);
    }

    #[test]
    fn empty_text_yields_no_pages() {
        assert!(split_into_pages("").is_empty());
        assert!(split_into_pages("\u{0c}\u{0c}").is_empty());
    }

    #[test]
    fn load_pdf_missing_file_errors() {
        let err = load_pdf(Path::new("/nonexistent/file.pdf")).unwrap_err();
        assert!(err.to_string().contains("PDF extraction failed"));
    }
}
