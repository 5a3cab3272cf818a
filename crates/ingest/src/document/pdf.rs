use std::panic::{self, AssertUnwindSafe};

use super::{ExtractionError, PageContent};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Check the file header before handing bytes to the parser.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    if !looks_like_pdf(bytes) {
        return Err(ExtractionError::NotPdf);
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractionError::PdfError("PDF parser crashed on this document".to_string()))?
    .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    let empty = pages.iter().filter(|t| t.trim().is_empty()).count();
    if empty > 0 {
        tracing::debug!("{} of {} PDF pages have no extractable text", empty, pages.len());
    }

    // Empty pages are kept so that page boundaries survive in the joined text.
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageContent {
            page_number: i + 1,
            text,
        })
        .collect())
}
