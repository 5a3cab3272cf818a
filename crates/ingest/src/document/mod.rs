mod pdf;
mod txt;

use std::fmt;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("File is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Invalid PDF format. The file header is missing.")]
    NotPdf,
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// True when the document itself is unreadable, as opposed to a local I/O failure.
    pub fn is_content_error(&self) -> bool {
        !matches!(self, ExtractionError::Io(_))
    }
}

/// Accepted upload types, keyed by the final filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    /// Classify by the segment after the last `.`, case-insensitively.
    /// Names without a dot are rejected.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Text => "txt",
            DocumentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub fn is_allowed_filename(filename: &str) -> bool {
    DocumentKind::from_filename(filename).is_some()
}

/// A page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number. Plain text is always a single page 1.
    pub page_number: usize,
    pub text: String,
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub filename: String,
    pub kind: DocumentKind,
    /// Pages in document order, including pages with no text.
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// The whole document as one string.
    ///
    /// Plain text comes back verbatim. PDF pages are each followed by a
    /// newline so page boundaries survive, even for empty pages.
    pub fn full_text(&self) -> String {
        match self.kind {
            DocumentKind::Text => self
                .pages
                .iter()
                .map(|p| p.text.as_str())
                .collect(),
            DocumentKind::Pdf => {
                let mut out = String::with_capacity(self.total_bytes() + self.pages.len());
                for page in &self.pages {
                    out.push_str(&page.text);
                    out.push('\n');
                }
                out
            }
        }
    }

    /// Total byte length across all pages.
    pub fn total_bytes(&self) -> usize {
        self.pages.iter().map(|p| p.text.len()).sum()
    }
}

/// Extract text from an in-memory document of a known kind.
pub fn extract_bytes(
    bytes: &[u8],
    filename: &str,
    kind: DocumentKind,
) -> Result<ExtractedDocument, ExtractionError> {
    let pages = match kind {
        DocumentKind::Text => txt::extract_txt(bytes)?,
        DocumentKind::Pdf => pdf::extract_pdf(bytes)?,
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        kind,
        pages,
    })
}

/// Extract text from a stored file. The kind comes from the validated upload name.
pub fn extract_file(path: &Path, kind: DocumentKind) -> Result<ExtractedDocument, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let doc = extract_bytes(&bytes, filename, kind)?;
    tracing::debug!(
        "Extracted {} ({}): {} pages, {} bytes of text",
        path.display(),
        kind,
        doc.pages.len(),
        doc.total_bytes()
    );
    Ok(doc)
}
