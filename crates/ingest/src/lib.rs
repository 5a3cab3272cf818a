pub mod document;

pub use document::{
    extract_bytes, extract_file, is_allowed_filename, DocumentKind, ExtractedDocument,
    ExtractionError, PageContent,
};
