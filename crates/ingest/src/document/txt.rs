use super::{ExtractionError, PageContent};

/// Plain text is returned exactly as stored. Invalid UTF-8 is an error
/// rather than a lossy conversion.
pub fn extract_txt(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let text = String::from_utf8(bytes.to_vec())?;

    Ok(vec![PageContent {
        page_number: 1,
        text,
    }])
}
