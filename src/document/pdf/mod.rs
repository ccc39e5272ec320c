#[cfg(test)]
mod tests;

use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

use super::{Document, normalize_text};
use crate::{RagError, Result};

/// PDF files must announce themselves within the first kilobyte
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Extract per-page text from an in-memory PDF
///
/// Fails with [`RagError::UnreadablePdf`] for input that is not a PDF, that the
/// extractor rejects (corrupt or encrypted files) or that makes the extractor panic.
#[inline]
pub fn load_pdf(bytes: &[u8], source_id: &str) -> Result<Document> {
    if bytes.is_empty() {
        return Err(RagError::UnreadablePdf(format!("{} is empty", source_id)));
    }

    if !has_pdf_header(bytes) {
        return Err(RagError::UnreadablePdf(format!(
            "{} does not look like a PDF file",
            source_id
        )));
    }

    debug!("Extracting text from {} ({} bytes)", source_id, bytes.len());

    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| {
        warn!("PDF extractor panicked on {}", source_id);
        RagError::UnreadablePdf(format!("{} could not be parsed", source_id))
    })?
    .map_err(|e| RagError::UnreadablePdf(format!("{}: {}", source_id, e)))?;

    let document = Document::from_page_texts(
        source_id,
        extracted.iter().map(|page| normalize_text(page)),
    );

    if document.is_blank() {
        warn!(
            "{} has {} pages but no extractable text (scanned document?)",
            source_id,
            document.page_count()
        );
    }

    info!(
        "Loaded {} with {} pages ({} characters)",
        source_id,
        document.page_count(),
        document.char_count()
    );

    Ok(document)
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}
