//! Page splitting: pure Rust PDF operations via lopdf.

use lopdf::Document;
use tracing::debug;

use crate::error::DocumentError;

/// A parsed source document.
///
/// Parsed once per dispatch; each `extract_page` call works on its own copy,
/// so the source is never modified.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    inner: Document,
}

impl PdfDocument {
    /// Parse a PDF from memory.
    pub fn load(bytes: &[u8]) -> Result<Self, DocumentError> {
        let inner = Document::load_mem(bytes).map_err(|e| DocumentError::Decode(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn page_count(&self) -> u32 {
        self.inner.get_pages().len() as u32
    }

    /// Build a standalone single-page PDF from page `page` (1-based).
    pub fn extract_page(&self, page: u32) -> Result<Vec<u8>, DocumentError> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(DocumentError::PageOutOfRange { page, page_count });
        }

        let mut single = self.inner.clone();
        let others: Vec<u32> = (1..=page_count).filter(|&p| p != page).collect();
        if !others.is_empty() {
            single.delete_pages(&others);
            single.prune_objects();
        }

        let mut buf = Vec::new();
        single
            .save_to(&mut buf)
            .map_err(|e| DocumentError::Write(e.to_string()))?;

        debug!(page, page_count, bytes = buf.len(), "Extracted single page");
        Ok(buf)
    }
}

/// Page count of a PDF held in memory.
pub fn page_count(bytes: &[u8]) -> Result<u32, DocumentError> {
    PdfDocument::load(bytes).map(|doc| doc.page_count())
}
