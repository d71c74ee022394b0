//! Document text extraction. PDF only; decoding is delegated to `pdf-extract`.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Plain text pulled out of a document.
///
/// An empty value is valid but unusable: it records that extraction ran and failed.
/// "No document yet" is modelled as `Option<ExtractedText>::None` by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when there is nothing a model could evaluate.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Document has no pages")]
    NoPages,

    #[error("Document contains no extractable text")]
    NoText,

    #[error("Could not decode document: {0}")]
    Decode(String),
}

/// Converts a binary document into plain text.
pub trait DocumentTextExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError>;
}

/// PDF extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl DocumentTextExtractor for PdfTextExtractor {
    fn extract(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        if document.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        // pdf-extract panics on some malformed inputs; keep the failure inside this boundary.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(document)
        }))
        .map_err(|_| {
            warn!("PDF decoder panicked on {} byte document", document.len());
            ExtractionError::Decode("PDF decoder aborted".to_string())
        })?
        .map_err(|e| ExtractionError::Decode(e.to_string()))?;

        debug!(pages = pages.len(), "Decoded PDF");
        concat_pages(pages)
    }
}

/// Joins per-page text in page order. Pages without text contribute an empty string.
pub fn concat_pages<I, S>(pages: I) -> Result<ExtractedText, ExtractionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut page_count = 0usize;
    let mut text = String::new();
    for page in pages {
        page_count += 1;
        text.push_str(page.as_ref());
    }

    if page_count == 0 {
        return Err(ExtractionError::NoPages);
    }

    let text = ExtractedText::new(text);
    if text.is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}
