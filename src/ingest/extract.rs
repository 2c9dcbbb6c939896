//! Capability seams for document text extraction.
//!
//! The crate never parses PDF, DOCX or spreadsheet bytes itself; callers
//! inject implementations of these traits (typically backed by whatever
//! extraction engine the host application ships). Extractor failure
//! messages travel through untouched so the user sees the real cause.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failure from an injected extractor, message preserved verbatim.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ExtractError(pub String);

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Opens PDF bytes into a paged document.
#[async_trait]
pub trait PdfOpener: Send + Sync {
    async fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractError>;
}

/// A parsed PDF. Pages are extracted one at a time so the caller can
/// report progress and stop between pages.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;
    /// Text of one zero-based page, text items joined with spaces.
    async fn page_text(&self, index: usize) -> Result<String, ExtractError>;
}

/// Extracts the full text of a DOCX document.
#[async_trait]
pub trait DocxExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Opens spreadsheet bytes into a workbook of named sheets.
#[async_trait]
pub trait WorkbookOpener: Send + Sync {
    async fn open(&self, bytes: &[u8]) -> Result<Arc<dyn Workbook>, ExtractError>;
}

/// A parsed workbook. Cell values arrive as plain strings; rendering
/// decisions stay with the formatter.
pub trait Workbook: Send + Sync {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;
    /// All rows of one sheet, or `None` for an unknown sheet name.
    fn rows(&self, sheet: &str) -> Option<Vec<Vec<String>>>;
}

/// The full set of injected extractors.
#[derive(Clone)]
pub struct Extractors {
    pub pdf: Arc<dyn PdfOpener>,
    pub docx: Arc<dyn DocxExtractor>,
    pub workbook: Arc<dyn WorkbookOpener>,
}

// ── Test fakes ──────────────────────────────────────────────────────────────
