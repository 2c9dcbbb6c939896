//! Upload ingestion: extension dispatch, extraction and the decision
//! between committing text directly or asking the user first.
//!
//! Every upload ends in one of three places: committed text, a pending
//! import decision for ambiguous formats, or a failure. A new upload
//! implicitly supersedes any still-running extraction; the stale result is
//! dropped instead of clobbering the newer one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::delimiter;
use super::extract::{ExtractError, Extractors};
use super::preview::{summarize_sheets, FilePreview, PendingImport};

/// File formats the importer understands, derived from the upload's
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
    /// xlsx/xls, needs a sheet decision before committing.
    Workbook,
    /// csv, needs a delimiter decision before committing.
    Delimited,
}

impl FileKind {
    /// Case-insensitive dispatch on the final extension.
    pub fn from_name(name: &str) -> Result<Self, IngestError> {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "txt" => Ok(FileKind::Text),
            "pdf" => Ok(FileKind::Pdf),
            "docx" => Ok(FileKind::Docx),
            "xlsx" | "xls" => Ok(FileKind::Workbook),
            "csv" => Ok(FileKind::Delimited),
            _ => Err(IngestError::Unsupported { ext }),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Không hỗ trợ định dạng .{ext}. Chỉ hỗ trợ: TXT, PDF, DOCX, XLSX, XLS, CSV")]
    Unsupported { ext: String },
    /// Extraction succeeded but produced no usable text.
    #[error("{0}")]
    EmptyDocument(String),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("extraction cancelled")]
    Cancelled,
    /// A newer upload started while this one was extracting. Callers drop
    /// this silently; it is not a user-visible failure.
    #[error("superseded by a newer upload")]
    Superseded,
}

/// An uploaded file: its name (for dispatch) and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

/// Text that is ready for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedText {
    pub text: String,
    /// Page count for PDFs, reported back to the user.
    pub pages: Option<usize>,
}

/// Where an upload ended up.
pub enum IngestOutcome {
    Committed(CommittedText),
    /// Ambiguous format; the user picks sheets or a delimiter first.
    NeedsDecision(PendingImport),
}

impl std::fmt::Debug for IngestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestOutcome::Committed(text) => f.debug_tuple("Committed").field(text).finish(),
            IngestOutcome::NeedsDecision(import) => f
                .debug_tuple("NeedsDecision")
                .field(&import.file_name())
                .finish(),
        }
    }
}

/// Cooperative cancellation flag, checked between PDF pages.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives uploads through extraction using the injected extractors.
pub struct Ingestor {
    extractors: Extractors,
    /// Bumped on every upload; completions from older generations are
    /// discarded.
    generation: AtomicU64,
}

impl Ingestor {
    pub fn new(extractors: Extractors) -> Self {
        Self { extractors, generation: AtomicU64::new(0) }
    }

    /// Ingest one upload. `on_progress` receives extraction percentages
    /// (monotonic, 0..=100); `cancel` stops PDF extraction between pages.
    pub async fn ingest(
        &self,
        upload: Upload,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(u8),
    ) -> Result<IngestOutcome, IngestError> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let kind = FileKind::from_name(&upload.name)?;
        tracing::info!(file = %upload.name, ?kind, "ingesting upload");

        let result = match kind {
            FileKind::Text => self.ingest_text(&upload),
            FileKind::Pdf => self.ingest_pdf(&upload, cancel, &mut on_progress).await,
            FileKind::Docx => self.ingest_docx(&upload, &mut on_progress).await,
            FileKind::Workbook => self.ingest_workbook(&upload).await,
            FileKind::Delimited => self.ingest_delimited(&upload),
        };

        // Stale completions, successes and failures alike, are discarded
        // before the caller can see them.
        if self.generation.load(Ordering::SeqCst) != my_generation {
            tracing::debug!(file = %upload.name, "upload superseded, dropping result");
            return Err(IngestError::Superseded);
        }
        result
    }

    fn ingest_text(&self, upload: &Upload) -> Result<IngestOutcome, IngestError> {
        let text = String::from_utf8_lossy(&upload.bytes).into_owned();
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument(
                "Không tìm thấy văn bản trong file TXT".to_string(),
            ));
        }
        Ok(IngestOutcome::Committed(CommittedText { text, pages: None }))
    }

    async fn ingest_pdf(
        &self,
        upload: &Upload,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<IngestOutcome, IngestError> {
        let doc = self.extractors.pdf.open(&upload.bytes).await?;
        let total = doc.page_count();
        let mut text = String::new();

        // Pages run strictly in order so the percentage stays monotonic.
        for page in 0..total {
            let page_text = doc.page_text(page).await?;
            text.push_str(&page_text);
            text.push_str("\n\n");
            on_progress(progress_percent(page + 1, total));

            if cancel.is_cancelled() {
                tracing::info!(file = %upload.name, page = page + 1, "pdf extraction cancelled");
                return Err(IngestError::Cancelled);
            }
        }

        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument(
                "Không tìm thấy văn bản trong PDF (có thể là file scan)".to_string(),
            ));
        }
        Ok(IngestOutcome::Committed(CommittedText { text, pages: Some(total) }))
    }

    async fn ingest_docx(
        &self,
        upload: &Upload,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<IngestOutcome, IngestError> {
        on_progress(50);
        let text = self.extractors.docx.extract(&upload.bytes).await?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument(
                "Không tìm thấy văn bản trong file DOCX".to_string(),
            ));
        }
        on_progress(100);
        Ok(IngestOutcome::Committed(CommittedText { text, pages: None }))
    }

    async fn ingest_workbook(&self, upload: &Upload) -> Result<IngestOutcome, IngestError> {
        let workbook = self.extractors.workbook.open(&upload.bytes).await?;
        let sheets = summarize_sheets(workbook.as_ref());
        tracing::debug!(file = %upload.name, sheets = sheets.len(), "workbook needs a sheet decision");
        let preview = FilePreview::Workbook {
            file_name: upload.name.clone(),
            sheets,
            workbook,
        };
        Ok(IngestOutcome::NeedsDecision(PendingImport::new(preview)))
    }

    fn ingest_delimited(&self, upload: &Upload) -> Result<IngestOutcome, IngestError> {
        let raw = String::from_utf8_lossy(&upload.bytes).into_owned();
        let scan = delimiter::detect(&raw);
        tracing::debug!(file = %upload.name, delimiter = ?scan.detected, "csv needs a delimiter decision");
        let preview = FilePreview::Delimited {
            file_name: upload.name.clone(),
            scan,
            raw,
        };
        Ok(IngestOutcome::NeedsDecision(PendingImport::new(preview)))
    }
}

fn progress_percent(done: usize, total: usize) -> u8 {
    ((done as f64 / total as f64) * 100.0).floor() as u8
}
