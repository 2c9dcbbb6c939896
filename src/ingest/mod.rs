pub mod delimiter;
pub mod extract;
pub mod manager;
pub mod preview;
pub mod tabular;

pub use delimiter::{Delimiter, DelimiterScan};
pub use extract::{
    DocxExtractor, ExtractError, Extractors, PdfDocument, PdfOpener, Workbook, WorkbookOpener,
};
pub use manager::{
    CancelToken, CommittedText, FileKind, IngestError, IngestOutcome, Ingestor, Upload,
};
pub use preview::{FilePreview, PendingImport, SheetSummary};
