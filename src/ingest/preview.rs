//! Preview payloads for ambiguous uploads and the pending-import decision.
//!
//! A [`PendingImport`] holds exactly the state the import prompt shows:
//! which sheets are ticked, or which delimiter is picked. Confirming runs
//! the tabular formatter against the live selection; cancelling is just
//! dropping the value, nothing was committed.

use std::sync::Arc;

use serde::Serialize;

use super::delimiter::{Delimiter, DelimiterScan};
use super::extract::Workbook;
use super::tabular;

/// Leading rows shown in a sheet's preview snippet.
const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub name: String,
    pub row_count: usize,
    /// First rows joined with ` | `, or `Empty sheet` when there is
    /// nothing to show.
    pub preview: String,
}

/// Build one summary per sheet, in workbook order.
pub fn summarize_sheets(workbook: &dyn Workbook) -> Vec<SheetSummary> {
    workbook
        .sheet_names()
        .into_iter()
        .map(|name| {
            let rows = workbook.rows(&name).unwrap_or_default();
            let preview = rows
                .iter()
                .take(PREVIEW_ROWS)
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n");
            SheetSummary {
                row_count: rows.len(),
                preview: if preview.is_empty() { "Empty sheet".to_string() } else { preview },
                name,
            }
        })
        .collect()
}

/// Decision payload for an upload that needs user input before any text
/// is committed.
#[derive(Clone)]
pub enum FilePreview {
    Workbook {
        file_name: String,
        sheets: Vec<SheetSummary>,
        /// The parsed workbook rides along so confirm can format without
        /// re-reading the file.
        workbook: Arc<dyn Workbook>,
    },
    Delimited {
        file_name: String,
        scan: DelimiterScan,
        raw: String,
    },
}

enum Selection {
    /// Ticked sheet names in the order they were ticked.
    Sheets(Vec<String>),
    Delimiter(Delimiter),
}

/// Live state of the import prompt for one previewed upload.
pub struct PendingImport {
    preview: FilePreview,
    selection: Selection,
}

impl PendingImport {
    /// Defaults: the first sheet for workbooks, the detector's guess for
    /// delimited text.
    pub fn new(preview: FilePreview) -> Self {
        let selection = match &preview {
            FilePreview::Workbook { sheets, .. } => {
                Selection::Sheets(sheets.first().map(|s| vec![s.name.clone()]).unwrap_or_default())
            }
            FilePreview::Delimited { scan, .. } => Selection::Delimiter(scan.detected),
        };
        Self { preview, selection }
    }

    pub fn preview(&self) -> &FilePreview {
        &self.preview
    }

    pub fn file_name(&self) -> &str {
        match &self.preview {
            FilePreview::Workbook { file_name, .. } => file_name,
            FilePreview::Delimited { file_name, .. } => file_name,
        }
    }

    /// Currently ticked sheets, in tick order. Empty for delimited mode.
    pub fn selected_sheets(&self) -> &[String] {
        match &self.selection {
            Selection::Sheets(names) => names,
            Selection::Delimiter(_) => &[],
        }
    }

    pub fn selected_delimiter(&self) -> Option<Delimiter> {
        match &self.selection {
            Selection::Delimiter(d) => Some(*d),
            Selection::Sheets(_) => None,
        }
    }

    /// Tick or untick one sheet. Unticking removes it; ticking appends it
    /// to the selection order. Names the workbook does not know, and
    /// delimited mode, are no-ops.
    pub fn toggle_sheet(&mut self, name: &str) {
        let known = match &self.preview {
            FilePreview::Workbook { sheets, .. } => sheets.iter().any(|s| s.name == name),
            FilePreview::Delimited { .. } => false,
        };
        if !known {
            return;
        }
        if let Selection::Sheets(names) = &mut self.selection {
            if let Some(pos) = names.iter().position(|n| n == name) {
                names.remove(pos);
            } else {
                names.push(name.to_string());
            }
        }
    }

    /// Tick every sheet, in workbook order.
    pub fn select_all(&mut self) {
        if let FilePreview::Workbook { sheets, .. } = &self.preview {
            let all = sheets.iter().map(|s| s.name.clone()).collect();
            self.selection = Selection::Sheets(all);
        }
    }

    pub fn select_none(&mut self) {
        if let Selection::Sheets(names) = &mut self.selection {
            names.clear();
        }
    }

    pub fn set_delimiter(&mut self, delimiter: Delimiter) {
        if let Selection::Delimiter(d) = &mut self.selection {
            *d = delimiter;
        }
    }

    /// Workbook imports cannot confirm with zero sheets ticked.
    pub fn can_confirm(&self) -> bool {
        match &self.selection {
            Selection::Sheets(names) => !names.is_empty(),
            Selection::Delimiter(_) => true,
        }
    }

    /// Run the formatter against the live selection. A result that trims
    /// to nothing returns `None` and commits nothing; the prompt stays
    /// open. `Some(text)` is the caller's commit payload.
    pub fn confirm(&self) -> Option<String> {
        let text = match (&self.preview, &self.selection) {
            (FilePreview::Workbook { workbook, .. }, Selection::Sheets(names)) => {
                tabular::format_sheets(workbook.as_ref(), names)
            }
            (FilePreview::Delimited { raw, .. }, Selection::Delimiter(d)) => {
                tabular::format_delimited(raw, *d)
            }
            // Selection always matches the preview it was built from.
            _ => String::new(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
