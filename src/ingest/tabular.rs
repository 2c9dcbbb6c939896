//! Flattening of tabular data into linear, speech-friendly text.
//!
//! Both entry points are pure: same input, same output, no hidden state.

use super::delimiter::Delimiter;
use super::extract::Workbook;

/// Longest separator rule emitted under a header.
const RULE_CAP: usize = 100;

/// Render delimited text as one row per line with ` | ` between cells.
///
/// The first non-blank line is the header: it gets a `📊 ` marker and a
/// dashed rule sized to the header's rendered width, capped at
/// [`RULE_CAP`]. Blank lines are dropped, never emitted as empty rows.
/// Cells are trimmed and lose one surrounding layer of double quotes.
/// Empty input renders as an empty string.
pub fn format_delimited(text: &str, delimiter: Delimiter) -> String {
    let sep = delimiter.as_char();
    let mut out = String::new();
    let mut header_done = false;

    for line in text.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<String> = line.split(sep).map(clean_cell).collect();
        let joined = cells.join(" | ");

        if !header_done {
            header_done = true;
            out.push_str("📊 ");
            out.push_str(&joined);
            out.push('\n');
            out.push_str(&"-".repeat(joined.chars().count().min(RULE_CAP)));
        } else {
            out.push_str(&joined);
        }
        out.push('\n');
    }

    out
}

/// Render the selected sheets of a workbook, in the order supplied.
///
/// Each sheet's rows are joined with tabs between cells and newlines
/// between rows. Sheets that render to pure whitespace are skipped without
/// a banner, as are unknown sheet names; everything else is wrapped in a
/// `=== name ===` section. An empty selection renders as an empty string.
pub fn format_sheets(workbook: &dyn Workbook, selection: &[String]) -> String {
    let mut out = String::new();

    for name in selection {
        let rows = match workbook.rows(name) {
            Some(rows) => rows,
            None => continue,
        };
        let text = rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            continue;
        }
        out.push_str(&format!("\n=== {} ===\n\n{}\n", name, text));
    }

    out
}

/// Trim a cell, then peel at most one leading and one trailing `"`.
fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    let cell = cell.strip_suffix('"').unwrap_or(cell);
    cell.to_string()
}
