//! Delimiter detection for imported CSV-style text.

use serde::{Deserialize, Serialize};

/// How many leading lines participate in detection.
const SAMPLE_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
        }
    }

    /// Option label shown in the import prompt.
    pub fn label(self) -> &'static str {
        match self {
            Delimiter::Comma => "Comma ( , )",
            Delimiter::Semicolon => "Semicolon ( ; )",
            Delimiter::Tab => "Tab ( ⭾ )",
        }
    }
}

/// Candidate counts over the sampled lines plus the winning delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterScan {
    pub comma: usize,
    pub semicolon: usize,
    pub tab: usize,
    pub detected: Delimiter,
}

/// Count candidate delimiters in the first five lines and pick the most
/// frequent one. Ties break toward tab, then semicolon, then comma, and a
/// sample with no candidates at all falls back to comma. Same input, same
/// answer: detection is pure.
pub fn detect(text: &str) -> DelimiterScan {
    let mut comma = 0;
    let mut semicolon = 0;
    let mut tab = 0;
    for line in text.split('\n').take(SAMPLE_LINES) {
        for c in line.chars() {
            match c {
                ',' => comma += 1,
                ';' => semicolon += 1,
                '\t' => tab += 1,
                _ => {}
            }
        }
    }

    let max = comma.max(semicolon).max(tab);
    let detected = if max == 0 {
        Delimiter::Comma
    } else if tab == max {
        Delimiter::Tab
    } else if semicolon == max {
        Delimiter::Semicolon
    } else {
        Delimiter::Comma
    };

    DelimiterScan { comma, semicolon, tab, detected }
}
