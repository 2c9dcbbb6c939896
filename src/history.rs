//! Reading history: a bounded, newest-first log of synthesized texts.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::store::KvStore;

/// Storage key for the history list.
const HISTORY_KEY: &str = "tts-history";

/// Maximum number of retained entries.
pub const MAX_ENTRIES: usize = 20;
/// Characters of the source text kept in the display title.
const TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Full source text, so an entry can be replayed as-is.
    pub text: String,
    pub voice: String,
    pub speed: f32,
    /// Insertion time, epoch milliseconds.
    pub created_at: i64,
    /// First 50 characters of the text, with `...` appended when truncated.
    pub title: String,
}

/// Newest-first log persisted through the injected [`KvStore`] under a
/// single key. Appends prepend and truncate to [`MAX_ENTRIES`]; corrupt or
/// missing state reads as an empty log.
#[derive(Clone)]
pub struct History {
    store: Arc<dyn KvStore>,
}

impl History {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Record a synthesis. The new entry lands at the front and anything
    /// past the cap falls off the back.
    pub fn append(&self, text: &str, voice: &str, speed: f32) -> HistoryEntry {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            voice: voice.to_string(),
            speed,
            created_at: chrono::Utc::now().timestamp_millis(),
            title: make_title(text),
        };

        let mut entries = self.list();
        entries.insert(0, entry.clone());
        entries.truncate(MAX_ENTRIES);
        self.persist(&entries);
        tracing::debug!(voice, title = %entry.title, "history entry recorded");
        entry
    }

    /// All entries, newest first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "corrupt history state, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "history read failed, starting empty");
                Vec::new()
            }
        }
    }

    /// Delete one entry by id. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) {
        let mut entries = self.list();
        entries.retain(|e| e.id != id);
        self.persist(&entries);
    }

    /// Drop the whole log.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            tracing::warn!(error = %e, "failed to clear history");
        }
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize history");
                return;
            }
        };
        if let Err(e) = self.store.set(HISTORY_KEY, &raw) {
            tracing::warn!(error = %e, "failed to persist history");
        }
    }
}

fn make_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_CHARS).collect();
    if text.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

/// Vietnamese relative-age label for an entry, e.g. `Vừa xong`,
/// `5 phút trước`, `3 giờ trước`, `2 ngày trước`, or the plain date once
/// the entry is a week old.
pub fn age_label(created_at_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(created_at_ms);
    let minutes = diff / 60_000;
    let hours = diff / 3_600_000;
    let days = diff / 86_400_000;

    if minutes < 1 {
        "Vừa xong".to_string()
    } else if minutes < 60 {
        format!("{} phút trước", minutes)
    } else if hours < 24 {
        format!("{} giờ trước", hours)
    } else if days < 7 {
        format!("{} ngày trước", days)
    } else {
        match Local.timestamp_millis_opt(created_at_ms).single() {
            Some(date) => date.format("%-d/%-m/%Y").to_string(),
            None => String::new(),
        }
    }
}
