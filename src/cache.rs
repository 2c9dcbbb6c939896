//! Synthesized-audio cache keyed by a text/voice/speed fingerprint.
//!
//! Entries persist through the injected [`KvStore`] as one JSON map under a
//! single key, so the cache survives restarts. Capacity is bounded by
//! evicting the oldest entry (smallest `createdAt`), and entries expire
//! after seven days, removed lazily on lookup.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::KvStore;

/// Storage key for the audio cache map.
const CACHE_KEY: &str = "tts-audio-cache";
/// Storage key prefix for per-voice preview audio.
const PREVIEW_KEY_PREFIX: &str = "preview-";

/// Maximum number of cached syntheses.
pub const MAX_ENTRIES: usize = 50;
/// Entry lifetime in milliseconds (seven days).
pub const TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;
/// How many characters of the source text participate in the fingerprint.
const FINGERPRINT_CHARS: usize = 100;

/// Cache key for one synthesis: the first 100 characters of the text, the
/// voice id and the speed multiplier, joined with `-`.
///
/// Texts that share their first 100 characters produce the same
/// fingerprint on purpose, so re-reading a long document does not re-bill
/// synthesis for cosmetic edits past the prefix. The trade-off is that two
/// genuinely different texts with an identical prefix serve the same audio.
pub fn fingerprint(text: &str, voice: &str, speed: f32) -> String {
    format!("{}-{}-{}", truncate_chars(text, FINGERPRINT_CHARS), voice, speed)
}

/// Char-boundary-safe prefix, so multi-byte Vietnamese text never splits
/// inside a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// One cached synthesis. Audio rides along as base64 inside the persisted
/// JSON, so entries stay valid across restarts instead of pointing at
/// ephemeral resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Source text truncated to the fingerprint prefix.
    pub text: String,
    pub voice: String,
    pub speed: f32,
    #[serde(with = "audio_b64")]
    pub audio: Vec<u8>,
    /// Insertion time, epoch milliseconds.
    pub created_at: i64,
}

/// Bounded, TTL-expiring audio cache over a [`KvStore`].
///
/// Writers do read-modify-write on the persisted map without cross-process
/// locking; concurrent sessions sharing one store are last-write-wins, the
/// same contract as the web-storage layer this replaces.
#[derive(Clone)]
pub struct AudioCache {
    store: Arc<dyn KvStore>,
}

impl AudioCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Look up audio for (text, voice, speed). Expired entries are deleted
    /// here and report as absent. Lookups never refresh an entry's age.
    pub fn lookup(&self, text: &str, voice: &str, speed: f32) -> Option<Vec<u8>> {
        let key = fingerprint(text, voice, speed);
        let mut map = self.load_map();
        let entry = map.get(&key)?;

        let age = now_ms() - entry.created_at;
        if age < TTL_MS {
            tracing::debug!(voice, speed, "audio cache hit");
            return Some(entry.audio.clone());
        }

        tracing::debug!(voice, age_ms = age, "audio cache entry expired, dropping");
        map.remove(&key);
        self.persist(&map);
        None
    }

    /// Insert a synthesis. At capacity the single oldest entry (smallest
    /// `createdAt`) is evicted first, so the map never grows past
    /// [`MAX_ENTRIES`]. Storage failures are logged and swallowed; losing
    /// cache entries is acceptable.
    pub fn store(&self, text: &str, voice: &str, speed: f32, audio: Vec<u8>) {
        let key = fingerprint(text, voice, speed);
        let mut map = self.load_map();

        if map.len() >= MAX_ENTRIES {
            if let Some(oldest) = map
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                tracing::debug!(evicted = %oldest, "audio cache at capacity, evicting oldest");
                map.remove(&oldest);
            }
        }

        map.insert(
            key,
            CacheEntry {
                text: truncate_chars(text, FINGERPRINT_CHARS).to_string(),
                voice: voice.to_string(),
                speed,
                audio,
                created_at: now_ms(),
            },
        );
        self.persist(&map);
    }

    /// Drop every cached synthesis.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(CACHE_KEY) {
            tracing::warn!(error = %e, "failed to clear audio cache");
        }
    }

    /// Number of cached entries currently persisted.
    pub fn len(&self) -> usize {
        self.load_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Missing or corrupt persisted state reads as an empty cache.
    fn load_map(&self) -> HashMap<String, CacheEntry> {
        match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "corrupt audio cache state, starting empty");
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "audio cache read failed, starting empty");
                HashMap::new()
            }
        }
    }

    fn persist(&self, map: &HashMap<String, CacheEntry>) {
        let raw = match serde_json::to_string(map) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize audio cache");
                return;
            }
        };
        if let Err(e) = self.store.set(CACHE_KEY, &raw) {
            tracing::warn!(error = %e, "failed to persist audio cache");
        }
    }
}

// ── Voice previews ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewEntry {
    #[serde(with = "audio_b64")]
    audio: Vec<u8>,
    created_at: i64,
}

/// Per-voice preview audio, one store key per voice id. Bounded by the
/// fixed voice catalog; entries still carry the same seven-day TTL as the
/// main cache so stale previews refresh eventually.
#[derive(Clone)]
pub struct PreviewCache {
    store: Arc<dyn KvStore>,
}

impl PreviewCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(voice_id: &str) -> String {
        format!("{}{}", PREVIEW_KEY_PREFIX, voice_id)
    }

    pub fn get(&self, voice_id: &str) -> Option<Vec<u8>> {
        let raw = self.store.get(&Self::key(voice_id)).ok().flatten()?;
        let entry: PreviewEntry = serde_json::from_str(&raw).ok()?;
        if now_ms() - entry.created_at < TTL_MS {
            return Some(entry.audio);
        }
        if let Err(e) = self.store.remove(&Self::key(voice_id)) {
            tracing::warn!(voice_id, error = %e, "failed to drop expired preview");
        }
        None
    }

    pub fn put(&self, voice_id: &str, audio: Vec<u8>) {
        let entry = PreviewEntry {
            audio,
            created_at: now_ms(),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.set(&Self::key(voice_id), &raw) {
                    tracing::warn!(voice_id, error = %e, "failed to persist preview audio");
                }
            }
            Err(e) => tracing::warn!(voice_id, error = %e, "failed to serialize preview audio"),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

mod audio_b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(serde::de::Error::custom)
    }
}
