//! App configuration: one JSON file under the per-user data directory,
//! every field optional with sensible defaults.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Default port the synthesis proxy binds on.
pub const DEFAULT_PROXY_PORT: u16 = 8750;

const GOOGLE_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

// ── Proxy ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Key sent to Google. Empty means: fall back to the environment.
    #[serde(default)]
    pub google_api_key: String,
    #[serde(default = "default_google_endpoint")]
    pub google_endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
            google_api_key: String::new(),
            google_endpoint: GOOGLE_TTS_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PROXY_PORT
}
fn default_google_endpoint() -> String {
    GOOGLE_TTS_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

// ── Synthesis client ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesisConfig {
    #[serde(default = "default_synth_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self { endpoint: default_synth_endpoint(), timeout_secs: 30 }
    }
}

fn default_synth_endpoint() -> String {
    format!("http://127.0.0.1:{DEFAULT_PROXY_PORT}/api/tts")
}

// ── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or unparsable.
    pub fn load(path: &Path) -> Self {
        load_json_config(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json_config(path, self)
    }
}

/// Per-user data directory for config and stored state.
pub fn data_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("com.docvan.app")
}

/// Default location of the app config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

// ── Generic helpers ─────────────────────────────────────────────────────────

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unparsable config, using defaults");
                T::default()
            }
        },
        Err(_) => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            T::default()
        }
    }
}

/// Generic save for any Serde config type. Creates the parent directory
/// when needed.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Resolve an API key: the configured value wins when non-empty, otherwise
/// the named environment variable is consulted.
pub fn resolve_api_key(configured: &str, env_var: &str) -> Option<String> {
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    match std::env::var(env_var) {
        Ok(key) if !key.is_empty() => Some(key),
        _ => None,
    }
}
