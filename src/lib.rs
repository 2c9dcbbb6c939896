//! Vietnamese text-to-speech toolkit: document ingestion, audio caching,
//! reading history, and a local proxy in front of Google Cloud TTS.

pub mod cache;
pub mod config;
pub mod history;
pub mod ingest;
pub mod proxy;
pub mod speaker;
pub mod store;
pub mod synth;
pub mod voice;
