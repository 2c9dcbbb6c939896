//! The speak pipeline: audio cache in front of the synthesis client, with
//! every fresh synthesis logged to the reading history.

use std::sync::Arc;

use crate::cache::{AudioCache, PreviewCache};
use crate::history::History;
use crate::store::KvStore;
use crate::synth::{SynthError, SynthesisClient, SynthesisRequest};
use crate::voice::PREVIEW_TEXT;

/// Outcome of one speak call.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    pub cache_hit: bool,
}

/// Orchestrates synthesis requests. Cache hits short-circuit the upstream
/// call and leave the history untouched; only fresh audio is logged.
pub struct Speaker {
    cache: AudioCache,
    history: History,
    previews: PreviewCache,
    client: Arc<dyn SynthesisClient>,
}

impl Speaker {
    pub fn new(store: Arc<dyn KvStore>, client: Arc<dyn SynthesisClient>) -> Self {
        Self {
            cache: AudioCache::new(store.clone()),
            history: History::new(store.clone()),
            previews: PreviewCache::new(store),
            client,
        }
    }

    /// Synthesize `text`, reusing cached audio for a recent identical
    /// (text, voice, speed) request.
    pub async fn speak(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Synthesis, SynthError> {
        let request = SynthesisRequest::new(text, voice, speed);
        request.validate()?;

        if let Some(audio) = self.cache.lookup(text, voice, speed) {
            tracing::debug!(voice, speed, "serving cached audio");
            return Ok(Synthesis { audio, cache_hit: true });
        }

        let audio = self.client.synthesize(&request).await?;
        self.cache.store(text, voice, speed, audio.clone());
        self.history.append(text, voice, speed);
        Ok(Synthesis { audio, cache_hit: false })
    }

    /// Short spoken sample of a voice, kept in the per-voice preview cache.
    /// Previews never touch the history.
    pub async fn preview(&self, voice_id: &str) -> Result<Vec<u8>, SynthError> {
        if let Some(audio) = self.previews.get(voice_id) {
            return Ok(audio);
        }
        let request = SynthesisRequest::new(PREVIEW_TEXT, voice_id, 1.0);
        let audio = self.client.synthesize(&request).await?;
        self.previews.put(voice_id, audio.clone());
        Ok(audio)
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

/// Suggested file name when the user saves the audio.
pub fn suggest_download_name(now_ms: i64) -> String {
    format!("tiengviet-tts-{now_ms}.mp3")
}
