//! Synthesis requests, their validation, and the HTTP client that sends
//! them to the synthesis endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::voice::DEFAULT_VOICE;

/// Longest accepted input, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;

/// One synthesis call: what to say, with which voice, how fast.
/// `voice` and `speed` may be omitted on the wire and fall back to the
/// default voice at normal speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_speed() -> f32 {
    1.0
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, speed: f32) -> Self {
        Self { text: text.into(), voice: voice.into(), speed }
    }

    /// Accepts 1..=5000 characters of non-whitespace text.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.text.trim().is_empty() {
            return Err(SynthError::EmptyText);
        }
        let len = self.text.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(SynthError::TooLong { len });
        }
        Ok(())
    }
}

/// Error payload the synthesis endpoint returns instead of audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Text không được để trống")]
    EmptyText,
    #[error("Text không được vượt quá 5000 ký tự")]
    TooLong { len: usize },
    #[error("Chưa cấu hình GOOGLE_CLOUD_API_KEY")]
    MissingApiKey,
    #[error("synthesis endpoint returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },
    /// The bounded request timeout expired. Fatal: there is no retry.
    #[error("synthesis request timed out")]
    Timeout,
    #[error("synthesis request failed: {0}")]
    Network(String),
}

/// Anything that can turn a request into MP3 bytes.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthError>;
}

/// Client for the local synthesis proxy (or anything speaking the same
/// shape: JSON request in, `audio/mpeg` bytes or an [`ErrorBody`] out).
pub struct HttpSynthesisClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpSynthesisClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(Client::new(), endpoint, timeout)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self { client, endpoint: endpoint.into(), timeout }
    }
}

#[async_trait]
impl SynthesisClient for HttpSynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthError> {
        request.validate()?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthError::Timeout
                } else {
                    SynthError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Map a non-success response to [`SynthError::Upstream`], keeping the
/// endpoint's own message when the body parses as an [`ErrorBody`].
fn upstream_error(status: u16, body: &str) -> SynthError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => match parsed.details {
            Some(details) => format!("{}: {}", parsed.error, details),
            None => parsed.error,
        },
        Err(_) => body.to_string(),
    };
    SynthError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn no_proxy_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn client_for(server: &MockServer) -> HttpSynthesisClient {
        HttpSynthesisClient::with_client(
            no_proxy_client(),
            format!("{}/api/tts", server.uri()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn validation_accepts_up_to_5000_chars() {
        let ok = SynthesisRequest::new("x".repeat(5000), DEFAULT_VOICE, 1.0);
        assert!(ok.validate().is_ok());

        let too_long = SynthesisRequest::new("x".repeat(5001), DEFAULT_VOICE, 1.0);
        match too_long.validate().unwrap_err() {
            SynthError::TooLong { len } => assert_eq!(len, 5001),
            other => panic!("expected TooLong, got {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_blank_text() {
        for text in ["", "   ", "\n\t"] {
            let request = SynthesisRequest::new(text, DEFAULT_VOICE, 1.0);
            assert!(matches!(request.validate(), Err(SynthError::EmptyText)));
        }
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        // 5000 Vietnamese characters are well over 5000 bytes.
        let text = "ế".repeat(5000);
        assert!(SynthesisRequest::new(text, DEFAULT_VOICE, 1.0).validate().is_ok());
    }

    #[test]
    fn missing_voice_and_speed_fall_back_to_defaults() {
        let request: SynthesisRequest = serde_json::from_str(r#"{"text":"xin chào"}"#).unwrap();
        assert_eq!(request.voice, DEFAULT_VOICE);
        assert_eq!(request.speed, 1.0);
    }

    #[tokio::test]
    async fn synthesize_posts_json_and_returns_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tts"))
            .and(body_partial_json(serde_json::json!({
                "text": "xin chào",
                "voice": "vi-VN-Wavenet-C",
                "speed": 1.5,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xff, 0xf3, 0x01]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let audio = client
            .synthesize(&SynthesisRequest::new("xin chào", "vi-VN-Wavenet-C", 1.5))
            .await
            .unwrap();
        assert_eq!(audio, vec![0xff, 0xf3, 0x01]);
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .synthesize(&SynthesisRequest::new("", DEFAULT_VOICE, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthError::EmptyText));
    }

    #[tokio::test]
    async fn endpoint_error_bodies_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tts"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Lỗi từ Google TTS API",
                "details": "quota exceeded",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .synthesize(&SynthesisRequest::new("xin chào", DEFAULT_VOICE, 1.0))
            .await
            .unwrap_err();
        match err {
            SynthError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("Lỗi từ Google TTS API"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_bodies_pass_through_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client
            .synthesize(&SynthesisRequest::new("a", DEFAULT_VOICE, 1.0))
            .await
            .unwrap_err()
        {
            SynthError::Upstream { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoints_hit_the_fatal_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let client = HttpSynthesisClient::with_client(
            no_proxy_client(),
            format!("{}/api/tts", server.uri()),
            Duration::from_millis(50),
        );
        let err = client
            .synthesize(&SynthesisRequest::new("chậm", DEFAULT_VOICE, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthError::Timeout));
    }
}
