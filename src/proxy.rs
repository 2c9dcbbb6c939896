//! Local HTTP proxy in front of Google Cloud Text-to-Speech: validates the
//! request, injects the API key, and relays the decoded MP3 back.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use warp::http::{Response, StatusCode};
use warp::Filter;

use crate::config::{self, ProxyConfig};
use crate::synth::{ErrorBody, SynthError, SynthesisRequest};

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "GOOGLE_CLOUD_API_KEY";

/// Shared state behind the proxy routes.
pub struct ProxyContext {
    api_key: Option<String>,
    google_endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ProxyContext {
    pub fn new(config: &ProxyConfig) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            config::resolve_api_key(&config.google_api_key, API_KEY_ENV),
            config.google_endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Full control over the HTTP client and key, without touching the
    /// process environment.
    pub fn with_client(
        client: reqwest::Client,
        api_key: Option<String>,
        google_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self { api_key, google_endpoint: google_endpoint.into(), timeout, client }
    }
}

/// The proxy's single route: `POST /api/tts` with a JSON [`SynthesisRequest`].
pub fn routes(
    ctx: Arc<ProxyContext>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("tts"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .and(warp::any().map(move || ctx.clone()))
        .and_then(handle_synthesize)
}

/// Bind on 127.0.0.1 and serve until the process exits.
pub async fn serve(ctx: Arc<ProxyContext>, port: u16) -> Result<(), warp::Error> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let (bound, server) = warp::serve(routes(ctx)).try_bind_ephemeral(addr)?;
    tracing::info!(addr = %bound, "synthesis proxy listening");
    server.await;
    Ok(())
}

async fn handle_synthesize(
    body: Bytes,
    ctx: Arc<ProxyContext>,
) -> Result<Response<Vec<u8>>, warp::Rejection> {
    let request: SynthesisRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting unreadable synthesis request");
            return Ok(failure_reply(&SynthError::Network(e.to_string())));
        }
    };

    match relay(&ctx, &request).await {
        Ok(audio) => {
            tracing::debug!(bytes = audio.len(), voice = %request.voice, "relayed synthesis audio");
            Ok(audio_reply(audio))
        }
        Err(err) => {
            tracing::warn!(error = %err, "synthesis request failed");
            Ok(failure_reply(&err))
        }
    }
}

/// Forward one request to Google and return the decoded MP3 bytes.
async fn relay(ctx: &ProxyContext, request: &SynthesisRequest) -> Result<Vec<u8>, SynthError> {
    request.validate()?;

    let key = ctx
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(SynthError::MissingApiKey)?;
    let url = format!("{}?key={}", ctx.google_endpoint, key);

    let payload = GooglePayload {
        input: GoogleInput { text: &request.text },
        voice: GoogleVoice { language_code: "vi-VN", name: &request.voice },
        audio_config: GoogleAudioConfig {
            audio_encoding: "MP3",
            speaking_rate: request.speed,
            pitch: 0,
            volume_gain_db: 0,
        },
    };

    let response = ctx
        .client
        .post(&url)
        .json(&payload)
        .timeout(ctx.timeout)
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
        return Err(google_error(status.as_u16(), &body));
    }

    let parsed: GoogleResponse = response
        .json()
        .await
        .map_err(|e| SynthError::Network(format!("unreadable upstream response: {e}")))?;
    BASE64
        .decode(parsed.audio_content.as_bytes())
        .map_err(|e| SynthError::Network(format!("upstream audio is not valid base64: {e}")))
}

/// Google wraps failures in `{ "error": { "message": ... } }`. A body that is
/// not JSON at all surfaces as the generic failure instead.
fn google_error(status: u16, body: &str) -> SynthError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let message = value["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            SynthError::Upstream { status, message }
        }
        Err(e) => SynthError::Network(format!("unreadable upstream error: {e}")),
    }
}

// ── Google wire format ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GooglePayload<'a> {
    input: GoogleInput<'a>,
    voice: GoogleVoice<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: GoogleAudioConfig,
}

#[derive(Debug, Serialize)]
struct GoogleInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GoogleVoice<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct GoogleAudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
    #[serde(rename = "speakingRate")]
    speaking_rate: f32,
    pitch: i32,
    #[serde(rename = "volumeGainDb")]
    volume_gain_db: i32,
}

/// Base64-encoded audio, as Google returns it.
#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

// ── Replies ─────────────────────────────────────────────────────────────────

fn audio_reply(audio: Vec<u8>) -> Response<Vec<u8>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "audio/mpeg")
        .header("Content-Length", audio.len().to_string())
        .header("Cache-Control", "public, max-age=31536000")
        .body(audio)
        .unwrap()
}

/// Map a failure onto the wire: status code plus an [`ErrorBody`] JSON body.
fn failure_reply(err: &SynthError) -> Response<Vec<u8>> {
    let (status, body) = match err {
        SynthError::EmptyText | SynthError::TooLong { .. } => (
            StatusCode::BAD_REQUEST,
            ErrorBody { error: err.to_string(), details: None },
        ),
        SynthError::MissingApiKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody { error: err.to_string(), details: None },
        ),
        SynthError::Upstream { status, message } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            ErrorBody {
                error: "Lỗi từ Google TTS API".to_string(),
                details: Some(message.clone()),
            },
        ),
        SynthError::Timeout | SynthError::Network(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                error: "Lỗi khi tạo giọng nói".to_string(),
                details: Some(err.to_string()),
            },
        ),
    };
    json_reply(status, &body)
}

fn json_reply(status: StatusCode, body: &ErrorBody) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body).unwrap_or_default())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn no_proxy_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn context(upstream: &MockServer, api_key: Option<&str>) -> Arc<ProxyContext> {
        Arc::new(ProxyContext::with_client(
            no_proxy_client(),
            api_key.map(str::to_string),
            format!("{}/v1/text:synthesize", upstream.uri()),
            Duration::from_secs(5),
        ))
    }

    /// Bind the routes on an ephemeral port and return the local endpoint.
    fn spawn_proxy(ctx: Arc<ProxyContext>) -> String {
        let (addr, fut) = warp::serve(routes(ctx)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(fut);
        format!("http://{}/api/tts", addr)
    }

    async fn post_json(endpoint: &str, body: serde_json::Value) -> reqwest::Response {
        no_proxy_client().post(endpoint).json(&body).send().await.unwrap()
    }

    #[tokio::test]
    async fn relays_google_audio_with_long_lived_caching_headers() {
        let upstream = MockServer::start().await;
        let audio = vec![0xffu8, 0xf3, 0x44, 0x00];
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(query_param("key", "k-123"))
            .and(body_partial_json(json!({
                "input": { "text": "xin chào" },
                "voice": { "languageCode": "vi-VN", "name": "vi-VN-Wavenet-B" },
                "audioConfig": { "audioEncoding": "MP3", "speakingRate": 1.5 },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audioContent": BASE64.encode(&audio),
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k-123")));
        let response = post_json(
            &endpoint,
            json!({ "text": "xin chào", "voice": "vi-VN-Wavenet-B", "speed": 1.5 }),
        )
        .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(response.headers()["cache-control"], "public, max-age=31536000");
        assert_eq!(response.bytes().await.unwrap().to_vec(), audio);
    }

    #[tokio::test]
    async fn missing_voice_and_speed_default_before_reaching_google() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "voice": { "languageCode": "vi-VN", "name": "vi-VN-Neural2-A" },
                "audioConfig": { "speakingRate": 1.0 },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audioContent": BASE64.encode(b"mp3"),
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = post_json(&endpoint, json!({ "text": "chào bạn" })).await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_google_is_called() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = post_json(&endpoint, json!({ "text": "   " })).await;

        assert_eq!(response.status(), 400);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Text không được để trống");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn over_long_text_is_rejected_with_the_limit_message() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = post_json(&endpoint, json!({ "text": "x".repeat(5001) })).await;

        assert_eq!(response.status(), 400);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Text không được vượt quá 5000 ký tự");
    }

    #[tokio::test]
    async fn missing_api_key_is_a_server_side_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, None));
        let response = post_json(&endpoint, json!({ "text": "xin chào" })).await;

        assert_eq!(response.status(), 500);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Chưa cấu hình GOOGLE_CLOUD_API_KEY");
    }

    #[tokio::test]
    async fn google_errors_keep_their_status_and_message() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("bad-key")));
        let response = post_json(&endpoint, json!({ "text": "xin chào" })).await;

        assert_eq!(response.status(), 403);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Lỗi từ Google TTS API");
        assert_eq!(body.details.as_deref(), Some("API key not valid"));
    }

    #[tokio::test]
    async fn google_errors_without_a_message_fall_back_to_unknown() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": {} })))
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = post_json(&endpoint, json!({ "text": "xin chào" })).await;

        assert_eq!(response.status(), 500);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.details.as_deref(), Some("Unknown error"));
    }

    #[tokio::test]
    async fn unreadable_request_bodies_get_the_generic_failure() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = no_proxy_client()
            .post(&endpoint)
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Lỗi khi tạo giọng nói");
    }

    #[tokio::test]
    async fn corrupt_upstream_audio_gets_the_generic_failure() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audioContent": "!!! not base64 !!!",
            })))
            .mount(&upstream)
            .await;

        let endpoint = spawn_proxy(context(&upstream, Some("k")));
        let response = post_json(&endpoint, json!({ "text": "xin chào" })).await;

        assert_eq!(response.status(), 500);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Lỗi khi tạo giọng nói");
        assert!(body.details.unwrap_or_default().contains("base64"));
    }

    #[tokio::test]
    async fn slow_google_responses_hit_the_bounded_timeout() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
            .mount(&upstream)
            .await;

        let ctx = Arc::new(ProxyContext::with_client(
            no_proxy_client(),
            Some("k".to_string()),
            format!("{}/v1/text:synthesize", upstream.uri()),
            Duration::from_millis(50),
        ));
        let endpoint = spawn_proxy(ctx);
        let response = post_json(&endpoint, json!({ "text": "chậm" })).await;

        assert_eq!(response.status(), 500);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Lỗi khi tạo giọng nói");
        assert_eq!(body.details.as_deref(), Some("synthesis request timed out"));
    }
}
