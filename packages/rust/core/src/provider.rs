//! Summarization service client.
//!
//! Defines the [`Summarizer`] seam the pipeline calls, the Gemini
//! `generateContent` wire types, and a `reqwest`-backed client that hands
//! the response body back as a byte stream.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use glimpse_shared::{GlimpseError, Result, ServiceConfig};

/// User-Agent string for service requests.
const USER_AGENT: &str = concat!("Glimpse/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response seam
// ---------------------------------------------------------------------------

/// Chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Status plus a not-yet-consumed body.
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl ServiceResponse {
    /// Response whose body yields the given chunks in order.
    pub fn from_chunks(status: StatusCode, chunks: Vec<Bytes>) -> Self {
        Self {
            status,
            body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }
}

impl std::fmt::Debug for ServiceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A text-generation endpoint.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Issue one request. `Err` only for failures before a status is known.
    async fn generate(&self, prompt: &str) -> Result<ServiceResponse>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// Single-turn request carrying one text part.
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Pull `candidates[0].content.parts[0].text` out of a decoded body.
pub fn parse_envelope(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GlimpseError::Envelope(format!("malformed response JSON: {e}")))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GlimpseError::Envelope("response has no candidates".into()))?;

    candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| GlimpseError::Envelope("first candidate carries no text".into()))
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// `reqwest` client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    url: Url,
    api_key: String,
}

impl GeminiClient {
    /// Build a client for `{endpoint}/{model}:generateContent`.
    pub fn new(config: &ServiceConfig, api_key: impl Into<String>) -> Result<Self> {
        let raw = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        let url = Url::parse(&raw)
            .map_err(|e| GlimpseError::config(format!("invalid service URL '{raw}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GlimpseError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
        })
    }

    /// Endpoint URL, without the key.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl Summarizer for GeminiClient {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn generate(&self, prompt: &str) -> Result<ServiceResponse> {
        let response = self
            .client
            .post(self.url.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| {
                GlimpseError::Transport(format!("request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        debug!(%status, "service responded");

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| {
                    GlimpseError::Transport(format!("body read failed: {}", e.without_url()))
                })
            })
            .boxed();

        Ok(ServiceResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::decoder::decode;

    fn config_for(server: &MockServer) -> ServiceConfig {
        ServiceConfig {
            endpoint: format!("{}/v1beta/models/", server.uri()),
            model: "gemini-test".into(),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn request_serializes_to_wire_shape() {
        let json = serde_json::to_value(GenerateRequest::from_prompt("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "contents": [{ "parts": [{ "text": "hi" }] }] }));
    }

    #[test]
    fn envelope_extracts_first_text() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"first"},{"text":"second"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#;
        assert_eq!(parse_envelope(body).unwrap(), "first");
    }

    #[test]
    fn envelope_without_candidates() {
        let err = parse_envelope(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, GlimpseError::Envelope(_)));

        let err = parse_envelope(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn envelope_without_text() {
        let err = parse_envelope(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap_err();
        assert!(err.to_string().contains("no text"));

        let err = parse_envelope(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap_err();
        assert!(matches!(err, GlimpseError::Envelope(_)));
    }

    #[test]
    fn envelope_rejects_malformed_json() {
        let err = parse_envelope(r#"{"candidates":["#).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn client_url_joins_endpoint_and_model() {
        let config = ServiceConfig {
            endpoint: "https://example.com/v1beta/models/".into(),
            model: "m".into(),
            ..ServiceConfig::default()
        };
        let client = GeminiClient::new(&config, "k").unwrap();
        assert_eq!(
            client.url().as_str(),
            "https://example.com/v1beta/models/m:generateContent"
        );
    }

    #[tokio::test]
    async fn posts_prompt_and_streams_body() {
        let server = MockServer::start().await;
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"**要約** です"}]}}]}"#;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_json(serde_json::json!({
                "contents": [{ "parts": [{ "text": "summarize this" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server), "secret").unwrap();
        let response = client.generate("summarize this").await.expect("send");
        assert_eq!(response.status, StatusCode::OK);

        let text = decode(response).await.expect("decode");
        assert_eq!(parse_envelope(&text).unwrap(), "**要約** です");
    }

    #[tokio::test]
    async fn error_status_surfaces_through_decode() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server), "secret").unwrap();
        let response = client.generate("x").await.expect("send");
        let err = decode(response).await.unwrap_err();
        assert!(matches!(err, GlimpseError::Transport(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let config = ServiceConfig {
            endpoint: "http://127.0.0.1:9/v1beta/models".into(),
            ..ServiceConfig::default()
        };
        let client = GeminiClient::new(&config, "secret").unwrap();
        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, GlimpseError::Transport(_)));
        assert!(!err.to_string().contains("secret"));
    }
}
