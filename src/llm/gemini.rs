//! Google Gemini backend using the `generateContent` REST API.
//!
//! * Validation sends a one-word `"ping"` prompt to
//!   `models/{model}:generateContent`.
//! * Streaming uses `models/{model}:streamGenerateContent?alt=sse` and
//!   decodes the server-sent events incrementally from the response body.
//!
//! The key travels in the `x-goog-api-key` header.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use super::client::{ChunkStream, LlmBackend, LlmError, TextGenerator};

const GEMINI_API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    message: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_model_name(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    }
}

fn request_body(prompt: &str) -> serde_json::Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ]
    })
}

/// Concatenated text of the first candidate; empty when there is none.
fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Map a non-success HTTP response to [`LlmError::Api`], preferring the
/// message from the JSON error payload.
async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GeminiErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Decode one SSE `data:` payload into a text fragment.
///
/// Returns `Ok(None)` for frames that carry no text (e.g. the final
/// usage-metadata frame).
fn parse_chunk(payload: &str) -> Result<Option<String>, LlmError> {
    let response: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| LlmError::Parse(e.to_string()))?;

    if let Some(err) = response.error {
        return Err(LlmError::Api {
            status: err.code.unwrap_or(500),
            message: err.message,
        });
    }

    let text = extract_text(&response);
    Ok((!text.is_empty()).then_some(text))
}

// ---------------------------------------------------------------------------
// SseDecoder
// ---------------------------------------------------------------------------

/// Incremental server-sent-events decoder.
///
/// Bytes are buffered until a blank line closes an event; the `data:` lines
/// of each complete event are joined and returned.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a body chunk; returns the payloads of every event it completed.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, LlmError> {
        // CR only appears as a line terminator; JSON escapes it inside strings.
        self.buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = Self::event_data(&event[..pos])? {
                payloads.push(data);
            }
        }
        Ok(payloads)
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub(crate) fn finish(&mut self) -> Result<Option<String>, LlmError> {
        let rest = std::mem::take(&mut self.buffer);
        Self::event_data(&rest)
    }

    fn event_data(event: &[u8]) -> Result<Option<String>, LlmError> {
        let text = std::str::from_utf8(event)
            .map_err(|_| LlmError::Parse("invalid UTF-8 in event stream".into()))?;

        let data: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect();

        if data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// Fragment stream
// ---------------------------------------------------------------------------

struct StreamState {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    error: Option<LlmError>,
    done: bool,
}

impl StreamState {
    /// Queue the fragments of decoded payloads; remembers the first error.
    fn accept(&mut self, payloads: Vec<String>) {
        for payload in payloads {
            match parse_chunk(&payload) {
                Ok(Some(text)) => self.pending.push_back(text),
                Ok(None) => {}
                Err(e) => {
                    self.error = Some(e);
                    return;
                }
            }
        }
    }
}

fn fragment_stream(response: reqwest::Response) -> ChunkStream {
    let state = StreamState {
        body: response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        error: None,
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(text) = st.pending.pop_front() {
                return Some((Ok(text), st));
            }
            if let Some(err) = st.error.take() {
                st.done = true;
                return Some((Err(err), st));
            }
            if st.done {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => match st.decoder.push(&bytes) {
                    Ok(payloads) => st.accept(payloads),
                    Err(e) => st.error = Some(e),
                },
                Some(Err(e)) => st.error = Some(LlmError::from(e)),
                None => {
                    st.done = true;
                    match st.decoder.finish() {
                        Ok(Some(payload)) => st.accept(vec![payload]),
                        Ok(None) => {}
                        Err(e) => st.error = Some(e),
                    }
                }
            }
        }
    })
    .boxed()
}

// ---------------------------------------------------------------------------
// GeminiBackend
// ---------------------------------------------------------------------------

/// Factory and key validator for Gemini.
#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_root: String,
}

impl GeminiBackend {
    /// Build a backend talking to the public Gemini endpoint.
    pub fn new() -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;
        Ok(Self {
            http,
            api_root: GEMINI_API_ROOT.to_string(),
        })
    }

    #[cfg(test)]
    fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{method}", self.api_root, normalize_model_name(model))
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn connect(&self, api_key: &str, model: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::EmptyKey);
        }
        Ok(Arc::new(GeminiClient {
            http: self.http.clone(),
            stream_url: format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent")),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }))
    }

    async fn validate(&self, api_key: &str, model: &str) -> Result<(), LlmError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::EmptyKey);
        }

        let response = self
            .http
            .post(self.endpoint(model, "generateContent"))
            .header("x-goog-api-key", api_key)
            .timeout(VALIDATION_TIMEOUT)
            .json(&request_body("ping"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        log::debug!("Gemini API key validation succeeded for model {model}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// A Gemini client bound to one key and model.
pub struct GeminiClient {
    http: reqwest::Client,
    stream_url: String,
    api_key: String,
    model: String,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_generate(&self, prompt: &str) -> Result<ChunkStream, LlmError> {
        let response = self
            .http
            .post(&self.stream_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(fragment_stream(response))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
