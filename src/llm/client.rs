//! Backend traits and the shared `LlmError` type.
//!
//! The orchestrator only sees two seams:
//!
//! * [`LlmBackend`]: builds a bound client for a key + model
//!   (`connect`, cheap and local) and validates a key with one network round
//!   trip (`validate`).
//! * [`TextGenerator`]: a bound client that streams text fragments for a
//!   prompt.
//!
//! [`GeminiBackend`](crate::llm::GeminiBackend) is the production
//! implementation; tests plug in scripted doubles.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors reported by a generative-text backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No key was supplied.
    #[error("API key is empty.")]
    EmptyKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the client timeout.
    #[error("Gemini request timed out")]
    Timeout,

    /// The API answered with a non-success status or an error payload.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to parse Gemini response: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("failed to initialise HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Ordered text fragments produced by a streaming call.  The stream ends
/// after the first `Err`.
pub type ChunkStream = BoxStream<'static, Result<String, LlmError>>;

/// A client bound to one API key and model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier this client talks to.
    fn model_name(&self) -> &str;

    /// Start a streaming generation for `prompt`.
    async fn stream_generate(&self, prompt: &str) -> Result<ChunkStream, LlmError>;
}

/// Factory + key validator for a generative-text service.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Build a bound client.  Must not perform network I/O.
    fn connect(&self, api_key: &str, model: &str) -> Result<Arc<dyn TextGenerator>, LlmError>;

    /// Confirm `api_key` is accepted for `model` with one lightweight call.
    async fn validate(&self, api_key: &str, model: &str) -> Result<(), LlmError>;
}
