//! Generative-text backend for WriteIQ.
//!
//! This module provides:
//! * [`LlmBackend`] / [`TextGenerator`]: the traits the orchestrator talks to.
//! * [`GeminiBackend`] / [`GeminiClient`]: Google Gemini REST implementation
//!   with SSE streaming.
//! * [`build_prompt`] and [`Mode`]: grammar-fix / translation prompts.
//! * [`LlmError`]: error variants for backend operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use write_iq::config::Language;
//! use write_iq::llm::{build_prompt, GeminiBackend, LlmBackend, Mode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiBackend::new().unwrap();
//!     backend.validate("my-key", "gemini-2.5-flash").await.unwrap();
//!
//!     let client = backend.connect("my-key", "gemini-2.5-flash").unwrap();
//!     let prompt = build_prompt(Mode::Translate, "Dobrý den", Language::English);
//!     let mut chunks = client.stream_generate(&prompt).await.unwrap();
//!     while let Some(chunk) = chunks.next().await {
//!         print!("{}", chunk.unwrap());
//!     }
//! }
//! ```

pub mod client;
pub mod gemini;
pub mod prompt;

#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ChunkStream, LlmBackend, LlmError, TextGenerator};
pub use gemini::{GeminiBackend, GeminiClient};
pub use prompt::{build_prompt, grammar_prompt, translation_prompt, Mode};
