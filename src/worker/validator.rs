//! Key validator: runs one API-key validation off the UI thread.
//!
//! ```text
//! Idle ──spawn──▶ Running ──▶ Success(key) | Failure(message)
//! ```
//!
//! Exactly one outcome event per validator, never both and never any
//! progress.  A cancelled validator emits nothing; the orchestrator has
//! already forgotten it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::llm::LlmBackend;

use super::events::{EventSink, ValidationEvent};
use super::task::{TaskHandle, TaskId};

/// One validation call waiting to be spawned.
pub struct KeyValidator {
    backend: Arc<dyn LlmBackend>,
    api_key: String,
    model: String,
}

impl KeyValidator {
    /// The key is trimmed here; the success event carries the trimmed key.
    pub fn new(backend: Arc<dyn LlmBackend>, api_key: &str, model: &str) -> Self {
        Self {
            backend,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        }
    }

    /// Start the validation on `runtime`; the outcome is tagged with `id`.
    pub fn spawn(self, runtime: &Handle, id: TaskId, sink: EventSink) -> TaskHandle {
        TaskHandle::spawn(runtime, id, move |cancel| self.run(id, sink, cancel))
    }

    async fn run(self, id: TaskId, sink: EventSink, cancel: CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("validator {id}: cancelled");
                return;
            }
            res = self.backend.validate(&self.api_key, &self.model) => res,
        };

        if cancel.is_cancelled() {
            log::debug!("validator {id}: result discarded after cancellation");
            return;
        }

        let event = match result {
            Ok(()) => {
                log::info!("API key validated using model {}", self.model);
                ValidationEvent::Success(self.api_key)
            }
            Err(e) => {
                log::warn!("API key validation failed for model {}: {e}", self.model);
                ValidationEvent::Failure(e.to_string())
            }
        };
        sink.validation(id, event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
