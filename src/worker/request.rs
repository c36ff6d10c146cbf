//! Request worker: runs one streaming generation off the UI thread.
//!
//! ```text
//! Idle ──spawn──▶ Running ──chunk──▶ Partial* ──▶ Error? ──▶ Finished
//! ```
//!
//! Guarantees per worker:
//! * `Partial` events follow the producer's order, with no reordering or
//!   de-duplication.
//! * At most one `Error`, and no `Partial` after it.
//! * Exactly one `Finished`, always last, also after cancellation.
//! * After cancellation no further `Partial` / `Error` is emitted.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmError, TextGenerator};

use super::events::{EventSink, RequestEvent};
use super::task::{TaskHandle, TaskId};

/// One streaming request waiting to be spawned.
pub struct RequestWorker {
    client: Arc<dyn TextGenerator>,
    prompt: String,
}

impl RequestWorker {
    pub fn new(client: Arc<dyn TextGenerator>, prompt: String) -> Self {
        Self { client, prompt }
    }

    /// Start streaming on `runtime`; events are tagged with `id`.
    pub fn spawn(self, runtime: &Handle, id: TaskId, sink: EventSink) -> TaskHandle {
        TaskHandle::spawn(runtime, id, move |cancel| self.run(id, sink, cancel))
    }

    async fn run(self, id: TaskId, sink: EventSink, cancel: CancellationToken) {
        log::debug!(
            "request {id}: streaming from {} (prompt {} chars)",
            self.client.model_name(),
            self.prompt.chars().count()
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.forward_chunks(id, &sink, &cancel) => Some(res),
        };

        match outcome {
            Some(Ok(count)) => log::debug!("request {id}: stream complete ({count} chunks)"),
            Some(Err(e)) if !cancel.is_cancelled() => {
                log::error!("request {id}: stream failed: {e}");
                sink.request(id, RequestEvent::Error(e.to_string()));
            }
            Some(Err(e)) => log::debug!("request {id}: error after cancellation ignored: {e}"),
            None => log::info!("request {id}: cancelled"),
        }

        sink.request(id, RequestEvent::Finished);
    }

    async fn forward_chunks(
        &self,
        id: TaskId,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<usize, LlmError> {
        let mut stream = self.client.stream_generate(&self.prompt).await?;
        let mut count = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if cancel.is_cancelled() {
                break;
            }
            sink.request(id, RequestEvent::Partial(chunk));
            count += 1;
        }

        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
