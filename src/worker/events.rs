//! Events produced by background tasks and the sink that delivers them.
//!
//! Workers never touch orchestrator state.  They push [`AppEvent`]s into an
//! unbounded channel; the UI thread drains it every frame.  The optional
//! waker lets a producer nudge the UI (egui `request_repaint`) so events are
//! picked up promptly even when the window is otherwise idle.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::task::TaskId;

/// Progress of a streaming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    /// One text fragment, in producer order.
    Partial(String),
    /// The stream failed.  At most one per request, never followed by
    /// `Partial`.
    Error(String),
    /// Always the last event of a request.
    Finished,
}

/// Outcome of a key validation.  Exactly one per (uncancelled) validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// The backend accepted the key; carries the trimmed key.
    Success(String),
    /// The backend rejected the key or the call failed.
    Failure(String),
}

/// Everything a background task can tell the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Request { id: TaskId, event: RequestEvent },
    Validation { id: TaskId, event: ValidationEvent },
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Cloneable producer end of the event channel.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AppEvent>,
    waker: Option<Waker>,
}

impl EventSink {
    /// Create a sink and the receiver the orchestrator drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, waker: None }, rx)
    }

    /// Call `waker` after every delivered event.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Deliver `event`.  Returns `false` once the receiver is gone.
    pub fn send(&self, event: AppEvent) -> bool {
        if self.tx.send(event).is_err() {
            return false;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
        true
    }

    pub(crate) fn request(&self, id: TaskId, event: RequestEvent) -> bool {
        self.send(AppEvent::Request { id, event })
    }

    pub(crate) fn validation(&self, id: TaskId, event: ValidationEvent) -> bool {
        self.send(AppEvent::Validation { id, event })
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.tx.is_closed())
            .field("waker", &self.waker.is_some())
            .finish()
    }
}
