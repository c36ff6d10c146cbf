//! Background tasks for WriteIQ.
//!
//! Two kinds of short-lived tasks run on the tokio runtime, never on the UI
//! thread:
//!
//! * [`RequestWorker`] streams one Gemini generation as `Partial` events.
//! * [`KeyValidator`] checks one API key and reports a single outcome.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (UI thread)
//!        │ spawn(id, sink)           ▲ AppEvent { id, .. }
//!        ▼                           │
//! TaskHandle ── CancellationToken    │
//!        │                           │
//!        └─ tokio task ──── EventSink (mpsc, unbounded) ──┘
//! ```
//!
//! Every event carries the [`TaskId`] of its producer so results from a
//! replaced task can be recognised and dropped.

pub mod events;
pub mod request;
pub mod task;
pub mod validator;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use events::{AppEvent, EventSink, RequestEvent, ValidationEvent};
pub use request::RequestWorker;
pub use task::{TaskHandle, TaskId};
pub use validator::KeyValidator;
