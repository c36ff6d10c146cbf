//! Orchestration layer for WriteIQ.
//!
//! This module turns user actions and background-task events into the state
//! the egui update loop renders every frame.
//!
//! # Architecture
//!
//! ```text
//! egui update()  ──submit / set_mode / save_settings / copy_output──▶ Orchestrator
//!                                                                       │
//!                     ┌──────────── spawn ◀─────────────────────────────┤
//!                     ▼                                                 │
//!      RequestWorker / KeyValidator (tokio tasks)                       │
//!                     │ AppEvent { id, .. }                             │
//!                     └──── mpsc ──▶ poll_events() (UI thread) ─────────┘
//!
//! UiState, output, notices, SettingsDialog ←── read by egui update() each frame
//! ```
//!
//! Only the UI thread mutates the orchestrator, so no state is shared behind
//! a lock.

pub mod dialog;
pub mod notice;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dialog::{DialogSettings, SaveAction, SettingsDialog};
pub use notice::{Notice, NoticeLevel};
pub use runner::{
    Orchestrator, COPY_RESET_DELAY, REQUEST_SHUTDOWN_TIMEOUT, VALIDATOR_SHUTDOWN_TIMEOUT,
};
pub use state::{warning, Phase, UiState, WARNING_PREFIX};
