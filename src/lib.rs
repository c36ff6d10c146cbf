//! WriteIQ: a desktop grammar-fix and translation helper backed by Google
//! Gemini.
//!
//! * [`config`]: settings, languages, TOML persistence.
//! * [`llm`]: backend traits, the Gemini client, prompt templates.
//! * [`worker`]: cancellable background tasks and their events.
//! * [`pipeline`]: the orchestrator and the state the UI renders.
//! * [`clipboard`]: output copy target.
//! * [`app`]: the egui window.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod worker;
