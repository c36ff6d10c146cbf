//! Application entry point: WriteIQ.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`](write_iq::config::AppConfig) from disk (defaults on
//!    first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the Gemini backend.
//! 5. Run [`eframe::run_native`]; the orchestrator is created inside the app
//!    creator so it can wake the egui context, then blocks until the window
//!    is closed.

use std::sync::Arc;

use anyhow::Context as _;
use eframe::egui;
use write_iq::{
    app::WriteIqApp,
    config::{ConfigStore, FileConfigStore},
    llm::{GeminiBackend, LlmBackend},
    pipeline::Orchestrator,
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options() -> eframe::NativeOptions {
    let viewport = egui::ViewportBuilder::default()
        .with_title("WriteIQ")
        .with_inner_size([650.0, 700.0])
        .with_min_inner_size([420.0, 480.0]);

    eframe::NativeOptions {
        viewport,
        centered: true,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("WriteIQ starting up");

    // 2. Configuration
    let store = FileConfigStore::default();
    log::debug!("Config file: {}", store.path().display());
    let config = store.load();

    // 3. Tokio runtime (request worker + key validator each get one)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Gemini backend
    let backend: Arc<dyn LlmBackend> =
        Arc::new(GeminiBackend::new().context("failed to build Gemini client")?);

    // 5. Run the window (blocks until closed)
    let handle = rt.handle().clone();
    eframe::run_native(
        "WriteIQ",
        native_options(),
        Box::new(move |cc| {
            let egui_ctx = cc.egui_ctx.clone();
            let mut orchestrator = Orchestrator::new(backend, Box::new(store), config, handle)
                .with_waker(move || egui_ctx.request_repaint());
            orchestrator.start();
            Ok(Box::new(WriteIqApp::new(orchestrator)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe exited with an error: {e}"))?;

    log::info!("WriteIQ shut down");
    Ok(())
}
