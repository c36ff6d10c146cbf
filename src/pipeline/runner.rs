//! Orchestrator: drives submissions, key validation and settings on the UI
//! thread.
//!
//! [`Orchestrator`] owns every piece of mutable state the main window shows.
//! Background tasks never touch it; they report through the event channel
//! and the UI thread feeds those events back in via
//! [`poll_events`](Orchestrator::poll_events).
//!
//! # Request flow
//!
//! ```text
//! submit()
//!   ├─ no client        → "Gemini Unavailable" notice, settings (require_key)
//!   ├─ request active   → "still running" notice
//!   ├─ blank input      → output = "⚠️ No input text."
//!   └─ otherwise        → start_processing, spawn RequestWorker      [Processing]
//!         Partial(chunk) → append; first chunk → "Streaming response…"
//!         Error(msg)     → record, "⚠️ msg" into output, error notice
//!         Finished       → release worker, set_ready(error > Completed. > No response received.)
//! ```
//!
//! # Key validation
//!
//! At most one [`KeyValidator`] is alive.  Starting another cancels the
//! previous one; its late events are recognised by task id and dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::clipboard::Clipboard;
use crate::config::{AppConfig, ConfigStore, Language, UserSettings};
use crate::llm::{self, LlmBackend, Mode, TextGenerator};
use crate::worker::{
    AppEvent, EventSink, KeyValidator, RequestEvent, RequestWorker, TaskHandle, TaskId,
    ValidationEvent,
};

use super::dialog::{DialogSettings, SaveAction, SettingsDialog};
use super::notice::Notice;
use super::state::{warning, UiState, READY_STATUS};

/// How long the "✅ Copied" confirmation stays before the button reverts.
pub const COPY_RESET_DELAY: Duration = Duration::from_millis(1200);
/// Bounded wait for a cancelled request worker on shutdown.
pub const REQUEST_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(1500);
/// Bounded wait for a cancelled key validator on shutdown.
pub const VALIDATOR_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a validator was started; decides how its outcome is applied.
#[derive(Debug)]
enum ValidationPurpose {
    Startup,
    Settings(DialogSettings),
}

#[derive(Debug)]
struct ActiveValidation {
    handle: TaskHandle,
    purpose: ValidationPurpose,
}

/// Single-writer owner of the main window state.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use write_iq::config::{ConfigStore, FileConfigStore};
/// use write_iq::llm::GeminiBackend;
/// use write_iq::pipeline::Orchestrator;
///
/// # fn example(runtime: &tokio::runtime::Runtime) -> anyhow::Result<()> {
/// let store = FileConfigStore::default();
/// let config = store.load();
/// let backend = Arc::new(GeminiBackend::new()?);
///
/// let mut orchestrator =
///     Orchestrator::new(backend, Box::new(store), config, runtime.handle().clone());
/// orchestrator.start();
///
/// // Every UI frame:
/// orchestrator.poll_events();
/// orchestrator.tick(std::time::Instant::now());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    backend: Arc<dyn LlmBackend>,
    store: Box<dyn ConfigStore>,
    runtime: Handle,
    sink: EventSink,
    events: mpsc::UnboundedReceiver<AppEvent>,
    next_task_id: TaskId,

    config: AppConfig,
    api_key: String,
    client: Option<Arc<dyn TextGenerator>>,
    request: Option<TaskHandle>,
    validation: Option<ActiveValidation>,

    mode: Mode,
    language: Language,
    input: String,
    output: String,
    last_error: Option<String>,
    ui: UiState,

    notices: VecDeque<Notice>,
    dialog: Option<SettingsDialog>,
    settings_open_pending: bool,
    copy_reset_at: Option<Instant>,
    close_requested: bool,
}

impl Orchestrator {
    /// Build an orchestrator around a loaded configuration.  No task is
    /// started until [`start`](Self::start).
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        store: Box<dyn ConfigStore>,
        config: AppConfig,
        runtime: Handle,
    ) -> Self {
        let (sink, events) = EventSink::channel();
        let api_key = config.api_key.trim().to_string();
        let language = config.settings.language();

        Self {
            backend,
            store,
            runtime,
            sink,
            events,
            next_task_id: 0,
            config,
            api_key,
            client: None,
            request: None,
            validation: None,
            mode: Mode::default(),
            language,
            input: String::new(),
            output: String::new(),
            last_error: None,
            ui: UiState::default(),
            notices: VecDeque::new(),
            dialog: None,
            settings_open_pending: false,
            copy_reset_at: None,
            close_requested: false,
        }
    }

    /// Call `waker` whenever a background task delivers an event.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.sink = self.sink.clone().with_waker(waker);
        self
    }

    /// Kick off startup: validate the stored key, or ask for one.
    pub fn start(&mut self) {
        if self.api_key.is_empty() {
            self.ui
                .set_status("API key required. Open settings to continue.");
            self.settings_open_pending = true;
            return;
        }

        self.ui.set_status("Validating stored API key…");
        let key = self.api_key.clone();
        let model = self.config.settings.model_name.clone();
        log::info!("Validating stored API key with model {model}");
        self.start_validation(&key, &model, ValidationPurpose::Startup);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The language combo is only shown in translate mode.
    pub fn language_selector_visible(&self) -> bool {
        self.mode == Mode::Translate
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> &UserSettings {
        &self.config.settings
    }

    /// Key of the active client, or the stored key before startup validation.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_request_active(&self) -> bool {
        self.request.is_some()
    }

    pub fn active_request_id(&self) -> Option<TaskId> {
        self.request.as_ref().map(TaskHandle::id)
    }

    pub fn is_validating(&self) -> bool {
        self.validation.is_some()
    }

    pub fn dialog(&self) -> Option<&SettingsDialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut SettingsDialog> {
        self.dialog.as_mut()
    }

    /// The notice the UI should show next.
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    /// `true` once the app should exit.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// A timed UI update is still outstanding.
    pub fn has_pending_timer(&self) -> bool {
        self.copy_reset_at.is_some() || self.settings_open_pending
    }

    // -----------------------------------------------------------------------
    // Mode & language
    // -----------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        match mode {
            Mode::GrammarFix => {
                self.ui.set_status("Grammar mode active.");
                log::debug!("Mode switched to grammar");
            }
            Mode::Translate => {
                self.ui.set_status(self.translate_status());
                log::debug!("Mode switched to translate ({})", self.language.code());
            }
        }
    }

    /// Select the translation target; unknown codes resolve to the default
    /// language.
    pub fn set_language(&mut self, code: &str) {
        self.language = Language::from_code(code);
        if self.mode == Mode::Translate {
            self.ui.set_status(self.translate_status());
            log::debug!("Translation language changed to {}", self.language.code());
        }
    }

    fn translate_status(&self) -> String {
        format!("Translate mode to {}.", self.language.label())
    }

    /// Prompt for `text` under the current mode and language.
    pub fn build_prompt(&self, text: &str) -> String {
        llm::build_prompt(self.mode, text, self.language)
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    pub fn submit(&mut self) {
        let Some(client) = self.client.clone() else {
            self.notices.push_back(Notice::warning(
                "Gemini Unavailable",
                "A valid Gemini API key is required before processing text.",
            ));
            log::warn!("Attempted submit without an active Gemini client");
            self.open_settings(true);
            return;
        };

        if self.request.is_some() {
            self.notices.push_back(Notice::info(
                "Processing",
                "The previous request is still running.",
            ));
            log::debug!("Submit ignored; request already running");
            return;
        }

        let text = self.input.trim();
        if text.is_empty() {
            self.output = warning("No input text.");
            self.reset_copy_button();
            log::debug!("Submit aborted due to empty input");
            return;
        }

        log::info!(
            "Submitting request mode={} length={}",
            self.mode.as_str(),
            text.chars().count()
        );
        let prompt = self.build_prompt(text);

        self.last_error = None;
        self.copy_reset_at = None;
        self.ui.start_processing();
        self.output.clear();
        self.ui.set_status("Working with Gemini…");

        let id = self.next_id();
        let handle = RequestWorker::new(client, prompt).spawn(&self.runtime, id, self.sink.clone());
        self.request = Some(handle);
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    /// Drain every queued event without blocking.  Called once per frame.
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    /// Wait for the next event from any background task.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events.recv().await
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Request { id, event } => self.on_request_event(id, event),
            AppEvent::Validation { id, event } => self.on_validation_event(id, event),
        }
    }

    fn on_request_event(&mut self, id: TaskId, event: RequestEvent) {
        if self.active_request_id() != Some(id) {
            log::debug!("Dropping event from stale request {id}");
            return;
        }

        match event {
            RequestEvent::Partial(chunk) => {
                if self.output.is_empty() {
                    self.ui.set_status("Streaming response…");
                }
                self.output.push_str(&chunk);
            }
            RequestEvent::Error(message) => self.on_request_error(message),
            RequestEvent::Finished => self.on_request_finished(),
        }
    }

    fn on_request_error(&mut self, message: String) {
        log::error!("Gemini request error: {message}");
        self.ui.set_status(warning(&message));
        if self.output.trim().is_empty() {
            self.output = warning(&message);
        } else {
            self.output.push('\n');
            self.output.push_str(&warning(&message));
        }
        self.notices
            .push_back(Notice::error("Gemini Error", message.clone()));
        self.last_error = Some(message);
    }

    fn on_request_finished(&mut self) {
        self.request = None;

        let has_output = !self.output.trim().is_empty();
        let status = match self.last_error.take() {
            Some(error) => warning(error),
            None if has_output => "Completed.".to_string(),
            None => "No response received.".to_string(),
        };

        self.ui.set_ready(status, has_output);
        log::info!("Processing finished (output={has_output})");
    }

    fn on_validation_event(&mut self, id: TaskId, event: ValidationEvent) {
        let Some(active) = self.validation.take() else {
            log::debug!("Dropping outcome of stale validator {id}");
            return;
        };
        if active.handle.id() != id {
            log::debug!("Dropping outcome of stale validator {id}");
            self.validation = Some(active);
            return;
        }

        match (active.purpose, event) {
            (ValidationPurpose::Startup, ValidationEvent::Success(key)) => {
                let model = self.config.settings.model_name.clone();
                if self.activate(&key, &model) {
                    self.ui.set_status(READY_STATUS);
                    log::info!("Gemini client ready with model {model}");
                }
            }
            (ValidationPurpose::Startup, ValidationEvent::Failure(message)) => {
                self.ui.set_status(warning(&message));
                self.notices.push_back(Notice::warning(
                    "API Key Required",
                    "The stored Gemini API key is invalid or expired. Please provide a new key.",
                ));
                log::warn!("Stored API key validation failed: {message}");
                self.open_settings(true);
            }
            (ValidationPurpose::Settings(candidate), ValidationEvent::Success(_)) => {
                if let Some(mut dialog) = self.dialog.take() {
                    dialog.mark_validation_success();
                }
                self.ui.set_status("API key validated.");
                log::info!("API key validated for model {}", candidate.model_name);
                self.apply_settings(candidate);
            }
            (ValidationPurpose::Settings(_), ValidationEvent::Failure(message)) => {
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.mark_validation_failure(&message);
                }
                self.ui.set_status(warning(&message));
                log::warn!("API key validation failed: {message}");
            }
        }
    }

    fn start_validation(&mut self, api_key: &str, model: &str, purpose: ValidationPurpose) {
        if let Some(previous) = self.validation.take() {
            log::debug!("Cancelling validator {}", previous.handle.id());
            previous.handle.request_cancel();
        }

        let id = self.next_id();
        let handle = KeyValidator::new(Arc::clone(&self.backend), api_key, model).spawn(
            &self.runtime,
            id,
            self.sink.clone(),
        );
        self.validation = Some(ActiveValidation { handle, purpose });
    }

    fn next_id(&mut self) -> TaskId {
        self.next_task_id += 1;
        self.next_task_id
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Show the settings dialog.  An already open dialog is kept; a forced
    /// open only tightens its `require_key` flag.
    pub fn open_settings(&mut self, require_key: bool) {
        match self.dialog.as_mut() {
            Some(dialog) => {
                if require_key {
                    dialog.require();
                }
            }
            None => {
                self.dialog = Some(SettingsDialog::new(
                    &self.config.settings,
                    &self.api_key,
                    require_key,
                ));
            }
        }
    }

    /// The dialog's *Save* button.
    pub fn save_settings(&mut self) {
        let action = match self.dialog.as_mut() {
            Some(dialog) if !dialog.is_busy() => dialog.save_clicked(),
            _ => return,
        };

        match action {
            SaveAction::MissingKey => {
                self.notices.push_back(Notice::warning(
                    "Missing API Key",
                    "Please enter a Gemini API key.",
                ));
            }
            SaveAction::Accept(candidate) => {
                self.dialog = None;
                self.apply_settings(candidate);
            }
            SaveAction::Validate(candidate) => {
                let key = candidate.api_key.clone();
                let model = candidate.model_name.clone();
                log::info!("Validating new API key with model {model}");
                self.start_validation(&key, &model, ValidationPurpose::Settings(candidate));
            }
        }
    }

    /// The dialog's *Cancel* button (or window close).  Ignored while a
    /// validation is in flight.
    pub fn cancel_settings(&mut self) {
        if self.dialog.as_ref().map_or(true, SettingsDialog::is_busy) {
            return;
        }
        let Some(dialog) = self.dialog.take() else {
            return;
        };

        if dialog.require_key() && (self.client.is_none() || self.api_key.is_empty()) {
            self.notices.push_back(Notice::error(
                "API Key Required",
                "WriteIQ cannot run without a valid Gemini API key.",
            ));
            self.close_requested = true;
            log::info!("Application closing because no API key was provided");
        }
    }

    /// Adopt accepted dialog settings.  Returns `false` when the client could
    /// not be activated, in which case nothing else changes.
    pub fn apply_settings(&mut self, candidate: DialogSettings) -> bool {
        let needs_activation = candidate.api_key != self.api_key
            || candidate.model_name != self.config.settings.model_name
            || self.client.is_none();

        if needs_activation && !self.activate(&candidate.api_key, &candidate.model_name) {
            self.notices.push_back(Notice::error(
                "Gemini Error",
                "Unable to initialize Gemini with the provided key.",
            ));
            return false;
        }

        self.language = Language::from_code(&candidate.default_language);
        self.config.settings.default_language = candidate.default_language;
        self.config.settings.model_name = candidate.model_name;
        self.config.api_key = candidate.api_key;

        match self.store.save(&self.config) {
            Ok(()) => {
                self.ui.set_status("Settings saved.");
                log::info!(
                    "Settings updated (language={}, model={})",
                    self.config.settings.default_language,
                    self.config.settings.model_name
                );
            }
            Err(e) => {
                log::error!("Failed to persist settings: {e}");
                let message = format!("Settings could not be saved: {e}");
                self.ui.set_status(warning(&message));
                self.notices
                    .push_back(Notice::warning("Settings Not Saved", message));
            }
        }
        true
    }

    /// Bind a client to `api_key` + `model`.
    ///
    /// On failure the client is dropped, the active key is cleared and the
    /// configured model is left as it was.
    pub fn activate(&mut self, api_key: &str, model: &str) -> bool {
        match self.backend.connect(api_key, model) {
            Ok(client) => {
                self.client = Some(client);
                self.api_key = api_key.trim().to_string();
                self.config.settings.model_name = model.to_string();
                log::debug!("Gemini client activated with model {model}");
                true
            }
            Err(e) => {
                self.client = None;
                self.api_key.clear();
                self.ui.set_status(warning(&e));
                log::error!("Failed to initialise Gemini client: {e}");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Output actions
    // -----------------------------------------------------------------------

    pub fn copy_output(&mut self, clipboard: &mut dyn Clipboard) {
        let text = self.output.trim();
        if text.is_empty() {
            self.ui.reset_copy_button(false);
            log::debug!("Copy attempted with empty output");
            return;
        }

        let chars = text.chars().count();
        match clipboard.set_text(text) {
            Ok(()) => {
                self.ui.mark_copy_success();
                self.copy_reset_at = Some(Instant::now() + COPY_RESET_DELAY);
                log::debug!("Output copied to clipboard ({chars} chars)");
            }
            Err(e) => {
                log::warn!("Copy failed: {e}");
                self.ui.set_status(warning(&e));
                self.reset_copy_button();
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.input.clear();
        self.output.clear();
        self.ui.mark_cleared();
        log::debug!("Cleared input and output");
    }

    fn reset_copy_button(&mut self) {
        let has_text = !self.output.trim().is_empty();
        self.ui.reset_copy_button(has_text);
    }

    /// Run deferred work that is due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if std::mem::take(&mut self.settings_open_pending) {
            self.open_settings(true);
        }
        if self.copy_reset_at.is_some_and(|at| now >= at) {
            self.copy_reset_at = None;
            self.reset_copy_button();
        }
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Cancel background work and wait a bounded time for it to stop.
    pub fn shutdown(&mut self) {
        if let Some(mut request) = self.request.take() {
            if request.is_running() {
                request.request_cancel();
                if !request.await_termination(REQUEST_SHUTDOWN_TIMEOUT) {
                    log::warn!("Request {} did not stop in time", request.id());
                }
            }
        }

        if let Some(mut active) = self.validation.take() {
            if active.handle.is_running() {
                active.handle.request_cancel();
                if !active.handle.await_termination(VALIDATOR_SHUTDOWN_TIMEOUT) {
                    log::warn!("Validator {} did not stop in time", active.handle.id());
                }
            }
        }

        log::debug!("Orchestrator shut down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::config::{ConfigError, DEFAULT_MODEL_NAME};
    use crate::llm::mock::{MockBackend, MockGenerator, StreamScript, ValidateScript};
    use crate::pipeline::notice::NoticeLevel;
    use crate::pipeline::state::Phase;

    // ---- Test doubles ---

    #[derive(Clone, Default)]
    struct RecordingStore {
        saved: Arc<Mutex<Vec<AppConfig>>>,
        fail: bool,
    }

    impl RecordingStore {
        fn saves(&self) -> Vec<AppConfig> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl ConfigStore for RecordingStore {
        fn load(&self) -> AppConfig {
            AppConfig::default()
        }

        fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
            if self.fail {
                return Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.saved.lock().unwrap().push(config.clone());
            Ok(())
        }
    }

    struct Harness {
        orch: Orchestrator,
        backend: Arc<MockBackend>,
        store: RecordingStore,
    }

    fn harness_with(generator: MockGenerator, config: AppConfig, store: RecordingStore) -> Harness {
        let backend = Arc::new(MockBackend::new(generator));
        let orch = Orchestrator::new(
            backend.clone(),
            Box::new(store.clone()),
            config,
            Handle::current(),
        );
        Harness {
            orch,
            backend,
            store,
        }
    }

    fn stored_key_config(key: &str) -> AppConfig {
        AppConfig {
            api_key: key.into(),
            ..AppConfig::default()
        }
    }

    /// Orchestrator with an active client bound to "key".
    fn connected(generator: MockGenerator) -> Harness {
        let mut h = harness_with(generator, stored_key_config("key"), RecordingStore::default());
        assert!(h.orch.activate("key", DEFAULT_MODEL_NAME));
        h
    }

    /// Feed events until no request or validation is in flight.
    async fn settle(orch: &mut Orchestrator) {
        while orch.is_request_active() || orch.is_validating() {
            let event = tokio::time::timeout(Duration::from_secs(5), orch.next_event())
                .await
                .expect("background task must report")
                .expect("channel open");
            orch.handle_event(event);
        }
    }

    fn notice_titles(orch: &Orchestrator) -> Vec<String> {
        orch.notices().map(|n| n.title.clone()).collect()
    }

    // ---- Submission ---

    #[tokio::test]
    async fn submit_without_client_warns_and_forces_settings() {
        let mut h = harness_with(
            MockGenerator::chunks(&["x"]),
            AppConfig::default(),
            RecordingStore::default(),
        );
        h.orch.set_input("hello");
        h.orch.submit();

        assert!(!h.orch.is_request_active());
        assert_eq!(notice_titles(&h.orch), vec!["Gemini Unavailable"]);
        assert_eq!(h.orch.notice().map(|n| n.level), Some(NoticeLevel::Warning));
        assert!(h.orch.dialog().is_some_and(SettingsDialog::require_key));
        assert!(h.backend.generator().prompts().is_empty());
    }

    #[tokio::test]
    async fn blank_input_writes_warning_without_calling_client() {
        let mut h = connected(MockGenerator::chunks(&["x"]));
        h.orch.set_input("   \n\t ");
        h.orch.submit();

        assert_eq!(h.orch.output(), "⚠️ No input text.");
        assert!(h.orch.ui().copy_enabled);
        assert!(!h.orch.is_request_active());
        assert!(h.backend.generator().prompts().is_empty());
    }

    #[tokio::test]
    async fn streamed_chunks_are_concatenated_and_completed() {
        let mut h = connected(MockGenerator::chunks(&["Hello ", "world!"]));
        h.orch.set_input("  helo wrld  ");
        h.orch.submit();

        assert_eq!(h.orch.ui().phase, Phase::Processing);
        assert_eq!(h.orch.ui().status, "Working with Gemini…");
        assert!(!h.orch.ui().submit_enabled);

        settle(&mut h.orch).await;

        assert_eq!(h.orch.output(), "Hello world!");
        assert_eq!(h.orch.ui().status, "Completed.");
        assert_eq!(h.orch.ui().phase, Phase::Ready);
        assert!(h.orch.ui().copy_enabled);
        assert!(h.orch.ui().submit_enabled);

        let prompts = h.backend.generator().prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("\n\nhelo wrld"));
    }

    #[tokio::test]
    async fn first_chunk_switches_status_to_streaming() {
        let mut h = connected(MockGenerator::chunks(&["a", "b"]));
        h.orch.set_input("text");
        h.orch.submit();

        let event = h.orch.next_event().await.expect("event");
        h.orch.handle_event(event);
        assert_eq!(h.orch.output(), "a");
        assert_eq!(h.orch.ui().status, "Streaming response…");

        settle(&mut h.orch).await;
        assert_eq!(h.orch.output(), "ab");
    }

    #[tokio::test]
    async fn stream_error_keeps_output_and_reports_once() {
        let mut h = connected(MockGenerator::fail_after(&["partial"], "boom"));
        h.orch.set_input("text");
        h.orch.submit();
        settle(&mut h.orch).await;

        let output = h.orch.output();
        assert!(output.starts_with("partial\n⚠️ "));
        assert!(output.contains("boom"));

        let errors: Vec<_> = h
            .orch
            .notices()
            .filter(|n| n.level == NoticeLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "Gemini Error");

        assert_eq!(h.orch.ui().phase, Phase::Error);
        assert!(h.orch.ui().status.starts_with("⚠️ "));
        assert!(h.orch.ui().status.contains("boom"));
        assert!(h.orch.ui().copy_enabled);
    }

    #[tokio::test]
    async fn error_before_any_chunk_becomes_the_output() {
        let mut h = connected(MockGenerator::new(StreamScript::FailToStart(
            "unauthorised".into(),
        )));
        h.orch.set_input("text");
        h.orch.submit();
        settle(&mut h.orch).await;

        assert!(h.orch.output().starts_with("⚠️ "));
        assert!(h.orch.output().contains("unauthorised"));
        assert!(!h.orch.output().contains('\n'));
    }

    #[tokio::test]
    async fn empty_stream_reports_no_response() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.set_input("text");
        h.orch.submit();
        settle(&mut h.orch).await;

        assert_eq!(h.orch.output(), "");
        assert_eq!(h.orch.ui().status, "No response received.");
        assert!(!h.orch.ui().copy_enabled);
    }

    #[tokio::test]
    async fn recorded_error_does_not_leak_into_next_submission() {
        let mut h = connected(MockGenerator::fail_after(&[], "boom"));
        h.orch.set_input("text");
        h.orch.submit();
        settle(&mut h.orch).await;
        assert!(h.orch.ui().status.starts_with("⚠️ "));

        h.backend.set_generator(MockGenerator::chunks(&["fine"]));
        assert!(h.orch.activate("key", DEFAULT_MODEL_NAME));
        h.orch.submit();
        settle(&mut h.orch).await;

        assert_eq!(h.orch.output(), "fine");
        assert_eq!(h.orch.ui().status, "Completed.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submit_while_running_is_rejected() {
        let mut h = connected(MockGenerator::new(StreamScript::Hang));
        h.orch.set_input("text");
        h.orch.submit();
        let first = h.orch.active_request_id();
        assert!(first.is_some());

        h.orch.submit();
        assert_eq!(h.orch.active_request_id(), first);
        assert_eq!(notice_titles(&h.orch), vec!["Processing"]);
        assert_eq!(h.orch.notice().map(|n| n.level), Some(NoticeLevel::Info));

        h.orch.shutdown();
        assert!(!h.orch.is_request_active());
    }

    #[tokio::test]
    async fn rejected_submit_keeps_the_running_request_error() {
        let mut h = connected(MockGenerator::fail_after(&[], "boom"));
        h.orch.set_input("text");
        h.orch.submit();
        let first = h.orch.active_request_id();

        let event = h.orch.next_event().await.expect("error event");
        h.orch.handle_event(event);
        assert!(h.orch.output().contains("boom"));

        h.orch.submit();
        assert_eq!(h.orch.active_request_id(), first);

        settle(&mut h.orch).await;
        assert_eq!(h.orch.ui().phase, Phase::Error);
        assert!(h.orch.ui().status.starts_with("⚠️ "));
        assert!(h.orch.ui().status.contains("boom"));
        assert!(notice_titles(&h.orch).contains(&"Processing".to_string()));
    }

    #[tokio::test]
    async fn switching_mode_mid_stream_keeps_the_request_running() {
        let mut h = connected(MockGenerator::chunks(&["Hello ", "there"]));
        h.orch.set_input("helo");
        h.orch.submit();
        let first = h.orch.active_request_id();

        let event = h.orch.next_event().await.expect("first chunk");
        h.orch.handle_event(event);
        h.orch.set_mode(Mode::Translate);
        assert_eq!(h.orch.active_request_id(), first);

        settle(&mut h.orch).await;
        assert_eq!(h.orch.output(), "Hello there");
        assert_eq!(h.orch.ui().status, "Completed.");

        let prompts = h.backend.generator().prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("You are an expert proofreader."));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn validation_completes_alongside_a_streaming_request() {
        let mut h = connected(MockGenerator::stall(&["part"]));
        h.orch.set_input("text");
        h.orch.submit();
        let first = h.orch.active_request_id();

        let event = h.orch.next_event().await.expect("first chunk");
        h.orch.handle_event(event);
        assert_eq!(h.orch.output(), "part");

        h.orch.open_settings(false);
        h.orch.dialog_mut().expect("dialog").api_key_input = "fresh".into();
        h.orch.save_settings();
        assert!(h.orch.is_validating());

        let event = tokio::time::timeout(Duration::from_secs(5), h.orch.next_event())
            .await
            .expect("validator must report")
            .expect("channel open");
        assert!(matches!(event, AppEvent::Validation { .. }));
        h.orch.handle_event(event);

        assert!(!h.orch.is_validating());
        assert_eq!(h.orch.api_key(), "fresh");
        assert_eq!(h.orch.active_request_id(), first);
        assert_eq!(h.orch.output(), "part");
        assert_eq!(h.orch.ui().phase, Phase::Processing);
        assert!(!h.orch.ui().submit_enabled);

        h.orch.shutdown();
        assert!(!h.orch.is_request_active());
    }

    #[tokio::test]
    async fn stale_request_events_are_ignored() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.handle_event(AppEvent::Request {
            id: 999,
            event: RequestEvent::Partial("ghost".into()),
        });
        h.orch.handle_event(AppEvent::Request {
            id: 999,
            event: RequestEvent::Finished,
        });

        assert_eq!(h.orch.output(), "");
        assert_eq!(h.orch.ui().phase, Phase::Idle);
    }

    // ---- Activation & settings ---

    #[tokio::test]
    async fn activate_failure_clears_client_and_keeps_model() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.backend.set_connect_error(Some("bad key"));

        assert!(!h.orch.activate("other", "gemini-1.5-pro"));
        assert!(!h.orch.has_client());
        assert_eq!(h.orch.api_key(), "");
        assert_eq!(h.orch.settings().model_name, DEFAULT_MODEL_NAME);
        assert!(h.orch.ui().status.starts_with("⚠️ "));
        assert!(h.orch.ui().status.contains("bad key"));
    }

    #[tokio::test]
    async fn apply_settings_failure_changes_nothing_and_never_persists() {
        let mut h = connected(MockGenerator::chunks(&[]));
        let before = h.orch.config().clone();
        h.backend.set_connect_error(Some("rejected"));

        let applied = h.orch.apply_settings(DialogSettings {
            api_key: "new-key".into(),
            default_language: "de".into(),
            model_name: "gemini-1.5-pro".into(),
        });

        assert!(!applied);
        assert_eq!(h.orch.config(), &before);
        assert_eq!(h.orch.language(), Language::English);
        assert!(h.store.saves().is_empty());
        assert!(notice_titles(&h.orch).contains(&"Gemini Error".to_string()));
    }

    #[tokio::test]
    async fn apply_settings_activates_and_persists() {
        let mut h = connected(MockGenerator::chunks(&[]));

        assert!(h.orch.apply_settings(DialogSettings {
            api_key: "new-key".into(),
            default_language: "de".into(),
            model_name: "gemini-1.5-pro".into(),
        }));

        assert_eq!(h.orch.api_key(), "new-key");
        assert_eq!(h.orch.language(), Language::German);
        assert_eq!(h.orch.ui().status, "Settings saved.");

        let saves = h.store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].api_key, "new-key");
        assert_eq!(saves[0].settings.default_language, "de");
        assert_eq!(saves[0].settings.model_name, "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn apply_settings_with_same_key_and_model_skips_activation() {
        let mut h = connected(MockGenerator::chunks(&[]));
        let connects = h.backend.connect_calls().len();

        assert!(h.orch.apply_settings(DialogSettings {
            api_key: "key".into(),
            default_language: "pl".into(),
            model_name: DEFAULT_MODEL_NAME.into(),
        }));

        assert_eq!(h.backend.connect_calls().len(), connects);
        assert_eq!(h.orch.language(), Language::Polish);
        assert_eq!(h.store.saves().len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_without_rollback() {
        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let mut h = harness_with(MockGenerator::chunks(&[]), AppConfig::default(), store);

        assert!(h.orch.apply_settings(DialogSettings {
            api_key: "k".into(),
            default_language: "it".into(),
            model_name: DEFAULT_MODEL_NAME.into(),
        }));

        assert!(h.orch.has_client());
        assert_eq!(h.orch.config().settings.default_language, "it");
        assert!(h.orch.ui().status.contains("disk full"));
        assert!(notice_titles(&h.orch).contains(&"Settings Not Saved".to_string()));
    }

    // ---- Startup ---

    #[tokio::test]
    async fn stored_key_is_validated_then_activated() {
        let mut h = harness_with(
            MockGenerator::chunks(&[]),
            stored_key_config(" stored "),
            RecordingStore::default(),
        );
        h.orch.start();
        assert_eq!(h.orch.ui().status, "Validating stored API key…");
        assert!(h.orch.is_validating());

        settle(&mut h.orch).await;

        assert!(h.orch.has_client());
        assert_eq!(h.orch.api_key(), "stored");
        assert_eq!(h.orch.ui().status, "Ready.");
        assert_eq!(
            h.backend.validate_calls(),
            vec![("stored".to_string(), DEFAULT_MODEL_NAME.to_string())]
        );
        assert!(h.orch.dialog().is_none());
    }

    #[tokio::test]
    async fn rejected_stored_key_forces_settings() {
        let mut h = harness_with(
            MockGenerator::chunks(&[]),
            stored_key_config("expired"),
            RecordingStore::default(),
        );
        h.backend
            .push_validation(ValidateScript::Reject("API key expired".into()));
        h.orch.start();
        settle(&mut h.orch).await;

        assert!(!h.orch.has_client());
        assert!(h.orch.ui().status.starts_with("⚠️ "));
        assert_eq!(notice_titles(&h.orch), vec!["API Key Required"]);
        assert!(h.orch.dialog().is_some_and(SettingsDialog::require_key));
    }

    #[tokio::test]
    async fn missing_key_defers_settings_to_next_tick() {
        let mut h = harness_with(
            MockGenerator::chunks(&[]),
            AppConfig::default(),
            RecordingStore::default(),
        );
        h.orch.start();

        assert_eq!(
            h.orch.ui().status,
            "API key required. Open settings to continue."
        );
        assert!(h.orch.dialog().is_none());
        assert!(h.orch.has_pending_timer());

        h.orch.tick(Instant::now());
        assert!(h.orch.dialog().is_some_and(SettingsDialog::require_key));
        assert!(h.backend.validate_calls().is_empty());
    }

    // ---- Settings dialog flow ---

    #[tokio::test]
    async fn new_key_is_validated_before_it_is_applied() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.open_settings(false);
        {
            let dialog = h.orch.dialog_mut().expect("dialog");
            dialog.api_key_input = " fresh ".into();
            dialog.language = Language::Spanish;
        }
        h.orch.save_settings();

        assert!(h.orch.dialog().is_some_and(SettingsDialog::is_busy));
        assert!(h.store.saves().is_empty());

        settle(&mut h.orch).await;

        assert!(h.orch.dialog().is_none());
        assert_eq!(h.orch.api_key(), "fresh");
        assert_eq!(h.orch.language(), Language::Spanish);
        assert_eq!(h.orch.ui().status, "Settings saved.");
        assert_eq!(h.store.saves().len(), 1);
        assert_eq!(
            h.backend.validate_calls(),
            vec![("fresh".to_string(), DEFAULT_MODEL_NAME.to_string())]
        );
    }

    #[tokio::test]
    async fn failed_validation_keeps_dialog_open() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.backend
            .push_validation(ValidateScript::Reject("API key not valid".into()));
        h.orch.open_settings(false);
        h.orch.dialog_mut().expect("dialog").api_key_input = "wrong".into();
        h.orch.save_settings();
        settle(&mut h.orch).await;

        let dialog = h.orch.dialog().expect("dialog stays open");
        assert!(!dialog.is_busy());
        assert!(dialog.status().starts_with("⚠️ "));
        assert!(h.orch.ui().status.contains("API key not valid"));
        assert_eq!(h.orch.api_key(), "key");
        assert!(h.store.saves().is_empty());
    }

    #[tokio::test]
    async fn unchanged_key_is_saved_without_validation() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.open_settings(false);
        h.orch.dialog_mut().expect("dialog").model_name = "gemini-1.5-pro".into();
        h.orch.save_settings();

        assert!(h.orch.dialog().is_none());
        assert!(h.backend.validate_calls().is_empty());
        assert_eq!(h.orch.settings().model_name, "gemini-1.5-pro");
        assert_eq!(h.store.saves().len(), 1);
    }

    #[tokio::test]
    async fn empty_key_in_dialog_shows_warning() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.open_settings(false);
        h.orch.dialog_mut().expect("dialog").api_key_input.clear();
        h.orch.save_settings();

        assert!(h.orch.dialog().is_some());
        assert_eq!(notice_titles(&h.orch), vec!["Missing API Key"]);
        assert!(!h.orch.is_validating());
    }

    #[tokio::test]
    async fn cancelling_required_settings_without_client_closes_app() {
        let mut h = harness_with(
            MockGenerator::chunks(&[]),
            AppConfig::default(),
            RecordingStore::default(),
        );
        h.orch.open_settings(true);
        h.orch.cancel_settings();

        assert!(h.orch.dialog().is_none());
        assert!(h.orch.close_requested());
        assert_eq!(h.orch.notice().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[tokio::test]
    async fn cancelling_optional_settings_keeps_running() {
        let mut h = connected(MockGenerator::chunks(&[]));
        h.orch.open_settings(false);
        h.orch.cancel_settings();

        assert!(h.orch.dialog().is_none());
        assert!(!h.orch.close_requested());
        assert!(h.orch.notice().is_none());
    }

    #[tokio::test]
    async fn new_validation_replaces_a_running_one() {
        let mut h = harness_with(
            MockGenerator::chunks(&[]),
            stored_key_config("slow"),
            RecordingStore::default(),
        );
        h.backend.push_validation(ValidateScript::Hang);
        h.orch.start();

        // Let the startup validator reach its hanging call.
        tokio::time::timeout(Duration::from_secs(5), async {
            while h.backend.validate_calls().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("startup validator must run");

        h.orch.open_settings(false);
        h.orch.dialog_mut().expect("dialog").api_key_input = "quick".into();
        h.orch.save_settings();
        settle(&mut h.orch).await;

        assert_eq!(h.backend.validate_calls().len(), 2);
        assert!(h.orch.has_client());
        assert_eq!(h.orch.api_key(), "quick");
        assert_eq!(h.orch.ui().status, "Settings saved.");
    }

    // ---- Mode, language, clipboard ---

    #[tokio::test]
    async fn mode_and_language_update_status() {
        let mut h = connected(MockGenerator::chunks(&[]));
        assert!(!h.orch.language_selector_visible());

        h.orch.set_mode(Mode::Translate);
        assert!(h.orch.language_selector_visible());
        assert_eq!(h.orch.ui().status, "Translate mode to English.");

        h.orch.set_language("cs");
        assert_eq!(h.orch.ui().status, "Translate mode to Czech.");

        h.orch.set_language("tlh");
        assert_eq!(h.orch.language(), Language::English);

        h.orch.set_mode(Mode::GrammarFix);
        assert_eq!(h.orch.ui().status, "Grammar mode active.");
        h.orch.set_language("de");
        assert_eq!(h.orch.ui().status, "Grammar mode active.");
    }

    #[tokio::test]
    async fn prompt_follows_mode_and_language() {
        let mut h = connected(MockGenerator::chunks(&[]));
        assert!(h.orch.build_prompt("teh cat").starts_with("You are an expert proofreader."));

        h.orch.set_mode(Mode::Translate);
        h.orch.set_language("ja");
        let prompt = h.orch.build_prompt("hello");
        assert!(prompt.contains("Japanese (JA)"));
        assert!(prompt.ends_with("hello"));
    }

    #[tokio::test]
    async fn copy_with_empty_output_leaves_clipboard_untouched() {
        let mut h = connected(MockGenerator::chunks(&[]));
        let mut clipboard = MemoryClipboard::default();
        h.orch.copy_output(&mut clipboard);

        assert!(clipboard.contents.is_none());
        assert!(!h.orch.ui().copy_enabled);
        assert_eq!(h.orch.ui().copy_label, "📋 Copy");
    }

    #[tokio::test]
    async fn copy_confirmation_reverts_after_delay() {
        let mut h = connected(MockGenerator::chunks(&["  done  "]));
        h.orch.set_input("x");
        h.orch.submit();
        settle(&mut h.orch).await;

        let mut clipboard = MemoryClipboard::default();
        h.orch.copy_output(&mut clipboard);
        assert_eq!(clipboard.contents.as_deref(), Some("done"));
        assert_eq!(h.orch.ui().copy_label, "✅ Copied");
        assert!(!h.orch.ui().copy_enabled);

        h.orch.tick(Instant::now());
        assert_eq!(h.orch.ui().copy_label, "✅ Copied");

        h.orch.tick(Instant::now() + COPY_RESET_DELAY + Duration::from_millis(50));
        assert_eq!(h.orch.ui().copy_label, "📋 Copy");
        assert!(h.orch.ui().copy_enabled);
        assert!(!h.orch.has_pending_timer());
    }

    #[tokio::test]
    async fn new_submission_drops_pending_copy_reset() {
        let mut h = connected(MockGenerator::chunks(&["done"]));
        h.orch.set_input("x");
        h.orch.submit();
        settle(&mut h.orch).await;

        h.orch.copy_output(&mut MemoryClipboard::default());
        assert!(h.orch.has_pending_timer());

        h.orch.submit();
        assert!(!h.orch.has_pending_timer());

        h.orch.tick(Instant::now() + COPY_RESET_DELAY + Duration::from_millis(50));
        assert_eq!(h.orch.ui().phase, Phase::Processing);
        assert!(!h.orch.ui().copy_enabled);

        settle(&mut h.orch).await;
        assert!(h.orch.ui().copy_enabled);
    }

    #[tokio::test]
    async fn clipboard_failure_is_reported_in_status() {
        let mut h = connected(MockGenerator::chunks(&["text"]));
        h.orch.set_input("x");
        h.orch.submit();
        settle(&mut h.orch).await;

        let mut clipboard = MemoryClipboard {
            fail: true,
            ..MemoryClipboard::default()
        };
        h.orch.copy_output(&mut clipboard);

        assert!(h.orch.ui().status.starts_with("⚠️ "));
        assert!(h.orch.ui().copy_enabled);
    }

    #[tokio::test]
    async fn clear_all_empties_both_panes() {
        let mut h = connected(MockGenerator::chunks(&["out"]));
        h.orch.set_input("in");
        h.orch.submit();
        settle(&mut h.orch).await;

        h.orch.clear_all();
        assert_eq!(h.orch.input(), "");
        assert_eq!(h.orch.output(), "");
        assert_eq!(h.orch.ui().status, "Cleared.");
        assert!(!h.orch.ui().copy_enabled);
    }

    // ---- Shutdown ---

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_is_bounded_with_hanging_work() {
        let mut h = harness_with(
            MockGenerator::new(StreamScript::Hang),
            stored_key_config("key"),
            RecordingStore::default(),
        );
        h.backend.push_validation(ValidateScript::Hang);
        h.orch.start();
        assert!(h.orch.activate("key", DEFAULT_MODEL_NAME));
        h.orch.set_input("text");
        h.orch.submit();

        let started = Instant::now();
        h.orch.shutdown();

        assert!(started.elapsed() < REQUEST_SHUTDOWN_TIMEOUT + VALIDATOR_SHUTDOWN_TIMEOUT);
        assert!(!h.orch.is_request_active());
        assert!(!h.orch.is_validating());
    }
}
