//! UI state manager: button affordances and the status line.
//!
//! [`UiState`] is a plain value owned by the orchestrator and read by the egui
//! update loop each frame.  It knows nothing about networking; every method is
//! a pure state transition.

/// Prefix that marks a status or output line as a warning.
pub const WARNING_PREFIX: &str = "⚠️ ";

pub const SUBMIT_LABEL: &str = "▶ Process";
pub const SUBMIT_BUSY_LABEL: &str = "⏳ Generating…";
pub const COPY_LABEL: &str = "📋 Copy";
pub const COPY_DONE_LABEL: &str = "✅ Copied";
pub const READY_STATUS: &str = "Ready.";

/// Coarse phase of the main window.
///
/// ```text
/// Idle ──start_processing──▶ Processing ──set_ready──▶ Ready
///                                        ──set_ready("⚠️ …")──▶ Error
/// Ready / Error ──start_processing──▶ Processing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Processing,
    Error,
    Ready,
}

impl Phase {
    /// ```
    /// use write_iq::pipeline::Phase;
    ///
    /// assert!(Phase::Processing.is_busy());
    /// assert!(!Phase::Ready.is_busy());
    /// assert!(!Phase::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Processing)
    }
}

/// Everything the main window renders besides the two text panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub phase: Phase,
    pub submit_enabled: bool,
    pub clear_enabled: bool,
    pub copy_enabled: bool,
    pub submit_label: &'static str,
    pub copy_label: &'static str,
    pub status: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            submit_enabled: true,
            clear_enabled: true,
            copy_enabled: false,
            submit_label: SUBMIT_LABEL,
            copy_label: COPY_LABEL,
            status: READY_STATUS.to_string(),
        }
    }
}

impl UiState {
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    /// Lock every action while a request is streaming.
    pub fn start_processing(&mut self) {
        self.phase = Phase::Processing;
        self.submit_label = SUBMIT_BUSY_LABEL;
        self.submit_enabled = false;
        self.clear_enabled = false;
        self.copy_enabled = false;
    }

    /// Unlock submit/clear, restore default labels and show `message`.
    pub fn set_ready(&mut self, message: impl Into<String>, copy_available: bool) {
        let message = message.into();
        self.phase = if message.starts_with(WARNING_PREFIX) {
            Phase::Error
        } else {
            Phase::Ready
        };
        self.submit_label = SUBMIT_LABEL;
        self.submit_enabled = true;
        self.clear_enabled = true;
        self.copy_label = COPY_LABEL;
        self.copy_enabled = copy_available;
        self.status = message;
    }

    pub fn mark_cleared(&mut self) {
        self.set_ready("Cleared.", false);
    }

    pub fn mark_copy_success(&mut self) {
        self.copy_label = COPY_DONE_LABEL;
        self.copy_enabled = false;
    }

    pub fn reset_copy_button(&mut self, copy_available: bool) {
        self.copy_label = COPY_LABEL;
        self.copy_enabled = copy_available;
    }
}

/// `"⚠️ {message}"`.
pub fn warning(message: impl std::fmt::Display) -> String {
    format!("{WARNING_PREFIX}{message}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
