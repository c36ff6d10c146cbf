//! Form state of the settings dialog.
//!
//! The egui layer binds its widgets straight to the public fields of
//! [`SettingsDialog`]; the orchestrator reacts to the [`SaveAction`] returned
//! by [`SettingsDialog::save_clicked`] and reports validation outcomes back.

use crate::config::{model_label, Language, UserSettings, MODEL_OPTIONS};

use super::state::warning;

/// Settings candidate produced by the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSettings {
    pub api_key: String,
    pub default_language: String,
    pub model_name: String,
}

/// What the orchestrator should do after the user pressed *Save*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    /// No key entered; the dialog stays open.
    MissingKey,
    /// Key unchanged since the dialog opened; accept without a round-trip.
    Accept(DialogSettings),
    /// Validate the candidate before accepting it.
    Validate(DialogSettings),
}

#[derive(Debug, Clone)]
pub struct SettingsDialog {
    pub api_key_input: String,
    pub language: Language,
    pub model_name: String,
    initial_api_key: String,
    require_key: bool,
    busy: bool,
    status: String,
}

impl SettingsDialog {
    /// Populate the form from the current settings.  Unknown languages fall
    /// back to the default language, unknown models to the first option.
    pub fn new(settings: &UserSettings, api_key: &str, require_key: bool) -> Self {
        let model_name = MODEL_OPTIONS
            .iter()
            .map(|(name, _)| *name)
            .find(|name| *name == settings.model_name)
            .unwrap_or(MODEL_OPTIONS[0].0)
            .to_string();

        Self {
            api_key_input: api_key.to_string(),
            language: settings.language(),
            model_name,
            initial_api_key: api_key.trim().to_string(),
            require_key,
            busy: false,
            status: String::new(),
        }
    }

    pub fn require_key(&self) -> bool {
        self.require_key
    }

    /// A forced re-open keeps the stricter requirement.
    pub(crate) fn require(&mut self) {
        self.require_key = true;
    }

    /// Inputs and buttons are disabled while a validation is running.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Inline status line under the form.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn get_settings(&self) -> DialogSettings {
        DialogSettings {
            api_key: self.api_key_input.trim().to_string(),
            default_language: self.language.code().to_string(),
            model_name: if self.model_name.is_empty() {
                MODEL_OPTIONS[0].0.to_string()
            } else {
                self.model_name.clone()
            },
        }
    }

    pub fn save_clicked(&mut self) -> SaveAction {
        let settings = self.get_settings();
        if settings.api_key.is_empty() {
            return SaveAction::MissingKey;
        }

        // Unchanged key is accepted as-is, even when the model changed.
        if settings.api_key == self.initial_api_key {
            self.status.clear();
            return SaveAction::Accept(settings);
        }

        self.status = format!(
            "Validating API key for {} translations on {}…",
            self.language.label(),
            model_label(&settings.model_name)
        );
        self.busy = true;
        SaveAction::Validate(settings)
    }

    pub fn mark_validation_success(&mut self) {
        self.busy = false;
        self.status = "✅ API key validated.".to_string();
    }

    pub fn mark_validation_failure(&mut self, message: &str) {
        self.busy = false;
        self.status = warning(message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
