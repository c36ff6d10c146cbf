//! Supported translation languages and Gemini model options.
//!
//! [`Language`] is a closed set; every lookup by code goes through
//! [`Language::from_code`], which never fails and resolves unknown codes to
//! [`DEFAULT_LANGUAGE`].

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// A translation target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Czech,
    German,
    French,
    Spanish,
    Italian,
    Polish,
    Portuguese,
    Russian,
    Japanese,
    Chinese,
}

/// Language used when the configured code is missing or unrecognised.
pub const DEFAULT_LANGUAGE: Language = Language::English;

impl Language {
    /// All languages in display order.
    pub const ALL: [Language; 11] = [
        Language::English,
        Language::Czech,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Italian,
        Language::Polish,
        Language::Portuguese,
        Language::Russian,
        Language::Japanese,
        Language::Chinese,
    ];

    /// ISO-639-1 code (e.g. `"cs"`).
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Czech => "cs",
            Language::German => "de",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::Italian => "it",
            Language::Polish => "pl",
            Language::Portuguese => "pt",
            Language::Russian => "ru",
            Language::Japanese => "ja",
            Language::Chinese => "zh",
        }
    }

    /// English display name (e.g. `"Czech"`).
    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Czech => "Czech",
            Language::German => "German",
            Language::French => "French",
            Language::Spanish => "Spanish",
            Language::Italian => "Italian",
            Language::Polish => "Polish",
            Language::Portuguese => "Portuguese",
            Language::Russian => "Russian",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
        }
    }

    /// Resolve a language code, case-insensitively.
    ///
    /// ```
    /// use write_iq::config::Language;
    ///
    /// assert_eq!(Language::from_code("DE"), Language::German);
    /// assert_eq!(Language::from_code("xx"), Language::English);
    /// assert_eq!(Language::from_code(""), Language::English);
    /// ```
    pub fn from_code(code: &str) -> Language {
        let normalized = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == normalized)
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

impl Default for Language {
    fn default() -> Self {
        DEFAULT_LANGUAGE
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";

/// `(model_name, label)` pairs offered in the settings dialog.
pub const MODEL_OPTIONS: [(&str, &str); 2] = [
    (DEFAULT_MODEL_NAME, "Gemini 2.5 Flash (speed)"),
    ("gemini-1.5-pro", "Gemini 1.5 Pro (quality)"),
];

/// Human label for a model name; unknown names are shown as-is.
pub fn model_label(model_name: &str) -> &str {
    MODEL_OPTIONS
        .iter()
        .find(|(name, _)| *name == model_name)
        .map(|(_, label)| *label)
        .unwrap_or(model_name)
}
