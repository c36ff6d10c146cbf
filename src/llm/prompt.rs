//! Prompt construction for the two text transformations.
//!
//! Both templates append the user's text verbatim after a blank line, so the
//! input is always the exact suffix of the generated prompt.  Trimming and
//! the empty-input check happen in the caller before a prompt is built.

use crate::config::Language;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The text transformation the user has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Correct grammar, punctuation and spelling.
    #[default]
    GrammarFix,
    /// Translate into the selected language.
    Translate,
}

impl Mode {
    /// Short identifier used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::GrammarFix => "fix",
            Mode::Translate => "translate",
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const GRAMMAR_INSTRUCTION: &str = "\
You are an expert proofreader. \
Correct grammar, punctuation, and spelling while preserving the original tone. \
Return only the corrected text without explanations.";

const TRANSLATION_INSTRUCTION: &str = "\
Detect the source language automatically, preserve tone, and keep formatting when possible. \
Return only the translated text.";

/// Grammar-fix prompt for `text`.
pub fn grammar_prompt(text: &str) -> String {
    format!("{GRAMMAR_INSTRUCTION}\n\n{text}")
}

/// Translation prompt for `text` into `target`.
pub fn translation_prompt(text: &str, target: Language) -> String {
    format!(
        "Translate the following text into {} ({}). {TRANSLATION_INSTRUCTION}\n\n{text}",
        target.label(),
        target.code().to_ascii_uppercase(),
    )
}

/// Build the prompt for the given mode.  `language` is ignored in
/// [`Mode::GrammarFix`].
pub fn build_prompt(mode: Mode, text: &str, language: Language) -> String {
    match mode {
        Mode::GrammarFix => grammar_prompt(text),
        Mode::Translate => translation_prompt(text, language),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_prompt_has_instruction_and_text() {
        let prompt = grammar_prompt("Please fix me.");
        assert!(prompt.contains("expert proofreader"));
        assert!(prompt.ends_with("\n\nPlease fix me."));
    }

    #[test]
    fn translation_prompt_names_language_and_code() {
        let prompt = translation_prompt("Hello world", Language::Czech);
        assert!(prompt.starts_with("Translate the following text into Czech (CS)."));
        assert!(prompt.contains("Detect the source language automatically"));
        assert!(prompt.ends_with("Hello world"));
    }

    #[test]
    fn input_is_always_the_verbatim_suffix() {
        let inputs = ["a", "line one\nline two", "  inner  spaces  ", "ünïcødé ✓", "{braces}"];
        for mode in [Mode::GrammarFix, Mode::Translate] {
            for lang in Language::ALL {
                for text in inputs {
                    let prompt = build_prompt(mode, text, lang);
                    assert!(prompt.ends_with(text), "{mode:?}/{lang:?}: {prompt:?}");
                }
            }
        }
    }

    #[test]
    fn grammar_mode_ignores_language() {
        assert_eq!(
            build_prompt(Mode::GrammarFix, "x", Language::German),
            build_prompt(Mode::GrammarFix, "x", Language::Japanese),
        );
    }

    #[test]
    fn mode_identifiers() {
        assert_eq!(Mode::default(), Mode::GrammarFix);
        assert_eq!(Mode::GrammarFix.as_str(), "fix");
        assert_eq!(Mode::Translate.as_str(), "translate");
    }
}
