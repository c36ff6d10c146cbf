//! System clipboard access backed by the `arboard` crate.
//!
//! The orchestrator only ever writes plain text, so the seam is a single
//! method.  [`SystemClipboard`] opens a short-lived [`arboard::Clipboard`]
//! per call since the handle is not `Send` on every platform.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Access(String),

    #[error("Failed to write to clipboard: {0}")]
    Set(String),
}

/// Anything that can receive copied output text.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Set(e.to_string()))
    }
}

/// In-memory clipboard for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
    pub fail: bool,
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Access("no display".into()));
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}
