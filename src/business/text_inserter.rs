//! Text Inserter
//!
//! Pastes text into the focused application through the clipboard, then puts
//! the user's clipboard back.

use super::clipboard_guard::ClipboardGuard;
use crate::platform::TextAction;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Clipboard-and-keystroke paste.
pub struct TextInserter {
    inner: Arc<dyn TextAction>,
    /// Pause after writing the clipboard and again after the keystroke, so
    /// the target app reads the new contents before they are restored.
    settle: Duration,
}

impl TextInserter {
    pub fn new(inner: Arc<dyn TextAction>) -> Self {
        Self {
            inner,
            settle: Duration::from_millis(100),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn pause(&self) {
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
    }

    /// Insert text into the currently focused window. The clipboard is
    /// restored whether or not the keystroke went out.
    pub fn insert(&self, text: &str, mut guard: ClipboardGuard) -> Result<()> {
        guard.overwrite_text(text)?;
        self.pause();
        let pasted = self.inner.send_paste();
        self.pause();
        guard.restore();
        pasted?;
        tracing::info!(chars = text.chars().count(), "Text pasted");
        Ok(())
    }
}
