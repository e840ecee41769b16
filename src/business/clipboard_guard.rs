//! Clipboard snapshot and restore around a paste.

use crate::platform::{ClipboardItem, Pasteboard};
use anyhow::Result;
use std::sync::Arc;

/// Every representation the clipboard held at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub items: Vec<ClipboardItem>,
}

impl ClipboardSnapshot {
    pub fn capture(pasteboard: &dyn Pasteboard) -> Self {
        Self {
            items: pasteboard.items(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Write the snapshot back. Representations the pasteboard refuses are
    /// skipped; returns how many made it.
    pub fn restore(&self, pasteboard: &dyn Pasteboard) -> usize {
        let restored = pasteboard.write_items(&self.items);
        if restored < self.items.len() {
            tracing::warn!(
                restored,
                total = self.items.len(),
                "Some clipboard representations could not be restored"
            );
        }
        restored
    }
}

/// Holds a snapshot taken before the clipboard is overwritten and puts it
/// back afterwards. Dropping a guard that overwrote the clipboard restores it.
pub struct ClipboardGuard {
    pasteboard: Arc<dyn Pasteboard>,
    snapshot: ClipboardSnapshot,
    dirty: bool,
}

impl ClipboardGuard {
    pub fn capture(pasteboard: Arc<dyn Pasteboard>) -> Self {
        let snapshot = ClipboardSnapshot::capture(pasteboard.as_ref());
        tracing::debug!(representations = snapshot.items.len(), "Clipboard captured");
        Self {
            pasteboard,
            snapshot,
            dirty: false,
        }
    }

    pub fn snapshot(&self) -> &ClipboardSnapshot {
        &self.snapshot
    }

    /// Replace the clipboard with plain text.
    pub fn overwrite_text(&mut self, text: &str) -> Result<()> {
        self.dirty = true;
        self.pasteboard.write_text(text)
    }

    /// Put the captured contents back.
    pub fn restore(mut self) -> usize {
        self.dirty = false;
        self.snapshot.restore(self.pasteboard.as_ref())
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        if self.dirty {
            self.snapshot.restore(self.pasteboard.as_ref());
        }
    }
}
