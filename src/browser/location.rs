//! Addresses and descriptors for browser tabs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One browser tab, addressed by window id and 1-based tab index.
///
/// Window ids survive reordering and minimizing; tab indices shift when a
/// sibling tab closes. Re-validate before trusting a remembered location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLocation {
    pub window_id: i64,
    pub tab_index: i64,
}

impl TabLocation {
    pub fn new(window_id: i64, tab_index: i64) -> Self {
        Self {
            window_id,
            tab_index,
        }
    }

    /// `(0, 0)` and negative values mean "unresolved".
    pub fn is_valid(&self) -> bool {
        self.window_id > 0 && self.tab_index > 0
    }
}

impl fmt::Display for TabLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WIN_ID={},TAB={}", self.window_id, self.tab_index)
    }
}

/// Screen rectangle for a browser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl WindowBounds {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parked almost entirely left of the main display; a sliver stays on
    /// screen because macOS refuses to place a window fully off-screen.
    pub const HIDDEN: WindowBounds = WindowBounds::new(-1180, 120, 1200, 800);

    /// On-screen placement used in debug mode and for login troubleshooting.
    pub const VISIBLE: WindowBounds = WindowBounds::new(80, 80, 1100, 800);
}

/// Immutable per-service matching and navigation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_name: &'static str,
    pub url_pattern: &'static str,
    pub title_pattern: &'static str,
    pub default_url: &'static str,
}

impl ServiceDescriptor {
    /// Same predicate the bridge applies inside the browser.
    pub fn matches(&self, url: &str, title: &str) -> bool {
        url.contains(self.url_pattern) || title.contains(self.title_pattern)
    }
}
