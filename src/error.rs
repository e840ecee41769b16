//! Errors crossing the browser automation boundary.
//!
//! Nothing at this boundary panics or unwinds: every failure of the bridge,
//! the browser or the page arrives here as a value the session can classify.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    /// The browser has no windows at all.
    #[error("NO_WINDOW")]
    NoWindow,

    /// Neither the addressed tab nor any matching tab exists.
    #[error("NOT_FOUND")]
    TabNotFound,

    /// A tab or window was opened at the service URL; retry after it loads.
    #[error("{}", opening_tag(.new_window))]
    Opening { new_window: bool },

    /// The automation host itself failed (osascript exit, bridge exception).
    #[error("HOST_ERROR:{0}")]
    Host(String),

    /// The page answered with something no status knows about.
    #[error("UNEXPECTED_REPLY:{0}")]
    UnexpectedReply(String),
}

fn opening_tag(new_window: &bool) -> &'static str {
    if *new_window {
        "OPENING_NEW_WINDOW"
    } else {
        "OPENING_NEW_TAB"
    }
}

impl AutomationError {
    /// True when the target tab is gone and the caller should re-resolve it.
    pub fn is_target_missing(&self) -> bool {
        matches!(self, AutomationError::NoWindow | AutomationError::TabNotFound)
    }
}
