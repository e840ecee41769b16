//! Business logic: hotkeys, session state, polling and the paste path.

pub mod clipboard_guard;
pub mod hotkey_manager;
pub mod poller;
pub mod session;
pub mod state;
pub mod text_inserter;

pub use clipboard_guard::{ClipboardGuard, ClipboardSnapshot};
pub use hotkey_manager::{HotkeyEvent, HotkeyManager, HotkeyMonitor};
pub use poller::{poll, Backoff, PollError};
pub use session::{DictationSession, PipeError, Timings};
pub use state::{DictationState, StateMachine, TransitionError};
pub use text_inserter::TextInserter;
