//! MicPipe - hotkey dictation through a chat page's speech-to-text
//!
//! Holds a global hotkey, drives the ChatGPT or Gemini microphone in a
//! dedicated Chrome window, and pastes the transcript (or the assistant's
//! reply to it) into the application that had focus.

pub mod browser;
pub mod business;
pub mod data;
pub mod error;
pub mod platform;
pub mod services;
#[cfg(target_os = "macos")]
pub mod ui;

#[cfg(test)]
mod testing;

pub use browser::{BrowserBridge, ServiceDescriptor, TabLocation, WindowBounds};
pub use business::{DictationSession, DictationState, HotkeyEvent, HotkeyManager, TextInserter};
pub use data::{PersistedConfig, ServiceName, StateStore};
pub use error::AutomationError;
pub use platform::{Platform, PlatformFactory};
