use anyhow::Result;
use std::sync::Arc;

use crate::error::AutomationError;

/// Runs a program in the host automation language and returns its output.
pub trait ScriptHost: Send + Sync {
    fn run(&self, program: &str) -> Result<String, AutomationError>;
}

/// One representation held by the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    /// Position of the pasteboard item this representation belongs to.
    pub item: usize,
    /// Uniform type identifier, e.g. `public.utf8-plain-text`.
    pub kind: String,
    pub data: Vec<u8>,
}

/// Split representations back into their pasteboard items, keeping order.
pub fn group_items(items: &[ClipboardItem]) -> Vec<Vec<&ClipboardItem>> {
    let mut groups: Vec<Vec<&ClipboardItem>> = Vec::new();
    for representation in items {
        match groups.last_mut() {
            Some(group) if group[0].item == representation.item => group.push(representation),
            _ => groups.push(vec![representation]),
        }
    }
    groups
}

pub const PLAIN_TEXT_TYPE: &str = "public.utf8-plain-text";

/// Trait for the system clipboard
pub trait Pasteboard: Send + Sync {
    /// Every representation that materializes right now.
    fn items(&self) -> Vec<ClipboardItem>;
    /// Replace the clipboard with plain text.
    fn write_text(&self, text: &str) -> Result<()>;
    /// Replace the clipboard with a representation set; returns how many were accepted.
    fn write_items(&self, items: &[ClipboardItem]) -> usize;
}

/// Trait for platform-specific text actions
pub trait TextAction: Send + Sync {
    /// Synthesize the paste shortcut into the focused application
    fn send_paste(&self) -> Result<()>;
}

/// The application that had focus when a session began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontApp {
    pub pid: i32,
    pub bundle_id: Option<String>,
}

/// Trait for reading and restoring application focus
pub trait FocusTracker: Send + Sync {
    fn frontmost(&self) -> Option<FrontApp>;
    /// Bring `app` back to the front; false when it no longer runs.
    fn activate(&self, app: &FrontApp) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
    FlagsChanged,
}

/// Raw key transition as seen by the low-level listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key_code: i64,
    pub flags: u64,
}

/// Trait for platform-specific hotkey management
pub trait HotkeyProvider: Send + Sync {
    /// Start delivering every raw key event to `callback`. Fails when the
    /// process lacks input-monitoring permission.
    fn on_key_event(&self, callback: Box<dyn Fn(KeyEvent) + Send + Sync + 'static>) -> Result<()>;
    /// Stop listening
    fn stop(&self);
}

/// User-facing messages.
pub trait Notifier: Send + Sync {
    /// Transient notification banner.
    fn notify(&self, title: &str, message: &str);
    /// Modal alert for problems the user must act on.
    fn alert(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Start,
    Stop,
}

pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// The set of OS capabilities the session runs against.
#[derive(Clone)]
pub struct Platform {
    pub script_host: Arc<dyn ScriptHost>,
    pub pasteboard: Arc<dyn Pasteboard>,
    pub text_action: Arc<dyn TextAction>,
    pub focus: Arc<dyn FocusTracker>,
    pub notifier: Arc<dyn Notifier>,
    pub sound: Arc<dyn SoundPlayer>,
}

#[cfg(target_os = "macos")]
pub mod macos;

/// Factory for creating platform-specific implementations
pub struct PlatformFactory;

impl PlatformFactory {
    pub fn create() -> Result<Platform> {
        #[cfg(target_os = "macos")]
        return Ok(Platform {
            script_host: Arc::new(macos::OsaScriptHost::new()),
            pasteboard: Arc::new(macos::MacosPasteboard::new()),
            text_action: Arc::new(macos::MacosTextAction::new()),
            focus: Arc::new(macos::MacosFocusTracker::new()),
            notifier: Arc::new(macos::MacosNotifier::new()),
            sound: Arc::new(macos::MacosSoundPlayer::new()),
        });
        #[cfg(not(target_os = "macos"))]
        anyhow::bail!("MicPipe drives the browser through macOS automation and only runs on macOS");
    }

    pub fn create_hotkey_provider() -> Result<Box<dyn HotkeyProvider>> {
        #[cfg(target_os = "macos")]
        return Ok(Box::new(macos::MacosHotkeyProvider::new()));
        #[cfg(not(target_os = "macos"))]
        anyhow::bail!("Global key monitoring is only available on macOS");
    }
}
