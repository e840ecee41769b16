//! Hotkey Manager
//!
//! Turns raw key events from the platform listener into trigger press,
//! trigger release and cancel edges. The trigger key can be changed at
//! runtime without re-creating the listener.

use crate::data::{PersistedConfig, CANCEL_KEY};
use crate::platform::{HotkeyProvider, KeyEvent, KeyEventKind};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Modifier flag bits as reported by the OS for flags-changed events.
pub const FLAG_SECONDARY_FN: u64 = 0x0080_0000;
pub const FLAG_COMMAND: u64 = 0x0010_0000;
pub const FLAG_ALTERNATE: u64 = 0x0008_0000;
pub const FLAG_CONTROL: u64 = 0x0004_0000;
pub const FLAG_SHIFT: u64 = 0x0002_0000;

/// Flag bit that tells whether `key_code` is down.
pub fn modifier_mask(key_code: i64) -> Option<u64> {
    match key_code {
        63 => Some(FLAG_SECONDARY_FN),
        54 | 55 => Some(FLAG_COMMAND),
        58 | 61 => Some(FLAG_ALTERNATE),
        59 | 62 => Some(FLAG_CONTROL),
        56 | 60 => Some(FLAG_SHIFT),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    TriggerDown,
    TriggerUp,
    Cancel,
}

/// Edge detector over raw key events.
///
/// Repeated "still down" reports are dropped so only real press/release
/// transitions come out.
#[derive(Debug)]
pub struct HotkeyMonitor {
    trigger_key: AtomicI64,
    pressed: AtomicBool,
}

impl HotkeyMonitor {
    pub fn new(trigger_key: i64) -> Self {
        Self {
            trigger_key: AtomicI64::new(trigger_key),
            pressed: AtomicBool::new(false),
        }
    }

    pub fn trigger_key(&self) -> i64 {
        self.trigger_key.load(Ordering::SeqCst)
    }

    /// Switch trigger keys. A press in progress on the old key is forgotten.
    pub fn set_trigger_key(&self, key_code: i64) {
        self.trigger_key.store(key_code, Ordering::SeqCst);
        self.pressed.store(false, Ordering::SeqCst);
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }

    pub fn handle(&self, event: KeyEvent) -> Option<HotkeyEvent> {
        match event.kind {
            KeyEventKind::KeyDown if event.key_code == CANCEL_KEY => Some(HotkeyEvent::Cancel),
            KeyEventKind::FlagsChanged if event.key_code == self.trigger_key() => {
                let mask = modifier_mask(event.key_code)?;
                let down = event.flags & mask != 0;
                if self.pressed.swap(down, Ordering::SeqCst) == down {
                    return None;
                }
                Some(if down {
                    HotkeyEvent::TriggerDown
                } else {
                    HotkeyEvent::TriggerUp
                })
            }
            _ => None,
        }
    }
}

/// Owns the platform listener and routes its edges to one handler.
pub struct HotkeyManager {
    provider: Mutex<Box<dyn HotkeyProvider>>,
    monitor: Arc<HotkeyMonitor>,
}

impl HotkeyManager {
    pub fn new(provider: Box<dyn HotkeyProvider>, trigger_key: i64) -> Self {
        Self {
            provider: Mutex::new(provider),
            monitor: Arc::new(HotkeyMonitor::new(trigger_key)),
        }
    }

    pub fn monitor(&self) -> Arc<HotkeyMonitor> {
        self.monitor.clone()
    }

    /// Start listening. Fails when the OS refuses the event tap.
    pub fn on_event(&self, handler: Arc<dyn Fn(HotkeyEvent) + Send + Sync + 'static>) -> Result<()> {
        let monitor = self.monitor.clone();
        let provider = self
            .provider
            .lock()
            .map_err(|_| anyhow::anyhow!("hotkey provider lock poisoned"))?;
        provider.on_key_event(Box::new(move |event| {
            if let Some(edge) = monitor.handle(event) {
                tracing::debug!(?edge, key_code = event.key_code, "Hotkey edge");
                handler(edge);
            }
        }))?;
        tracing::info!(
            trigger = %PersistedConfig::trigger_key_name(self.monitor.trigger_key()),
            "Hotkey listener started"
        );
        Ok(())
    }

    /// Change the trigger key at runtime.
    pub fn update_trigger_key(&self, key_code: i64) {
        self.monitor.set_trigger_key(key_code);
        tracing::info!(
            trigger = %PersistedConfig::trigger_key_name(key_code),
            "Hotkey updated"
        );
    }

    pub fn stop(&self) {
        if let Ok(provider) = self.provider.lock() {
            provider.stop();
        }
    }
}
