//! Data module for persisted preferences

mod config;

pub use config::{
    default_prompt_slots, PersistedConfig, PromptSlot, ServiceName, StateStore, CANCEL_KEY,
    DEFAULT_TRIGGER_KEY, HOTKEY_OPTIONS, PROMPT_SLOT_COUNT,
};
