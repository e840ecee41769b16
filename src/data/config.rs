//! Persisted Preferences
//!
//! Loads and saves the user's preferences and the remembered automation
//! window of each service. Loading never fails: every field is checked on its
//! own and replaced by its default when missing or malformed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::browser::TabLocation;

/// Number of prompt slots offered for pipe-through.
pub const PROMPT_SLOT_COUNT: usize = 5;

/// Trigger keys the listener knows how to read from modifier flags.
pub const HOTKEY_OPTIONS: [(i64, &str); 9] = [
    (63, "Fn"),
    (54, "Right Command (⌘)"),
    (55, "Left Command (⌘)"),
    (58, "Right Option (⌥)"),
    (61, "Left Option (⌥)"),
    (59, "Right Control (⌃)"),
    (62, "Left Control (⌃)"),
    (60, "Right Shift (⇧)"),
    (56, "Left Shift (⇧)"),
];

pub const DEFAULT_TRIGGER_KEY: i64 = 63;

/// Escape; cancels an in-flight dictation.
pub const CANCEL_KEY: i64 = 53;

/// Chat services the agent can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceName {
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    #[serde(rename = "Gemini")]
    Gemini,
}

impl ServiceName {
    pub const ALL: [ServiceName; 2] = [ServiceName::ChatGpt, ServiceName::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::ChatGpt => "ChatGPT",
            ServiceName::Gemini => "Gemini",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored instruction template for pipe-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSlot {
    pub title: String,
    pub prompt: String,
}

impl PromptSlot {
    fn new(title: &str, prompt: &str) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
        }
    }

    fn blank() -> Self {
        Self::new("", "")
    }

    /// Wraps a transcript in this slot's instruction.
    pub fn compose(&self, transcript: &str) -> String {
        format!("{}\n{}", self.prompt, transcript)
    }
}

pub fn default_prompt_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot::new(
            "Basic Correction",
            "Fix the following voice transcription: 1) Fix grammar errors, typos, and filler words; 2) Add proper punctuation; 3) Auto Format: standardize addresses, phone numbers, numbers, and times to their proper formats; 4) Auto Edit: if there are contradictions, keep the true intent based on context. Output only the corrected text:",
        ),
        PromptSlot::new(
            "Polish Text",
            "Polish and improve the following text and output only the result:",
        ),
        PromptSlot::new(
            "Translate to English",
            "Translate the following text to English and output only the translation:",
        ),
        PromptSlot::new(
            "Vibe Coder",
            "The following is a voice transcription of coding instructions. Please clean it up by: 1) removing filler words, hesitations and repetitions, 2) resolving any contradictions by keeping the latest intent, 3) organizing the ideas into clear, actionable instructions. Output a clean, well-structured prompt that a coding agent can directly use:",
        ),
        PromptSlot::new(
            "Email Writer",
            "Transform the following voice transcription into a professional email. Please: 1) Identify the key points and intent; 2) Structure it with appropriate greeting, body, and closing; 3) Use professional yet friendly tone; 4) Fix any grammar issues and remove filler words; 5) Keep it concise and clear. Output only the email content:",
        ),
    ]
}

/// In-memory form of the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedConfig {
    pub current_service: ServiceName,
    pub sound_enabled: bool,
    pub dedicated_windows: BTreeMap<ServiceName, Option<TabLocation>>,
    pub trigger_key: i64,
    pub pipe_slots: Vec<PromptSlot>,
    /// `-1` disables pipe-through, otherwise an index into `pipe_slots`.
    pub current_pipe_slot: i64,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            current_service: ServiceName::ChatGpt,
            sound_enabled: true,
            dedicated_windows: ServiceName::ALL.into_iter().map(|s| (s, None)).collect(),
            trigger_key: DEFAULT_TRIGGER_KEY,
            pipe_slots: default_prompt_slots(),
            current_pipe_slot: -1,
        }
    }
}

impl PersistedConfig {
    pub fn is_supported_trigger_key(code: i64) -> bool {
        HOTKEY_OPTIONS.iter().any(|(k, _)| *k == code)
    }

    pub fn trigger_key_name(code: i64) -> String {
        HOTKEY_OPTIONS
            .iter()
            .find(|(k, _)| *k == code)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("Key {}", code))
    }

    pub fn dedicated_window(&self, service: ServiceName) -> Option<TabLocation> {
        self.dedicated_windows.get(&service).copied().flatten()
    }

    pub fn set_dedicated_window(&mut self, service: ServiceName, location: Option<TabLocation>) {
        self.dedicated_windows
            .insert(service, location.filter(TabLocation::is_valid));
    }

    /// The prompt slot selected for pipe-through, if any.
    pub fn active_prompt_slot(&self) -> Option<&PromptSlot> {
        usize::try_from(self.current_pipe_slot)
            .ok()
            .and_then(|i| self.pipe_slots.get(i))
            .filter(|slot| !slot.prompt.trim().is_empty())
    }

    /// Field-by-field validation of a decoded state document.
    fn from_value(data: &Value) -> Self {
        let mut config = Self::default();

        if let Some(service) = data
            .get("current_service")
            .and_then(Value::as_str)
            .and_then(ServiceName::parse)
        {
            config.current_service = service;
        }

        if let Some(sound) = data.get("sound_enabled").and_then(Value::as_bool) {
            config.sound_enabled = sound;
        }

        if let Some(windows) = data.get("dedicated_windows").and_then(Value::as_object) {
            for service in ServiceName::ALL {
                let location = windows.get(service.as_str()).and_then(location_from_value);
                config.set_dedicated_window(service, location);
            }
        }

        if let Some(key) = data.get("trigger_key").and_then(Value::as_i64) {
            if Self::is_supported_trigger_key(key) {
                config.trigger_key = key;
            }
        }

        if let Some(slots) = data.get("pipe_slots").and_then(Value::as_array) {
            if slots.len() == PROMPT_SLOT_COUNT {
                config.pipe_slots = slots.iter().map(slot_from_value).collect();
            }
        }

        if let Some(slot) = data.get("current_pipe_slot").and_then(Value::as_i64) {
            if (-1..PROMPT_SLOT_COUNT as i64).contains(&slot) {
                config.current_pipe_slot = slot;
            }
        }

        config
    }
}

fn location_from_value(value: &Value) -> Option<TabLocation> {
    let pair = value.as_array().filter(|a| a.len() == 2)?;
    let window_id = pair[0].as_i64()?;
    let tab_index = pair[1].as_i64()?;
    Some(TabLocation::new(window_id, tab_index)).filter(TabLocation::is_valid)
}

fn slot_from_value(value: &Value) -> PromptSlot {
    match value {
        Value::Object(map) => match (
            map.get("title").and_then(Value::as_str),
            map.get("prompt").and_then(Value::as_str),
        ) {
            (Some(title), Some(prompt)) => PromptSlot::new(title, prompt),
            _ => PromptSlot::blank(),
        },
        // Older files stored bare prompt strings.
        Value::String(prompt) => {
            let title = if prompt.chars().count() > 20 {
                format!("{}...", prompt.chars().take(20).collect::<String>())
            } else {
                prompt.clone()
            };
            PromptSlot {
                title,
                prompt: prompt.clone(),
            }
        }
        _ => PromptSlot::blank(),
    }
}

/// Wire form of the state file.
#[derive(Serialize)]
struct StateFile<'a> {
    current_service: ServiceName,
    sound_enabled: bool,
    dedicated_windows: BTreeMap<&'static str, Option<(i64, i64)>>,
    trigger_key: i64,
    pipe_slots: &'a [PromptSlot],
    current_pipe_slot: i64,
}

impl<'a> From<&'a PersistedConfig> for StateFile<'a> {
    fn from(config: &'a PersistedConfig) -> Self {
        Self {
            current_service: config.current_service,
            sound_enabled: config.sound_enabled,
            dedicated_windows: ServiceName::ALL
                .into_iter()
                .map(|s| {
                    let pair = config
                        .dedicated_window(s)
                        .map(|loc| (loc.window_id, loc.tab_index));
                    (s.as_str(), pair)
                })
                .collect(),
            trigger_key: config.trigger_key,
            pipe_slots: &config.pipe_slots,
            current_pipe_slot: config.current_pipe_slot,
        }
    }
}

/// Reads and writes the state file at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/MicPipe/state.json` for the current user.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("MicPipe")
            .join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file, falling back to defaults for anything unusable.
    pub fn load(&self) -> PersistedConfig {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PersistedConfig::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read state: {}", e);
                return PersistedConfig::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(data) => PersistedConfig::from_value(&data),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "State file is not valid JSON: {}", e);
                PersistedConfig::default()
            }
        }
    }

    /// Overwrite the state file. Failures are logged and swallowed.
    pub fn save(&self, config: &PersistedConfig) {
        if let Err(e) = self.try_save(config) {
            tracing::error!(path = %self.path.display(), "Failed to save state: {:#}", e);
        }
    }

    fn try_save(&self, config: &PersistedConfig) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string(&StateFile::from(config))?;
        fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "State saved");
        Ok(())
    }
}
