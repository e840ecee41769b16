//! Page reply statuses.
//!
//! Page scripts answer with `TAG`, `TAG|DBG=<diagnostic>` or, for text
//! results, `TEXT:<content>`. Each enum here covers exactly the tags one
//! operation can produce; anything else is an `UnexpectedReply`.

use std::fmt;

use crate::error::AutomationError;

/// A status decoded from a raw page reply.
pub trait PageStatus: Sized {
    fn parse(raw: &str) -> Result<Self, AutomationError>;
}

const DBG: &str = "|DBG=";

fn split_tag(raw: &str) -> (&str, String) {
    match raw.split_once(DBG) {
        Some((tag, diag)) => (tag.trim(), diag.trim().to_string()),
        None => (raw.trim(), String::new()),
    }
}

fn unexpected(raw: &str) -> AutomationError {
    AutomationError::UnexpectedReply(raw.to_string())
}

fn write_tag(f: &mut fmt::Formatter<'_>, tag: &str, diag: &str) -> fmt::Result {
    if diag.is_empty() {
        f.write_str(tag)
    } else {
        write!(f, "{}{}{}", tag, DBG, diag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyStatus {
    Ready,
    /// Loaded, but the microphone control is missing (often: logged out).
    ButtonNotFound(String),
    PageNotReady,
}

impl PageStatus for ReadyStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("READY", _) => Ok(Self::Ready),
            ("BTN_NOT_FOUND", diag) => Ok(Self::ButtonNotFound(diag)),
            ("PAGE_NOT_READY", _) => Ok(Self::PageNotReady),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for ReadyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("READY"),
            Self::ButtonNotFound(diag) => write_tag(f, "BTN_NOT_FOUND", diag),
            Self::PageNotReady => f.write_str("PAGE_NOT_READY"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartStatus {
    Started,
    ButtonNotFound(String),
}

impl PageStatus for StartStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("START_DONE", _) => Ok(Self::Started),
            ("START_BTN_NOT_FOUND", diag) => Ok(Self::ButtonNotFound(diag)),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for StartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("START_DONE"),
            Self::ButtonNotFound(diag) => write_tag(f, "START_BTN_NOT_FOUND", diag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopStatus {
    /// Dictation finalized; the transcript stays in the composer.
    SubmitClicked,
    /// Microphone toggled off.
    StopClicked,
    /// Transcript was already in place and got sent.
    SendClicked,
    SubmitButtonNotFound(String),
    StopButtonNotFound(String),
}

impl StopStatus {
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Self::SubmitClicked | Self::StopClicked | Self::SendClicked
        )
    }
}

impl PageStatus for StopStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("SUBMIT_CLICKED", _) => Ok(Self::SubmitClicked),
            ("STOP_CLICKED", _) => Ok(Self::StopClicked),
            ("SEND_CLICKED", _) => Ok(Self::SendClicked),
            ("SUBMIT_BTN_NOT_FOUND", diag) => Ok(Self::SubmitButtonNotFound(diag)),
            ("STOP_BTN_NOT_FOUND", diag) => Ok(Self::StopButtonNotFound(diag)),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitClicked => f.write_str("SUBMIT_CLICKED"),
            Self::StopClicked => f.write_str("STOP_CLICKED"),
            Self::SendClicked => f.write_str("SEND_CLICKED"),
            Self::SubmitButtonNotFound(diag) => write_tag(f, "SUBMIT_BTN_NOT_FOUND", diag),
            Self::StopButtonNotFound(diag) => write_tag(f, "STOP_BTN_NOT_FOUND", diag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelStatus {
    Cancelled,
    ButtonNotFound(String),
    /// The service has no cancel control. Not an error.
    NotSupported,
}

impl PageStatus for CancelStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("CANCEL_DONE", _) => Ok(Self::Cancelled),
            ("CANCEL_BTN_NOT_FOUND", diag) => Ok(Self::ButtonNotFound(diag)),
            ("CANCEL_NOT_SUPPORTED", _) => Ok(Self::NotSupported),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for CancelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("CANCEL_DONE"),
            Self::ButtonNotFound(diag) => write_tag(f, "CANCEL_BTN_NOT_FOUND", diag),
            Self::NotSupported => f.write_str("CANCEL_NOT_SUPPORTED"),
        }
    }
}

/// Result of reading and clearing the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerText {
    Text(String),
    Empty(String),
    NotFound(String),
    /// The page script threw.
    PageError(String),
}

impl PageStatus for ComposerText {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        if let Some(text) = raw.strip_prefix("TEXT:") {
            return Ok(Self::Text(text.trim().to_string()));
        }
        if let Some(msg) = raw.strip_prefix("ERROR:") {
            return Ok(Self::PageError(msg.to_string()));
        }
        match split_tag(raw) {
            ("EMPTY", diag) => Ok(Self::Empty(diag)),
            ("NOT_FOUND", diag) => Ok(Self::NotFound(diag)),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for ComposerText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "TEXT:{}", text),
            Self::Empty(diag) => write_tag(f, "EMPTY", diag),
            Self::NotFound(diag) => write_tag(f, "NOT_FOUND", diag),
            Self::PageError(msg) => write!(f, "ERROR:{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefillStatus {
    Filled,
    NotFound(String),
    Error(String),
}

impl PageStatus for PrefillStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        if let Some(msg) = raw.strip_prefix("ERROR:") {
            return Ok(Self::Error(msg.to_string()));
        }
        match split_tag(raw) {
            ("SUCCESS", _) => Ok(Self::Filled),
            ("NOT_FOUND", diag) => Ok(Self::NotFound(diag)),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for PrefillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filled => f.write_str("SUCCESS"),
            Self::NotFound(diag) => write_tag(f, "NOT_FOUND", diag),
            Self::Error(msg) => write!(f, "ERROR:{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Sent,
    ButtonDisabled,
    ButtonNotFound(String),
}

impl PageStatus for SubmitStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("SENT", _) => Ok(Self::Sent),
            ("SEND_BTN_DISABLED", _) => Ok(Self::ButtonDisabled),
            ("SEND_BTN_NOT_FOUND", diag) => Ok(Self::ButtonNotFound(diag)),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("SENT"),
            Self::ButtonDisabled => f.write_str("SEND_BTN_DISABLED"),
            Self::ButtonNotFound(diag) => write_tag(f, "SEND_BTN_NOT_FOUND", diag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Generating,
    Complete,
    NoResponse,
}

impl PageStatus for ResponseStatus {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        match split_tag(raw) {
            ("GENERATING", _) => Ok(Self::Generating),
            ("COMPLETE", _) => Ok(Self::Complete),
            ("NO_RESPONSE", _) => Ok(Self::NoResponse),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generating => "GENERATING",
            Self::Complete => "COMPLETE",
            Self::NoResponse => "NO_RESPONSE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseText {
    Text(String),
    NoResponse,
    EmptyResponse,
}

impl PageStatus for ResponseText {
    fn parse(raw: &str) -> Result<Self, AutomationError> {
        if let Some(text) = raw.strip_prefix("TEXT:") {
            return Ok(Self::Text(text.trim().to_string()));
        }
        match split_tag(raw) {
            ("NO_RESPONSE", _) => Ok(Self::NoResponse),
            ("EMPTY_RESPONSE", _) => Ok(Self::EmptyResponse),
            _ => Err(unexpected(raw)),
        }
    }
}

impl fmt::Display for ResponseText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "TEXT:{}", text),
            Self::NoResponse => f.write_str("NO_RESPONSE"),
            Self::EmptyResponse => f.write_str("EMPTY_RESPONSE"),
        }
    }
}
