//! Structured automation bridge.
//!
//! Each call serializes one typed request, prepends it to a fixed JXA program
//! and decodes the single JSON object the program prints. No location or
//! status is ever scraped out of free-form text.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::location::{ServiceDescriptor, TabLocation, WindowBounds};
use crate::error::AutomationError;
use crate::platform::ScriptHost;

const BRIDGE_PROGRAM: &str = include_str!("bridge.js");

pub const DEFAULT_BROWSER: &str = "Google Chrome";

/// Operations understood by the bridge program.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeOp {
    LocateAny,
    LocateFront,
    Validate {
        location: TabLocation,
    },
    CreateWindow {
        bounds: WindowBounds,
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Reposition {
        window_id: i64,
        bounds: WindowBounds,
        activate: bool,
    },
    #[serde(rename_all = "camelCase")]
    Demote {
        window_id: i64,
    },
    /// `script` is the base64 form of the page script.
    #[serde(rename_all = "camelCase")]
    Execute {
        preferred: Option<TabLocation>,
        script: String,
        open_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ExecuteActivated {
        preferred: Option<TabLocation>,
        script: String,
        /// Seconds to wait after raising the tab.
        settle: f64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    browser: &'a str,
    url_pattern: &'a str,
    title_pattern: &'a str,
    #[serde(flatten)]
    op: &'a BridgeOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyStatus {
    Ok,
    NotFound,
    NoWindow,
    OpeningNewWindow,
    OpeningNewTab,
    Error,
}

/// How an execution reached its tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecPath {
    /// The remembered location still pointed at a matching tab.
    Preferred,
    /// Found by scanning every window.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub location: Option<TabLocation>,
    #[serde(default)]
    pub path: Option<ExecPath>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Typed front end to the host automation runtime.
pub struct BrowserBridge {
    host: Arc<dyn ScriptHost>,
    browser_app: String,
    settle: Duration,
}

impl BrowserBridge {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            browser_app: DEFAULT_BROWSER.to_string(),
            settle: Duration::from_millis(150),
        }
    }

    pub fn browser_app(&self) -> &str {
        &self.browser_app
    }

    /// Delay between raising a tab and reading it in activated executions.
    pub fn settle(&self) -> Duration {
        self.settle
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Build the full program for one request.
    pub fn program(&self, service: &ServiceDescriptor, op: &BridgeOp) -> String {
        let request = Request {
            browser: &self.browser_app,
            url_pattern: service.url_pattern,
            title_pattern: service.title_pattern,
            op,
        };
        // Serializing plain strings and integers cannot fail.
        let json = serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string());
        format!("var req = {};\n{}", json, BRIDGE_PROGRAM)
    }

    /// Run one request. Bridge-side exceptions come back as `Host` errors;
    /// every other status is left for the caller to interpret.
    pub fn send(
        &self,
        service: &ServiceDescriptor,
        op: &BridgeOp,
    ) -> Result<BridgeReply, AutomationError> {
        let program = self.program(service, op);
        let raw = self.host.run(&program)?;
        let reply: BridgeReply = serde_json::from_str(raw.trim()).map_err(|e| {
            AutomationError::Host(format!("unreadable bridge reply ({}): {}", e, raw.trim()))
        })?;

        tracing::debug!(
            service = service.service_name,
            status = ?reply.status,
            location = ?reply.location,
            path = ?reply.path,
            "bridge reply"
        );

        if reply.status == ReplyStatus::Error {
            return Err(AutomationError::Host(
                reply.message.unwrap_or_else(|| "unknown bridge error".to_string()),
            ));
        }
        Ok(reply)
    }
}
