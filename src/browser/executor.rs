//! Script Executor
//!
//! Runs a page script inside the service tab and reports which tab
//! actually answered.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use super::bridge::{BridgeOp, BrowserBridge, BridgeReply, ExecPath, ReplyStatus};
use super::location::{ServiceDescriptor, TabLocation};
use crate::error::AutomationError;

/// Outcome of one successful page execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// The tab that ran the script. Callers should cache this.
    pub location: TabLocation,
    pub path: ExecPath,
    /// Raw page result; `None` when the script evaluated to nothing.
    pub payload: Option<String>,
}

pub struct ScriptExecutor {
    bridge: Arc<BrowserBridge>,
    descriptor: ServiceDescriptor,
}

impl ScriptExecutor {
    pub fn new(bridge: Arc<BrowserBridge>, descriptor: ServiceDescriptor) -> Self {
        Self { bridge, descriptor }
    }

    /// Execute in the preferred tab, falling back to the first matching tab.
    pub fn execute(
        &self,
        script: &str,
        preferred: Option<TabLocation>,
    ) -> Result<Execution, AutomationError> {
        self.run(BridgeOp::Execute {
            preferred: usable(preferred),
            script: encode(script),
            open_url: None,
        })
    }

    /// Like [`execute`](Self::execute), but opens the service when no tab
    /// matches. The caller gets `Opening` and must retry once the page loads.
    pub fn execute_or_open(
        &self,
        script: &str,
        preferred: Option<TabLocation>,
    ) -> Result<Execution, AutomationError> {
        self.run(BridgeOp::Execute {
            preferred: usable(preferred),
            script: encode(script),
            open_url: Some(self.descriptor.default_url.to_string()),
        })
    }

    /// Raise the target tab, execute, then give the front window and tab
    /// back to whatever held them before.
    pub fn execute_activated(
        &self,
        script: &str,
        preferred: Option<TabLocation>,
    ) -> Result<Execution, AutomationError> {
        self.run(BridgeOp::ExecuteActivated {
            preferred: usable(preferred),
            script: encode(script),
            settle: self.bridge.settle().as_secs_f64(),
        })
    }

    fn run(&self, op: BridgeOp) -> Result<Execution, AutomationError> {
        let reply = self.bridge.send(&self.descriptor, &op)?;
        into_execution(reply)
    }
}

fn usable(preferred: Option<TabLocation>) -> Option<TabLocation> {
    match preferred {
        Some(loc) if loc.is_valid() => Some(loc),
        Some(loc) => {
            tracing::debug!(%loc, "Ignoring unresolved preferred location");
            None
        }
        None => None,
    }
}

fn encode(script: &str) -> String {
    STANDARD.encode(script.as_bytes())
}

fn into_execution(reply: BridgeReply) -> Result<Execution, AutomationError> {
    match reply.status {
        ReplyStatus::Ok => {
            let location = reply
                .location
                .filter(TabLocation::is_valid)
                .ok_or_else(|| {
                    AutomationError::UnexpectedReply("execution reply without location".into())
                })?;
            Ok(Execution {
                location,
                path: reply.path.unwrap_or(ExecPath::Fallback),
                payload: reply.payload,
            })
        }
        ReplyStatus::NotFound => Err(AutomationError::TabNotFound),
        ReplyStatus::NoWindow => Err(AutomationError::NoWindow),
        ReplyStatus::OpeningNewWindow => Err(AutomationError::Opening { new_window: true }),
        ReplyStatus::OpeningNewTab => Err(AutomationError::Opening { new_window: false }),
        ReplyStatus::Error => Err(AutomationError::Host(
            reply.message.unwrap_or_default(),
        )),
    }
}
