//! Browser automation: tab addressing, the JXA bridge, lookup and execution.

mod bridge;
mod executor;
mod location;
mod locator;

pub use bridge::{BridgeOp, BridgeReply, BrowserBridge, ExecPath, ReplyStatus, DEFAULT_BROWSER};
pub use executor::{Execution, ScriptExecutor};
pub use location::{ServiceDescriptor, TabLocation, WindowBounds};
pub use locator::TabLocator;
