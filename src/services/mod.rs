//! Chat service controllers
//!
//! One contract, [`DictationController`], with a single page-script
//! implementation driven by per-service [`ServiceProfile`] data.

mod chatgpt;
mod controller;
mod gemini;
mod status;

use std::sync::Arc;

use crate::browser::{BrowserBridge, ExecPath, ServiceDescriptor, TabLocation, TabLocator};
use crate::data::ServiceName;
use crate::error::AutomationError;

pub use controller::{PageController, PageOp, ServiceProfile};
pub use status::{
    CancelStatus, ComposerText, PageStatus, PrefillStatus, ReadyStatus, ResponseStatus,
    ResponseText, StartStatus, StopStatus, SubmitStatus,
};

/// The tab that actually answered a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub location: TabLocation,
    pub path: ExecPath,
}

/// A page status plus where it came from. `target` is `None` for answers
/// produced without touching the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed<T> {
    pub status: T,
    pub target: Option<Target>,
}

impl<T> Executed<T> {
    pub fn location(&self) -> Option<TabLocation> {
        self.target.map(|t| t.location)
    }
}

pub type ControllerResult<T> = Result<Executed<T>, AutomationError>;

/// Drives one chat service's page.
///
/// Every operation takes the last known tab location; an unresolved or
/// stale location falls back to scanning for the service's tab.
pub trait DictationController: Send + Sync {
    fn service(&self) -> ServiceName;

    fn descriptor(&self) -> &ServiceDescriptor;

    fn locator(&self) -> &TabLocator;

    /// Whether a cancel control exists at all.
    fn supports_cancel(&self) -> bool;

    fn is_page_ready(&self, preferred: Option<TabLocation>) -> ControllerResult<ReadyStatus>;

    fn start_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<StartStatus>;

    fn stop_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<StopStatus>;

    fn cancel_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<CancelStatus>;

    /// Read the composer and clear it in the same page turn.
    fn get_text_and_clear(
        &self,
        activate_first: bool,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<ComposerText>;

    fn prefill_prompt(
        &self,
        text: &str,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<PrefillStatus>;

    fn submit_message(&self, preferred: Option<TabLocation>) -> ControllerResult<SubmitStatus>;

    fn is_response_complete(&self, preferred: Option<TabLocation>)
        -> ControllerResult<ResponseStatus>;

    fn extract_last_response_text(
        &self,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<ResponseText>;
}

/// Build the controller for `service`.
pub fn controller_for(
    bridge: Arc<BrowserBridge>,
    service: ServiceName,
) -> Arc<dyn DictationController> {
    Arc::new(PageController::new(bridge, ServiceProfile::for_service(service)))
}
