//! Generic page-script controller.

use std::sync::Arc;

use super::status::{
    CancelStatus, ComposerText, PageStatus, PrefillStatus, ReadyStatus, ResponseStatus,
    ResponseText, StartStatus, StopStatus, SubmitStatus,
};
use super::{chatgpt, gemini, ControllerResult, DictationController, Executed, Target};
use crate::browser::{
    BrowserBridge, Execution, ScriptExecutor, ServiceDescriptor, TabLocation, TabLocator,
};
use crate::data::ServiceName;
use crate::error::AutomationError;

/// Page operations. The name is stamped at the top of every script so the
/// page log (and test doubles) can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOp {
    IsPageReady,
    StartDictation,
    StopDictation,
    CancelDictation,
    GetTextAndClear,
    PrefillPrompt,
    SubmitMessage,
    IsResponseComplete,
    ExtractLastResponse,
}

impl PageOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageOp::IsPageReady => "is_page_ready",
            PageOp::StartDictation => "start_dictation",
            PageOp::StopDictation => "stop_dictation",
            PageOp::CancelDictation => "cancel_dictation",
            PageOp::GetTextAndClear => "get_text_and_clear",
            PageOp::PrefillPrompt => "prefill_prompt",
            PageOp::SubmitMessage => "submit_message",
            PageOp::IsResponseComplete => "is_response_complete",
            PageOp::ExtractLastResponse => "extract_last_response",
        }
    }
}

/// What differs between chat services: matching data, DOM lookups and the
/// stop/cancel procedures.
///
/// `helpers` must define `micButton()`, `composer()`, `sendButton()`,
/// `stopGeneratingButton()`, `isStreaming()` and `lastReply()`.
#[derive(Debug, Clone)]
pub struct ServiceProfile {
    pub service: ServiceName,
    pub descriptor: ServiceDescriptor,
    pub helpers: &'static str,
    pub stop_body: &'static str,
    /// `None` when the page has no cancel affordance.
    pub cancel_body: Option<&'static str>,
}

impl ServiceProfile {
    pub fn for_service(service: ServiceName) -> Self {
        match service {
            ServiceName::ChatGpt => chatgpt::profile(),
            ServiceName::Gemini => gemini::profile(),
        }
    }
}

// Shared page helpers. Selector lists are tried in order.
const PRELUDE: &str = r#"
function dbg(extra) {
    var info = 'url=' + location.href + ';title=' + document.title;
    return '|DBG=' + info + (extra ? ';' + extra : '');
}
function pick(selectors) {
    for (var i = 0; i < selectors.length; i++) {
        var el = document.querySelector(selectors[i]);
        if (el) { return el; }
    }
    return null;
}
function findButton(test) {
    return Array.from(document.querySelectorAll('button')).find(test) || null;
}
function label(el) {
    return (el.getAttribute('aria-label') || '').toLowerCase();
}
function count(selector) {
    return document.querySelectorAll(selector).length;
}
function isPlainInput(el) {
    return el.tagName === 'TEXTAREA' || el.tagName === 'INPUT';
}
function readEditor(el) {
    return isPlainInput(el) ? (el.value || '') : (el.innerText || el.textContent || '');
}
function notify(el) {
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
}
function clearEditor(el) {
    if (isPlainInput(el)) {
        el.value = '';
    } else {
        el.focus();
        document.execCommand('selectAll', false, null);
        document.execCommand('delete', false, null);
        while (el.firstChild) { el.removeChild(el.firstChild); }
    }
    notify(el);
}
function fillEditor(el, text) {
    el.focus();
    if (isPlainInput(el)) {
        el.value = text;
    } else {
        document.execCommand('selectAll', false, null);
        var inserted = document.execCommand('insertText', false, text);
        if (!inserted || readEditor(el).trim() !== text.trim()) { el.innerText = text; }
    }
    notify(el);
}
"#;

const READY_BODY: &str = r#"
if (document.readyState !== 'complete') { return 'PAGE_NOT_READY'; }
return micButton() ? 'READY' : 'BTN_NOT_FOUND' + dbg('buttons=' + count('button'));
"#;

const START_BODY: &str = r#"
var btn = micButton();
if (!btn) { return 'START_BTN_NOT_FOUND' + dbg('buttons=' + count('button')); }
btn.click();
return 'START_DONE';
"#;

const GET_TEXT_BODY: &str = r#"
try {
    var el = composer();
    if (!el) { return 'NOT_FOUND' + dbg('editors=' + count('[contenteditable="true"]')); }
    var text = readEditor(el).trim();
    if (!text) { return 'EMPTY' + dbg('focused=' + document.hasFocus()); }
    clearEditor(el);
    return 'TEXT:' + text;
} catch (e) {
    return 'ERROR:' + e.message;
}
"#;

const PREFILL_BODY: &str = r#"
try {
    var el = composer();
    if (!el) { return 'NOT_FOUND' + dbg('editors=' + count('[contenteditable="true"]')); }
    fillEditor(el, text);
    return 'SUCCESS';
} catch (e) {
    return 'ERROR:' + e.message;
}
"#;

const SUBMIT_BODY: &str = r#"
var btn = sendButton();
if (!btn) { return 'SEND_BTN_NOT_FOUND' + dbg('composer=' + (composer() ? 1 : 0)); }
if (btn.disabled || btn.getAttribute('aria-disabled') === 'true') { return 'SEND_BTN_DISABLED'; }
btn.click();
return 'SENT';
"#;

const COMPLETE_BODY: &str = r#"
if (stopGeneratingButton() || isStreaming()) { return 'GENERATING'; }
return lastReply() ? 'COMPLETE' : 'NO_RESPONSE';
"#;

const EXTRACT_BODY: &str = r#"
var node = lastReply();
if (!node) { return 'NO_RESPONSE'; }
var text = (node.innerText || node.textContent || '').trim();
return text ? 'TEXT:' + text : 'EMPTY_RESPONSE';
"#;

#[derive(Debug, Clone, Copy)]
enum Delivery {
    Direct,
    OpenIfMissing,
    Activated,
}

pub struct PageController {
    profile: ServiceProfile,
    executor: ScriptExecutor,
    locator: TabLocator,
}

impl PageController {
    pub fn new(bridge: Arc<BrowserBridge>, profile: ServiceProfile) -> Self {
        let executor = ScriptExecutor::new(bridge.clone(), profile.descriptor.clone());
        let locator = TabLocator::new(bridge, profile.descriptor.clone());
        Self {
            profile,
            executor,
            locator,
        }
    }

    /// Full page script for `op`: marker, shared prelude, service helpers, body.
    pub fn script(&self, op: PageOp, body: &str) -> String {
        format!(
            "/* micpipe:{} */\n(function () {{\n{}\n{}\n{}\n}})();",
            op.as_str(),
            PRELUDE,
            self.profile.helpers,
            body
        )
    }

    fn call<T: PageStatus>(
        &self,
        op: PageOp,
        body: &str,
        preferred: Option<TabLocation>,
        delivery: Delivery,
    ) -> ControllerResult<T> {
        let script = self.script(op, body);
        let execution = match delivery {
            Delivery::Direct => self.executor.execute(&script, preferred),
            Delivery::OpenIfMissing => self.executor.execute_or_open(&script, preferred),
            Delivery::Activated => self.executor.execute_activated(&script, preferred),
        }?;
        decode(op, execution)
    }
}

fn decode<T: PageStatus>(op: PageOp, execution: Execution) -> ControllerResult<T> {
    let Execution {
        location,
        path,
        payload,
    } = execution;
    let raw = payload
        .ok_or_else(|| AutomationError::UnexpectedReply(format!("{}: missing value", op.as_str())))?;
    tracing::debug!(op = op.as_str(), %location, ?path, reply = %raw, "page reply");
    Ok(Executed {
        status: T::parse(&raw)?,
        target: Some(Target { location, path }),
    })
}

impl DictationController for PageController {
    fn service(&self) -> ServiceName {
        self.profile.service
    }

    fn descriptor(&self) -> &ServiceDescriptor {
        &self.profile.descriptor
    }

    fn locator(&self) -> &TabLocator {
        &self.locator
    }

    fn supports_cancel(&self) -> bool {
        self.profile.cancel_body.is_some()
    }

    fn is_page_ready(&self, preferred: Option<TabLocation>) -> ControllerResult<ReadyStatus> {
        self.call(PageOp::IsPageReady, READY_BODY, preferred, Delivery::Direct)
    }

    fn start_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<StartStatus> {
        self.call(
            PageOp::StartDictation,
            START_BODY,
            preferred,
            Delivery::OpenIfMissing,
        )
    }

    fn stop_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<StopStatus> {
        self.call(
            PageOp::StopDictation,
            self.profile.stop_body,
            preferred,
            Delivery::Direct,
        )
    }

    fn cancel_dictation(&self, preferred: Option<TabLocation>) -> ControllerResult<CancelStatus> {
        match self.profile.cancel_body {
            Some(body) => self.call(PageOp::CancelDictation, body, preferred, Delivery::Direct),
            None => Ok(Executed {
                status: CancelStatus::NotSupported,
                target: None,
            }),
        }
    }

    fn get_text_and_clear(
        &self,
        activate_first: bool,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<ComposerText> {
        let delivery = if activate_first {
            Delivery::Activated
        } else {
            Delivery::Direct
        };
        self.call(PageOp::GetTextAndClear, GET_TEXT_BODY, preferred, delivery)
    }

    fn prefill_prompt(
        &self,
        text: &str,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<PrefillStatus> {
        // A JSON string literal is a valid JS string literal.
        let literal = serde_json::to_string(text)
            .map_err(|e| AutomationError::Host(format!("cannot encode prompt: {}", e)))?;
        let body = format!("var text = {};\n{}", literal, PREFILL_BODY);
        self.call(PageOp::PrefillPrompt, &body, preferred, Delivery::Direct)
    }

    fn submit_message(&self, preferred: Option<TabLocation>) -> ControllerResult<SubmitStatus> {
        self.call(PageOp::SubmitMessage, SUBMIT_BODY, preferred, Delivery::Direct)
    }

    fn is_response_complete(
        &self,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<ResponseStatus> {
        self.call(
            PageOp::IsResponseComplete,
            COMPLETE_BODY,
            preferred,
            Delivery::Direct,
        )
    }

    fn extract_last_response_text(
        &self,
        preferred: Option<TabLocation>,
    ) -> ControllerResult<ResponseText> {
        self.call(
            PageOp::ExtractLastResponse,
            EXTRACT_BODY,
            preferred,
            Delivery::Direct,
        )
    }
}
