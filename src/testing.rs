//! In-memory doubles for the browser and the OS capabilities.
//!
//! `FakeBrowser` interprets the same JSON requests the bridge program
//! receives, holds a small window/tab model and hands page scripts to
//! `FakePage`, which recognises them by their `/* micpipe:<op> */` marker.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::{BrowserBridge, ServiceDescriptor, TabLocation, WindowBounds};
use crate::data::ServiceName;
use crate::error::AutomationError;
use crate::platform::{
    ClipboardItem, FocusTracker, FrontApp, Notifier, Pasteboard, Platform, ScriptHost, SoundCue,
    SoundPlayer, TextAction, PLAIN_TEXT_TYPE,
};
use crate::services::ServiceProfile;

pub fn chatgpt_descriptor() -> ServiceDescriptor {
    ServiceProfile::for_service(ServiceName::ChatGpt).descriptor
}

/// Decode the request a bridge program carries on its first line.
pub fn request_from_program(program: &str) -> Value {
    let first = program.lines().next().unwrap_or_default();
    let json = first
        .trim()
        .strip_prefix("var req = ")
        .and_then(|rest| rest.strip_suffix(';'))
        .expect("program starts with a request line");
    serde_json::from_str(json).expect("request is JSON")
}

/// Host returning canned outputs in order.
pub struct ScriptedHost {
    outputs: Mutex<VecDeque<Result<String, AutomationError>>>,
}

impl ScriptedHost {
    pub fn new(outputs: Vec<Result<String, AutomationError>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
        }
    }
}

impl ScriptHost for ScriptedHost {
    fn run(&self, _program: &str) -> Result<String, AutomationError> {
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AutomationError::Host("no scripted output".into())))
    }
}

// ---------------------------------------------------------------------------
// Chat page
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PageState {
    loaded: bool,
    mic_present: bool,
    composer_present: bool,
    send_present: bool,
    /// Composer text only becomes readable while the tab is raised.
    needs_focus: bool,
    /// `PAGE_NOT_READY` answers left before the page counts as loaded.
    loading_polls: usize,
    recording: bool,
    composer: String,
    transcript: String,
    transcript_delay: usize,
    pending: Option<String>,
    pending_polls: usize,
    stop_reply: Option<String>,
    response_sequence: Vec<String>,
    response_polls: usize,
    reply: Option<String>,
    submitted: Vec<String>,
    activations: usize,
    calls: Vec<String>,
}

/// Shared handle to an emulated chat page.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    /// A page that belongs to no chat service.
    pub fn blank() -> Self {
        let page = Self::default();
        page.state.lock().unwrap().loaded = true;
        page
    }

    /// Loaded, logged in, every control present.
    pub fn ready() -> Self {
        let page = Self::blank();
        {
            let mut s = page.state.lock().unwrap();
            s.mic_present = true;
            s.composer_present = true;
            s.send_present = true;
        }
        page
    }

    /// Ready after answering `PAGE_NOT_READY` `polls` times.
    pub fn loading(polls: usize) -> Self {
        let page = Self::ready();
        page.state.lock().unwrap().loading_polls = polls;
        page
    }

    /// Loaded but without the microphone control.
    pub fn logged_out() -> Self {
        let page = Self::ready();
        page.state.lock().unwrap().mic_present = false;
        page
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.state.lock().unwrap().loaded = loaded;
    }

    pub fn set_mic_present(&self, present: bool) {
        self.state.lock().unwrap().mic_present = present;
    }

    pub fn set_composer_present(&self, present: bool) {
        self.state.lock().unwrap().composer_present = present;
    }

    pub fn set_send_present(&self, present: bool) {
        self.state.lock().unwrap().send_present = present;
    }

    pub fn set_needs_focus(&self, needs_focus: bool) {
        self.state.lock().unwrap().needs_focus = needs_focus;
    }

    pub fn set_recording(&self, recording: bool) {
        self.state.lock().unwrap().recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().unwrap().recording
    }

    pub fn set_composer(&self, text: &str) {
        self.state.lock().unwrap().composer = text.to_string();
    }

    pub fn composer(&self) -> String {
        self.state.lock().unwrap().composer.clone()
    }

    /// Text that lands in the composer once dictation stops.
    pub fn set_transcript(&self, text: &str) {
        self.state.lock().unwrap().transcript = text.to_string();
    }

    /// Number of reads that still see an empty composer after stopping.
    pub fn set_transcript_delay(&self, reads: usize) {
        self.state.lock().unwrap().transcript_delay = reads;
    }

    pub fn set_stop_reply(&self, reply: &str) {
        self.state.lock().unwrap().stop_reply = Some(reply.to_string());
    }

    /// Completion answers after a submit; the last one repeats.
    pub fn set_response_sequence(&self, tags: &[&str]) {
        let mut s = self.state.lock().unwrap();
        s.response_sequence = tags.iter().map(|t| t.to_string()).collect();
        s.response_polls = 0;
    }

    pub fn set_reply(&self, text: &str) {
        self.state.lock().unwrap().reply = Some(text.to_string());
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn activations(&self) -> usize {
        self.state.lock().unwrap().activations
    }

    /// Page operations in the order they ran.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    fn evaluate(&self, script: &str, focused: bool) -> Option<String> {
        let op = script
            .trim_start()
            .strip_prefix("/* micpipe:")
            .and_then(|rest| rest.split_once(" */"))
            .map(|(op, _)| op.to_string())?;

        let mut guard = self.state.lock().unwrap();
        let s = &mut *guard;
        s.calls.push(op.clone());
        if focused {
            s.activations += 1;
        }

        let reply = match op.as_str() {
            "is_page_ready" => {
                if s.loading_polls > 0 {
                    s.loading_polls -= 1;
                    "PAGE_NOT_READY".to_string()
                } else if !s.loaded {
                    "PAGE_NOT_READY".to_string()
                } else if s.mic_present {
                    "READY".to_string()
                } else {
                    "BTN_NOT_FOUND|DBG=mic=0".to_string()
                }
            }
            "start_dictation" => {
                if s.loaded && s.mic_present {
                    s.recording = true;
                    "START_DONE".to_string()
                } else {
                    "START_BTN_NOT_FOUND|DBG=mic=0".to_string()
                }
            }
            "stop_dictation" => {
                let was_recording = s.recording;
                s.recording = false;
                if was_recording {
                    s.pending = Some(s.transcript.clone());
                    s.pending_polls = s.transcript_delay;
                }
                match (&s.stop_reply, was_recording) {
                    (Some(reply), _) => reply.clone(),
                    (None, true) => "SUBMIT_CLICKED".to_string(),
                    (None, false) => "SUBMIT_BTN_NOT_FOUND|DBG=recording=0".to_string(),
                }
            }
            "cancel_dictation" => {
                if s.recording {
                    s.recording = false;
                    s.pending = None;
                    "CANCEL_DONE".to_string()
                } else {
                    "CANCEL_BTN_NOT_FOUND|DBG=recording=0".to_string()
                }
            }
            "get_text_and_clear" => {
                if s.pending.is_some() {
                    if s.pending_polls > 0 {
                        s.pending_polls -= 1;
                    } else if let Some(text) = s.pending.take() {
                        s.composer.push_str(&text);
                    }
                }
                if !s.composer_present {
                    "NOT_FOUND|DBG=composer=0".to_string()
                } else if s.needs_focus && !focused {
                    "EMPTY|DBG=hidden".to_string()
                } else {
                    let text = s.composer.trim().to_string();
                    if text.is_empty() {
                        "EMPTY".to_string()
                    } else {
                        s.composer.clear();
                        format!("TEXT:{}", text)
                    }
                }
            }
            "prefill_prompt" => {
                let text = prefill_text(script);
                if !s.composer_present {
                    "NOT_FOUND|DBG=composer=0".to_string()
                } else {
                    s.composer = text;
                    "SUCCESS".to_string()
                }
            }
            "submit_message" => {
                if !s.send_present {
                    "SEND_BTN_NOT_FOUND|DBG=composer=1".to_string()
                } else if s.composer.trim().is_empty() {
                    "SEND_BTN_DISABLED".to_string()
                } else {
                    let sent = std::mem::take(&mut s.composer);
                    s.submitted.push(sent);
                    s.response_polls = 0;
                    "SENT".to_string()
                }
            }
            "is_response_complete" => {
                if s.response_sequence.is_empty() {
                    let tag = if s.reply.is_some() { "COMPLETE" } else { "NO_RESPONSE" };
                    tag.to_string()
                } else {
                    let i = s.response_polls.min(s.response_sequence.len() - 1);
                    s.response_polls += 1;
                    s.response_sequence[i].clone()
                }
            }
            "extract_last_response" => match &s.reply {
                None => "NO_RESPONSE".to_string(),
                Some(text) if text.trim().is_empty() => "EMPTY_RESPONSE".to_string(),
                Some(text) => format!("TEXT:{}", text),
            },
            _ => return None,
        };
        Some(reply)
    }
}

fn prefill_text(script: &str) -> String {
    script
        .lines()
        .find_map(|line| line.trim().strip_prefix("var text = "))
        .and_then(|rest| rest.strip_suffix(';'))
        .and_then(|literal| serde_json::from_str(literal).ok())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct FakeTab {
    url: String,
    title: String,
    page: FakePage,
}

#[derive(Debug)]
struct FakeWindow {
    id: i64,
    bounds: Option<WindowBounds>,
    /// 1-based.
    active_tab: usize,
    tabs: Vec<FakeTab>,
}

#[derive(Debug, Default)]
struct BrowserModel {
    /// Front window first.
    windows: Vec<FakeWindow>,
    next_id: i64,
    requests: Vec<Value>,
    offline: bool,
    next_pages: VecDeque<FakePage>,
}

fn status(tag: &str) -> Value {
    json!({ "status": tag })
}

impl BrowserModel {
    fn matches(req: &Value, tab: &FakeTab) -> bool {
        let url = req["urlPattern"].as_str().unwrap_or_default();
        let title = req["titlePattern"].as_str().unwrap_or_default();
        tab.url.contains(url) || tab.title.contains(title)
    }

    fn location(&self, w: usize, t: usize) -> Value {
        json!({ "windowId": self.windows[w].id, "tabIndex": t + 1 })
    }

    fn find(&self, id: i64) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    fn scan(&self, req: &Value) -> Option<(usize, usize)> {
        self.windows.iter().enumerate().find_map(|(w, win)| {
            win.tabs
                .iter()
                .position(|tab| Self::matches(req, tab))
                .map(|t| (w, t))
        })
    }

    fn resolve(&self, req: &Value, loc: &Value) -> Option<(usize, usize)> {
        let id = loc.get("windowId")?.as_i64()?;
        let index = loc.get("tabIndex")?.as_i64()?;
        if id <= 0 || index <= 0 {
            return None;
        }
        let w = self.find(id)?;
        let t = usize::try_from(index - 1).ok()?;
        let tab = self.windows[w].tabs.get(t)?;
        Self::matches(req, tab).then_some((w, t))
    }

    fn new_page(&mut self) -> FakePage {
        self.next_pages.pop_front().unwrap_or_else(FakePage::ready)
    }

    fn open_window(&mut self, url: &str, bounds: Option<WindowBounds>) -> i64 {
        self.next_id += 1;
        let id = 1000 + self.next_id;
        let page = self.new_page();
        self.windows.insert(
            0,
            FakeWindow {
                id,
                bounds,
                active_tab: 1,
                tabs: vec![FakeTab {
                    url: url.to_string(),
                    title: String::new(),
                    page,
                }],
            },
        );
        id
    }

    fn open_service(&mut self, url: &str) -> Value {
        if self.windows.is_empty() {
            self.open_window(url, None);
            return status("OPENING_NEW_WINDOW");
        }
        let page = self.new_page();
        let front = &mut self.windows[0];
        front.tabs.push(FakeTab {
            url: url.to_string(),
            title: String::new(),
            page,
        });
        front.active_tab = front.tabs.len();
        status("OPENING_NEW_TAB")
    }

    fn run_script(&self, req: &Value, w: usize, t: usize, focused: bool) -> Option<String> {
        let encoded = req["script"].as_str().unwrap_or_default();
        let bytes = STANDARD.decode(encoded).expect("script is base64");
        let script = String::from_utf8(bytes).expect("script is UTF-8");
        self.windows[w].tabs[t].page.evaluate(&script, focused)
    }

    fn executed(&self, w: usize, t: usize, path: &str, payload: Option<String>) -> Value {
        json!({
            "status": "OK",
            "location": self.location(w, t),
            "path": path,
            "payload": payload,
        })
    }

    fn handle(&mut self, req: &Value) -> Value {
        let op = req["op"].as_str().unwrap_or_default();
        match op {
            "locate_any" => match self.scan(req) {
                Some((w, t)) => json!({ "status": "OK", "location": self.location(w, t) }),
                None => status("NOT_FOUND"),
            },
            "locate_front" => {
                if self.windows.is_empty() {
                    return status("NO_WINDOW");
                }
                let t = self.windows[0].active_tab - 1;
                if Self::matches(req, &self.windows[0].tabs[t]) {
                    json!({ "status": "OK", "location": self.location(0, t) })
                } else {
                    status("NOT_FOUND")
                }
            }
            "validate" => match self.resolve(req, &req["location"]) {
                Some((w, t)) => json!({ "status": "OK", "location": self.location(w, t) }),
                None => status("NOT_FOUND"),
            },
            "create_window" => {
                let bounds = serde_json::from_value(req["bounds"].clone()).ok();
                let url = req["url"].as_str().unwrap_or_default().to_string();
                let id = self.open_window(&url, bounds);
                json!({ "status": "OK", "location": { "windowId": id, "tabIndex": 1 } })
            }
            "reposition" => {
                let Some(w) = req["windowId"].as_i64().and_then(|id| self.find(id)) else {
                    return status("NOT_FOUND");
                };
                self.windows[w].bounds = serde_json::from_value(req["bounds"].clone()).ok();
                if req["activate"].as_bool().unwrap_or(false) {
                    let win = self.windows.remove(w);
                    self.windows.insert(0, win);
                }
                status("OK")
            }
            "demote" => {
                let count = self.windows.len();
                let Some(w) = req["windowId"].as_i64().and_then(|id| self.find(id)) else {
                    return status("NOT_FOUND");
                };
                if count < 2 {
                    return json!({ "status": "OK", "payload": "SINGLE_WINDOW" });
                }
                let win = self.windows.remove(w);
                self.windows.push(win);
                json!({ "status": "OK", "payload": "DEMOTED" })
            }
            "execute" => {
                let open_url = req["openUrl"].as_str().map(str::to_string);
                if self.windows.is_empty() {
                    return match open_url {
                        Some(url) => self.open_service(&url),
                        None => status("NO_WINDOW"),
                    };
                }
                if let Some((w, t)) = self.resolve(req, &req["preferred"]) {
                    let payload = self.run_script(req, w, t, false);
                    return self.executed(w, t, "PREFERRED", payload);
                }
                if let Some((w, t)) = self.scan(req) {
                    let payload = self.run_script(req, w, t, false);
                    return self.executed(w, t, "FALLBACK", payload);
                }
                match open_url {
                    Some(url) => self.open_service(&url),
                    None => status("NOT_FOUND"),
                }
            }
            "execute_activated" => {
                if self.windows.is_empty() {
                    return status("NO_WINDOW");
                }
                let front_id = self.windows[0].id;
                let front_tab = self.windows[0].active_tab;

                let (found, path) = match self.resolve(req, &req["preferred"]) {
                    Some(found) => (Some(found), "PREFERRED"),
                    None => (self.scan(req), "FALLBACK"),
                };
                let Some((w, t)) = found else {
                    return status("NOT_FOUND");
                };

                let mut win = self.windows.remove(w);
                win.active_tab = t + 1;
                self.windows.insert(0, win);
                let payload = self.run_script(req, 0, t, true);
                let reply = self.executed(0, t, path, payload);

                if let Some(orig) = self.find(front_id) {
                    let mut win = self.windows.remove(orig);
                    win.active_tab = front_tab;
                    self.windows.insert(0, win);
                }
                reply
            }
            other => json!({ "status": "ERROR", "message": format!("unknown op {}", other) }),
        }
    }
}

/// Scriptable browser model behind a `ScriptHost`.
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    model: Arc<Mutex<BrowserModel>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge talking to this browser, with no settle delay.
    pub fn bridge(&self) -> BrowserBridge {
        BrowserBridge::new(Arc::new(self.clone())).with_settle(Duration::ZERO)
    }

    /// Append a window behind the existing ones. Its first tab is active.
    pub fn add_window(&self, id: i64, tabs: Vec<(&str, &str, FakePage)>) {
        let tabs = tabs
            .into_iter()
            .map(|(url, title, page)| FakeTab {
                url: url.to_string(),
                title: title.to_string(),
                page,
            })
            .collect();
        self.model.lock().unwrap().windows.push(FakeWindow {
            id,
            bounds: None,
            active_tab: 1,
            tabs,
        });
    }

    /// Page used for the next window or tab the browser opens itself.
    pub fn set_next_page(&self, page: FakePage) {
        self.model.lock().unwrap().next_pages.push_back(page);
    }

    pub fn set_active_tab(&self, window_id: i64, tab_index: usize) {
        let mut model = self.model.lock().unwrap();
        if let Some(w) = model.find(window_id) {
            model.windows[w].active_tab = tab_index;
        }
    }

    pub fn navigate(&self, window_id: i64, tab_index: usize, url: &str, title: &str) {
        let mut model = self.model.lock().unwrap();
        if let Some(w) = model.find(window_id) {
            if let Some(tab) = model.windows[w].tabs.get_mut(tab_index - 1) {
                tab.url = url.to_string();
                tab.title = title.to_string();
                tab.page = FakePage::blank();
            }
        }
    }

    /// Navigate the front window's active tab.
    pub fn navigate_front(&self, url: &str, title: &str) {
        let (id, tab) = {
            let model = self.model.lock().unwrap();
            let front = &model.windows[0];
            (front.id, front.active_tab)
        };
        self.navigate(id, tab, url, title);
    }

    pub fn front_window_id(&self) -> Option<i64> {
        self.model.lock().unwrap().windows.first().map(|w| w.id)
    }

    pub fn window_bounds(&self, window_id: i64) -> Option<WindowBounds> {
        let model = self.model.lock().unwrap();
        model.find(window_id).and_then(|w| model.windows[w].bounds)
    }

    pub fn window_count(&self) -> usize {
        self.model.lock().unwrap().windows.len()
    }

    pub fn page_at(&self, location: TabLocation) -> Option<FakePage> {
        let model = self.model.lock().unwrap();
        let w = model.find(location.window_id)?;
        let t = usize::try_from(location.tab_index - 1).ok()?;
        model.windows[w].tabs.get(t).map(|tab| tab.page.clone())
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<Value> {
        self.model.lock().unwrap().requests.clone()
    }

    /// Operation names of every request received.
    pub fn ops(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["op"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Make the automation host fail every call.
    pub fn set_offline(&self, offline: bool) {
        self.model.lock().unwrap().offline = offline;
    }
}

impl ScriptHost for FakeBrowser {
    fn run(&self, program: &str) -> Result<String, AutomationError> {
        let req = request_from_program(program);
        let mut model = self.model.lock().unwrap();
        model.requests.push(req.clone());
        if model.offline {
            return Err(AutomationError::Host("osascript exited with status 1".into()));
        }
        Ok(model.handle(&req).to_string())
    }
}

// ---------------------------------------------------------------------------
// OS capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakePasteboard {
    items: Mutex<Vec<ClipboardItem>>,
    rejected: Mutex<Vec<String>>,
}

impl FakePasteboard {
    pub fn with_text(text: &str) -> Self {
        let pb = Self::default();
        *pb.items.lock().unwrap() = vec![plain(text)];
        pb
    }

    pub fn with_items(items: Vec<ClipboardItem>) -> Self {
        let pb = Self::default();
        *pb.items.lock().unwrap() = items;
        pb
    }

    /// Representations of this kind refuse to be written back.
    pub fn reject_kind(&self, kind: &str) {
        self.rejected.lock().unwrap().push(kind.to_string());
    }

    pub fn text(&self) -> Option<String> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.kind == PLAIN_TEXT_TYPE)
            .map(|i| String::from_utf8_lossy(&i.data).into_owned())
    }

    pub fn snapshot(&self) -> Vec<ClipboardItem> {
        self.items.lock().unwrap().clone()
    }
}

pub fn plain(text: &str) -> ClipboardItem {
    ClipboardItem {
        item: 0,
        kind: PLAIN_TEXT_TYPE.to_string(),
        data: text.as_bytes().to_vec(),
    }
}

impl Pasteboard for FakePasteboard {
    fn items(&self) -> Vec<ClipboardItem> {
        self.snapshot()
    }

    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        *self.items.lock().unwrap() = vec![plain(text)];
        Ok(())
    }

    fn write_items(&self, items: &[ClipboardItem]) -> usize {
        let rejected = self.rejected.lock().unwrap().clone();
        let accepted: Vec<ClipboardItem> = items
            .iter()
            .filter(|i| !rejected.contains(&i.kind))
            .cloned()
            .collect();
        let count = accepted.len();
        *self.items.lock().unwrap() = accepted;
        count
    }
}

/// Records the clipboard text present at each paste keystroke.
pub struct FakeKeyboard {
    pasteboard: Arc<FakePasteboard>,
    pasted: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl FakeKeyboard {
    pub fn new(pasteboard: Arc<FakePasteboard>) -> Self {
        Self {
            pasteboard,
            pasted: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn pasted(&self) -> Vec<String> {
        self.pasted.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TextAction for FakeKeyboard {
    fn send_paste(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("event source unavailable");
        }
        let text = self.pasteboard.text().unwrap_or_default();
        self.pasted.lock().unwrap().push(text);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeFocus {
    front: Mutex<Option<FrontApp>>,
    activated: Mutex<Vec<FrontApp>>,
}

impl FakeFocus {
    pub fn set_front(&self, bundle_id: &str, pid: i32) {
        *self.front.lock().unwrap() = Some(FrontApp {
            pid,
            bundle_id: Some(bundle_id.to_string()),
        });
    }

    pub fn activated(&self) -> Vec<FrontApp> {
        self.activated.lock().unwrap().clone()
    }
}

impl FocusTracker for FakeFocus {
    fn frontmost(&self) -> Option<FrontApp> {
        self.front.lock().unwrap().clone()
    }

    fn activate(&self, app: &FrontApp) -> bool {
        self.activated.lock().unwrap().push(app.clone());
        *self.front.lock().unwrap() = Some(app.clone());
        true
    }
}

#[derive(Debug, Default)]
pub struct FakeNotifier {
    notes: Mutex<Vec<(String, String)>>,
    alerts: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    pub fn notes(&self) -> Vec<(String, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.notes
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct FakeSound {
    played: Mutex<Vec<SoundCue>>,
}

impl FakeSound {
    pub fn played(&self) -> Vec<SoundCue> {
        self.played.lock().unwrap().clone()
    }
}

impl SoundPlayer for FakeSound {
    fn play(&self, cue: SoundCue) {
        self.played.lock().unwrap().push(cue);
    }
}

/// Every OS double plus a browser, wired into a `Platform`.
pub struct FakeOs {
    pub browser: FakeBrowser,
    pub pasteboard: Arc<FakePasteboard>,
    pub keyboard: Arc<FakeKeyboard>,
    pub focus: Arc<FakeFocus>,
    pub notifier: Arc<FakeNotifier>,
    pub sound: Arc<FakeSound>,
}

impl FakeOs {
    pub fn new(clipboard_text: &str) -> Self {
        let pasteboard = Arc::new(FakePasteboard::with_text(clipboard_text));
        Self {
            browser: FakeBrowser::new(),
            keyboard: Arc::new(FakeKeyboard::new(pasteboard.clone())),
            pasteboard,
            focus: Arc::new(FakeFocus::default()),
            notifier: Arc::new(FakeNotifier::default()),
            sound: Arc::new(FakeSound::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            script_host: Arc::new(self.browser.clone()),
            pasteboard: self.pasteboard.clone(),
            text_action: self.keyboard.clone(),
            focus: self.focus.clone(),
            notifier: self.notifier.clone(),
            sound: self.sound.clone(),
        }
    }
}
