//! Dictation Session
//!
//! Coordinates one dictation lifecycle at a time: hotkey edges drive the
//! chat page through start, stop, retrieval and paste, with optional
//! pipe-through of the transcript to the assistant.
//!
//! Every method blocks; callers run them on worker threads.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

use super::clipboard_guard::ClipboardGuard;
use super::hotkey_manager::HotkeyEvent;
use super::poller::{poll, Backoff, PollError};
use super::state::{DictationState, StateMachine};
use super::text_inserter::TextInserter;
use crate::browser::{BrowserBridge, TabLocation, WindowBounds};
use crate::data::{PersistedConfig, PromptSlot, ServiceName, StateStore, PROMPT_SLOT_COUNT};
use crate::error::AutomationError;
use crate::platform::{FrontApp, Platform, SoundCue};
use crate::services::{
    controller_for, CancelStatus, ComposerText, DictationController, PrefillStatus, ReadyStatus,
    ResponseStatus, ResponseText, StartStatus, SubmitStatus,
};

/// Bundle id of the browser whose front tab enables in-context mode.
const BROWSER_BUNDLE_ID: &str = "com.google.Chrome";

/// Wait budgets and pauses used across a lifecycle.
#[derive(Debug, Clone)]
pub struct Timings {
    pub page_wait: Backoff,
    /// Consecutive `BTN_NOT_FOUND` answers that mean "logged out".
    pub login_threshold: usize,
    pub retrieval: Backoff,
    pub response_wait: Backoff,
    /// Consecutive `COMPLETE` answers required before extracting a reply.
    pub completion_streak: usize,
    /// Polls after which `COMPLETE` counts even if generation was never seen.
    pub completion_grace: usize,
    pub focus_settle: Duration,
    pub focus_restore: Duration,
    pub paste_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        let secs = Duration::from_secs_f64;
        Self {
            page_wait: Backoff::fixed(secs(0.5), secs(15.0)),
            login_threshold: 6,
            retrieval: Backoff::schedule(vec![secs(1.0), secs(0.5), secs(0.5), secs(1.0), secs(1.0)]),
            response_wait: Backoff::fixed(secs(1.0), secs(60.0)),
            completion_streak: 2,
            completion_grace: 3,
            focus_settle: Duration::from_millis(200),
            focus_restore: Duration::from_millis(100),
            paste_settle: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
impl Timings {
    /// Same budgets, no sleeping.
    pub fn instant() -> Self {
        Self {
            page_wait: Backoff::attempts(Duration::ZERO, 30),
            retrieval: Backoff::attempts(Duration::ZERO, 5),
            response_wait: Backoff::attempts(Duration::ZERO, 20),
            focus_settle: Duration::ZERO,
            focus_restore: Duration::ZERO,
            paste_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Why a transcript could not be turned into an assistant reply.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("could not fill the composer: {0}")]
    Prefill(String),
    #[error("could not send the prompt: {0}")]
    Submit(String),
    #[error("no reply after {attempts} checks")]
    Timeout { attempts: usize },
    #[error("the reply could not be read: {0}")]
    Extract(String),
    #[error(transparent)]
    Automation(#[from] AutomationError),
}

/// The dedicated window after making sure it exists.
#[derive(Debug, Clone, Copy)]
struct DedicatedWindow {
    location: TabLocation,
    created: bool,
}

/// What the current lifecycle was started against.
#[derive(Debug, Clone)]
struct Lifecycle {
    service: ServiceName,
    target_app: Option<FrontApp>,
    /// Started from the service's own tab; the transcript stays there.
    in_context: bool,
    location: Option<TabLocation>,
}

enum WaitOutcome {
    Ready,
    LoginRequired(String),
}

struct Controllers {
    chatgpt: Arc<dyn DictationController>,
    gemini: Arc<dyn DictationController>,
}

impl Controllers {
    fn new(bridge: Arc<BrowserBridge>) -> Self {
        Self {
            chatgpt: controller_for(bridge.clone(), ServiceName::ChatGpt),
            gemini: controller_for(bridge, ServiceName::Gemini),
        }
    }

    fn get(&self, service: ServiceName) -> Arc<dyn DictationController> {
        match service {
            ServiceName::ChatGpt => self.chatgpt.clone(),
            ServiceName::Gemini => self.gemini.clone(),
        }
    }
}

/// Clears an in-flight flag when the start sequence ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct DictationSession {
    platform: Platform,
    controllers: Controllers,
    store: StateStore,
    config: Mutex<PersistedConfig>,
    state: StateMachine,
    timings: Timings,
    inserter: TextInserter,
    debug: bool,
    /// A start sequence is running, possibly waiting for the page.
    starting: AtomicBool,
    /// Cleared to abandon the page wait.
    should_auto_start: AtomicBool,
    trigger_held: AtomicBool,
    lifecycle: Mutex<Option<Lifecycle>>,
    /// Runs once, right after the next return to IDLE.
    #[cfg(test)]
    on_idle: Mutex<Option<Box<dyn FnOnce(&DictationSession) + Send>>>,
}

impl DictationSession {
    pub fn new(platform: Platform, store: StateStore, config: PersistedConfig) -> Self {
        let bridge = Arc::new(BrowserBridge::new(platform.script_host.clone()));
        Self::with_bridge(platform, bridge, store, config)
    }

    pub fn with_bridge(
        platform: Platform,
        bridge: Arc<BrowserBridge>,
        store: StateStore,
        config: PersistedConfig,
    ) -> Self {
        let timings = Timings::default();
        let inserter =
            TextInserter::new(platform.text_action.clone()).with_settle(timings.paste_settle);
        Self {
            controllers: Controllers::new(bridge),
            platform,
            store,
            config: Mutex::new(config),
            state: StateMachine::new(),
            timings,
            inserter,
            debug: false,
            starting: AtomicBool::new(false),
            should_auto_start: AtomicBool::new(false),
            trigger_held: AtomicBool::new(false),
            lifecycle: Mutex::new(None),
            #[cfg(test)]
            on_idle: Mutex::new(None),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.inserter =
            TextInserter::new(self.platform.text_action.clone()).with_settle(timings.paste_settle);
        self.timings = timings;
        self
    }

    /// Debug mode keeps the automation window on screen.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn state(&self) -> DictationState {
        self.state.current()
    }

    pub fn config(&self) -> PersistedConfig {
        lock(&self.config).clone()
    }

    pub fn current_service(&self) -> ServiceName {
        lock(&self.config).current_service
    }

    fn controller(&self, service: ServiceName) -> Arc<dyn DictationController> {
        self.controllers.get(service)
    }

    fn update_config(&self, change: impl FnOnce(&mut PersistedConfig)) {
        let mut config = lock(&self.config);
        change(&mut config);
        self.store.save(&config);
    }

    fn lifecycle(&self) -> Lifecycle {
        lock(&self.lifecycle).clone().unwrap_or_else(|| Lifecycle {
            service: self.current_service(),
            target_app: None,
            in_context: false,
            location: None,
        })
    }

    fn remember_location(&self, location: Option<TabLocation>) {
        if let (Some(location), Some(lifecycle)) = (location, lock(&self.lifecycle).as_mut()) {
            if lifecycle.location != Some(location) {
                tracing::debug!(%location, "Service tab moved");
                lifecycle.location = Some(location);
            }
        }
    }

    fn play(&self, cue: SoundCue) {
        if lock(&self.config).sound_enabled {
            self.platform.sound.play(cue);
        }
    }

    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(title, "{}", message);
        self.platform.notifier.notify(title, message);
    }

    fn restore_focus(&self, lifecycle: &Lifecycle, pause: Duration) {
        let Some(app) = &lifecycle.target_app else {
            return;
        };
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        if !self.platform.focus.activate(app) {
            tracing::warn!(pid = app.pid, "Target application is gone");
        }
    }

    /// Back to IDLE from wherever the lifecycle stopped. IDLE is published
    /// last: a press accepted right after it owns the lifecycle slot.
    fn finish(&self) {
        self.should_auto_start.store(false, Ordering::SeqCst);
        lock(&self.lifecycle).take();
        match self.state.current() {
            DictationState::Idle => {}
            DictationState::Waiting | DictationState::Processing => {
                if let Err(e) = self.state.transition(DictationState::Idle) {
                    tracing::warn!("{}", e);
                    self.state.reset();
                }
            }
            DictationState::Recording => self.state.reset(),
        }
        #[cfg(test)]
        {
            let hook = lock(&self.on_idle).take();
            if let Some(hook) = hook {
                hook(self);
            }
        }
    }

    /// Record the physical trigger state and act on the event.
    pub fn handle_hotkey(&self, event: HotkeyEvent) {
        self.note_trigger(event);
        self.dispatch_hotkey(event);
    }

    /// Record whether the trigger is held. Callers that hand events to
    /// worker threads call this in event order first, so a release that
    /// overtakes its press still counts as a release.
    pub fn note_trigger(&self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::TriggerDown => self.trigger_held.store(true, Ordering::SeqCst),
            HotkeyEvent::TriggerUp => self.trigger_held.store(false, Ordering::SeqCst),
            HotkeyEvent::Cancel => {}
        }
    }

    /// Act on an event whose trigger state was already recorded.
    pub fn dispatch_hotkey(&self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::TriggerDown => self.trigger_pressed(),
            HotkeyEvent::TriggerUp => self.trigger_released(),
            HotkeyEvent::Cancel => self.cancel(),
        }
    }

    // ------------------------------------------------------------------
    // Start
    // ------------------------------------------------------------------

    pub fn trigger_pressed(&self) {
        if self.state.current() != DictationState::Idle {
            tracing::debug!(state = %self.state.current(), "Press ignored");
            return;
        }
        if self
            .starting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Press ignored, start already in flight");
            return;
        }
        let _in_flight = InFlight(&self.starting);
        self.start_sequence();
    }

    fn start_sequence(&self) {
        let service = self.current_service();
        let controller = self.controller(service);
        let target_app = self.platform.focus.frontmost();

        if let Some(location) = self.in_context_tab(controller.as_ref(), target_app.as_ref()) {
            tracing::info!(%service, %location, "Dictating in the front tab");
            *lock(&self.lifecycle) = Some(Lifecycle {
                service,
                target_app,
                in_context: true,
                location: Some(location),
            });
            self.begin_recording(controller.as_ref());
            return;
        }

        *lock(&self.lifecycle) = Some(Lifecycle {
            service,
            target_app,
            in_context: false,
            location: None,
        });

        let window = match self.ensure_dedicated_window(service, controller.as_ref()) {
            Ok(window) => window,
            Err(e) => {
                self.notify(
                    "Browser Unavailable",
                    &format!("Could not open the {} window. Details: {}", service, e),
                );
                return self.finish();
            }
        };
        self.remember_location(Some(window.location));

        if window.created {
            return self.enter_waiting(controller.as_ref(), true);
        }

        match controller.is_page_ready(Some(window.location)) {
            Ok(executed) => {
                self.remember_location(executed.location());
                match executed.status {
                    ReadyStatus::Ready => self.begin_recording(controller.as_ref()),
                    ReadyStatus::ButtonNotFound(_) | ReadyStatus::PageNotReady => {
                        self.enter_waiting(controller.as_ref(), false)
                    }
                }
            }
            Err(e) if e.is_target_missing() => {
                tracing::warn!(%service, "Dedicated window vanished: {}", e);
                self.update_config(|c| c.set_dedicated_window(service, None));
                match self.ensure_dedicated_window(service, controller.as_ref()) {
                    Ok(window) => {
                        self.remember_location(Some(window.location));
                        self.enter_waiting(controller.as_ref(), window.created);
                    }
                    Err(e) => {
                        self.notify(
                            "Browser Unavailable",
                            &format!("Could not open the {} window. Details: {}", service, e),
                        );
                        self.finish();
                    }
                }
            }
            Err(e) => {
                self.notify(
                    "Start Failed",
                    &format!("Could not reach the {} page. Details: {}", service, e),
                );
                self.finish();
            }
        }
    }

    /// The front browser tab, when the user is already looking at the service.
    fn in_context_tab(
        &self,
        controller: &dyn DictationController,
        target_app: Option<&FrontApp>,
    ) -> Option<TabLocation> {
        let bundle = target_app?.bundle_id.as_deref()?;
        if bundle != BROWSER_BUNDLE_ID {
            return None;
        }
        match controller.locator().locate_front_tab() {
            Ok(location) => location,
            Err(e) => {
                tracing::debug!("Front tab lookup failed: {}", e);
                None
            }
        }
    }

    /// Reuse the remembered automation window or open a new one.
    fn ensure_dedicated_window(
        &self,
        service: ServiceName,
        controller: &dyn DictationController,
    ) -> Result<DedicatedWindow, AutomationError> {
        let locator = controller.locator();
        let cached = lock(&self.config).dedicated_window(service);
        if let Some(location) = cached {
            if locator.validate_location(location) {
                return Ok(DedicatedWindow {
                    location,
                    created: false,
                });
            }
            tracing::info!(%service, %location, "Remembered window no longer matches");
        }

        let bounds = if self.debug {
            WindowBounds::VISIBLE
        } else {
            WindowBounds::HIDDEN
        };
        let location = locator.create_dedicated_window(bounds)?;
        self.update_config(|c| c.set_dedicated_window(service, Some(location)));
        if !self.debug {
            locator.demote_window_stack_order(location.window_id);
        }
        Ok(DedicatedWindow {
            location,
            created: true,
        })
    }

    fn begin_recording(&self, controller: &dyn DictationController) {
        let lifecycle = self.lifecycle();
        let service = lifecycle.service;

        match controller.start_dictation(lifecycle.location) {
            Ok(executed) => {
                self.remember_location(executed.location());
                match executed.status {
                    StartStatus::Started => {
                        if let Err(e) = self.state.transition(DictationState::Recording) {
                            tracing::warn!("Recording started outside a lifecycle: {}", e);
                            return;
                        }
                        self.play(SoundCue::Start);
                        if !lifecycle.in_context {
                            self.restore_focus(&lifecycle, self.timings.focus_restore);
                        }
                    }
                    status @ StartStatus::ButtonNotFound(_) => {
                        self.notify(
                            "Start Failed",
                            &format!("Could not start {} dictation. Details: {}", service, status),
                        );
                        self.finish();
                    }
                }
            }
            Err(AutomationError::Opening { new_window })
                if self.state.current() == DictationState::Idle =>
            {
                self.enter_waiting(controller, new_window);
            }
            Err(e) => {
                self.notify(
                    "Start Failed",
                    &format!("Could not start {} dictation. Details: {}", service, e),
                );
                self.finish();
            }
        }
    }

    fn enter_waiting(&self, controller: &dyn DictationController, opened: bool) {
        if let Err(e) = self.state.transition(DictationState::Waiting) {
            tracing::warn!("{}", e);
            return;
        }
        self.should_auto_start
            .store(self.trigger_held.load(Ordering::SeqCst), Ordering::SeqCst);

        let service = controller.service();
        if opened {
            self.platform.notifier.notify(
                &format!("{} Page Opened", service),
                &format!(
                    "Please keep the {} tab open. Starting recording in a moment...",
                    service
                ),
            );
        }

        match self.wait_for_page(controller) {
            Ok(WaitOutcome::Ready) => {
                if self.should_auto_start.swap(false, Ordering::SeqCst) {
                    self.begin_recording(controller);
                } else {
                    tracing::info!("Page ready but the key was released");
                    self.finish();
                }
            }
            Ok(WaitOutcome::LoginRequired(diag)) => {
                tracing::warn!(%service, diag = %diag, "Microphone button missing after page load");
                if let Some(location) = self.lifecycle().location {
                    controller.locator().reposition_window(
                        location.window_id,
                        WindowBounds::VISIBLE,
                        true,
                    );
                }
                self.platform.notifier.alert(
                    "Login Required",
                    &format!(
                        "{} loaded but its microphone button is missing. Sign in in the window that just appeared, then try again.",
                        service
                    ),
                );
                self.finish();
            }
            Err(PollError::Cancelled { attempts }) => {
                tracing::info!(attempts, "Page wait abandoned");
                self.finish();
            }
            Err(PollError::TimedOut { .. }) => {
                self.notify("Timeout", "Page took too long to load. Please try again.");
                self.finish();
            }
        }
    }

    fn wait_for_page(&self, controller: &dyn DictationController) -> Result<WaitOutcome, PollError> {
        let mut missing_streak = 0;
        poll(
            &self.timings.page_wait,
            Some(&self.should_auto_start),
            |attempt| {
                let location = self.lifecycle().location;
                match controller.is_page_ready(location) {
                    Ok(executed) => {
                        self.remember_location(executed.location());
                        match executed.status {
                            ReadyStatus::Ready => return ControlFlow::Break(WaitOutcome::Ready),
                            ReadyStatus::ButtonNotFound(diag) => {
                                missing_streak += 1;
                                if missing_streak >= self.timings.login_threshold {
                                    return ControlFlow::Break(WaitOutcome::LoginRequired(diag));
                                }
                            }
                            ReadyStatus::PageNotReady => missing_streak = 0,
                        }
                    }
                    Err(e) => {
                        tracing::debug!(attempt, "Readiness check failed: {}", e);
                        missing_streak = 0;
                    }
                }
                ControlFlow::Continue(())
            },
        )
    }

    // ------------------------------------------------------------------
    // Stop
    // ------------------------------------------------------------------

    pub fn trigger_released(&self) {
        match self.state.current() {
            DictationState::Recording => self.stop_sequence(),
            DictationState::Waiting => self.should_auto_start.store(false, Ordering::SeqCst),
            DictationState::Idle | DictationState::Processing => {}
        }
    }

    fn stop_sequence(&self) {
        if self
            .state
            .transition_from(DictationState::Recording, DictationState::Processing)
            .is_err()
        {
            return;
        }
        let lifecycle = self.lifecycle();
        let service = lifecycle.service;
        let controller = self.controller(service);
        self.play(SoundCue::Stop);

        let failure = match controller.stop_dictation(lifecycle.location) {
            Ok(executed) => {
                self.remember_location(executed.location());
                (!executed.status.is_stopped()).then(|| executed.status.to_string())
            }
            Err(e) => Some(e.to_string()),
        };
        if let Some(details) = failure {
            self.notify(
                "Stop Failed",
                &format!(
                    "Could not stop {} dictation automatically. It may still be recording in Chrome. Details: {}",
                    service, details
                ),
            );
            return self.finish();
        }

        if lifecycle.in_context {
            tracing::info!(%service, "Transcript left in the front tab");
            return self.finish();
        }

        let guard = ClipboardGuard::capture(self.platform.pasteboard.clone());
        let transcript = match self.retrieve_text(controller.as_ref()) {
            Ok(text) => text,
            Err(last) => {
                self.notify(
                    "No Text",
                    &format!("No text was captured from {}. Details: {}", service, last),
                );
                return self.finish();
            }
        };

        let slot = lock(&self.config).active_prompt_slot().cloned();
        let text = match slot {
            Some(slot) => match self.pipe_through(controller.as_ref(), &slot, &transcript) {
                Ok(reply) => reply,
                Err(e) => {
                    self.notify(
                        "Pipe-through Failed",
                        &format!("Pasting the raw transcript instead. Details: {}", e),
                    );
                    transcript
                }
            },
            None => transcript,
        };

        self.restore_focus(&lifecycle, Duration::ZERO);
        if !self.timings.focus_settle.is_zero() {
            std::thread::sleep(self.timings.focus_settle);
        }
        if let Err(e) = self.inserter.insert(&text, guard) {
            tracing::error!("Paste failed: {:#}", e);
            self.notify("Paste Failed", &format!("Details: {:#}", e));
        }
        self.finish();
    }

    /// Poll the composer until the transcript shows up. The error carries
    /// the last status seen.
    fn retrieve_text(&self, controller: &dyn DictationController) -> Result<String, String> {
        let mut activate = true;
        let mut last = String::from("EMPTY");
        let result = poll(&self.timings.retrieval, None, |attempt| {
            let location = self.lifecycle().location;
            match controller.get_text_and_clear(activate, location) {
                Ok(executed) => {
                    self.remember_location(executed.location());
                    match executed.status {
                        ComposerText::Text(text) if !text.trim().is_empty() => {
                            tracing::info!(attempt, chars = text.chars().count(), "Transcript retrieved");
                            return ControlFlow::Break(text);
                        }
                        status @ (ComposerText::Text(_)
                        | ComposerText::Empty(_)
                        | ComposerText::NotFound(_)) => {
                            activate = true;
                            last = status.to_string();
                        }
                        status @ ComposerText::PageError(_) => {
                            activate = false;
                            last = status.to_string();
                        }
                    }
                }
                Err(e) => {
                    activate = false;
                    last = e.to_string();
                }
            }
            tracing::debug!(attempt, last = %last, "Transcript not there yet");
            ControlFlow::Continue(())
        });
        result.map_err(|_| last)
    }

    /// Send the transcript wrapped in `slot` and return the assistant's reply.
    fn pipe_through(
        &self,
        controller: &dyn DictationController,
        slot: &PromptSlot,
        transcript: &str,
    ) -> Result<String, PipeError> {
        tracing::info!(slot = %slot.title, "Piping transcript through the assistant");
        let location = self.lifecycle().location;

        let executed = controller.prefill_prompt(&slot.compose(transcript), location)?;
        self.remember_location(executed.location());
        match executed.status {
            PrefillStatus::Filled => {}
            status => return Err(PipeError::Prefill(status.to_string())),
        }

        let location = self.lifecycle().location;
        let executed = controller.submit_message(location)?;
        self.remember_location(executed.location());
        match executed.status {
            SubmitStatus::Sent => {}
            status => return Err(PipeError::Submit(status.to_string())),
        }

        self.wait_for_reply(controller)?;

        let location = self.lifecycle().location;
        let executed = controller.extract_last_response_text(location)?;
        match executed.status {
            ResponseText::Text(text) if !text.trim().is_empty() => Ok(text),
            status => Err(PipeError::Extract(status.to_string())),
        }
    }

    /// Completion has no event, so require a streak of `COMPLETE` answers
    /// after generation was seen (or after the grace polls).
    fn wait_for_reply(&self, controller: &dyn DictationController) -> Result<(), PipeError> {
        let mut seen_generating = false;
        let mut streak = 0;
        let result = poll(&self.timings.response_wait, None, |attempt| {
            let location = self.lifecycle().location;
            match controller.is_response_complete(location) {
                Ok(executed) => match executed.status {
                    ResponseStatus::Generating => {
                        seen_generating = true;
                        streak = 0;
                    }
                    ResponseStatus::Complete
                        if seen_generating || attempt >= self.timings.completion_grace =>
                    {
                        streak += 1;
                        if streak >= self.timings.completion_streak {
                            return ControlFlow::Break(Ok(()));
                        }
                    }
                    ResponseStatus::Complete | ResponseStatus::NoResponse => streak = 0,
                },
                Err(e) if e.is_target_missing() => return ControlFlow::Break(Err(e)),
                Err(e) => {
                    tracing::debug!(attempt, "Completion check failed: {}", e);
                    streak = 0;
                }
            }
            ControlFlow::Continue(())
        });
        match result {
            Ok(outcome) => outcome.map_err(PipeError::from),
            Err(PollError::TimedOut { attempts } | PollError::Cancelled { attempts }) => {
                Err(PipeError::Timeout { attempts })
            }
        }
    }

    // ------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------

    pub fn cancel(&self) {
        let lifecycle = self.lifecycle();
        let controller = self.controller(lifecycle.service);
        if !controller.supports_cancel() {
            tracing::debug!(service = %lifecycle.service, "Cancel not offered");
            return;
        }

        match self.state.current() {
            DictationState::Waiting => {
                tracing::info!("Pending start cancelled");
                self.should_auto_start.store(false, Ordering::SeqCst);
                self.restore_focus(&lifecycle, self.timings.focus_restore);
            }
            DictationState::Recording => {
                if self
                    .state
                    .transition_from(DictationState::Recording, DictationState::Processing)
                    .is_err()
                {
                    return;
                }
                self.play(SoundCue::Stop);
                match controller.cancel_dictation(lifecycle.location) {
                    Ok(executed) => match executed.status {
                        CancelStatus::Cancelled => tracing::info!("Dictation cancelled"),
                        status => self.notify(
                            "Cancel Failed",
                            &format!(
                                "Could not cancel {} dictation. Details: {}",
                                lifecycle.service, status
                            ),
                        ),
                    },
                    Err(e) => self.notify(
                        "Cancel Failed",
                        &format!(
                            "Could not cancel {} dictation. Details: {}",
                            lifecycle.service, e
                        ),
                    ),
                }
                if !lifecycle.in_context {
                    self.restore_focus(&lifecycle, self.timings.focus_restore);
                }
                self.finish();
            }
            DictationState::Idle | DictationState::Processing => {}
        }
    }

    // ------------------------------------------------------------------
    // Preferences and window management
    // ------------------------------------------------------------------

    /// Refused while a lifecycle is in flight.
    pub fn select_service(&self, service: ServiceName) -> bool {
        if self.state.current().is_active() || self.starting.load(Ordering::SeqCst) {
            tracing::info!(%service, "Service switch refused during dictation");
            return false;
        }
        self.update_config(|c| c.current_service = service);
        tracing::info!(%service, "Service selected");
        true
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.update_config(|c| c.sound_enabled = enabled);
    }

    pub fn set_trigger_key(&self, key_code: i64) -> bool {
        if !PersistedConfig::is_supported_trigger_key(key_code) {
            return false;
        }
        self.update_config(|c| c.trigger_key = key_code);
        true
    }

    /// `-1` turns pipe-through off.
    pub fn select_prompt_slot(&self, index: i64) -> bool {
        if !(-1..PROMPT_SLOT_COUNT as i64).contains(&index) {
            return false;
        }
        self.update_config(|c| c.current_pipe_slot = index);
        true
    }

    /// Make sure the current service's window exists. Returns whether it had
    /// to be opened.
    pub fn warm_up(&self) -> Result<bool, AutomationError> {
        let service = self.current_service();
        let controller = self.controller(service);
        let window = self.ensure_dedicated_window(service, controller.as_ref())?;
        if window.created {
            self.platform.notifier.notify(
                &format!("{} Page Opened", service),
                &format!("Please keep the {} window open; MicPipe dictates through it.", service),
            );
        }
        Ok(window.created)
    }

    /// Bring the automation window on screen, e.g. to sign in.
    pub fn show_window(&self) -> Result<(), AutomationError> {
        let service = self.current_service();
        let controller = self.controller(service);
        let window = self.ensure_dedicated_window(service, controller.as_ref())?;
        controller
            .locator()
            .reposition_window(window.location.window_id, WindowBounds::VISIBLE, true);
        Ok(())
    }

    /// Park the automation window off screen again.
    pub fn hide_window(&self) -> bool {
        let service = self.current_service();
        let controller = self.controller(service);
        let Some(location) = lock(&self.config).dedicated_window(service) else {
            return false;
        };
        let locator = controller.locator();
        if !locator.validate_location(location) {
            return false;
        }
        let moved = locator.reposition_window(location.window_id, WindowBounds::HIDDEN, false);
        locator.demote_window_stack_order(location.window_id);
        moved
    }
}
