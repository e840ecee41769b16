#![allow(unexpected_cfgs)]
use crate::error::AutomationError;
use crate::platform::{
    group_items, ClipboardItem, FocusTracker, FrontApp, HotkeyProvider, KeyEvent, KeyEventKind,
    Notifier, Pasteboard, ScriptHost, SoundCue, SoundPlayer, TextAction, PLAIN_TEXT_TYPE,
};
use anyhow::Result;
use cocoa::base::{id, nil, BOOL, NO, YES};
use objc::{class, msg_send, sel, sel_impl};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

mod native {
    use cocoa::base::{id, nil};
    use cocoa::foundation::{NSAutoreleasePool, NSString};
    use objc::{class, msg_send, sel, sel_impl};
    use std::ffi::CStr;
    use std::os::raw::{c_char, c_void};

    /// Runs `f` inside a fresh autorelease pool.
    pub fn with_pool<T>(f: impl FnOnce() -> T) -> T {
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let out = f();
            pool.drain();
            out
        }
    }

    pub unsafe fn ns_string(text: &str) -> id {
        NSString::alloc(nil).init_str(text).autorelease()
    }

    pub unsafe fn rust_string(s: id) -> Option<String> {
        if s == nil {
            return None;
        }
        let ptr: *const c_char = msg_send![s, UTF8String];
        if ptr.is_null() {
            return None;
        }
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }

    pub unsafe fn data_bytes(data: id) -> Vec<u8> {
        if data == nil {
            return Vec::new();
        }
        let len: usize = msg_send![data, length];
        let ptr: *const u8 = msg_send![data, bytes];
        if ptr.is_null() || len == 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts(ptr, len).to_vec()
    }

    pub unsafe fn ns_data(bytes: &[u8]) -> id {
        msg_send![class!(NSData), dataWithBytes: bytes.as_ptr() as *const c_void length: bytes.len()]
    }
}

/// Runs JavaScript for Automation through `osascript`.
pub struct OsaScriptHost;

impl OsaScriptHost {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptHost for OsaScriptHost {
    fn run(&self, program: &str) -> Result<String, AutomationError> {
        let output = Command::new("osascript")
            .args(["-l", "JavaScript", "-e", program])
            .output()
            .map_err(|e| AutomationError::Host(format!("failed to launch osascript: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(status = ?output.status.code(), "osascript failed: {}", stderr);
            return Err(AutomationError::Host(stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// The general pasteboard.
pub struct MacosPasteboard;

impl MacosPasteboard {
    pub fn new() -> Self {
        Self
    }
}

impl Pasteboard for MacosPasteboard {
    fn items(&self) -> Vec<ClipboardItem> {
        native::with_pool(|| unsafe {
            let pb: id = msg_send![class!(NSPasteboard), generalPasteboard];
            let entries: id = msg_send![pb, pasteboardItems];
            if entries == nil {
                return Vec::new();
            }
            let count: usize = msg_send![entries, count];
            let mut items = Vec::new();
            for i in 0..count {
                let entry: id = msg_send![entries, objectAtIndex: i];
                let types: id = msg_send![entry, types];
                let type_count: usize = msg_send![types, count];
                for t in 0..type_count {
                    let kind: id = msg_send![types, objectAtIndex: t];
                    let data: id = msg_send![entry, dataForType: kind];
                    // Promised data that fails to materialize is skipped.
                    if data == nil {
                        continue;
                    }
                    if let Some(kind) = native::rust_string(kind) {
                        items.push(ClipboardItem {
                            item: i,
                            kind,
                            data: native::data_bytes(data),
                        });
                    }
                }
            }
            items
        })
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let ok = native::with_pool(|| unsafe {
            let pb: id = msg_send![class!(NSPasteboard), generalPasteboard];
            let _: i64 = msg_send![pb, clearContents];
            let ok: BOOL = msg_send![pb,
                setString: native::ns_string(text)
                forType: native::ns_string(PLAIN_TEXT_TYPE)];
            ok != NO
        });
        if !ok {
            anyhow::bail!("pasteboard refused plain text");
        }
        Ok(())
    }

    fn write_items(&self, items: &[ClipboardItem]) -> usize {
        native::with_pool(|| unsafe {
            let pb: id = msg_send![class!(NSPasteboard), generalPasteboard];
            let _: i64 = msg_send![pb, clearContents];
            if items.is_empty() {
                return 0;
            }
            let list: id = msg_send![class!(NSMutableArray), array];
            let mut accepted = 0;
            for group in group_items(items) {
                let entry: id = msg_send![class!(NSPasteboardItem), new];
                for item in group {
                    let ok: BOOL = msg_send![entry,
                        setData: native::ns_data(&item.data)
                        forType: native::ns_string(&item.kind)];
                    if ok != NO {
                        accepted += 1;
                    } else {
                        tracing::debug!(kind = %item.kind, "Representation refused");
                    }
                }
                let _: () = msg_send![list, addObject: entry];
                let _: () = msg_send![entry, release];
            }
            let written: BOOL = msg_send![pb, writeObjects: list];
            if written == NO {
                return 0;
            }
            accepted
        })
    }
}

/// Synthesizes Cmd+V at the HID level.
pub struct MacosTextAction;

impl MacosTextAction {
    pub fn new() -> Self {
        Self
    }
}

impl TextAction for MacosTextAction {
    fn send_paste(&self) -> Result<()> {
        use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

        const VK_V: CGKeyCode = 9;

        for down in [true, false] {
            let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
                .map_err(|_| anyhow::anyhow!("Failed to create CGEventSource"))?;
            let event = CGEvent::new_keyboard_event(source, VK_V, down)
                .map_err(|_| anyhow::anyhow!("Failed to create CGEvent"))?;
            event.set_flags(CGEventFlags::CGEventFlagCommand);
            event.post(CGEventTapLocation::HID);
        }
        Ok(())
    }
}

/// Frontmost application through NSWorkspace.
pub struct MacosFocusTracker;

impl MacosFocusTracker {
    pub fn new() -> Self {
        Self
    }
}

impl FocusTracker for MacosFocusTracker {
    fn frontmost(&self) -> Option<FrontApp> {
        native::with_pool(|| unsafe {
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let app: id = msg_send![workspace, frontmostApplication];
            if app == nil {
                return None;
            }
            let pid: i32 = msg_send![app, processIdentifier];
            let bundle: id = msg_send![app, bundleIdentifier];
            Some(FrontApp {
                pid,
                bundle_id: native::rust_string(bundle),
            })
        })
    }

    fn activate(&self, app: &FrontApp) -> bool {
        // NSApplicationActivateIgnoringOtherApps
        const IGNORING_OTHER_APPS: u64 = 1 << 1;
        native::with_pool(|| unsafe {
            let running: id = msg_send![class!(NSRunningApplication),
                runningApplicationWithProcessIdentifier: app.pid];
            if running == nil {
                return false;
            }
            let ok: BOOL = msg_send![running, activateWithOptions: IGNORING_OTHER_APPS];
            ok != NO
        })
    }
}

/// Notification banners and alerts through Standard Additions.
pub struct MacosNotifier {
    host: OsaScriptHost,
}

impl MacosNotifier {
    pub fn new() -> Self {
        Self {
            host: OsaScriptHost::new(),
        }
    }

    fn script(call: &str, title: &str, message: &str) -> String {
        let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        format!(
            "var app = Application.currentApplication();\napp.includeStandardAdditions = true;\n{}",
            call.replace("$TITLE", &quote(title))
                .replace("$MESSAGE", &quote(message))
        )
    }
}

impl Notifier for MacosNotifier {
    fn notify(&self, title: &str, message: &str) {
        let program = Self::script(
            "app.displayNotification($MESSAGE, {withTitle: 'MicPipe', subtitle: $TITLE});",
            title,
            message,
        );
        if let Err(e) = self.host.run(&program) {
            tracing::warn!("Notification failed: {}", e);
        }
    }

    fn alert(&self, title: &str, message: &str) {
        let program = Self::script(
            "app.displayAlert($TITLE, {message: $MESSAGE, as: 'critical'});",
            title,
            message,
        );
        // The dialog blocks until dismissed.
        thread::spawn(move || {
            if let Err(e) = OsaScriptHost::new().run(&program) {
                tracing::warn!("Alert failed: {}", e);
            }
        });
    }
}

/// System sounds for start/stop cues.
pub struct MacosSoundPlayer;

impl MacosSoundPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl SoundPlayer for MacosSoundPlayer {
    fn play(&self, cue: SoundCue) {
        let name = match cue {
            SoundCue::Start => "Tink",
            SoundCue::Stop => "Pop",
        };
        native::with_pool(|| unsafe {
            let sound: id =
                msg_send![class!(NSSound), soundNamed: native::ns_string(name)];
            if sound == nil {
                tracing::debug!(name, "System sound missing");
                return;
            }
            let _: BOOL = msg_send![sound, play];
        });
    }
}

/// Listen-only CGEventTap on its own run loop thread.
pub struct MacosHotkeyProvider {
    is_active: Arc<AtomicBool>,
}

impl MacosHotkeyProvider {
    pub fn new() -> Self {
        Self {
            is_active: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl HotkeyProvider for MacosHotkeyProvider {
    fn on_key_event(&self, callback: Box<dyn Fn(KeyEvent) + Send + Sync + 'static>) -> Result<()> {
        use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
        use core_graphics::event::{
            CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
            EventField,
        };

        let is_active = self.is_active.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        thread::spawn(move || {
            let tap = CGEventTap::new(
                CGEventTapLocation::Session,
                CGEventTapPlacement::HeadInsertEventTap,
                CGEventTapOptions::ListenOnly,
                vec![
                    CGEventType::KeyDown,
                    CGEventType::KeyUp,
                    CGEventType::FlagsChanged,
                ],
                move |_proxy, event_type, event| {
                    if !is_active.load(Ordering::SeqCst) {
                        return None;
                    }
                    let kind = match event_type {
                        CGEventType::KeyDown => KeyEventKind::KeyDown,
                        CGEventType::KeyUp => KeyEventKind::KeyUp,
                        CGEventType::FlagsChanged => KeyEventKind::FlagsChanged,
                        _ => return None,
                    };
                    callback(KeyEvent {
                        kind,
                        key_code: event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE),
                        flags: event.get_flags().bits(),
                    });
                    None
                },
            );

            let tap = match tap {
                Ok(tap) => tap,
                Err(()) => {
                    let _ = ready_tx.send(Err(
                        "could not create the event tap; grant Accessibility and Input Monitoring permission".into(),
                    ));
                    return;
                }
            };

            let source = match tap.mach_port.create_runloop_source(0) {
                Ok(source) => source,
                Err(()) => {
                    let _ = ready_tx.send(Err("could not attach the event tap".into()));
                    return;
                }
            };
            let run_loop = CFRunLoop::get_current();
            unsafe {
                run_loop.add_source(&source, kCFRunLoopCommonModes);
            }
            tap.enable();
            let _ = ready_tx.send(Ok(()));
            CFRunLoop::run_current();
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(anyhow::anyhow!(message)),
            Err(_) => Err(anyhow::anyhow!("event tap thread exited")),
        }
    }

    fn stop(&self) {
        self.is_active.store(false, Ordering::SeqCst);
    }
}

impl Drop for MacosHotkeyProvider {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Puts the process in accessory mode (menu bar only, no Dock icon).
pub fn init_application() {
    native::with_pool(|| unsafe {
        let app: id = msg_send![class!(NSApplication), sharedApplication];
        // NSApplicationActivationPolicyAccessory
        let _: BOOL = msg_send![app, setActivationPolicy: 1i64];
        let _: () = msg_send![app, finishLaunching];
    });
}

/// Dispatch pending AppKit events without blocking.
pub fn pump_events() {
    native::with_pool(|| unsafe {
        let app: id = msg_send![class!(NSApplication), sharedApplication];
        let mode = native::ns_string("kCFRunLoopDefaultMode");
        loop {
            let past: id = msg_send![class!(NSDate), distantPast];
            let event: id = msg_send![app,
                nextEventMatchingMask: u64::MAX
                untilDate: past
                inMode: mode
                dequeue: YES];
            if event == nil {
                break;
            }
            let _: () = msg_send![app, sendEvent: event];
        }
    });
}
