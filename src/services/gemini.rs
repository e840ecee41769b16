//! Gemini page profile.
//!
//! The microphone button toggles; clicking it while listening stops and may
//! submit right away. There is no cancel control.

use super::controller::ServiceProfile;
use crate::browser::ServiceDescriptor;
use crate::data::ServiceName;

const HELPERS: &str = r#"
function micButton() {
    return pick(['.speech_dictation_mic_button', 'button[aria-label*="microphone" i]']);
}
function composer() {
    return pick(['.ql-editor[role="textbox"]', '.ql-editor',
        'div[contenteditable="true"][role="textbox"]']);
}
function sendButton() {
    return pick(['button.send-button', 'button[aria-label="Send message"]']);
}
function stopGeneratingButton() {
    return pick(['button.send-button.stop', 'button[aria-label="Stop response"]']);
}
function isStreaming() {
    return !!document.querySelector('model-response .pending, message-content .streaming');
}
function lastReply() {
    var nodes = document.querySelectorAll('model-response message-content, .model-response-text');
    return nodes.length ? nodes[nodes.length - 1] : null;
}
"#;

const STOP_BODY: &str = r#"
var mic = micButton();
if (mic && mic.querySelector('mat-icon.mic-on')) {
    mic.click();
    return 'STOP_CLICKED';
}
var send = sendButton();
if (send) {
    send.click();
    return 'SEND_CLICKED';
}
return 'STOP_BTN_NOT_FOUND' + dbg('mic=' + (mic ? 1 : 0));
"#;

pub fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor {
        service_name: "Gemini",
        url_pattern: "gemini.google.com",
        title_pattern: "Gemini",
        default_url: "https://gemini.google.com/app",
    }
}

pub fn profile() -> ServiceProfile {
    ServiceProfile {
        service: ServiceName::Gemini,
        descriptor: descriptor(),
        helpers: HELPERS,
        stop_body: STOP_BODY,
        cancel_body: None,
    }
}
