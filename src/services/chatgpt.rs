//! ChatGPT page profile.
//!
//! Stopping clicks "Submit dictation", which finalizes the transcript and
//! leaves it in the composer. "Stop dictation" discards it.

use super::controller::ServiceProfile;
use crate::browser::ServiceDescriptor;
use crate::data::ServiceName;

const HELPERS: &str = r#"
function micButton() {
    return pick(['button[aria-label="Dictate button"]', 'button[data-testid="composer-speech-button"]'])
        || findButton(function (b) {
            return label(b).indexOf('dictate') !== -1
                || !!b.querySelector('svg path[d*="M12 1a3 3 0 0 0-3 3v8a3 3 0 0 0 6 0V4a3 3 0 0 0-3-3z"]');
        });
}
function submitDictationButton() {
    return pick(['button[aria-label="Submit dictation"]'])
        || findButton(function (b) {
            return label(b).indexOf('submit dictation') !== -1
                || !!b.querySelector('svg path[d*="M20 6L9 17l-5-5"]');
        });
}
function stopDictationButton() {
    return pick(['button[aria-label="Stop dictation"]'])
        || findButton(function (b) { return label(b).indexOf('stop dictation') !== -1; });
}
function composer() {
    return pick(['#prompt-textarea', 'div[contenteditable="true"][data-testid*="composer"]',
        'form div[contenteditable="true"]', 'form textarea']);
}
function sendButton() {
    return pick(['button[data-testid="send-button"]', '#composer-submit-button',
        'button[aria-label="Send prompt"]']);
}
function stopGeneratingButton() {
    return pick(['button[data-testid="stop-button"]', 'button[aria-label="Stop streaming"]',
        'button[aria-label="Stop generating"]']);
}
function isStreaming() {
    return !!document.querySelector('.result-streaming');
}
function lastReply() {
    var nodes = document.querySelectorAll('[data-message-author-role="assistant"]');
    if (!nodes.length) { return null; }
    var last = nodes[nodes.length - 1];
    return last.querySelector('.markdown') || last;
}
"#;

const STOP_BODY: &str = r#"
var btn = submitDictationButton();
if (!btn) { return 'SUBMIT_BTN_NOT_FOUND' + dbg('buttons=' + count('button')); }
btn.click();
return 'SUBMIT_CLICKED';
"#;

const CANCEL_BODY: &str = r#"
var btn = stopDictationButton();
if (!btn) { return 'CANCEL_BTN_NOT_FOUND' + dbg('buttons=' + count('button')); }
btn.click();
return 'CANCEL_DONE';
"#;

pub fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor {
        service_name: "ChatGPT",
        url_pattern: "chatgpt.com",
        title_pattern: "ChatGPT",
        default_url: "https://chatgpt.com",
    }
}

pub fn profile() -> ServiceProfile {
    ServiceProfile {
        service: ServiceName::ChatGpt,
        descriptor: descriptor(),
        helpers: HELPERS,
        stop_body: STOP_BODY,
        cancel_body: Some(CANCEL_BODY),
    }
}
