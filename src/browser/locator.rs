//! Tab Locator
//!
//! Resolves a service to a concrete `(window id, tab index)` and keeps the
//! dedicated automation window in place.

use std::sync::Arc;

use super::bridge::{BridgeOp, BrowserBridge, ReplyStatus};
use super::location::{ServiceDescriptor, TabLocation, WindowBounds};
use crate::error::AutomationError;

pub struct TabLocator {
    bridge: Arc<BrowserBridge>,
    descriptor: ServiceDescriptor,
}

impl TabLocator {
    pub fn new(bridge: Arc<BrowserBridge>, descriptor: ServiceDescriptor) -> Self {
        Self { bridge, descriptor }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// First matching tab, scanning windows then tabs in index order.
    pub fn locate_any_matching_tab(&self) -> Result<Option<TabLocation>, AutomationError> {
        self.locate(&BridgeOp::LocateAny)
    }

    /// The front window's active tab, if it belongs to this service.
    pub fn locate_front_tab(&self) -> Result<Option<TabLocation>, AutomationError> {
        self.locate(&BridgeOp::LocateFront)
    }

    fn locate(&self, op: &BridgeOp) -> Result<Option<TabLocation>, AutomationError> {
        let reply = self.bridge.send(&self.descriptor, op)?;
        match reply.status {
            ReplyStatus::Ok => Ok(reply.location.filter(TabLocation::is_valid)),
            _ => Ok(None),
        }
    }

    /// Re-reads the tab at `location` and checks it still belongs to the service.
    pub fn validate_location(&self, location: TabLocation) -> bool {
        if !location.is_valid() {
            return false;
        }
        match self
            .bridge
            .send(&self.descriptor, &BridgeOp::Validate { location })
        {
            Ok(reply) => reply.status == ReplyStatus::Ok,
            Err(e) => {
                tracing::debug!(%location, "Location validation failed: {}", e);
                false
            }
        }
    }

    /// Opens a new window at `bounds` pointed at the service's default URL.
    pub fn create_dedicated_window(
        &self,
        bounds: WindowBounds,
    ) -> Result<TabLocation, AutomationError> {
        let reply = self.bridge.send(
            &self.descriptor,
            &BridgeOp::CreateWindow {
                bounds,
                url: self.descriptor.default_url.to_string(),
            },
        )?;
        match (reply.status, reply.location) {
            (ReplyStatus::Ok, Some(location)) if location.is_valid() => {
                tracing::info!(
                    service = self.descriptor.service_name,
                    %location,
                    "Dedicated window created"
                );
                Ok(location)
            }
            (ReplyStatus::NoWindow, _) => Err(AutomationError::NoWindow),
            _ => Err(AutomationError::UnexpectedReply(format!(
                "create_window returned {:?}",
                reply.status
            ))),
        }
    }

    pub fn reposition_window(&self, window_id: i64, bounds: WindowBounds, activate: bool) -> bool {
        self.simple(&BridgeOp::Reposition {
            window_id,
            bounds,
            activate,
        })
    }

    /// Push the window to the back so "open in most recent window" skips it.
    /// No-op when it is the only window.
    pub fn demote_window_stack_order(&self, window_id: i64) -> bool {
        self.simple(&BridgeOp::Demote { window_id })
    }

    fn simple(&self, op: &BridgeOp) -> bool {
        match self.bridge.send(&self.descriptor, op) {
            Ok(reply) => reply.status == ReplyStatus::Ok,
            Err(e) => {
                tracing::warn!(op = ?op, "Window operation failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chatgpt_descriptor, FakeBrowser, FakePage};

    fn locator(browser: &FakeBrowser) -> TabLocator {
        TabLocator::new(Arc::new(browser.bridge()), chatgpt_descriptor())
    }

    #[test]
    fn test_locate_any_scans_in_window_then_tab_order() {
        let browser = FakeBrowser::new();
        browser.add_window(10, vec![("https://example.com", "Example", FakePage::blank())]);
        browser.add_window(
            20,
            vec![
                ("https://news.site", "News", FakePage::blank()),
                ("https://chatgpt.com/", "ChatGPT", FakePage::ready()),
                ("https://chatgpt.com/c/2", "ChatGPT", FakePage::ready()),
            ],
        );

        let found = locator(&browser).locate_any_matching_tab().unwrap();
        assert_eq!(found, Some(TabLocation::new(20, 2)));
    }

    #[test]
    fn test_locate_any_without_match() {
        let browser = FakeBrowser::new();
        browser.add_window(10, vec![("https://example.com", "Example", FakePage::blank())]);
        assert_eq!(locator(&browser).locate_any_matching_tab().unwrap(), None);
    }

    #[test]
    fn test_locate_front_checks_only_active_tab() {
        let browser = FakeBrowser::new();
        browser.add_window(
            5,
            vec![
                ("https://chatgpt.com/", "ChatGPT", FakePage::ready()),
                ("https://example.com", "Example", FakePage::blank()),
            ],
        );
        browser.set_active_tab(5, 2);
        assert_eq!(locator(&browser).locate_front_tab().unwrap(), None);

        browser.set_active_tab(5, 1);
        assert_eq!(
            locator(&browser).locate_front_tab().unwrap(),
            Some(TabLocation::new(5, 1))
        );
    }

    #[test]
    fn test_validate_detects_navigation_and_closure() {
        let browser = FakeBrowser::new();
        browser.add_window(3, vec![("https://chatgpt.com/", "ChatGPT", FakePage::ready())]);
        let loc = locator(&browser);

        assert!(loc.validate_location(TabLocation::new(3, 1)));
        assert!(!loc.validate_location(TabLocation::new(3, 2)));
        assert!(!loc.validate_location(TabLocation::new(4, 1)));
        assert!(!loc.validate_location(TabLocation::new(0, 0)));

        browser.navigate(3, 1, "https://example.com", "Example");
        assert!(!loc.validate_location(TabLocation::new(3, 1)));
    }

    #[test]
    fn test_invalid_location_is_rejected_without_bridge_call() {
        let browser = FakeBrowser::new();
        let loc = locator(&browser);
        assert!(!loc.validate_location(TabLocation::new(-1, 1)));
        assert!(browser.requests().is_empty());
    }

    #[test]
    fn test_create_dedicated_window_and_demote() {
        let browser = FakeBrowser::new();
        browser.add_window(1, vec![("https://example.com", "Example", FakePage::blank())]);
        let loc = locator(&browser);

        let created = loc.create_dedicated_window(WindowBounds::HIDDEN).unwrap();
        assert!(created.is_valid());
        assert_eq!(created.tab_index, 1);
        assert_eq!(browser.front_window_id(), Some(created.window_id));
        assert_eq!(browser.window_bounds(created.window_id), Some(WindowBounds::HIDDEN));
        assert!(loc.validate_location(created));

        assert!(loc.demote_window_stack_order(created.window_id));
        assert_eq!(browser.front_window_id(), Some(1));
    }

    #[test]
    fn test_demote_single_window_is_noop() {
        let browser = FakeBrowser::new();
        browser.add_window(8, vec![("https://chatgpt.com/", "ChatGPT", FakePage::ready())]);
        assert!(locator(&browser).demote_window_stack_order(8));
        assert_eq!(browser.front_window_id(), Some(8));
    }

    #[test]
    fn test_reposition_missing_window() {
        let browser = FakeBrowser::new();
        browser.add_window(8, vec![("https://chatgpt.com/", "ChatGPT", FakePage::ready())]);
        let loc = locator(&browser);
        assert!(!loc.reposition_window(99, WindowBounds::VISIBLE, true));
        assert!(loc.reposition_window(8, WindowBounds::VISIBLE, false));
        assert_eq!(browser.window_bounds(8), Some(WindowBounds::VISIBLE));
    }
}
