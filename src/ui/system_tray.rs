//! System Tray
//!
//! Status-bar menu used as the preference surface. The menu lives on the
//! main thread; AppKit events are pumped from the same loop that reads menu
//! clicks.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu},
    TrayIconBuilder,
};

use crate::business::{DictationSession, HotkeyManager};
use crate::data::{PersistedConfig, ServiceName, HOTKEY_OPTIONS};
use crate::platform::macos;

const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Menu items whose check marks mirror the persisted preferences.
struct TrayMenu {
    services: Vec<(ServiceName, CheckMenuItem)>,
    sound: CheckMenuItem,
    prompt_off: CheckMenuItem,
    prompt_slots: Vec<(i64, CheckMenuItem)>,
    trigger_keys: Vec<(i64, CheckMenuItem)>,
    show_id: MenuId,
    hide_id: MenuId,
    quit_id: MenuId,
}

enum MenuAction {
    SelectService(ServiceName),
    ToggleSound,
    SelectPromptSlot(i64),
    SelectTriggerKey(i64),
    ShowWindow,
    HideWindow,
    Quit,
}

impl TrayMenu {
    fn build(menu: &Menu, config: &PersistedConfig) -> Result<Self> {
        let title = MenuItem::new(format!("MicPipe {}", env!("CARGO_PKG_VERSION")), false, None);
        menu.append(&title)?;
        menu.append(&PredefinedMenuItem::separator())?;

        let mut services = Vec::new();
        for service in ServiceName::ALL {
            let item = CheckMenuItem::new(
                service.as_str(),
                true,
                config.current_service == service,
                None,
            );
            menu.append(&item)?;
            services.push((service, item));
        }
        menu.append(&PredefinedMenuItem::separator())?;

        let prompt_menu = Submenu::new("Pipe Through", true);
        let prompt_off = CheckMenuItem::new("Off", true, config.current_pipe_slot < 0, None);
        prompt_menu.append(&prompt_off)?;
        prompt_menu.append(&PredefinedMenuItem::separator())?;
        let mut prompt_slots = Vec::new();
        for (index, slot) in config.pipe_slots.iter().enumerate() {
            let index = index as i64;
            let label = if slot.title.is_empty() {
                format!("Slot {}", index + 1)
            } else {
                slot.title.clone()
            };
            let item = CheckMenuItem::new(label, true, config.current_pipe_slot == index, None);
            prompt_menu.append(&item)?;
            prompt_slots.push((index, item));
        }
        menu.append(&prompt_menu)?;

        let key_menu = Submenu::new("Trigger Key", true);
        let mut trigger_keys = Vec::new();
        for (code, name) in HOTKEY_OPTIONS {
            let item = CheckMenuItem::new(name, true, config.trigger_key == code, None);
            key_menu.append(&item)?;
            trigger_keys.push((code, item));
        }
        menu.append(&key_menu)?;

        let sound = CheckMenuItem::new("Play Sounds", true, config.sound_enabled, None);
        menu.append(&sound)?;
        menu.append(&PredefinedMenuItem::separator())?;

        let show_item = MenuItem::new("Show Automation Window", true, None);
        let hide_item = MenuItem::new("Hide Automation Window", true, None);
        menu.append(&show_item)?;
        menu.append(&hide_item)?;
        menu.append(&PredefinedMenuItem::separator())?;

        let quit_item = MenuItem::new("Quit MicPipe", true, None);
        menu.append(&quit_item)?;

        Ok(Self {
            services,
            sound,
            prompt_off,
            prompt_slots,
            trigger_keys,
            show_id: show_item.id().clone(),
            hide_id: hide_item.id().clone(),
            quit_id: quit_item.id().clone(),
        })
    }

    fn action_for(&self, id: &MenuId) -> Option<MenuAction> {
        if let Some((service, _)) = self.services.iter().find(|(_, item)| item.id() == id) {
            return Some(MenuAction::SelectService(*service));
        }
        if self.sound.id() == id {
            return Some(MenuAction::ToggleSound);
        }
        if self.prompt_off.id() == id {
            return Some(MenuAction::SelectPromptSlot(-1));
        }
        if let Some((index, _)) = self.prompt_slots.iter().find(|(_, item)| item.id() == id) {
            return Some(MenuAction::SelectPromptSlot(*index));
        }
        if let Some((code, _)) = self.trigger_keys.iter().find(|(_, item)| item.id() == id) {
            return Some(MenuAction::SelectTriggerKey(*code));
        }
        if *id == self.show_id {
            Some(MenuAction::ShowWindow)
        } else if *id == self.hide_id {
            Some(MenuAction::HideWindow)
        } else if *id == self.quit_id {
            Some(MenuAction::Quit)
        } else {
            None
        }
    }

    /// Clicking a check item flips it on its own; put every mark back in
    /// line with what was actually stored.
    fn sync(&self, config: &PersistedConfig) {
        for (service, item) in &self.services {
            item.set_checked(config.current_service == *service);
        }
        self.sound.set_checked(config.sound_enabled);
        self.prompt_off.set_checked(config.current_pipe_slot < 0);
        for (index, item) in &self.prompt_slots {
            item.set_checked(config.current_pipe_slot == *index);
        }
        for (code, item) in &self.trigger_keys {
            item.set_checked(config.trigger_key == *code);
        }
    }
}

/// Run the menu-bar agent until Quit is chosen.
pub async fn run_app(session: Arc<DictationSession>, hotkeys: Arc<HotkeyManager>) -> Result<()> {
    macos::init_application();

    let menu = Menu::new();
    let tray_menu = TrayMenu::build(&menu, &session.config())?;

    let trigger_name = PersistedConfig::trigger_key_name(session.config().trigger_key);
    let _tray_icon = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(format!("MicPipe - hold {} to dictate", trigger_name))
        .with_icon(load_icon()?)
        .build()?;

    tracing::info!("System tray initialized");

    let running = Arc::new(AtomicBool::new(true));
    let menu_rx = MenuEvent::receiver();

    while running.load(Ordering::SeqCst) {
        macos::pump_events();

        while let Ok(event) = menu_rx.try_recv() {
            let Some(action) = tray_menu.action_for(&event.id) else {
                continue;
            };
            handle_action(action, &session, &hotkeys, &running);
            tray_menu.sync(&session.config());
        }

        tokio::time::sleep(PUMP_INTERVAL).await;
    }

    hotkeys.stop();
    tracing::info!("Application exiting");
    Ok(())
}

fn handle_action(
    action: MenuAction,
    session: &Arc<DictationSession>,
    hotkeys: &Arc<HotkeyManager>,
    running: &AtomicBool,
) {
    match action {
        MenuAction::SelectService(service) => {
            if session.select_service(service) {
                let session = session.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = session.warm_up() {
                        tracing::warn!("Warm-up after service switch failed: {}", e);
                    }
                });
            }
        }
        MenuAction::ToggleSound => {
            let enabled = !session.config().sound_enabled;
            session.set_sound_enabled(enabled);
        }
        MenuAction::SelectPromptSlot(index) => {
            session.select_prompt_slot(index);
        }
        MenuAction::SelectTriggerKey(code) => {
            if session.set_trigger_key(code) {
                hotkeys.update_trigger_key(code);
                tracing::info!(
                    key = %PersistedConfig::trigger_key_name(code),
                    "Trigger key changed"
                );
            }
        }
        MenuAction::ShowWindow => {
            let session = session.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = session.show_window() {
                    tracing::error!("Failed to show automation window: {}", e);
                }
            });
        }
        MenuAction::HideWindow => {
            let session = session.clone();
            tokio::task::spawn_blocking(move || {
                if !session.hide_window() {
                    tracing::info!("No automation window to hide");
                }
            });
        }
        MenuAction::Quit => {
            tracing::info!("Quit from menu");
            running.store(false, Ordering::SeqCst);
        }
    }
}

/// Gradient disc with a white microphone glyph.
fn load_icon() -> Result<tray_icon::Icon> {
    let width = 32u32;
    let height = 32u32;
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = (width.min(height) as f32 / 2.0) - 1.0;

    // Teal to indigo
    let color_start = (20u8, 184u8, 166u8);
    let color_end = (79u8, 70u8, 229u8);

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - center_x;
            let dy = y as f32 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist > radius {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }

            let t = y as f32 / height as f32;
            let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t) as u8;
            let alpha = if dist > radius - 1.5 {
                ((radius - dist + 1.5) / 1.5 * 255.0) as u8
            } else {
                255
            };
            rgba.extend_from_slice(&[
                mix(color_start.0, color_end.0),
                mix(color_start.1, color_end.1),
                mix(color_start.2, color_end.2),
                alpha,
            ]);
        }
    }

    let cx = center_x as i32;
    let cy = center_y as i32;
    let mut paint = |px: i32, py: i32| {
        if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
            return;
        }
        let idx = (py as u32 * width + px as u32) as usize * 4;
        rgba[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
    };

    // Capsule
    for dy in -7..=2 {
        for dx in -3..=3 {
            let corner = (dy == -7 || dy == 2) && dx.abs() == 3;
            if !corner {
                paint(cx + dx, cy + dy);
            }
        }
    }
    // Cradle
    for dy in 0..=5 {
        paint(cx - 6, cy + dy);
        paint(cx + 6, cy + dy);
    }
    for dx in -5..=5 {
        paint(cx + dx, cy + 6);
    }
    // Stem and foot
    for dy in 7..=9 {
        paint(cx, cy + dy);
    }
    for dx in -3..=3 {
        paint(cx + dx, cy + 10);
    }

    let icon = tray_icon::Icon::from_rgba(rgba, width, height)?;
    Ok(icon)
}
