//! UI module for the menu-bar agent

mod system_tray;

pub use system_tray::run_app;
