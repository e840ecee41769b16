//! MicPipe - Main Entry Point
//!
//! Runs the menu-bar agent: global trigger key, dedicated chat window and the
//! status-bar menu.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use micpipe::business::{DictationSession, HotkeyEvent, HotkeyManager};
use micpipe::data::{PersistedConfig, StateStore};
use micpipe::platform::PlatformFactory;

#[derive(Parser, Debug)]
#[command(name = "micpipe", version, about = "Hotkey dictation through ChatGPT or Gemini")]
struct Cli {
    /// Verbose logging and a visible automation window
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    info!(
        "Starting MicPipe v{}{}",
        env!("CARGO_PKG_VERSION"),
        if cli.debug { " (debug)" } else { "" }
    );

    let store = StateStore::new(StateStore::default_path());
    let config = store.load();
    info!(
        path = %store.path().display(),
        service = %config.current_service,
        trigger = %PersistedConfig::trigger_key_name(config.trigger_key),
        "Preferences loaded"
    );

    let platform = PlatformFactory::create()?;
    let notifier = platform.notifier.clone();
    let trigger_key = config.trigger_key;
    let session = Arc::new(DictationSession::new(platform, store, config).with_debug(cli.debug));

    let warm = session.clone();
    tokio::task::spawn_blocking(move || match warm.warm_up() {
        Ok(true) => info!("Automation window opened"),
        Ok(false) => info!("Automation window already open"),
        Err(e) => warn!("Warm-up failed: {}", e),
    });

    let hotkeys = Arc::new(HotkeyManager::new(
        PlatformFactory::create_hotkey_provider()?,
        trigger_key,
    ));
    let runtime = tokio::runtime::Handle::current();
    let dispatch = session.clone();
    let listening = hotkeys.on_event(Arc::new(move |event: HotkeyEvent| {
        dispatch.note_trigger(event);
        let session = dispatch.clone();
        runtime.spawn_blocking(move || session.dispatch_hotkey(event));
    }));
    if let Err(e) = listening {
        error!("Failed to start key listener: {:#}", e);
        notifier.alert(
            "Permission Error",
            "MicPipe could not listen for the trigger key. Grant Accessibility and Input Monitoring access in System Settings, then restart MicPipe.",
        );
        return Err(e);
    }
    info!("Key listener started");

    run(session, hotkeys).await?;

    info!("Application exited");
    Ok(())
}

#[cfg(target_os = "macos")]
async fn run(session: Arc<DictationSession>, hotkeys: Arc<HotkeyManager>) -> Result<()> {
    micpipe::ui::run_app(session, hotkeys).await
}

#[cfg(not(target_os = "macos"))]
async fn run(_session: Arc<DictationSession>, hotkeys: Arc<HotkeyManager>) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    hotkeys.stop();
    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug { "micpipe=debug" } else { "micpipe=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
