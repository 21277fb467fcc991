// CommondX - Windows-style cut/paste for Finder, plus a repeated-copy
// clipboard assistant. The heavy lifting (moving files, rendering menus,
// remote processing) is delegated to external collaborators; this crate
// owns the event tap, the selection state machine, the clipboard debounce
// logic, and the recovery protocol that keeps the tap alive.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod cut;
pub mod finder;
pub mod focus;
pub mod menu;
pub mod notify;
pub mod processor;
pub mod retry;
pub mod tap;

// Re-export log macros for use throughout the crate
pub use tracing::{debug, error, info, trace, warn};

#[cfg(target_os = "macos")]
use std::sync::atomic::AtomicUsize;
#[cfg(target_os = "macos")]
use std::sync::{mpsc, Arc};

/// Wire up the real collaborators and run the orchestrator until shutdown.
///
/// Blocks the calling thread. The event tap runs on its own thread; every
/// key event it accepts is marshaled onto the orchestrator channel, which
/// is the single serialization point for all mutable state.
#[cfg(target_os = "macos")]
pub fn run(settings: config::Settings) -> Result<(), tap::HookError> {
    use app::recovery::{wait_for_permission, TapRecovery, PERMISSION_POLL_ATTEMPTS, PERMISSION_POLL_INTERVAL};
    use retry::ThreadSleeper;

    let notifier: Arc<dyn notify::NotificationSink> = Arc::new(notify::OsaScriptNotifier);

    if !tap::permissions::is_process_trusted() {
        info!("accessibility permission missing, prompting");
        tap::permissions::request_trust_prompt();
        if let Err(e) = tap::permissions::open_accessibility_settings() {
            warn!("could not open the accessibility settings pane: {e}");
        }
        notifier.notify(
            "CommondX needs authorization",
            "Grant access in System Settings > Privacy & Security > Accessibility",
        );
        let granted = wait_for_permission(
            &ThreadSleeper,
            PERMISSION_POLL_ATTEMPTS,
            PERMISSION_POLL_INTERVAL,
            tap::permissions::is_process_trusted,
        );
        if !granted {
            notifier.notify(
                "Authorization timed out",
                "Re-launch CommondX after granting accessibility access",
            );
            return Err(tap::HookError::PermissionDenied);
        }
    }

    let (tx, rx) = mpsc::channel();
    let pending_cuts = Arc::new(AtomicUsize::new(0));

    let gate = focus::FocusGate::new(
        Arc::new(focus::WorkspaceApps),
        settings.host_bundle_id.clone(),
    );
    let handler = app::make_tap_handler(settings.keys, gate, pending_cuts.clone(), tx.clone());

    let mut event_tap = tap::event_tap::EventTap::new();
    event_tap.start(Box::new(handler))?;
    let event_tap = Arc::new(event_tap);

    let recovery = TapRecovery::new(event_tap.clone(), Arc::new(ThreadSleeper));
    let bridge = finder::OsaScriptBridge::new();

    let mut orchestrator =
        app::Orchestrator::new(settings.clone(), bridge, recovery, tx.clone(), pending_cuts)
            .with_notifier(notifier.clone());

    match clipboard::SystemClipboard::new() {
        Ok(reader) => match clipboard::SystemClipboard::new() {
            Ok(writer) => {
                orchestrator = orchestrator.with_clipboard(Box::new(reader), Box::new(writer));
            }
            Err(e) => warn!("clipboard unavailable: {e}"),
        },
        Err(e) => warn!("clipboard unavailable: {e}"),
    }

    match processor::MoonshotClient::from_settings(&settings.processor) {
        Ok(client) => orchestrator = orchestrator.with_processor(Arc::new(client)),
        Err(e) => warn!("content processor not configured: {e}"),
    }

    let shutdown_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(app::AppEvent::Shutdown);
    }) {
        warn!("failed to install signal handler: {e}");
    }

    notifier.notify("CommondX", "Running. Cmd+X cuts, Cmd+V moves.");
    info!("commondx started");
    orchestrator.run(rx);

    event_tap.request_stop();
    info!("commondx stopped");
    Ok(())
}
