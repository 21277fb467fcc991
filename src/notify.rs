// Fire-and-forget user notifications. Delivery failures are logged and
// otherwise ignored; nothing in the core depends on a notification landing.

use std::process::Command;

pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Posts through `osascript`'s `display notification`.
pub struct OsaScriptNotifier;

impl NotificationSink for OsaScriptNotifier {
    fn notify(&self, title: &str, message: &str) {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape(message),
            escape(title)
        );
        match Command::new("osascript").arg("-e").arg(&script).status() {
            Ok(status) if status.success() => {}
            Ok(status) => crate::warn!("notification delivery exited with {status}"),
            Err(e) => crate::warn!("notification delivery failed: {e}"),
        }
    }
}

/// Sink that drops everything. Used when notifications are disabled.
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
