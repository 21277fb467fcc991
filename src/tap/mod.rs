// Global key-event interception.
//
// The pure classification logic lives here so it can be tested anywhere;
// the CGEventTap handle itself is macOS-only and lives in `event_tap`.

#[cfg(target_os = "macos")]
pub mod event_tap;

pub mod permissions;

use serde::{Deserialize, Serialize};

/// The three intercepted combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    Cut,
    Paste,
    Copy,
}

/// What the tap callback tells the OS to do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDecision {
    /// Swallow the event; the focused application never sees it.
    Consume,
    /// Deliver the event normally.
    PassThrough,
}

/// A key-down event as seen by the tap callback. Ephemeral, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: i64,
    pub command: bool,
    pub shift: bool,
    pub option: bool,
    pub control: bool,
}

/// Key codes for the intercepted combinations (macOS virtual key codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub cut: i64,
    pub paste: i64,
    pub copy: i64,
}

impl Default for KeyMap {
    fn default() -> Self {
        // X, V, C on ANSI layouts.
        Self {
            cut: 7,
            paste: 9,
            copy: 8,
        }
    }
}

/// Classify a key event against the map.
///
/// Command must be held; Shift or Option disqualifies the event so that
/// combinations like Cmd+Shift+V keep their native meaning. Control is
/// deliberately ignored.
pub fn classify(event: &KeyEvent, keys: &KeyMap) -> Option<Hotkey> {
    if !event.command || event.shift || event.option {
        return None;
    }
    if event.key_code == keys.cut {
        Some(Hotkey::Cut)
    } else if event.key_code == keys.paste {
        Some(Hotkey::Paste)
    } else if event.key_code == keys.copy {
        Some(Hotkey::Copy)
    } else {
        None
    }
}

/// Errors from creating or driving the event tap.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HookError {
    /// The process is not trusted for input monitoring.
    #[error("accessibility permission required; grant it in System Settings > Privacy & Security > Accessibility")]
    PermissionDenied,
    /// CGEventTapCreate returned null even though permission looked granted.
    #[error("failed to create the event tap")]
    CreationFailed,
    /// start() called while the tap is already live.
    #[error("event tap is already running")]
    AlreadyRunning,
}

/// Handle the recovery path needs: re-assert the tap is alive without
/// knowing how it is implemented. The production implementation recreates
/// the underlying tap object; mocks script the outcome.
pub trait TapControl: Send + Sync {
    /// Re-assert the hook is enabled, recreating it if the OS killed it.
    /// Returns true when a live tap is in place afterwards.
    fn ensure_enabled(&self) -> bool;
    fn is_running(&self) -> bool;
}

/// Callback invoked for every classified key-down event. Must return fast;
/// anything slow is enqueued elsewhere.
pub type TapHandler = Box<dyn Fn(&KeyEvent) -> TapDecision + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(key_code: i64) -> KeyEvent {
        KeyEvent {
            key_code,
            command: true,
            shift: false,
            option: false,
            control: false,
        }
    }

    #[test]
    fn cmd_x_is_cut() {
        assert_eq!(classify(&cmd(7), &KeyMap::default()), Some(Hotkey::Cut));
    }

    #[test]
    fn cmd_v_is_paste() {
        assert_eq!(classify(&cmd(9), &KeyMap::default()), Some(Hotkey::Paste));
    }

    #[test]
    fn cmd_c_is_copy() {
        assert_eq!(classify(&cmd(8), &KeyMap::default()), Some(Hotkey::Copy));
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(classify(&cmd(0), &KeyMap::default()), None);
    }

    #[test]
    fn missing_command_disqualifies() {
        let mut event = cmd(7);
        event.command = false;
        assert_eq!(classify(&event, &KeyMap::default()), None);
    }

    #[test]
    fn shift_disqualifies() {
        let mut event = cmd(9);
        event.shift = true;
        assert_eq!(classify(&event, &KeyMap::default()), None);
    }

    #[test]
    fn option_disqualifies() {
        let mut event = cmd(7);
        event.option = true;
        assert_eq!(classify(&event, &KeyMap::default()), None);
    }

    #[test]
    fn control_is_ignored() {
        let mut event = cmd(8);
        event.control = true;
        assert_eq!(classify(&event, &KeyMap::default()), Some(Hotkey::Copy));
    }

    #[test]
    fn custom_key_map_is_honored() {
        let keys = KeyMap {
            cut: 11,
            paste: 45,
            copy: 46,
        };
        assert_eq!(classify(&cmd(11), &keys), Some(Hotkey::Cut));
        assert_eq!(classify(&cmd(7), &keys), None);
    }
}
