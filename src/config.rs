// Settings loaded from a JSON file in the user config directory.
// Every field has a default so a missing or partial file never blocks startup.

use crate::processor::Action;
use crate::tap::KeyMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the settings file location (used in tests
/// and by launchd plists that keep config next to the bundle).
pub const CONFIG_PATH_ENV: &str = "COMMONDX_CONFIG";

/// Policy for what happens when the same selection is cut twice in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// Offer the secondary-action menu once, then treat the next identical
    /// cut as a fresh cut again.
    OncePerSelection,
    /// Offer the menu on every repeated cut of the same selection.
    EveryTime,
}

/// Thresholds for the repeated-copy detector, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Two copies closer together than this are a key-repeat artifact.
    pub min_interval_ms: u64,
    /// Two copies further apart than this are unrelated.
    pub max_interval_ms: u64,
    /// Suppression window after triggering on some content.
    pub cooldown_ms: u64,
    /// Minimum trimmed content length worth triggering on.
    pub min_content_len: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 100,
            max_interval_ms: 5_000,
            cooldown_ms: 3_000,
            min_content_len: 2,
        }
    }
}

/// Remote content-processor configuration (OpenAI-compatible endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// What to do with the copied content when the detector fires.
    pub action: Action,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.moonshot.cn/v1".to_string(),
            model: "moonshot-v1-8k".to_string(),
            action: Action::Translate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bundle id of the host file manager the cut/paste keys are scoped to.
    pub host_bundle_id: String,
    /// Key codes for the intercepted combinations.
    pub keys: KeyMap,
    pub repeat_policy: RepeatPolicy,
    pub detector: DetectorSettings,
    pub processor: ProcessorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_bundle_id: "com.apple.finder".to_string(),
            keys: KeyMap::default(),
            repeat_policy: RepeatPolicy::OncePerSelection,
            detector: DetectorSettings::default(),
            processor: ProcessorSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, falling back to defaults on
    /// any error. A broken config file is logged, never fatal.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => {
                    crate::debug!("loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    crate::warn!("ignoring malformed settings file {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// `$COMMONDX_CONFIG` if set, otherwise `<config dir>/commondx/settings.json`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("commondx")
            .join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_target_finder() {
        let settings = Settings::default();
        assert_eq!(settings.host_bundle_id, "com.apple.finder");
        assert_eq!(settings.repeat_policy, RepeatPolicy::OncePerSelection);
        assert_eq!(settings.detector.min_interval_ms, 100);
        assert_eq!(settings.detector.max_interval_ms, 5_000);
        assert_eq!(settings.detector.cooldown_ms, 3_000);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let parsed: Settings =
            serde_json::from_str(r#"{"host_bundle_id": "com.example.fm"}"#).unwrap();
        assert_eq!(parsed.host_bundle_id, "com.example.fm");
        assert_eq!(parsed.keys, KeyMap::default());
        assert_eq!(parsed.detector, DetectorSettings::default());
    }

    #[test]
    fn repeat_policy_round_trips_as_snake_case() {
        let json = serde_json::to_string(&RepeatPolicy::OncePerSelection).unwrap();
        assert_eq!(json, "\"once_per_selection\"");
        let back: RepeatPolicy = serde_json::from_str("\"every_time\"").unwrap();
        assert_eq!(back, RepeatPolicy::EveryTime);
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_from_malformed_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"{not json")
            .unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    #[serial]
    fn env_var_overrides_config_path() {
        std::env::set_var(CONFIG_PATH_ENV, "/tmp/commondx-test.json");
        assert_eq!(
            Settings::config_path(),
            PathBuf::from("/tmp/commondx-test.json")
        );
        std::env::remove_var(CONFIG_PATH_ENV);
    }
}
