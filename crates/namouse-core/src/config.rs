use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NamouseError, Result};
use crate::settings::Settings;

/// Top-level configuration for the namouse application.
///
/// Loaded from `~/.namouse/config.toml` by default. Every section falls back
/// to its defaults when missing, so a partial file is always valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamouseConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    /// Default playback settings for new sessions.
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
}

impl NamouseConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NamouseConfig = toml::from_str(&content)?;
        config.settings.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file does not
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NamouseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Directory where scripts are saved when given a bare file name.
    pub scripts_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            scripts_dir: "~/.namouse/scripts".to_string(),
        }
    }
}

/// Which input categories are captured while recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub record_mouse_moves: bool,
    pub record_mouse_clicks: bool,
    pub record_scroll: bool,
    pub record_keyboard: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            record_mouse_moves: true,
            record_mouse_clicks: true,
            record_scroll: true,
            record_keyboard: true,
        }
    }
}

/// Key names bound to the session controls.
///
/// Names are compared case-insensitively against captured key names
/// (e.g. `"F9"`, `"esc"`, `"q"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub record: String,
    pub stop: String,
    pub play: String,
    pub pause: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            record: "F9".to_string(),
            stop: "F10".to_string(),
            play: "F11".to_string(),
            pause: "F12".to_string(),
        }
    }
}

impl HotkeyConfig {
    /// All configured key names, in record/stop/play/pause order.
    pub fn names(&self) -> Vec<String> {
        vec![
            self.record.clone(),
            self.stop.clone(),
            self.play.clone(),
            self.pause.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = NamouseConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.settings, Settings::default());
        assert!(config.recording.record_keyboard);
        assert_eq!(config.hotkeys.record, "F9");
        assert_eq!(config.hotkeys.pause, "F12");
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(
            r#"
[general]
log_level = "debug"

[settings]
playback_speed = 2.0
repeat_count = 0
repeat_interval = 1.5
mouse_smoothing = true

[recording]
record_mouse_moves = false

[hotkeys]
record = "F5"
"#,
        );
        let config = NamouseConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.settings.playback_speed, 2.0);
        assert_eq!(config.settings.repeat_count, 0);
        assert_eq!(config.settings.repeat_interval, 1.5);
        assert!(config.settings.mouse_smoothing);
        assert!(config.settings.force_position);
        assert!(!config.recording.record_mouse_moves);
        assert!(config.recording.record_mouse_clicks);
        assert_eq!(config.hotkeys.record, "F5");
        assert_eq!(config.hotkeys.stop, "F10");
    }

    #[test]
    fn test_load_rejects_invalid_settings() {
        let file = create_temp_config("[settings]\nplayback_speed = 0.0\n");
        assert!(NamouseConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is [[[ not toml");
        let err = NamouseConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, NamouseError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = NamouseConfig::load_or_default(Path::new("/nonexistent/namouse.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = NamouseConfig::load(file.path()).unwrap();
        assert_eq!(config.hotkeys, HotkeyConfig::default());
        assert_eq!(config.recording, RecordingConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = NamouseConfig::default();
        config.settings.repeat_count = 4;
        config.hotkeys.stop = "esc".to_string();
        config.save(&path).unwrap();

        let loaded = NamouseConfig::load(&path).unwrap();
        assert_eq!(loaded.settings.repeat_count, 4);
        assert_eq!(loaded.hotkeys.stop, "esc");
    }

    #[test]
    fn test_hotkey_names() {
        let names = HotkeyConfig::default().names();
        assert_eq!(names, vec!["F9", "F10", "F11", "F12"]);
    }
}
