//! Script file format.
//!
//! ```json
//! {
//!   "version": "2.3",
//!   "events": [{"type": "mouse_move", "time": 0.0, "x": 10, "y": 20}],
//!   "settings": {"playback_speed": 1.0, "repeat_count": 1, ...},
//!   "metadata": {"created": "...", "total_events": 1, "duration": 0.0,
//!                "screen_width": 1920, "screen_height": 1080}
//! }
//! ```
//!
//! Missing sections and missing settings fields take their defaults. Unknown
//! fields are ignored.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use namouse_core::error::{NamouseError, Result};
use namouse_core::settings::Settings;
use namouse_core::types::{Event, ScreenSize, Script};

/// Version string written to new files.
pub const FORMAT_VERSION: &str = "2.3";

/// Extension added to script paths given without one.
pub const SCRIPT_EXTENSION: &str = "nam";

/// Descriptive information stored alongside the events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// RFC 3339 timestamp of the save.
    pub created: String,
    pub total_events: usize,
    /// Seconds, the time of the last event.
    pub duration: f64,
    pub screen_width: i32,
    pub screen_height: i32,
}

/// A script read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScript {
    pub script: Script,
    pub settings: Settings,
    /// Absent for bare-array files and files without a metadata section.
    pub metadata: Option<Metadata>,
    pub version: Option<String>,
}

#[derive(Serialize)]
struct StoredScriptRef<'a> {
    version: &'static str,
    events: &'a [Event],
    settings: &'a Settings,
    metadata: Metadata,
}

#[derive(Deserialize)]
struct StoredScript {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    metadata: Option<Metadata>,
}

fn persistence(context: &str, e: impl std::fmt::Display) -> NamouseError {
    NamouseError::Persistence(format!("{}: {}", context, e))
}

/// Serialize a script and its settings.
pub fn save(script: &Script, settings: &Settings, screen: ScreenSize) -> Result<Vec<u8>> {
    let stored = StoredScriptRef {
        version: FORMAT_VERSION,
        events: script.events(),
        settings,
        metadata: Metadata {
            created: Utc::now().to_rfc3339(),
            total_events: script.len(),
            duration: script.duration(),
            screen_width: screen.width,
            screen_height: screen.height,
        },
    };
    serde_json::to_vec_pretty(&stored).map_err(|e| persistence("Failed to encode script", e))
}

/// Parse a script file.
pub fn load(bytes: &[u8]) -> Result<LoadedScript> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| persistence("Malformed script file", e))?;

    let stored = match value {
        Value::Array(_) => {
            debug!("Loading bare event array");
            StoredScript {
                version: None,
                events: serde_json::from_value(value)
                    .map_err(|e| persistence("Invalid events", e))?,
                settings: Settings::default(),
                metadata: None,
            }
        }
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| persistence("Invalid script file", e))?
        }
        _ => {
            return Err(NamouseError::Persistence(
                "Script file must be an object or an array of events".into(),
            ))
        }
    };

    if let Some(version) = stored.version.as_deref() {
        if version != FORMAT_VERSION {
            warn!(
                version,
                expected = FORMAT_VERSION,
                "Loading script with a different format version"
            );
        }
    }
    stored
        .settings
        .validate()
        .map_err(|e| persistence("Invalid settings", e))?;
    let script = Script::from_events(stored.events).map_err(|e| persistence("Invalid events", e))?;

    Ok(LoadedScript {
        script,
        settings: stored.settings,
        metadata: stored.metadata,
        version: stored.version,
    })
}

/// Write a script file, creating parent directories as needed.
pub fn save_to_path(
    path: &Path,
    script: &Script,
    settings: &Settings,
    screen: ScreenSize,
) -> Result<()> {
    let bytes = save(script, settings, screen)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| persistence(&format!("Failed to create {}", parent.display()), e))?;
        }
    }
    std::fs::write(path, bytes)
        .map_err(|e| persistence(&format!("Failed to write {}", path.display()), e))?;
    info!(path = %path.display(), events = script.len(), "Script saved");
    Ok(())
}

/// Read and parse a script file.
pub fn load_from_path(path: &Path) -> Result<LoadedScript> {
    let bytes = std::fs::read(path)
        .map_err(|e| persistence(&format!("Failed to read {}", path.display()), e))?;
    let loaded = load(&bytes)?;
    info!(path = %path.display(), events = loaded.script.len(), "Script loaded");
    Ok(loaded)
}

/// Resolve a user-supplied script path.
///
/// A bare file name is placed in `scripts_dir` (a leading `~` expands to the
/// home directory) and gets the `.nam` extension if it has none. Paths with
/// a directory component are used as given.
pub fn resolve_script_path(name: &Path, scripts_dir: &str) -> PathBuf {
    let bare = name
        .parent()
        .map(|parent| parent.as_os_str().is_empty())
        .unwrap_or(true);
    let mut path = if bare && !name.is_absolute() {
        expand_home(scripts_dir).join(name)
    } else {
        name.to_path_buf()
    };
    if path.extension().is_none() {
        path.set_extension(SCRIPT_EXTENSION);
    }
    path
}

fn expand_home(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix('~') {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
        if let Some(home) = home {
            let rest = rest.trim_start_matches(['/', '\\']);
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(dir)
}
