//! Live recording: raw input in, timestamped script events out.
//!
//! The recorder is owned by the session actor and fed one `CapturedInput` at a
//! time. Each call appends at most one event to the script. Only pointer moves
//! are filtered; clicks, scrolls and keys are always kept unless their
//! category is disabled or the key is a control hotkey.

use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use namouse_core::config::{HotkeyConfig, RecordingConfig};
use namouse_core::settings::Settings;
use namouse_core::types::{Event, Key, MouseButton, Script};

use crate::capture::{CapturedInput, RawInput};

/// Minimum spacing between two recorded moves (at most 100 moves per second).
pub const MIN_MOVE_INTERVAL: Duration = Duration::from_millis(10);

/// Filters applied while recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    pub ignore_minimal_movements: bool,
    /// Pixels. A move is dropped when both axes moved less than this.
    pub minimal_movement_threshold: u32,
    pub categories: RecordingConfig,
    /// Key names that drive the session and must never end up in a script.
    pub hotkeys: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::from_parts(
            &Settings::default(),
            &RecordingConfig::default(),
            &HotkeyConfig::default(),
        )
    }
}

impl RecorderConfig {
    pub fn from_parts(
        settings: &Settings,
        recording: &RecordingConfig,
        hotkeys: &HotkeyConfig,
    ) -> Self {
        Self {
            ignore_minimal_movements: settings.ignore_minimal_movements,
            minimal_movement_threshold: settings.minimal_movement_threshold,
            categories: recording.clone(),
            hotkeys: hotkeys.names(),
        }
    }

    fn is_hotkey(&self, key: &Key) -> bool {
        self.hotkeys.iter().any(|name| key.matches_name(name))
    }
}

#[derive(Debug, Clone, Copy)]
struct RecordedMove {
    at: Instant,
    x: i32,
    y: i32,
}

/// One recording session.
#[derive(Debug)]
pub struct Recorder {
    config: RecorderConfig,
    start: Instant,
    last_move: Option<RecordedMove>,
    session_id: Uuid,
}

impl Recorder {
    /// Begin a recording whose time origin is `start`.
    pub fn new(config: RecorderConfig, start: Instant) -> Self {
        let session_id = Uuid::new_v4();
        debug!(%session_id, "Recorder created");
        Self {
            config,
            start,
            last_move: None,
            session_id,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Dispatch one captured input to the matching `on_raw_*` handler.
    pub fn handle(&mut self, script: &mut Script, captured: &CapturedInput) -> bool {
        let at = captured.at;
        match &captured.input {
            RawInput::Move { x, y } => self.on_raw_move(script, at, *x, *y),
            RawInput::Click {
                x,
                y,
                button,
                pressed,
            } => self.on_raw_click(script, at, *x, *y, *button, *pressed),
            RawInput::Scroll { x, y, dx, dy } => self.on_raw_scroll(script, at, *x, *y, *dx, *dy),
            RawInput::Key { key, pressed } => self.on_raw_key(script, at, key.clone(), *pressed),
        }
    }

    pub fn on_raw_move(&mut self, script: &mut Script, at: Instant, x: i32, y: i32) -> bool {
        if !self.config.categories.record_mouse_moves {
            return false;
        }

        if let Some(last) = self.last_move {
            if at.saturating_duration_since(last.at) < MIN_MOVE_INTERVAL {
                return false;
            }
            if self.config.ignore_minimal_movements {
                let threshold = i64::from(self.config.minimal_movement_threshold);
                let dx = (i64::from(x) - i64::from(last.x)).abs();
                let dy = (i64::from(y) - i64::from(last.y)).abs();
                if dx < threshold && dy < threshold {
                    return false;
                }
            }
        }

        let time = self.offset(script, at);
        if self.append(script, Event::MouseMove { time, x, y }) {
            self.last_move = Some(RecordedMove { at, x, y });
            true
        } else {
            false
        }
    }

    pub fn on_raw_click(
        &mut self,
        script: &mut Script,
        at: Instant,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> bool {
        if !self.config.categories.record_mouse_clicks {
            return false;
        }
        let time = self.offset(script, at);
        self.append(
            script,
            Event::MouseClick {
                time,
                x,
                y,
                button,
                pressed,
            },
        )
    }

    pub fn on_raw_scroll(
        &mut self,
        script: &mut Script,
        at: Instant,
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    ) -> bool {
        if !self.config.categories.record_scroll {
            return false;
        }
        let time = self.offset(script, at);
        self.append(script, Event::MouseScroll { time, x, y, dx, dy })
    }

    pub fn on_raw_key(
        &mut self,
        script: &mut Script,
        at: Instant,
        key: Key,
        pressed: bool,
    ) -> bool {
        if !self.config.categories.record_keyboard {
            return false;
        }
        if self.config.is_hotkey(&key) {
            debug!(key = %key, "Hotkey suppressed from recording");
            return false;
        }
        let time = self.offset(script, at);
        let event = if pressed {
            Event::KeyPress { time, key }
        } else {
            Event::KeyRelease { time, key }
        };
        self.append(script, event)
    }

    /// Seconds since the recording started. Listener threads may deliver
    /// inputs slightly out of order, so the offset never goes below the last
    /// recorded time.
    fn offset(&self, script: &Script, at: Instant) -> f64 {
        let elapsed = at.saturating_duration_since(self.start).as_secs_f64();
        elapsed.max(script.duration())
    }

    fn append(&mut self, script: &mut Script, event: Event) -> bool {
        match script.push(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Dropped recorded event");
                false
            }
        }
    }
}
