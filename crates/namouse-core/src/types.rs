use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{NamouseError, Result};

// =============================================================================
// Keys
// =============================================================================

/// Mouse button recorded with a click.
///
/// Anything that is not the primary button is recorded as `Right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "Left"),
            MouseButton::Right => write!(f, "Right"),
        }
    }
}

/// A key as stored in a script.
///
/// Serialized as a plain string: a single character is a literal key,
/// anything longer is a symbolic name such as `"shift"` or `"f5"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Char(char),
    Named(String),
}

impl Key {
    /// Build a key from the name reported by the capture layer.
    pub fn from_name(name: &str) -> Self {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Char(c),
            _ => Key::Named(name.to_string()),
        }
    }

    /// The textual name as written to script files.
    pub fn name(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Named(n) => n.clone(),
        }
    }

    /// Whether this key's name matches `other`, ignoring case.
    pub fn matches_name(&self, other: &str) -> bool {
        self.name().to_uppercase() == other.to_uppercase()
    }

    /// Resolve the key against the symbolic key table.
    pub fn resolve(&self) -> std::result::Result<ResolvedKey, UnresolvedKey> {
        match self {
            Key::Char(c) => Ok(ResolvedKey::Char(*c)),
            Key::Named(name) => NamedKey::from_name(name)
                .map(ResolvedKey::Named)
                .ok_or_else(|| UnresolvedKey(name.clone())),
        }
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::from_name(&name)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A key name with no entry in the symbolic key table.
///
/// Playback skips such keys instead of failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved key: {0}")]
pub struct UnresolvedKey(pub String);

/// A key ready for actuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolvedKey {
    Char(char),
    Named(NamedKey),
}

/// Symbolic (non-printable) keys that can be replayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Alt,
    AltLeft,
    AltRight,
    AltGr,
    Backspace,
    CapsLock,
    Cmd,
    CmdLeft,
    CmdRight,
    Ctrl,
    CtrlLeft,
    CtrlRight,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    /// Function key F1..=F24.
    F(u8),
    Home,
    Insert,
    Left,
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftLeft,
    ShiftRight,
    Space,
    Tab,
    Up,
}

const NAMED_KEYS: &[(&str, NamedKey)] = &[
    ("alt", NamedKey::Alt),
    ("alt_l", NamedKey::AltLeft),
    ("alt_r", NamedKey::AltRight),
    ("alt_gr", NamedKey::AltGr),
    ("backspace", NamedKey::Backspace),
    ("caps_lock", NamedKey::CapsLock),
    ("cmd", NamedKey::Cmd),
    ("cmd_l", NamedKey::CmdLeft),
    ("cmd_r", NamedKey::CmdRight),
    ("ctrl", NamedKey::Ctrl),
    ("ctrl_l", NamedKey::CtrlLeft),
    ("ctrl_r", NamedKey::CtrlRight),
    ("delete", NamedKey::Delete),
    ("down", NamedKey::Down),
    ("end", NamedKey::End),
    ("enter", NamedKey::Enter),
    ("esc", NamedKey::Esc),
    ("home", NamedKey::Home),
    ("insert", NamedKey::Insert),
    ("left", NamedKey::Left),
    ("menu", NamedKey::Menu),
    ("num_lock", NamedKey::NumLock),
    ("page_down", NamedKey::PageDown),
    ("page_up", NamedKey::PageUp),
    ("pause", NamedKey::Pause),
    ("print_screen", NamedKey::PrintScreen),
    ("right", NamedKey::Right),
    ("scroll_lock", NamedKey::ScrollLock),
    ("shift", NamedKey::Shift),
    ("shift_l", NamedKey::ShiftLeft),
    ("shift_r", NamedKey::ShiftRight),
    ("space", NamedKey::Space),
    ("tab", NamedKey::Tab),
    ("up", NamedKey::Up),
];

impl NamedKey {
    /// Look up a symbolic name (case-insensitive), e.g. `"page_down"` or `"F5"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if let Some(n) = lower.strip_prefix('f').and_then(|d| d.parse::<u8>().ok()) {
            return (1..=24).contains(&n).then_some(NamedKey::F(n));
        }
        NAMED_KEYS
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, key)| *key)
    }

    /// Canonical lowercase name used in script files.
    pub fn name(&self) -> String {
        if let NamedKey::F(n) = self {
            return format!("f{}", n);
        }
        NAMED_KEYS
            .iter()
            .find(|(_, key)| key == self)
            .map(|(n, _)| n.to_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// Events
// =============================================================================

/// One recorded input action.
///
/// `time` is the offset in seconds from the start of the recording session.
/// Coordinates are raw device coordinates and are never clamped, so values
/// past the primary monitor (multi-monitor setups, taskbars) survive intact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    MouseMove {
        time: f64,
        x: i32,
        y: i32,
    },
    MouseClick {
        time: f64,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    MouseScroll {
        time: f64,
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
    KeyPress {
        time: f64,
        key: Key,
    },
    KeyRelease {
        time: f64,
        key: Key,
    },
    Delay {
        time: f64,
        duration: f64,
    },
}

impl Event {
    pub fn time(&self) -> f64 {
        match self {
            Event::MouseMove { time, .. }
            | Event::MouseClick { time, .. }
            | Event::MouseScroll { time, .. }
            | Event::KeyPress { time, .. }
            | Event::KeyRelease { time, .. }
            | Event::Delay { time, .. } => *time,
        }
    }

    pub fn set_time(&mut self, value: f64) {
        match self {
            Event::MouseMove { time, .. }
            | Event::MouseClick { time, .. }
            | Event::MouseScroll { time, .. }
            | Event::KeyPress { time, .. }
            | Event::KeyRelease { time, .. }
            | Event::Delay { time, .. } => *time = value,
        }
    }

    /// Snake-case type tag as written to script files.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::MouseMove { .. } => "mouse_move",
            Event::MouseClick { .. } => "mouse_click",
            Event::MouseScroll { .. } => "mouse_scroll",
            Event::KeyPress { .. } => "key_press",
            Event::KeyRelease { .. } => "key_release",
            Event::Delay { .. } => "delay",
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Event::MouseMove { .. })
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, Event::Delay { .. })
    }

    /// Pointer position carried by mouse events.
    pub fn position(&self) -> Option<(i32, i32)> {
        match self {
            Event::MouseMove { x, y, .. }
            | Event::MouseClick { x, y, .. }
            | Event::MouseScroll { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>9.3}s  ", self.time())?;
        match self {
            Event::MouseMove { x, y, .. } => write!(f, "Move     Position: ({}, {})", x, y),
            Event::MouseClick {
                x,
                y,
                button,
                pressed,
                ..
            } => write!(
                f,
                "{:<8} {} button at ({}, {})",
                if *pressed { "Press" } else { "Release" },
                button,
                x,
                y
            ),
            Event::MouseScroll { x, y, dx, dy, .. } => {
                write!(f, "Scroll   Delta: ({}, {}) at ({}, {})", dx, dy, x, y)
            }
            Event::KeyPress { key, .. } => write!(f, "Press    Key: {}", key),
            Event::KeyRelease { key, .. } => write!(f, "Release  Key: {}", key),
            Event::Delay { duration, .. } => write!(f, "Wait     Duration: {:.3}s", duration),
        }
    }
}

fn check_time(time: f64) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(NamouseError::Script(format!("invalid event time: {}", time)))
    }
}

// =============================================================================
// Script
// =============================================================================

/// An ordered sequence of events, sorted by non-decreasing `time`.
///
/// Events with equal times keep their insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Script {
    events: Vec<Event>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a script from arbitrary events, stable-sorting them by time.
    ///
    /// Fails if any event has a negative or non-finite time.
    pub fn from_events(mut events: Vec<Event>) -> Result<Self> {
        for event in &events {
            check_time(event.time())?;
        }
        let sorted = events.windows(2).all(|w| w[0].time() <= w[1].time());
        if !sorted {
            tracing::warn!(events = events.len(), "Script events out of order, re-sorting");
            events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        }
        Ok(Self { events })
    }

    /// Append an event. Rejects events that would break time ordering.
    pub fn push(&mut self, event: Event) -> Result<()> {
        check_time(event.time())?;
        if let Some(last) = self.events.last() {
            if event.time() < last.time() {
                return Err(NamouseError::Script(format!(
                    "event at {:.6}s precedes last event at {:.6}s",
                    event.time(),
                    last.time()
                )));
            }
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Time offset of the final event, or 0 for an empty script.
    pub fn duration(&self) -> f64 {
        self.events.last().map(Event::time).unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Insert a `Delay` before position `index`.
    ///
    /// The delay takes the time of the event before it (0 at the head) and
    /// every event after it is pushed back by `duration`, which keeps the
    /// script ordered. Later `Delay` events shift too; otherwise a delay
    /// could end up timed before the event that precedes it.
    pub fn insert_delay(&mut self, index: usize, duration: f64) -> Result<()> {
        if index > self.events.len() {
            return Err(NamouseError::Script(format!(
                "delay index {} out of range for {} events",
                index,
                self.events.len()
            )));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(NamouseError::Script(format!(
                "invalid delay duration: {}",
                duration
            )));
        }

        let time = if index > 0 {
            self.events[index - 1].time()
        } else {
            0.0
        };
        self.events.insert(index, Event::Delay { time, duration });
        for event in &mut self.events[index + 1..] {
            let shifted = event.time() + duration;
            event.set_time(shifted);
        }
        Ok(())
    }

    /// Remove the events at the given indices. Out-of-range indices are
    /// ignored. Returns the number of events removed.
    pub fn remove_indices(&mut self, indices: &[usize]) -> usize {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.events.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for &i in &sorted {
            self.events.remove(i);
        }
        sorted.len()
    }

    pub fn summary(&self) -> ScriptSummary {
        let mut summary = ScriptSummary {
            total: self.events.len(),
            duration_secs: self.duration(),
            ..ScriptSummary::default()
        };
        for event in &self.events {
            match event {
                Event::MouseMove { .. } => summary.moves += 1,
                Event::MouseClick { .. } => summary.clicks += 1,
                Event::MouseScroll { .. } => summary.scrolls += 1,
                Event::KeyPress { .. } | Event::KeyRelease { .. } => summary.keys += 1,
                Event::Delay { .. } => summary.delays += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Per-category event counts for a script.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub total: usize,
    pub moves: usize,
    pub clicks: usize,
    pub scrolls: usize,
    pub keys: usize,
    pub delays: usize,
    pub duration_secs: f64,
}

// =============================================================================
// Screen and playback results
// =============================================================================

/// Screen dimensions recorded in script metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

/// How a playback run ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum PlaybackOutcome {
    /// Every repeat ran to the end.
    Completed,
    /// Stopped by the user before the end.
    Stopped,
    /// A device action failed and the run was aborted.
    Failed(String),
}

// =============================================================================
// Tests
// =============================================================================
