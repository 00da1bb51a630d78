//! Hotkey bindings for the session controls.
//!
//! Hotkeys are matched against key presses from the input capture stream,
//! so no separate OS registration is needed. Names compare case-insensitively
//! (`"F9"`, `"f9"`).

use namouse_core::config::HotkeyConfig;
use namouse_core::types::Key;

use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyCommand {
    Record,
    Stop,
    Play,
    Pause,
}

impl HotkeyCommand {
    /// Whether the command does anything in `state`.
    ///
    /// Record and Play only start from Idle, Pause only applies to a running
    /// playback, and Stop ends whichever of recording or playback is active.
    pub fn applies_in(&self, state: SessionState) -> bool {
        match self {
            HotkeyCommand::Record | HotkeyCommand::Play => state.is_idle(),
            HotkeyCommand::Pause => state.is_playing(),
            HotkeyCommand::Stop => !state.is_idle(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyMap {
    bindings: Vec<(String, HotkeyCommand)>,
}

impl Default for HotkeyMap {
    fn default() -> Self {
        Self::from_config(&HotkeyConfig::default())
    }
}

impl HotkeyMap {
    pub fn from_config(config: &HotkeyConfig) -> Self {
        let bindings = vec![
            (config.record.clone(), HotkeyCommand::Record),
            (config.stop.clone(), HotkeyCommand::Stop),
            (config.play.clone(), HotkeyCommand::Play),
            (config.pause.clone(), HotkeyCommand::Pause),
        ];
        for (i, (name, _)) in bindings.iter().enumerate() {
            if bindings[..i].iter().any(|(other, _)| other.eq_ignore_ascii_case(name)) {
                tracing::warn!(
                    key = %name,
                    "Key bound to more than one hotkey, first binding wins"
                );
            }
        }
        Self { bindings }
    }

    /// The command bound to `key`, if any.
    pub fn lookup(&self, key: &Key) -> Option<HotkeyCommand> {
        self.bindings
            .iter()
            .find(|(name, _)| key.matches_name(name))
            .map(|(_, command)| *command)
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.iter().map(|(name, _)| name.clone()).collect()
    }
}
