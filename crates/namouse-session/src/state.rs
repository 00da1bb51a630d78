//! Session state machine with validated transitions.
//!
//! - Idle -> Recording (start recording)
//! - Recording -> Idle (stop recording)
//! - Idle -> Playing (start playback)
//! - Playing <-> Paused (toggle pause)
//! - Playing / Paused -> Idle (playback finished or stopped)

use std::fmt;
use std::sync::{Arc, Mutex};

use namouse_core::error::{NamouseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Recording,
    Playing { paused: bool },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Recording => write!(f, "Recording"),
            SessionState::Playing { paused: false } => write!(f, "Playing"),
            SessionState::Playing { paused: true } => write!(f, "Paused"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Recording)
                | (SessionState::Recording, SessionState::Idle)
                | (SessionState::Idle, SessionState::Playing { paused: false })
                | (SessionState::Playing { paused: false }, SessionState::Playing { paused: true })
                | (SessionState::Playing { paused: true }, SessionState::Playing { paused: false })
                | (SessionState::Playing { .. }, SessionState::Idle)
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// True while a playback run is active, paused or not.
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing { .. })
    }
}

/// Shared view of the session state.
///
/// The session actor is the only writer; handles clone it to read the
/// current state without a round trip through the actor.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<SessionState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    pub fn current(&self) -> SessionState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Attempt to transition to `target`.
    pub fn transition(&self, target: SessionState) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| NamouseError::Session(format!("State mutex poisoned: {}", e)))?;
        if state.can_transition_to(&target) {
            tracing::debug!("Session state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(NamouseError::Session(format!(
                "Invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the state back to Idle (error recovery).
    pub fn reset(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !state.is_idle() {
            tracing::warn!("Session state reset to Idle from {}", *state);
        }
        *state = SessionState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYING: SessionState = SessionState::Playing { paused: false };
    const PAUSED: SessionState = SessionState::Playing { paused: true };

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Recording.to_string(), "Recording");
        assert_eq!(PLAYING.to_string(), "Playing");
        assert_eq!(PAUSED.to_string(), "Paused");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(SessionState::Idle.can_transition_to(&SessionState::Recording));
        assert!(SessionState::Recording.can_transition_to(&SessionState::Idle));
        assert!(SessionState::Idle.can_transition_to(&PLAYING));
        assert!(PLAYING.can_transition_to(&PAUSED));
        assert!(PAUSED.can_transition_to(&PLAYING));
        assert!(PLAYING.can_transition_to(&SessionState::Idle));
        assert!(PAUSED.can_transition_to(&SessionState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        // Recording and playback are mutually exclusive.
        assert!(!SessionState::Recording.can_transition_to(&PLAYING));
        assert!(!PLAYING.can_transition_to(&SessionState::Recording));
        assert!(!PAUSED.can_transition_to(&SessionState::Recording));

        // A run always starts unpaused.
        assert!(!SessionState::Idle.can_transition_to(&PAUSED));

        // No self transitions.
        assert!(!SessionState::Idle.can_transition_to(&SessionState::Idle));
        assert!(!SessionState::Recording.can_transition_to(&SessionState::Recording));
        assert!(!PLAYING.can_transition_to(&PLAYING));
    }

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::Idle.is_idle());
        assert!(SessionState::Recording.is_recording());
        assert!(PLAYING.is_playing());
        assert!(PAUSED.is_playing());
        assert!(!PAUSED.is_idle());
    }

    #[test]
    fn test_state_machine_record_cycle() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), SessionState::Idle);
        sm.transition(SessionState::Recording).unwrap();
        sm.transition(SessionState::Idle).unwrap();
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_state_machine_playback_cycle() {
        let sm = StateMachine::new();
        sm.transition(PLAYING).unwrap();
        sm.transition(PAUSED).unwrap();
        assert_eq!(sm.current(), PAUSED);
        sm.transition(SessionState::Idle).unwrap();
        assert!(sm.current().is_idle());
    }

    #[test]
    fn test_state_machine_invalid_transition() {
        let sm = StateMachine::new();
        sm.transition(SessionState::Recording).unwrap();
        let err = sm.transition(PLAYING).unwrap_err();
        assert!(err.to_string().contains("Recording -> Playing"));
        assert_eq!(sm.current(), SessionState::Recording);
    }

    #[test]
    fn test_state_machine_reset() {
        let sm = StateMachine::new();
        sm.transition(PLAYING).unwrap();
        sm.reset();
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_clones_share_state() {
        let sm = StateMachine::new();
        let view = sm.clone();
        sm.transition(SessionState::Recording).unwrap();
        assert!(view.current().is_recording());
    }
}
