use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PlaybackOutcome;

/// Notifications emitted by the session controller.
///
/// Broadcast to every subscriber (CLI progress output, front-ends). They are
/// advisory only: nothing in the engine waits on a subscriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    // =========================================================================
    // Recording
    // =========================================================================
    RecordingStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RecordingStopped {
        session_id: Uuid,
        event_count: usize,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// The input listener could not be started; the session is back to Idle.
    RecordingFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Playback
    // =========================================================================
    PlaybackStarted {
        session_id: Uuid,
        repeat_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// One event was replayed. `fraction` is the event's position in the
    /// script timeline, from 0.0 to 1.0.
    PlaybackProgress {
        session_id: Uuid,
        repeat: u32,
        index: usize,
        fraction: f64,
    },

    PlaybackPaused {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    PlaybackResumed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    PlaybackFinished {
        session_id: Uuid,
        outcome: PlaybackOutcome,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Script editing
    // =========================================================================
    ScriptOptimized {
        removed: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },

    DelayInserted {
        index: usize,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },

    EventsDeleted {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    ScriptCleared {
        timestamp: DateTime<Utc>,
    },

    ScriptLoaded {
        event_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Short snake_case name, used as the log/event-stream key.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::RecordingStarted { .. } => "recording_started",
            SessionEvent::RecordingStopped { .. } => "recording_stopped",
            SessionEvent::RecordingFailed { .. } => "recording_failed",
            SessionEvent::PlaybackStarted { .. } => "playback_started",
            SessionEvent::PlaybackProgress { .. } => "playback_progress",
            SessionEvent::PlaybackPaused { .. } => "playback_paused",
            SessionEvent::PlaybackResumed { .. } => "playback_resumed",
            SessionEvent::PlaybackFinished { .. } => "playback_finished",
            SessionEvent::ScriptOptimized { .. } => "script_optimized",
            SessionEvent::DelayInserted { .. } => "delay_inserted",
            SessionEvent::EventsDeleted { .. } => "events_deleted",
            SessionEvent::ScriptCleared { .. } => "script_cleared",
            SessionEvent::ScriptLoaded { .. } => "script_loaded",
        }
    }

    /// Whether this event ends a recording or playback run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::RecordingStopped { .. }
                | SessionEvent::RecordingFailed { .. }
                | SessionEvent::PlaybackFinished { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        let event = SessionEvent::RecordingStarted {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_name(), "recording_started");

        let event = SessionEvent::ScriptOptimized {
            removed: 3,
            remaining: 10,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_name(), "script_optimized");
    }

    #[test]
    fn test_terminal_events() {
        let session_id = Uuid::new_v4();
        let finished = SessionEvent::PlaybackFinished {
            session_id,
            outcome: PlaybackOutcome::Stopped,
            timestamp: Utc::now(),
        };
        assert!(finished.is_terminal());

        let progress = SessionEvent::PlaybackProgress {
            session_id,
            repeat: 0,
            index: 1,
            fraction: 0.5,
        };
        assert!(!progress.is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::PlaybackFinished {
            session_id: Uuid::new_v4(),
            outcome: PlaybackOutcome::Completed,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("PlaybackFinished"));
        assert!(json.contains("completed"));
    }
}
