//! Session actor and its handle.
//!
//! The actor owns the capture source, the recorder, the running playback and
//! the only write access to the script. Every state change happens inside its
//! `select!` loop, in the order messages arrive.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use namouse_core::config::{HotkeyConfig, NamouseConfig, RecordingConfig};
use namouse_core::error::{NamouseError, Result};
use namouse_core::events::SessionEvent;
use namouse_core::settings::Settings;
use namouse_core::types::{PlaybackOutcome, Script, ScriptSummary};
use namouse_playback::{spawn_playback, Actuator, PlaybackHandle, PlaybackUpdate};
use namouse_recorder::{
    optimize, CapturedInput, InputCapture, InputSink, RawInput, Recorder, RecorderConfig,
};

use crate::hotkey::{HotkeyCommand, HotkeyMap};
use crate::state::{SessionState, StateMachine};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Startup parameters of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Initial playback settings.
    pub settings: Settings,
    pub recording: RecordingConfig,
    pub hotkeys: HotkeyConfig,
    /// Keep the input listener running while idle so hotkeys work. When
    /// false the listener only runs while recording.
    pub listen_for_hotkeys: bool,
}

impl From<&NamouseConfig> for SessionConfig {
    fn from(config: &NamouseConfig) -> Self {
        Self {
            settings: config.settings.clone(),
            recording: config.recording.clone(),
            hotkeys: config.hotkeys.clone(),
            listen_for_hotkeys: false,
        }
    }
}

/// Requests handled by the session actor.
#[derive(Debug)]
enum SessionCommand {
    StartRecording {
        reply: oneshot::Sender<Result<()>>,
    },
    StopRecording {
        reply: oneshot::Sender<Result<ScriptSummary>>,
    },
    StartPlayback {
        settings: Option<Settings>,
        reply: oneshot::Sender<Result<()>>,
    },
    TogglePause {
        reply: oneshot::Sender<Result<bool>>,
    },
    StopPlayback {
        reply: oneshot::Sender<Result<PlaybackOutcome>>,
    },
    Stop {
        reply: oneshot::Sender<Result<()>>,
    },
    Optimize {
        reply: oneshot::Sender<Result<usize>>,
    },
    InsertDelay {
        index: usize,
        duration: f64,
        reply: oneshot::Sender<Result<()>>,
    },
    DeleteEvents {
        indices: Vec<usize>,
        reply: oneshot::Sender<Result<usize>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
    LoadScript {
        script: Script,
        settings: Option<Settings>,
        reply: oneshot::Sender<Result<()>>,
    },
    GetSettings {
        reply: oneshot::Sender<Result<Settings>>,
    },
    UpdateSettings {
        settings: Settings,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable control surface of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    state: StateMachine,
    script: Arc<Mutex<Script>>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| NamouseError::ShuttingDown)?;
        rx.await.map_err(|_| NamouseError::ShuttingDown)?
    }

    /// Clear the script and start capturing input. Only valid when Idle.
    pub async fn start_recording(&self) -> Result<()> {
        self.request(|reply| SessionCommand::StartRecording { reply })
            .await
    }

    /// Stop capturing and return a summary of the recorded script.
    pub async fn stop_recording(&self) -> Result<ScriptSummary> {
        self.request(|reply| SessionCommand::StopRecording { reply })
            .await
    }

    /// Start replaying the current script. `settings` overrides the session
    /// settings for this run only.
    pub async fn start_playback(&self, settings: Option<Settings>) -> Result<()> {
        self.request(|reply| SessionCommand::StartPlayback { settings, reply })
            .await
    }

    /// Toggle pause on the running playback. Returns the new paused state.
    pub async fn pause_or_resume_playback(&self) -> Result<bool> {
        self.request(|reply| SessionCommand::TogglePause { reply })
            .await
    }

    /// Stop the running playback and wait for it to end.
    pub async fn stop_playback(&self) -> Result<PlaybackOutcome> {
        self.request(|reply| SessionCommand::StopPlayback { reply })
            .await
    }

    /// Stop whichever of recording or playback is active.
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }

    /// Compact the script in place. Returns the number of events removed.
    pub async fn optimize(&self) -> Result<usize> {
        self.request(|reply| SessionCommand::Optimize { reply })
            .await
    }

    pub async fn insert_delay(&self, index: usize, duration: f64) -> Result<()> {
        self.request(|reply| SessionCommand::InsertDelay {
            index,
            duration,
            reply,
        })
        .await
    }

    /// Delete the events at `indices`. Returns how many were removed.
    pub async fn delete_events(&self, indices: Vec<usize>) -> Result<usize> {
        self.request(|reply| SessionCommand::DeleteEvents { indices, reply })
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Clear { reply }).await
    }

    /// Replace the script, and the settings if given.
    pub async fn load_script(&self, script: Script, settings: Option<Settings>) -> Result<()> {
        self.request(|reply| SessionCommand::LoadScript {
            script,
            settings,
            reply,
        })
        .await
    }

    pub async fn settings(&self) -> Result<Settings> {
        self.request(|reply| SessionCommand::GetSettings { reply })
            .await
    }

    /// Replace the session settings. A running playback keeps the settings
    /// it started with.
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.request(|reply| SessionCommand::UpdateSettings { settings, reply })
            .await
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    /// A copy of the current script.
    pub fn script_snapshot(&self) -> Result<Script> {
        self.script
            .lock()
            .map(|script| script.clone())
            .map_err(|e| NamouseError::Session(format!("Script mutex poisoned: {}", e)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop any activity and end the actor. Later requests fail with
    /// `ShuttingDown`.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Shutdown { reply })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}

/// Start a session actor on the current tokio runtime.
///
/// Fails only if `listen_for_hotkeys` is set and the capture cannot start.
pub fn spawn_session(
    config: SessionConfig,
    capture: Box<dyn InputCapture>,
    actuator: Arc<dyn Actuator>,
) -> Result<SessionHandle> {
    config.settings.validate()?;

    let (commands, inbox) = mpsc::channel(COMMAND_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (playback_tx, playback_rx) = mpsc::unbounded_channel();
    let state = StateMachine::new();
    let script = Arc::new(Mutex::new(Script::new()));

    let mut actor = SessionActor {
        hotkeys: HotkeyMap::from_config(&config.hotkeys),
        config,
        state: state.clone(),
        script: Arc::clone(&script),
        capture,
        actuator,
        events: events.clone(),
        inbox,
        input_tx,
        input_rx,
        playback_tx,
        playback_rx,
        recorder: None,
        playback: None,
        stop_waiters: Vec::new(),
    };

    if actor.config.listen_for_hotkeys {
        actor.capture.start(actor.input_tx.clone())?;
        info!(hotkeys = ?actor.hotkeys.names(), "Listening for hotkeys");
    }

    tokio::spawn(actor.run());

    Ok(SessionHandle {
        commands,
        events,
        state,
        script,
    })
}

// =============================================================================
// Actor
// =============================================================================

struct ActivePlayback {
    handle: PlaybackHandle,
    session_id: Uuid,
}

struct SessionActor {
    config: SessionConfig,
    state: StateMachine,
    script: Arc<Mutex<Script>>,
    capture: Box<dyn InputCapture>,
    actuator: Arc<dyn Actuator>,
    hotkeys: HotkeyMap,
    events: broadcast::Sender<SessionEvent>,
    inbox: mpsc::Receiver<SessionCommand>,
    input_tx: InputSink,
    input_rx: mpsc::UnboundedReceiver<CapturedInput>,
    playback_tx: mpsc::UnboundedSender<PlaybackUpdate>,
    playback_rx: mpsc::UnboundedReceiver<PlaybackUpdate>,
    recorder: Option<Recorder>,
    playback: Option<ActivePlayback>,
    stop_waiters: Vec<oneshot::Sender<Result<PlaybackOutcome>>>,
}

impl SessionActor {
    async fn run(mut self) {
        info!("Session actor started");
        loop {
            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(SessionCommand::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(input) = self.input_rx.recv() => self.on_input(input),
                Some(update) = self.playback_rx.recv() => self.on_playback_update(update),
            }
        }
        info!("Session actor stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::StartRecording { reply } => {
                let _ = reply.send(self.start_recording());
            }
            SessionCommand::StopRecording { reply } => {
                let _ = reply.send(self.stop_recording());
            }
            SessionCommand::StartPlayback { settings, reply } => {
                let _ = reply.send(self.start_playback(settings));
            }
            SessionCommand::TogglePause { reply } => {
                let _ = reply.send(self.toggle_pause());
            }
            SessionCommand::StopPlayback { reply } => match &self.playback {
                Some(active) => {
                    active.handle.stop();
                    self.stop_waiters.push(reply);
                }
                None => {
                    let _ = reply.send(Err(NamouseError::Session("No playback running".into())));
                }
            },
            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            SessionCommand::Optimize { reply } => {
                let _ = reply.send(self.optimize());
            }
            SessionCommand::InsertDelay {
                index,
                duration,
                reply,
            } => {
                let _ = reply.send(self.insert_delay(index, duration));
            }
            SessionCommand::DeleteEvents { indices, reply } => {
                let _ = reply.send(self.delete_events(&indices));
            }
            SessionCommand::Clear { reply } => {
                let _ = reply.send(self.clear());
            }
            SessionCommand::LoadScript {
                script,
                settings,
                reply,
            } => {
                let _ = reply.send(self.load_script(script, settings));
            }
            SessionCommand::GetSettings { reply } => {
                let _ = reply.send(Ok(self.config.settings.clone()));
            }
            SessionCommand::UpdateSettings { settings, reply } => {
                let result = settings.validate().map(|()| {
                    debug!(?settings, "Settings updated");
                    self.config.settings = settings;
                });
                let _ = reply.send(result);
            }
            SessionCommand::Shutdown { reply } => {
                // Handled in the run loop.
                let _ = reply.send(());
            }
        }
    }

    // =========================================================================
    // Recording
    // =========================================================================

    fn start_recording(&mut self) -> Result<()> {
        let current = self.state.current();
        if !current.can_transition_to(&SessionState::Recording) {
            return Err(NamouseError::Session(format!(
                "Cannot start recording while {}",
                current
            )));
        }

        if !self.capture.is_running() {
            if let Err(e) = self.capture.start(self.input_tx.clone()) {
                error!(error = %e, "Failed to start input capture");
                self.state.reset();
                self.emit(SessionEvent::RecordingFailed {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        }

        self.lock_script()?.clear();
        self.state.transition(SessionState::Recording)?;

        let recorder_config = RecorderConfig::from_parts(
            &self.config.settings,
            &self.config.recording,
            &self.config.hotkeys,
        );
        let recorder = Recorder::new(recorder_config, Instant::now());
        let session_id = recorder.session_id();
        self.recorder = Some(recorder);

        info!(%session_id, "Recording started");
        self.emit(SessionEvent::RecordingStarted {
            session_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<ScriptSummary> {
        if !self.state.current().is_recording() {
            return Err(NamouseError::Session("Not recording".into()));
        }

        // Inputs captured before the stop request still belong to the script.
        while let Ok(input) = self.input_rx.try_recv() {
            self.record(&input);
        }

        let recorder = self.recorder.take();
        if !self.config.listen_for_hotkeys {
            self.capture.stop();
        }
        self.state.transition(SessionState::Idle)?;

        let summary = self.lock_script()?.summary();
        let session_id = recorder.map(|r| r.session_id()).unwrap_or_default();
        info!(
            %session_id,
            events = summary.total,
            duration_secs = summary.duration_secs,
            "Recording stopped"
        );
        self.emit(SessionEvent::RecordingStopped {
            session_id,
            event_count: summary.total,
            duration_secs: summary.duration_secs,
            timestamp: Utc::now(),
        });
        Ok(summary)
    }

    fn on_input(&mut self, input: CapturedInput) {
        if let RawInput::Key { key, pressed: true } = &input.input {
            if let Some(command) = self.hotkeys.lookup(key) {
                self.on_hotkey(command);
                return;
            }
        }
        self.record(&input);
    }

    fn record(&mut self, input: &CapturedInput) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        match self.script.lock() {
            Ok(mut script) => {
                recorder.handle(&mut script, input);
            }
            Err(e) => warn!(error = %e, "Script mutex poisoned, input dropped"),
        }
    }

    fn on_hotkey(&mut self, command: HotkeyCommand) {
        let state = self.state.current();
        if !command.applies_in(state) {
            debug!(?command, %state, "Hotkey ignored");
            return;
        }
        debug!(?command, "Hotkey pressed");
        let result = match command {
            HotkeyCommand::Record => self.start_recording(),
            HotkeyCommand::Stop => self.stop(),
            HotkeyCommand::Play => self.start_playback(None),
            HotkeyCommand::Pause => self.toggle_pause().map(|_| ()),
        };
        if let Err(e) = result {
            warn!(?command, error = %e, "Hotkey command failed");
        }
    }

    // =========================================================================
    // Playback
    // =========================================================================

    fn start_playback(&mut self, settings: Option<Settings>) -> Result<()> {
        let current = self.state.current();
        if !current.is_idle() {
            return Err(NamouseError::Session(format!(
                "Cannot start playback while {}",
                current
            )));
        }

        let settings = settings.unwrap_or_else(|| self.config.settings.clone());
        settings.validate()?;

        let snapshot = self.lock_script()?.clone();
        if snapshot.is_empty() {
            return Err(NamouseError::Session("No events to play".into()));
        }

        self.state.transition(SessionState::Playing { paused: false })?;
        let repeat_count = settings.effective_repeat_count();
        let handle = spawn_playback(
            Arc::new(snapshot),
            settings,
            Arc::clone(&self.actuator),
            self.playback_tx.clone(),
        );
        let session_id = Uuid::new_v4();
        self.playback = Some(ActivePlayback { handle, session_id });

        info!(%session_id, repeat_count, "Playback started");
        self.emit(SessionEvent::PlaybackStarted {
            session_id,
            repeat_count,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<bool> {
        let Some(active) = &self.playback else {
            return Err(NamouseError::Session("No playback running".into()));
        };
        let paused = active.handle.toggle_pause();
        let session_id = active.session_id;
        self.state.transition(SessionState::Playing { paused })?;

        let timestamp = Utc::now();
        if paused {
            info!(%session_id, "Playback paused");
            self.emit(SessionEvent::PlaybackPaused {
                session_id,
                timestamp,
            });
        } else {
            info!(%session_id, "Playback resumed");
            self.emit(SessionEvent::PlaybackResumed {
                session_id,
                timestamp,
            });
        }
        Ok(paused)
    }

    fn stop(&mut self) -> Result<()> {
        match self.state.current() {
            SessionState::Recording => self.stop_recording().map(|_| ()),
            SessionState::Playing { .. } => {
                if let Some(active) = &self.playback {
                    active.handle.stop();
                }
                Ok(())
            }
            SessionState::Idle => Err(NamouseError::Session("Nothing to stop".into())),
        }
    }

    fn on_playback_update(&mut self, update: PlaybackUpdate) {
        let Some(session_id) = self.playback.as_ref().map(|active| active.session_id) else {
            debug!(?update, "Update without an active playback");
            return;
        };
        match update {
            PlaybackUpdate::Progress {
                repeat,
                index,
                fraction,
            } => {
                self.emit(SessionEvent::PlaybackProgress {
                    session_id,
                    repeat,
                    index,
                    fraction,
                });
            }
            PlaybackUpdate::Finished(outcome) => {
                self.playback = None;
                self.state.reset();
                info!(%session_id, outcome = ?outcome, "Playback ended");
                for waiter in self.stop_waiters.drain(..) {
                    let _ = waiter.send(Ok(outcome.clone()));
                }
                self.emit(SessionEvent::PlaybackFinished {
                    session_id,
                    outcome,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    // =========================================================================
    // Script editing
    // =========================================================================

    fn require_idle(&self, action: &str) -> Result<()> {
        let current = self.state.current();
        if current.is_idle() {
            Ok(())
        } else {
            Err(NamouseError::Session(format!(
                "Cannot {} while {}",
                action, current
            )))
        }
    }

    fn optimize(&mut self) -> Result<usize> {
        self.require_idle("optimize")?;
        let (removed, remaining) = {
            let mut script = self.lock_script()?;
            let (optimized, removed) = optimize(&script);
            *script = optimized;
            (removed, script.len())
        };
        info!(removed, remaining, "Script optimized");
        self.emit(SessionEvent::ScriptOptimized {
            removed,
            remaining,
            timestamp: Utc::now(),
        });
        Ok(removed)
    }

    fn insert_delay(&mut self, index: usize, duration: f64) -> Result<()> {
        self.require_idle("insert a delay")?;
        self.lock_script()?.insert_delay(index, duration)?;
        info!(index, duration, "Delay inserted");
        self.emit(SessionEvent::DelayInserted {
            index,
            duration_secs: duration,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn delete_events(&mut self, indices: &[usize]) -> Result<usize> {
        self.require_idle("delete events")?;
        let count = self.lock_script()?.remove_indices(indices);
        info!(count, "Events deleted");
        self.emit(SessionEvent::EventsDeleted {
            count,
            timestamp: Utc::now(),
        });
        Ok(count)
    }

    fn clear(&mut self) -> Result<()> {
        self.require_idle("clear the script")?;
        self.lock_script()?.clear();
        info!("Script cleared");
        self.emit(SessionEvent::ScriptCleared {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn load_script(&mut self, script: Script, settings: Option<Settings>) -> Result<()> {
        self.require_idle("load a script")?;
        if let Some(settings) = &settings {
            settings.validate()?;
        }
        let event_count = script.len();
        *self.lock_script()? = script;
        if let Some(settings) = settings {
            self.config.settings = settings;
        }
        info!(events = event_count, "Script loaded");
        self.emit(SessionEvent::ScriptLoaded {
            event_count,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn shutdown(&mut self) {
        if let Some(active) = self.playback.take() {
            active.handle.stop();
            let outcome = active.handle.join().await;
            for waiter in self.stop_waiters.drain(..) {
                let _ = waiter.send(Ok(outcome.clone()));
            }
        }
        self.recorder = None;
        self.capture.stop();
        self.state.reset();
    }

    fn lock_script(&self) -> Result<MutexGuard<'_, Script>> {
        self.script
            .lock()
            .map_err(|e| NamouseError::Session(format!("Script mutex poisoned: {}", e)))
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event = event.event_name(), "Session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namouse_playback::MockActuator;
    use namouse_recorder::MockCapture;

    fn spawn(config: SessionConfig) -> (SessionHandle, MockCapture, Arc<MockActuator>) {
        let capture = MockCapture::new();
        let actuator = Arc::new(MockActuator::new());
        let handle = spawn_session(config, Box::new(capture.clone()), actuator.clone()).unwrap();
        (handle, capture, actuator)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (session, capture, _) = spawn(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.script_snapshot().unwrap().is_empty());
        assert!(!capture.is_running());
        assert_eq!(session.settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_recording_requires_idle() {
        let (session, _, _) = spawn(SessionConfig::default());
        session.start_recording().await.unwrap();
        let err = session.start_recording().await.unwrap_err();
        assert!(matches!(err, NamouseError::Session(_)));
        assert!(session.start_playback(None).await.is_err());
        assert!(session.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_capture_failure_returns_to_idle() {
        let capture = MockCapture::failing("hook refused");
        let session = spawn_session(
            SessionConfig::default(),
            Box::new(capture),
            Arc::new(MockActuator::new()),
        )
        .unwrap();
        let mut events = session.subscribe();

        let err = session.start_recording().await.unwrap_err();
        assert!(matches!(err, NamouseError::Capture(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::RecordingFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_listen_for_hotkeys_fails_fast() {
        let config = SessionConfig {
            listen_for_hotkeys: true,
            ..SessionConfig::default()
        };
        let result = spawn_session(
            config,
            Box::new(MockCapture::failing("no hook")),
            Arc::new(MockActuator::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_playback_rejects_empty_script() {
        let (session, _, _) = spawn(SessionConfig::default());
        let err = session.start_playback(None).await.unwrap_err();
        assert!(err.to_string().contains("No events"));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let (session, _, _) = spawn(SessionConfig::default());
        let bad = Settings {
            playback_speed: 0.0,
            ..Settings::default()
        };
        assert!(session.update_settings(bad).await.is_err());
        assert_eq!(session.settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_an_error() {
        let (session, _, _) = spawn(SessionConfig::default());
        assert!(session.stop().await.is_err());
        assert!(session.stop_playback().await.is_err());
        assert!(session.pause_or_resume_playback().await.is_err());
    }

    #[tokio::test]
    async fn test_requests_after_shutdown() {
        let (session, capture, _) = spawn(SessionConfig::default());
        session.start_recording().await.unwrap();
        session.shutdown().await.unwrap();

        assert!(!capture.is_running());
        let err = session.settings().await.unwrap_err();
        assert!(matches!(err, NamouseError::ShuttingDown));
    }
}
