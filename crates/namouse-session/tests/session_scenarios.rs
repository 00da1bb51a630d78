//! End-to-end session scenarios driven through `SessionHandle`, with input
//! injected through `MockCapture` and actuation observed on `MockActuator`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use namouse_core::config::HotkeyConfig;
use namouse_core::error::NamouseError;
use namouse_core::events::SessionEvent;
use namouse_core::settings::Settings;
use namouse_core::types::{Event, Key, MouseButton, PlaybackOutcome, Script};
use namouse_playback::{Action, MockActuator};
use namouse_recorder::{InputCapture, MockCapture, RawInput};
use namouse_session::{spawn_session, SessionConfig, SessionHandle, SessionState};

fn spawn(config: SessionConfig) -> (SessionHandle, MockCapture, Arc<MockActuator>) {
    let capture = MockCapture::new();
    let actuator = Arc::new(MockActuator::new());
    let session = spawn_session(config, Box::new(capture.clone()), actuator.clone()).unwrap();
    (session, capture, actuator)
}

/// Receive events until one matches, returning everything seen.
async fn wait_for(
    rx: &mut broadcast::Receiver<SessionEvent>,
    done: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = rx.recv().await.unwrap();
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

fn is_finished(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::PlaybackFinished { .. })
}

fn click(pressed: bool) -> RawInput {
    RawInput::Click {
        x: 100,
        y: 200,
        button: MouseButton::Left,
        pressed,
    }
}

fn key_script(times: &[f64]) -> Script {
    Script::from_events(
        times
            .iter()
            .map(|&time| Event::KeyPress {
                time,
                key: Key::Char('k'),
            })
            .collect(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_record_optimize_play_round_trip() {
    let (session, capture, actuator) = spawn(SessionConfig::default());
    let mut events = session.subscribe();

    session.start_recording().await.unwrap();
    assert_eq!(session.state(), SessionState::Recording);

    let t = Instant::now();
    capture.emit_at(t, RawInput::Move { x: 100, y: 200 });
    capture.emit_at(t + Duration::from_millis(50), click(true));
    capture.emit_at(t + Duration::from_millis(60), click(false));

    let summary = session.stop_recording().await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!((summary.moves, summary.clicks), (1, 2));
    assert_eq!(session.state(), SessionState::Idle);

    let recorded = session.script_snapshot().unwrap();
    let gap = recorded.events()[2].time() - recorded.events()[1].time();
    assert!((gap - 0.01).abs() < 1e-6);

    assert_eq!(session.optimize().await.unwrap(), 0);
    assert_eq!(session.script_snapshot().unwrap(), recorded);

    session.start_playback(None).await.unwrap();
    assert!(session.state().is_playing());
    let seen = wait_for(&mut events, is_finished).await;
    assert_eq!(session.state(), SessionState::Idle);

    let names: Vec<&str> = seen.iter().map(SessionEvent::event_name).collect();
    assert_eq!(
        names,
        vec![
            "recording_started",
            "recording_stopped",
            "script_optimized",
            "playback_started",
            "playback_progress",
            "playback_progress",
            "playback_progress",
            "playback_finished",
        ]
    );
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::PlaybackFinished {
            outcome: PlaybackOutcome::Completed,
            ..
        })
    ));

    let actions = actuator.actions();
    assert_eq!(actions[0].action, Action::SetPosition { x: 100, y: 200 });
    let buttons: Vec<_> = actions
        .iter()
        .filter(|a| matches!(a.action, Action::Button { .. }))
        .collect();
    assert_eq!(buttons.len(), 2);
    assert_eq!(
        buttons[0].action,
        Action::Button {
            button: MouseButton::Left,
            pressed: true
        }
    );
    assert!(buttons[1].at - buttons[0].at >= Duration::from_millis(10));

    // The script survives playback and can be replayed.
    assert_eq!(session.script_snapshot().unwrap().len(), 3);
    session.start_playback(None).await.unwrap();
    wait_for(&mut events, is_finished).await;
}

#[tokio::test]
async fn test_recording_clears_previous_script() {
    let (session, capture, _) = spawn(SessionConfig::default());
    session
        .load_script(key_script(&[0.0, 1.0]), None)
        .await
        .unwrap();

    session.start_recording().await.unwrap();
    assert!(session.script_snapshot().unwrap().is_empty());
    capture.emit(RawInput::Key {
        key: Key::Char('x'),
        pressed: true,
    });
    let summary = session.stop_recording().await.unwrap();
    assert_eq!(summary.keys, 1);
    assert!(!capture.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_hotkeys_drive_the_session() {
    let config = SessionConfig {
        listen_for_hotkeys: true,
        hotkeys: HotkeyConfig::default(),
        ..SessionConfig::default()
    };
    let (session, capture, actuator) = spawn(config);
    let mut events = session.subscribe();
    let press = |name: &str| RawInput::Key {
        key: Key::from_name(name),
        pressed: true,
    };
    let release = |name: &str| RawInput::Key {
        key: Key::from_name(name),
        pressed: false,
    };

    // Typing while idle records nothing.
    capture.emit(press("a"));

    capture.emit(press("f9"));
    capture.emit(release("f9"));
    capture.emit(press("b"));
    capture.emit(release("b"));
    capture.emit(press("F10"));
    capture.emit(release("F10"));

    let seen = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::RecordingStopped { .. })
    })
    .await;
    assert!(matches!(seen[0], SessionEvent::RecordingStarted { .. }));
    assert!(matches!(
        seen[1],
        SessionEvent::RecordingStopped { event_count: 2, .. }
    ));
    assert!(capture.is_running());

    // Pause is ignored while idle; play starts a run.
    capture.emit(press("f12"));
    capture.emit(press("f11"));
    wait_for(&mut events, is_finished).await;

    assert_eq!(
        actuator.action_log(),
        vec![
            Action::Key {
                key: namouse_core::types::ResolvedKey::Char('b'),
                pressed: true
            },
            Action::Key {
                key: namouse_core::types::ResolvedKey::Char('b'),
                pressed: false
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_playback_cancels_pending_events() {
    let (session, _, actuator) = spawn(SessionConfig::default());
    session
        .load_script(key_script(&[0.0, 10.0, 20.0]), None)
        .await
        .unwrap();

    session.start_playback(None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let outcome = session.stop_playback().await.unwrap();
    assert_eq!(outcome, PlaybackOutcome::Stopped);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(actuator.actions().len(), 1);

    // Nothing else is actuated later on.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(actuator.actions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume() {
    let (session, _, actuator) = spawn(SessionConfig::default());
    let mut events = session.subscribe();
    session
        .load_script(key_script(&[0.0, 1.0]), None)
        .await
        .unwrap();

    session.start_playback(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(session.pause_or_resume_playback().await.unwrap());
    assert_eq!(session.state(), SessionState::Playing { paused: true });
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(actuator.actions().len(), 1);

    assert!(!session.pause_or_resume_playback().await.unwrap());
    assert_eq!(session.state(), SessionState::Playing { paused: false });

    let seen = wait_for(&mut events, is_finished).await;
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::PlaybackPaused { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::PlaybackResumed { .. })));
    assert_eq!(actuator.actions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_editing_rejected_during_playback() {
    let (session, _, _) = spawn(SessionConfig::default());
    session
        .load_script(key_script(&[0.0, 5.0]), None)
        .await
        .unwrap();
    session.start_playback(None).await.unwrap();

    for result in [
        session.optimize().await.map(|_| ()),
        session.insert_delay(0, 1.0).await,
        session.delete_events(vec![0]).await.map(|_| ()),
        session.clear().await,
        session.start_recording().await,
        session.start_playback(None).await,
    ] {
        assert!(matches!(result, Err(NamouseError::Session(_))));
    }

    session.stop().await.unwrap();
    let mut events = session.subscribe();
    if session.state().is_playing() {
        wait_for(&mut events, is_finished).await;
    }
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_script_editing_commands() {
    let (session, _, _) = spawn(SessionConfig::default());
    let mut events = session.subscribe();
    session
        .load_script(key_script(&[0.0, 0.5, 1.0]), None)
        .await
        .unwrap();

    session.insert_delay(1, 2.0).await.unwrap();
    let script = session.script_snapshot().unwrap();
    assert_eq!(script.len(), 4);
    assert!(script.events()[1].is_delay());
    assert_eq!(script.events()[1].time(), 0.0);
    assert_eq!(script.events()[2].time(), 2.5);
    assert_eq!(script.events()[3].time(), 3.0);

    assert!(session.insert_delay(10, 1.0).await.is_err());

    assert_eq!(session.delete_events(vec![1, 1, 42]).await.unwrap(), 1);
    assert_eq!(session.script_snapshot().unwrap().len(), 3);

    session.clear().await.unwrap();
    assert!(session.script_snapshot().unwrap().is_empty());

    let names: Vec<&str> = [
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
    ]
    .iter()
    .map(SessionEvent::event_name)
    .collect();
    assert_eq!(
        names,
        vec![
            "script_loaded",
            "delay_inserted",
            "events_deleted",
            "script_cleared"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_playback_settings_override_is_per_run() {
    let (session, _, actuator) = spawn(SessionConfig::default());
    let mut events = session.subscribe();
    session
        .load_script(key_script(&[0.0, 1.0]), None)
        .await
        .unwrap();

    let fast = Settings {
        playback_speed: 4.0,
        repeat_count: 2,
        ..Settings::default()
    };
    let start = tokio::time::Instant::now();
    session.start_playback(Some(fast)).await.unwrap();
    wait_for(&mut events, is_finished).await;

    let actions = actuator.actions();
    assert_eq!(actions.len(), 4);
    assert!(actions[1].at - start >= Duration::from_millis(250));
    assert!(actions[1].at - start < Duration::from_millis(300));
    assert_eq!(session.settings().await.unwrap(), Settings::default());
}

#[tokio::test]
async fn test_load_script_replaces_settings() {
    let (session, _, _) = spawn(SessionConfig::default());
    let settings = Settings {
        repeat_count: 0,
        ..Settings::default()
    };
    session
        .load_script(key_script(&[0.0]), Some(settings.clone()))
        .await
        .unwrap();
    assert_eq!(session.settings().await.unwrap(), settings);
    assert_eq!(session.settings().await.unwrap().effective_repeat_count(), 9999);
}

#[tokio::test(start_paused = true)]
async fn test_extreme_coordinates_return_session_to_idle() {
    let (session, _, actuator) = spawn(SessionConfig::default());
    let mut events = session.subscribe();
    let script = Script::from_events(vec![
        Event::MouseMove {
            time: 0.0,
            x: i32::MIN,
            y: i32::MIN,
        },
        Event::MouseClick {
            time: 0.1,
            x: i32::MAX,
            y: i32::MAX,
            button: MouseButton::Right,
            pressed: true,
        },
    ])
    .unwrap();
    let settings = Settings {
        mouse_smoothing: true,
        ..Settings::default()
    };
    session.load_script(script, Some(settings)).await.unwrap();

    session.start_playback(None).await.unwrap();
    let seen = wait_for(&mut events, is_finished).await;
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::PlaybackFinished {
            outcome: PlaybackOutcome::Completed,
            ..
        })
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(actuator.current_position(), (i32::MAX, i32::MAX));

    session.start_recording().await.unwrap();
    session.stop_recording().await.unwrap();
}
