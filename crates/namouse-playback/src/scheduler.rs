//! Playback scheduling.
//!
//! `spawn_playback` replays a script snapshot on its own tokio task. Each
//! event is actuated when the scaled timeline reaches `event.time / speed`,
//! measured from the start of the current repeat. Pause holds the timeline:
//! the time spent paused moves the repeat start forward, so a resumed run
//! continues exactly where it stopped. Stop is a one-shot cancellation that
//! interrupts any wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use namouse_core::settings::Settings;
use namouse_core::types::{PlaybackOutcome, Script};

use crate::actuator::Actuator;
use crate::executor::{seconds, EventExecutor};

/// Progress notifications sent by a running playback.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    /// Event `index` of repeat `repeat` was actuated. `fraction` is its
    /// position on the script timeline, 0.0 to 1.0.
    Progress {
        repeat: u32,
        index: usize,
        fraction: f64,
    },
    /// Always the last update of a run.
    Finished(PlaybackOutcome),
}

/// Control handle for a running playback.
pub struct PlaybackHandle {
    cancel: CancellationToken,
    pause: watch::Sender<bool>,
    task: JoinHandle<PlaybackOutcome>,
}

impl PlaybackHandle {
    /// Returns `true` if the run was not already paused.
    pub fn pause(&self) -> bool {
        !self.pause.send_replace(true)
    }

    /// Returns `true` if the run was paused.
    pub fn resume(&self) -> bool {
        self.pause.send_replace(false)
    }

    /// Flip the pause flag and return the new state.
    pub fn toggle_pause(&self) -> bool {
        let paused = !*self.pause.borrow();
        self.pause.send_replace(paused);
        paused
    }

    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    /// Request a stop. No further event starts once the current one ends.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    pub async fn join(self) -> PlaybackOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => PlaybackOutcome::Failed(format!("playback task failed: {}", e)),
        }
    }
}

/// Start replaying `script` on a new task.
///
/// Must be called from within a tokio runtime. `updates` receives one
/// `Progress` per actuated event and a final `Finished`.
pub fn spawn_playback(
    script: Arc<Script>,
    settings: Settings,
    actuator: Arc<dyn Actuator>,
    updates: mpsc::UnboundedSender<PlaybackUpdate>,
) -> PlaybackHandle {
    let cancel = CancellationToken::new();
    let (pause_tx, pause_rx) = watch::channel(false);

    let finished = updates.clone();
    let mut player = Player {
        executor: EventExecutor::new(actuator, settings.clone(), cancel.clone()),
        settings,
        cancel: cancel.clone(),
        pause: pause_rx,
        pause_open: true,
        updates,
    };

    let task = tokio::spawn(async move {
        // The run gets its own task so a panic still ends in `Finished`.
        let run = tokio::spawn(async move { player.play(&script).await });
        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(e) => PlaybackOutcome::Failed(format!("playback task failed: {}", e)),
        };
        match &outcome {
            PlaybackOutcome::Failed(reason) => error!(reason = %reason, "Playback aborted"),
            other => info!(outcome = ?other, "Playback finished"),
        }
        let _ = finished.send(PlaybackUpdate::Finished(outcome.clone()));
        outcome
    });

    PlaybackHandle {
        cancel,
        pause: pause_tx,
        task,
    }
}

struct Player {
    executor: EventExecutor,
    settings: Settings,
    cancel: CancellationToken,
    pause: watch::Receiver<bool>,
    /// False once the handle is gone; pause can no longer change.
    pause_open: bool,
    updates: mpsc::UnboundedSender<PlaybackUpdate>,
}

impl Player {
    async fn play(&mut self, script: &Script) -> PlaybackOutcome {
        let repeats = self.settings.effective_repeat_count();
        let speed = self.settings.playback_speed;
        let total = script.duration();
        info!(events = script.len(), repeats, speed, "Playback started");

        for repeat in 0..repeats {
            if repeat > 0 && self.settings.repeat_interval > 0.0 {
                tokio::select! {
                    _ = self.cancel.cancelled() => return PlaybackOutcome::Stopped,
                    _ = sleep(seconds(self.settings.repeat_interval)) => {}
                }
            }

            let mut repeat_start = Instant::now();
            debug!(repeat, "Repeat started");

            for (index, event) in script.iter().enumerate() {
                let target = seconds(event.time() / speed);
                if !self.wait_until(&mut repeat_start, target).await {
                    return PlaybackOutcome::Stopped;
                }

                if let Err(e) = self.executor.execute(event).await {
                    return PlaybackOutcome::Failed(e.to_string());
                }

                let fraction = if total > 0.0 { event.time() / total } else { 0.0 };
                let _ = self.updates.send(PlaybackUpdate::Progress {
                    repeat,
                    index,
                    fraction,
                });
            }
        }
        PlaybackOutcome::Completed
    }

    /// Sleep until `repeat_start + target`, holding while paused.
    ///
    /// Returns `false` if the run was stopped.
    async fn wait_until(&mut self, repeat_start: &mut Instant, target: Duration) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }

            if self.pause_open && *self.pause.borrow_and_update() {
                let paused_at = Instant::now();
                debug!("Playback paused");
                let pause = &mut self.pause;
                let resumed = tokio::select! {
                    _ = self.cancel.cancelled() => return false,
                    resumed = async { pause.wait_for(|paused| !*paused).await.is_ok() } => resumed,
                };
                if !resumed {
                    self.pause_open = false;
                }
                *repeat_start += paused_at.elapsed();
                debug!(paused_for = ?paused_at.elapsed(), "Playback resumed");
                continue;
            }

            let Some(deadline) = repeat_start.checked_add(target) else {
                // Past the end of the clock: nothing left but a stop.
                self.cancel.cancelled().await;
                return false;
            };
            if Instant::now() >= deadline {
                return true;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                changed = self.pause.changed(), if self.pause_open => {
                    if changed.is_err() {
                        self.pause_open = false;
                    }
                }
                _ = sleep_until(deadline) => return true,
            }
        }
    }
}
