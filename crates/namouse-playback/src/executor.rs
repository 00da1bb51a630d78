//! Executes single script events against an `Actuator`.
//!
//! Pointer-targeted events re-assert the pointer position before acting.
//! Some shell surfaces (the taskbar in particular) snap the cursor away after
//! the first move, so the position is set, read back and set again until it
//! sticks or the attempts run out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use namouse_core::error::Result;
use namouse_core::settings::Settings;
use namouse_core::types::{Event, Key, MouseButton};

use crate::actuator::Actuator;

const FORCE_ATTEMPTS: usize = 3;
const FORCE_SETTLE: Duration = Duration::from_millis(5);
/// Pixels of read-back error accepted per axis.
const FORCE_TOLERANCE: u32 = 1;

const SMOOTHING_STEPS: i32 = 3;
const SMOOTHING_STEP_DELAY: Duration = Duration::from_millis(3);

const CLICK_SETTLE: Duration = Duration::from_millis(30);
const CLICK_RECHECK: Duration = Duration::from_millis(10);
const CLICK_HOLD: Duration = Duration::from_millis(10);
const SCROLL_SETTLE: Duration = Duration::from_millis(20);

/// Convert seconds to a `Duration`, mapping negative or NaN input to zero.
pub(crate) fn seconds(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

pub struct EventExecutor {
    actuator: Arc<dyn Actuator>,
    settings: Settings,
    cancel: CancellationToken,
}

impl EventExecutor {
    pub fn new(actuator: Arc<dyn Actuator>, settings: Settings, cancel: CancellationToken) -> Self {
        Self {
            actuator,
            settings,
            cancel,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Perform one event. Errors come from the actuator and are not retried.
    pub async fn execute(&self, event: &Event) -> Result<()> {
        trace!(event = event.type_name(), time = event.time(), "Executing event");
        match event {
            Event::MouseMove { x, y, .. } => {
                if self.settings.mouse_smoothing {
                    self.smooth_move(*x, *y).await
                } else {
                    self.force_position(*x, *y).await
                }
            }
            Event::MouseClick {
                x,
                y,
                button,
                pressed,
                ..
            } => self.click(*x, *y, *button, *pressed).await,
            Event::MouseScroll { x, y, dx, dy, .. } => {
                self.force_position(*x, *y).await?;
                sleep(SCROLL_SETTLE).await;
                self.actuator.scroll(*dx, *dy)
            }
            Event::KeyPress { key, .. } => self.key(key, true),
            Event::KeyRelease { key, .. } => self.key(key, false),
            Event::Delay { duration, .. } => {
                let wait = seconds(duration / self.settings.playback_speed);
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = sleep(wait) => {}
                }
                Ok(())
            }
        }
    }

    /// Move the pointer and verify it landed, retrying a few times.
    ///
    /// Without `force_position` this is a single unverified move. Exhausting
    /// the attempts is not an error: the pointer is left where it ended up.
    pub async fn force_position(&self, x: i32, y: i32) -> Result<()> {
        if !self.settings.force_position {
            return self.actuator.set_position(x, y);
        }

        for attempt in 1..=FORCE_ATTEMPTS {
            self.actuator.set_position(x, y)?;
            sleep(FORCE_SETTLE).await;
            let (cx, cy) = self.actuator.position()?;
            if cx.abs_diff(x) <= FORCE_TOLERANCE && cy.abs_diff(y) <= FORCE_TOLERANCE {
                return Ok(());
            }
            debug!(attempt, x, y, cx, cy, "Pointer position did not stick");
        }
        Ok(())
    }

    async fn smooth_move(&self, x: i32, y: i32) -> Result<()> {
        let (sx, sy) = self.actuator.position()?;
        for step in 1..=SMOOTHING_STEPS {
            if self.cancel.is_cancelled() {
                break;
            }
            let t = f64::from(step) / f64::from(SMOOTHING_STEPS);
            // Interpolate in f64: the i32 difference can overflow.
            let ix = f64::from(sx) + (f64::from(x) - f64::from(sx)) * t;
            let iy = f64::from(sy) + (f64::from(y) - f64::from(sy)) * t;
            self.force_position(ix as i32, iy as i32).await?;
            sleep(SMOOTHING_STEP_DELAY).await;
        }
        Ok(())
    }

    async fn click(&self, x: i32, y: i32, button: MouseButton, pressed: bool) -> Result<()> {
        self.force_position(x, y).await?;
        sleep(CLICK_SETTLE).await;
        self.force_position(x, y).await?;
        sleep(CLICK_RECHECK).await;
        self.actuator.button(button, pressed)?;
        sleep(CLICK_HOLD).await;
        Ok(())
    }

    fn key(&self, key: &Key, pressed: bool) -> Result<()> {
        match key.resolve() {
            Ok(resolved) => self.actuator.key(resolved, pressed),
            Err(unresolved) => {
                debug!(%unresolved, "Skipping key");
                Ok(())
            }
        }
    }
}
