//! Playback and recording settings.
//!
//! A `Settings` value is sampled once when a playback run starts and passed
//! by value into the scheduler, so edits made while a run is in flight only
//! take effect on the next run.

use serde::{Deserialize, Serialize};

use crate::error::{NamouseError, Result};

/// Repeat bound used when the repeat count is 0.
///
/// Large enough to feel unbounded, finite so a run can always end.
pub const UNBOUNDED_REPEAT_COUNT: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeline speed multiplier. 2.0 replays twice as fast.
    pub playback_speed: f64,
    /// Number of full playthroughs. 0 means `UNBOUNDED_REPEAT_COUNT`.
    pub repeat_count: u32,
    /// Seconds to wait between playthroughs.
    pub repeat_interval: f64,
    /// Interpolate pointer moves in a few small steps.
    pub mouse_smoothing: bool,
    /// Drop recorded moves smaller than `minimal_movement_threshold` on both axes.
    pub ignore_minimal_movements: bool,
    /// Pixel threshold for `ignore_minimal_movements`.
    pub minimal_movement_threshold: u32,
    /// Re-assert and verify the pointer position before acting.
    pub force_position: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            playback_speed: 1.0,
            repeat_count: 1,
            repeat_interval: 0.0,
            mouse_smoothing: false,
            ignore_minimal_movements: true,
            minimal_movement_threshold: 3,
            force_position: true,
        }
    }
}

impl Settings {
    /// Number of playthroughs a run will perform.
    pub fn effective_repeat_count(&self) -> u32 {
        if self.repeat_count == 0 {
            UNBOUNDED_REPEAT_COUNT
        } else {
            self.repeat_count
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.playback_speed.is_finite() || self.playback_speed <= 0.0 {
            return Err(NamouseError::Config(format!(
                "playback_speed must be a positive number, got {}",
                self.playback_speed
            )));
        }
        if !self.repeat_interval.is_finite() || self.repeat_interval < 0.0 {
            return Err(NamouseError::Config(format!(
                "repeat_interval must be >= 0, got {}",
                self.repeat_interval
            )));
        }
        Ok(())
    }
}
