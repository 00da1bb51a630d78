//! namouse playback crate - replays scripts against an input device.
//!
//! The `EventExecutor` turns one script event into device actions through the
//! `Actuator` seam, and `spawn_playback` drives the executor over a whole
//! script on its own task with speed scaling, repeats, pause and stop.

pub mod actuator;
pub mod executor;
pub mod keymap;
pub mod scheduler;

pub use actuator::{Action, Actuator, MockActuator, RecordedAction, SystemActuator};
pub use executor::EventExecutor;
pub use scheduler::{spawn_playback, PlaybackHandle, PlaybackUpdate};
