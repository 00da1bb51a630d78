//! namouse session crate - the single owner of recording and playback state.
//!
//! A `SessionActor` runs on its own task and serializes every transition:
//! control requests from `SessionHandle`, raw input from the capture layer
//! (including hotkey presses) and progress from the running playback all
//! arrive as messages on one loop.

pub mod controller;
pub mod hotkey;
pub mod state;

pub use controller::{spawn_session, SessionConfig, SessionHandle};
pub use hotkey::{HotkeyCommand, HotkeyMap};
pub use state::{SessionState, StateMachine};
