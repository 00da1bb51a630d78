//! namouse recorder crate - turns live input into a compact, time-ordered script.
//!
//! Provides the `Recorder` that applies move filters and timestamps raw input,
//! the `optimize` compaction pass, and the `InputCapture` seam through which
//! platform listeners deliver raw input.

pub mod capture;
pub mod optimizer;
pub mod recorder;

pub use capture::{CapturedInput, InputCapture, InputSink, MockCapture, RawInput, SystemCapture};
pub use optimizer::{optimize, MOVE_MERGE_WINDOW_SECS};
pub use recorder::{Recorder, RecorderConfig, MIN_MOVE_INTERVAL};
