//! namouse storage crate - script files on disk.
//!
//! Scripts are stored as pretty-printed JSON (`.nam`) holding the events, the
//! playback settings they were saved with, and descriptive metadata. Files
//! that are a bare array of events load with default settings.

pub mod script_file;

pub use script_file::{
    load, load_from_path, resolve_script_path, save, save_to_path, LoadedScript, Metadata,
    FORMAT_VERSION, SCRIPT_EXTENSION,
};
