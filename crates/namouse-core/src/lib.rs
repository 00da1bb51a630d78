pub mod config;
pub mod error;
pub mod events;
pub mod settings;
pub mod types;

pub use config::NamouseConfig;
pub use error::{NamouseError, Result};
pub use settings::Settings;
pub use types::*;
