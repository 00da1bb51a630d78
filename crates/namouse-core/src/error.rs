use thiserror::Error;

/// Top-level error type for the namouse engine.
///
/// None of these are fatal to the process. Every failure path returns the
/// session to `Idle` and surfaces the error to whoever issued the command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NamouseError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input listener could not be started.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A single device action (move, click, scroll, key) failed.
    #[error("Actuation error: {0}")]
    Actuation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A command was rejected by the session state machine.
    #[error("Session error: {0}")]
    Session(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for NamouseError {
    fn from(err: toml::de::Error) -> Self {
        NamouseError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NamouseError {
    fn from(err: toml::ser::Error) -> Self {
        NamouseError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NamouseError {
    fn from(err: serde_json::Error) -> Self {
        NamouseError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for namouse operations.
pub type Result<T> = std::result::Result<T, NamouseError>;
