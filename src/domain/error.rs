use thiserror::Error;

/// Why an acquisition attempt could not refresh the local package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("Device does not seem to be connected to the internet")]
    NetworkUnreachable,

    #[error("Portal request failed: {0}")]
    RemoteService(String),

    #[error("Unable to download the map: {0}")]
    Transfer(String),

    #[error("Unable to record the download: {0}")]
    Settings(String),
}

/// Errors surfaced to the desktop shell.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}
