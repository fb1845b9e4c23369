//! Error types for carillon-audio

use thiserror::Error;

/// Audio playback error type
#[derive(Debug, Error)]
pub enum Error {
    /// Audio device error
    #[error("audio device error: {0}")]
    Device(String),

    /// Audio stream error
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Sound file could not be decoded
    #[error("cannot decode sound file: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
