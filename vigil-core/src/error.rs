use thiserror::Error;

/// All errors produced by vigil-core.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("audio source error: {0}")]
    AudioSource(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("a screening session is already running")]
    AlreadyRunning,

    #[error("no screening session is running")]
    NotRunning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VigilError>;
