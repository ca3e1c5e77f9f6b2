//! Error types shared across the crate

use thiserror::Error;

/// Errors raised while turning source bytes into samples.
///
/// These never reach the user: a clip whose source fails to decode plays
/// silently and shows an empty waveform.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to probe media: {0}")]
    Probe(#[from] symphonia::core::errors::Error),

    #[error("No decodable audio track found")]
    NoTrack,

    #[error("Missing sample rate")]
    MissingSampleRate,

    #[error("Decoded source contains no samples")]
    Empty,
}

/// Errors raised by an asset fetcher
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to read asset: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a source could not be loaded
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Offline render failures. The only error category propagated to callers.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid render window: start={start}s duration={duration}s")]
    InvalidWindow { start: f64, duration: f64 },

    #[error("Invalid sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    #[error("Render of {frames} frames exceeds the allowed maximum")]
    TooLarge { frames: usize },

    #[error("Failed to write WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading a project document
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Malformed project: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported project version: {0}")]
    UnsupportedVersion(u64),
}

/// Errors raised while reading or writing the config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Audio device failures
#[cfg(feature = "device")]
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("No output device available")]
    NoDevice,

    #[error("Failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type RenderResult<T> = Result<T, RenderError>;
