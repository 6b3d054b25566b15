//! Error types shared across the player subsystems.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the playback engine and its audio backend.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("no track is selected")]
    NoTrackSelected,

    #[error("the current playlist is empty")]
    EmptyPlaylist,

    #[error("audio backend failed to start: {0}")]
    BackendInit(String),

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("failed to start {name} thread: {reason}")]
    WorkerSpawn { name: &'static str, reason: String },
}

/// Failures raised inside the mixer backend (device, stream and decoder).
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no output device available")]
    NoOutputDevice,

    #[error("output stream error: {0}")]
    Stream(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("resampler error: {0}")]
    Resample(String),
}

/// Failures raised by the serial hardware link.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("failed to open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("hardware link is not connected")]
    NotConnected,

    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised by playlist management and persistence.
#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("playlist '{0}' not found")]
    NotFound(String),

    #[error("playlist '{0}' already exists")]
    AlreadyExists(String),

    #[error("playlist name must not be empty")]
    InvalidName,

    #[error("playlist file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("playlist format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failures raised while reading or writing tags.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read tags from {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write tags to {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// Top-level error for the application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the application error.
pub type Result<T> = std::result::Result<T, Error>;
