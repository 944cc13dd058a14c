//! Error types for the audio core

use std::fmt;
use std::path::PathBuf;

use crate::backend::BufferId;

/// Failure type returned by decoder factories.
///
/// Factories may fail for any reason (I/O, malformed headers, backend
/// rejection), so the registry accepts any boxed error and keeps it as the
/// `source()` of [`AudioError::Creation`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of the registry a decoder belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    /// Fully decoded one-shot effect
    Sound,
    /// Streamed long-running playback
    Music,
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderKind::Sound => f.write_str("sound"),
            DecoderKind::Music => f.write_str("music"),
        }
    }
}

/// Errors surfaced by the audio system's public surface
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Registration with an empty extension
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No decoder registered for the file's extension
    #[error("unknown file extension for {kind}: {file}")]
    UnsupportedFormat {
        /// Sound or music lookup
        kind: DecoderKind,
        /// File identity
        file: String,
    },

    /// The decoder for a recognized extension failed to construct
    #[error("error creating {kind} {decoder} for file: {file}")]
    Creation {
        /// Sound or music construction
        kind: DecoderKind,
        /// Type name of the factory that failed
        decoder: &'static str,
        /// File identity
        file: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// The audio context could not be brought up
    #[error("error initializing audio backend")]
    Init(#[source] BackendError),

    /// Raw PCM device could not be opened
    #[error("audio device error: {0}")]
    Device(String),
}

/// Errors reported by an [`AudioBackend`](crate::backend::AudioBackend)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Audio context could not be created
    #[error("audio context initialization failed: {0}")]
    InitFailed(String),

    /// Hardware refused to create another voice
    #[error("no more hardware voices available")]
    VoiceUnavailable,

    /// Hardware refused to create another buffer
    #[error("no more hardware buffers available")]
    BufferUnavailable,

    /// Operation on a buffer the backend doesn't know
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferId),

    /// Buffer upload rejected (empty data, bad layout)
    #[error("buffer upload rejected: {0}")]
    InvalidData(String),
}

/// Errors raised by the built-in decoders
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Reading the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV container or sample decoding failed
    #[error("WAV decode failed: {0}")]
    Wav(#[from] hound::Error),

    /// Compressed stream decoding failed
    #[error("decode failed: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),

    /// Only mono and stereo sources can be bound to a voice
    #[error("unsupported channel count {0} (mono or stereo only)")]
    UnsupportedChannels(u16),

    /// Header declares a rate no voice can play
    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(u32),

    /// Container holds no decodable audio track
    #[error("no audio track found")]
    NoTrack,

    /// The source decoded to zero samples
    #[error("no audio data")]
    Empty,

    /// Backend rejected a buffer operation
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors while loading or saving [`AudioConfig`](crate::config::AudioConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("failed to access {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// File contents are not valid config TOML
    #[error("invalid audio config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered as TOML
    #[error("failed to serialize audio config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
