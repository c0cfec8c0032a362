use std::io;
use thiserror::Error;

/// Error types for emitter configuration and template loading
#[derive(Error, Debug)]
pub enum EmitterError {
    /// I/O Error while reading an effect library
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A template parameter is outside its valid range
    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    /// The emitter has no usable particle templates
    #[error("Emitter `{0}` has no particle templates")]
    NoParticleTemplates(String),

    /// The requested emitter is not part of the effect library
    #[error("Unknown emitter: {0}")]
    UnknownEmitter(String),

    /// Keyframe times are not ordered within [0, 1]
    #[error("Invalid keyframe table: {0}")]
    InvalidKeyframes(String),

    /// Animated texture frame list or tiling is malformed
    #[error("Invalid animated texture: {0}")]
    InvalidAnimation(String),

    /// Error while decoding an effect library document
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl EmitterError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type using EmitterError
pub type Result<T> = std::result::Result<T, EmitterError>;
