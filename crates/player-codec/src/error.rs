//! Error types for the decoder contract.

use thiserror::Error;

/// Errors a decoding collaborator can raise.
#[derive(Debug, Clone, Error)]
pub enum DecoderError {
    /// The codec string or parameters are not supported.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfig(String),

    /// Configuration was rejected.
    #[error("Configuration failed: {0}")]
    Configuration(String),

    /// A chunk could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Flushing pending work failed.
    #[error("Flush failed: {0}")]
    Flush(String),

    /// A chunk arrived before `configure`.
    #[error("Decoder not configured")]
    NotConfigured,

    /// The decoder was closed.
    #[error("Decoder closed")]
    Closed,
}
