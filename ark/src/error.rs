use thiserror::Error;

/// Errors returned while reading or writing Kaldi archives.
#[derive(Debug, Error)]
pub enum ArkError {
    #[error("ark: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ark: unexpected end of stream")]
    UnexpectedEof,

    #[error("ark: invalid key {0:?}")]
    InvalidKey(String),

    #[error("ark: unsupported matrix type {0:?}")]
    UnsupportedType(String),

    #[error("ark: invalid binary header: {0}")]
    InvalidHeader(String),

    #[error("ark: invalid text matrix: {0}")]
    InvalidText(String),

    #[error("ark: failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for archive operations.
pub type ArkResult<T> = Result<T, ArkError>;
