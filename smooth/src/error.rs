use ctcsmooth_ark::ArkError;
use thiserror::Error;

/// Errors returned by the smoother.
#[derive(Debug, Error)]
pub enum SmoothError {
    #[error(transparent)]
    Ark(#[from] ArkError),

    #[error(
        "shape mismatch for {key}: expected {expected_rows}x{expected_cols}, got {got_rows}x{got_cols}"
    )]
    ShapeMismatch {
        key: String,
        expected_rows: usize,
        expected_cols: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("no input streams")]
    NoStreams,

    #[error("config: {0}")]
    Config(String),

    #[error("config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

/// Result alias for smoother operations.
pub type SmoothResult<T> = Result<T, SmoothError>;
