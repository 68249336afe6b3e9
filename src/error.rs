use thiserror::Error;

/// Errors surfaced by the host layer (config files and exports).
///
/// The simulation core itself has no recoverable errors.
#[derive(Debug, Error)]
pub enum SandError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to encode gif: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, SandError>;
