//! Error types shared across HunyClip crates.

use std::path::PathBuf;

/// Top-level error type for HunyClip operations.
#[derive(Debug, thiserror::Error)]
pub enum HunyclipError {
    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Frame source error: {message}")]
    FrameSource { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using HunyclipError.
pub type HunyclipResult<T> = Result<T, HunyclipError>;

impl HunyclipError {
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn frame_source(msg: impl Into<String>) -> Self {
        Self::FrameSource {
            message: msg.into(),
        }
    }
}
