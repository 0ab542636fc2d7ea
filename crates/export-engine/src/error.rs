//! Export error taxonomy.
//!
//! Every variant except [`ExportError::OutputDirectory`] is scoped to a
//! single job or entry and never stops the rest of the batch.

use std::path::PathBuf;

use hunyclip_clip_model::{BoundsViolation, CropRegion, FrameSize};
use hunyclip_common::HunyclipError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("{display_name}: crop {crop} does not fit the {source_size} source ({violation})")]
    InvalidRegion {
        display_name: String,
        crop: CropRegion,
        source_size: FrameSize,
        violation: BoundsViolation,
    },

    #[error("{display_name}: trim start {trim_start} is outside the clip's {frame_count} frames")]
    TrimOutOfRange {
        display_name: String,
        trim_start: u64,
        frame_count: u64,
    },

    #[error("{display_name}: no frame could be read at index {frame}: {detail}")]
    FrameReadFailure {
        display_name: String,
        frame: u64,
        detail: String,
    },

    #[error("{display_name}: {backend} failed: {diagnostic}")]
    BackendFailure {
        display_name: String,
        backend: String,
        diagnostic: String,
    },

    #[error("{display_name}: cannot open {path}: {detail}")]
    SourceUnavailable {
        display_name: String,
        path: PathBuf,
        detail: String,
    },

    #[error("{display_name}: cannot write {path}: {detail}")]
    OutputWrite {
        display_name: String,
        path: PathBuf,
        detail: String,
    },

    #[error("{display_name}: {path} is already written by an earlier job of this export")]
    OutputCollision { display_name: String, path: PathBuf },

    #[error("Cannot create output directory {path}: {detail}")]
    OutputDirectory { path: PathBuf, detail: String },
}

impl ExportError {
    /// Display name of the clip this error is about, if it is clip-scoped.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::InvalidRegion { display_name, .. }
            | Self::TrimOutOfRange { display_name, .. }
            | Self::FrameReadFailure { display_name, .. }
            | Self::BackendFailure { display_name, .. }
            | Self::SourceUnavailable { display_name, .. }
            | Self::OutputWrite { display_name, .. }
            | Self::OutputCollision { display_name, .. } => Some(display_name),
            Self::OutputDirectory { .. } => None,
        }
    }

    /// Whether this error ends the whole batch rather than one job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutputDirectory { .. })
    }
}

impl From<ExportError> for HunyclipError {
    fn from(err: ExportError) -> Self {
        HunyclipError::export(err.to_string())
    }
}

/// Result type for export operations.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_clip_and_values() {
        let err = ExportError::InvalidRegion {
            display_name: "clip.mp4".to_string(),
            crop: CropRegion::new(0, 0, 50, 200),
            source_size: FrameSize::new(100, 100),
            violation: BoundsViolation::ExceedsHeight,
        };
        let msg = err.to_string();
        assert!(msg.contains("clip.mp4"));
        assert!(msg.contains("(0, 0, 50x200)"));
        assert!(msg.contains("100x100"));
        assert_eq!(err.display_name(), Some("clip.mp4"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_output_directory_is_fatal() {
        let err = ExportError::OutputDirectory {
            path: PathBuf::from("/ro/cropped"),
            detail: "read-only file system".to_string(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.display_name(), None);
        assert!(HunyclipError::from(err).to_string().contains("/ro/cropped"));
    }
}
