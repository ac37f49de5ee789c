use std::path::PathBuf;
use thiserror::Error;

pub type CloudResult<T> = Result<T, CloudError>;

/// Failures surfaced while loading, validating or writing point clouds.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Referenced input path does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Extension is not one of `.ply`, `.pcd`, `.off`.
    #[error("unsupported point cloud format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// A point table is not a non-empty list of xyz triples, or attribute
    /// arrays do not line up with the positions.
    #[error("invalid point array shape: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Malformed file content.
    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Map an `io::Error` raised while opening `path` into `NotFound` when
    /// appropriate.
    pub(crate) fn opening(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}
