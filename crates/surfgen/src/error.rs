use cloud_io::CloudError;
use thiserror::Error;

pub type SynthResult<T> = Result<T, SynthError>;

#[derive(Debug, Error)]
pub enum SynthError {
    /// A configuration value violates a precondition.
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl SynthError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}
