use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Shared error type for the ingestion kernel.
///
/// Validation failures are detected before any I/O begins and never touch
/// the underlying byte source. [`IngestError::DuplicateContent`] is an
/// expected business outcome and must not be treated as an I/O fault.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Content already stored with digest {digest}")]
    DuplicateContent {
        digest: String,
        existing: Option<String>,
    },
    #[error("Storage error: {0} {1}")]
    Storage(String, String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IngestError {
    /// Whether the error is the dedup-gate rejection rather than a fault.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestError::DuplicateContent { .. })
    }
}
