//! Pipeline error taxonomy.
//!
//! Every failure carries a stable [`ErrorKind`] so the presentation layer
//! can map it to retry / acknowledge / open-settings UI without parsing
//! message text.

use campusvault_protocol::ExistingResource;

/// Transport-level errors from the backend or the storage target.
///
/// Timeouts are distinct from server-reported validation errors; both are
/// distinct from connection-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected request: {0}")]
    Validation(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Stable, client-observable error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileTooLarge,
    PermissionDenied,
    HashComputation,
    DuplicateFound,
    MissingField,
    Network,
    Timeout,
    ServerValidation,
    TransferInterrupted,
    FinalizeFailed,
    Cancelled,
}

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file too large: {size_bytes} bytes (max {max_bytes})")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("storage permission denied; grant file access in system settings")]
    PermissionDenied,

    #[error("could not read file for hashing: {0}")]
    HashComputation(#[from] campusvault_transfer::TransferError),

    #[error("an identical resource already exists for this course unit")]
    DuplicateFound {
        existing: Option<ExistingResource>,
        similarity_score: Option<f64>,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("server rejected request: {0}")]
    ServerValidation(String),

    #[error("transfer interrupted: {0}")]
    TransferInterrupted(String),

    #[error("finalize failed after successful transfer: {0}")]
    FinalizeFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// The stable kind the UI switches on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            UploadError::PermissionDenied => ErrorKind::PermissionDenied,
            UploadError::HashComputation(_) => ErrorKind::HashComputation,
            UploadError::DuplicateFound { .. } => ErrorKind::DuplicateFound,
            UploadError::MissingField(_) => ErrorKind::MissingField,
            UploadError::Network(_) => ErrorKind::Network,
            UploadError::Timeout => ErrorKind::Timeout,
            UploadError::ServerValidation(_) => ErrorKind::ServerValidation,
            UploadError::TransferInterrupted(_) => ErrorKind::TransferInterrupted,
            UploadError::FinalizeFailed(_) => ErrorKind::FinalizeFailed,
            UploadError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Maps a transport error from duplicate-check or initiate.
    ///
    /// Finalize and transfer failures have their own mappings because their
    /// kinds carry extra recovery semantics (orphaned upload, re-initiate).
    pub(crate) fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Timeout => UploadError::Timeout,
            ApiError::Network(msg) => UploadError::Network(msg),
            ApiError::Validation(msg) => UploadError::ServerValidation(msg),
            ApiError::Server { status, message } => {
                UploadError::Network(format!("server error ({status}): {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(UploadError::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(
            UploadError::Network("x".into()).kind(),
            ErrorKind::Network
        );
        assert_ne!(
            UploadError::Timeout.kind(),
            UploadError::ServerValidation("x".into()).kind()
        );
    }

    #[test]
    fn from_api_maps_timeout_and_validation_separately() {
        assert_eq!(
            UploadError::from_api(ApiError::Timeout).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            UploadError::from_api(ApiError::Validation("bad".into())).kind(),
            ErrorKind::ServerValidation
        );
        assert_eq!(
            UploadError::from_api(ApiError::Server {
                status: 503,
                message: "down".into()
            })
            .kind(),
            ErrorKind::Network
        );
    }
}
