use std::error::Error;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(
        "invalid URL {url:?}: {reason}. Please ensure the URL includes a valid scheme like 'http://' or 'https://'"
    )]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("unexpected server response: {status}\n{body}")]
    UnexpectedStatus { status: String, body: String },

    #[error("checksum mismatch for {file_name}, expected: {expected}, actual: {actual}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{message}: {attempts} attempts failed")]
    RetriesExhausted {
        message: String,
        attempts: u32,
        #[source]
        source: Option<Box<TransferError>>,
    },

    #[error("{0}")]
    Extract(Box<dyn Error + Send + Sync>),

    #[error("{primary}; cleanup also failed: {cleanup}")]
    CleanupFailed {
        primary: Box<TransferError>,
        cleanup: Box<TransferError>,
    },
}

/// Attaches operation context to filesystem errors.
pub(crate) trait ErrContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T, TransferError>;
}

impl<T> ErrContext<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, TransferError> {
        self.map_err(|source| TransferError::Io {
            context: context.into(),
            source,
        })
    }
}

/// Joins a deferred-cleanup failure to the primary outcome. The primary error
/// is never replaced; a cleanup error alone becomes the result.
pub(crate) fn join_cleanup<T>(
    result: Result<T, TransferError>,
    cleanup: Result<(), TransferError>,
) -> Result<T, TransferError> {
    match (result, cleanup) {
        (result, Ok(())) => result,
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(primary), Err(cleanup)) => Err(TransferError::CleanupFailed {
            primary: Box::new(primary),
            cleanup: Box::new(cleanup),
        }),
    }
}
