use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The remote catalog rejected the session credentials.
    #[error("Session rejected by remote catalog: {0}")]
    SessionInvalid(String),

    #[error("Remote catalog error: {0}")]
    Remote(String),

    #[error("Tag extraction failed: {0}")]
    TagExtraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error invalidates the whole session rather than one request.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, BridgeError::SessionInvalid(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
