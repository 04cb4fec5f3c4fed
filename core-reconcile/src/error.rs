use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid phase transition from {from} to {to}: {reason}")]
    InvalidPhaseTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Cannot prepare folder {path}: {message}")]
    Structural { path: String, message: String },

    #[error("Failed to relocate {playlist}/{file_name}: {message}")]
    RelocationFailed {
        playlist: String,
        file_name: String,
        message: String,
    },

    #[error("Session expired or rejected: {0}")]
    SessionExpired(String),

    #[error("Remote catalog error: {0}")]
    Catalog(String),

    #[error("Pending set serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Session handoff failed: {0}")]
    Auth(#[from] core_auth::AuthError),
}

impl ReconcileError {
    /// Wraps a catalog failure, promoting a rejected session to a fatal error.
    pub fn from_catalog(error: bridge_traits::BridgeError) -> Self {
        if error.is_session_invalid() {
            ReconcileError::SessionExpired(error.to_string())
        } else {
            ReconcileError::Catalog(error.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
