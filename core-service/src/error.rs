use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Service configuration rejected: {0}")]
    InitializationFailed(String),

    #[error("{capability} not provided: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error(transparent)]
    Auth(#[from] core_auth::AuthError),

    #[error(transparent)]
    Reconcile(#[from] core_reconcile::ReconcileError),

    #[error(transparent)]
    Metadata(#[from] core_metadata::MetadataError),

    /// The spawned coordinator task panicked or was cancelled
    #[error("Reconciliation task did not finish: {0}")]
    TaskFailed(String),
}

impl From<core_runtime::Error> for CoreError {
    fn from(error: core_runtime::Error) -> Self {
        if let core_runtime::Error::CapabilityMissing {
            capability,
            message,
        } = error
        {
            return CoreError::CapabilityMissing {
                capability,
                message,
            };
        }
        CoreError::InitializationFailed(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
