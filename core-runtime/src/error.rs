use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected by a builder or by filter parsing
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A bridge the host must supply was not set and has no desktop default
    #[error("{capability} not provided: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime setup failed: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
