use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    /// The bytes could not be read or the container type was not recognized
    #[error("Cannot read tags: {0}")]
    ExtractionFailed(String),

    /// Recognized container whose tag block does not parse
    #[error("Unreadable audio file: {0}")]
    CorruptedFile(String),
}

/// The scanner only needs to know that a file has no usable identity.
impl From<MetadataError> for BridgeError {
    fn from(err: MetadataError) -> Self {
        BridgeError::TagExtraction(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
