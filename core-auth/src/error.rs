use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The bootstrap side was dropped without delivering a session.
    #[error("Session bootstrap ended without delivering a session")]
    BootstrapAbandoned,

    /// The coordinator stopped waiting before the session was delivered.
    #[error("No coordinator is waiting for the session")]
    CoordinatorGone,

    #[error("Session expired at {0}")]
    SessionExpired(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
