//! Session types shared between the bootstrap and the coordinator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, Result};

/// Opaque credential the coordinator uses to call the remote catalog.
///
/// Produced once by the session bootstrap and handed over through
/// [`SessionHandoff`](crate::SessionHandoff).
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionHandle {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionHandle {
    /// Handle without a known expiry
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::SessionHandle;
    ///
    /// let handle = SessionHandle::new("token");
    /// assert_eq!(handle.access_token(), "token");
    /// assert!(!handle.is_expired());
    /// ```
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Handle expiring `expires_in` seconds from now
    pub fn with_expiry(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is expired or expires within 60 seconds.
    /// Handles without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(60)
    }

    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at - Duration::seconds(buffer_seconds),
            None => false,
        }
    }

    /// Fails with [`AuthError::SessionExpired`] when the token is already past
    /// its expiry.
    pub fn ensure_valid(&self) -> Result<()> {
        match self.expires_at {
            Some(expires_at) if self.is_expired_with_buffer(0) => {
                Err(AuthError::SessionExpired(expires_at.to_rfc3339()))
            }
            _ => Ok(()),
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
