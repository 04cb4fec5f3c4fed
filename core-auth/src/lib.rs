//! # Authentication Module
//!
//! Session handoff between the interactive bootstrap and the reconciliation
//! coordinator.
//!
//! ## Overview
//!
//! Obtaining credentials (OAuth consent, callback listener, cached token
//! files) is the host's job. This crate only defines what crosses the
//! boundary: a [`SessionHandle`] with a redacted `Debug`, and a
//! [`SessionHandoff`] that delivers it exactly once.

pub mod error;
pub mod handoff;
pub mod types;

pub use error::{AuthError, Result};
pub use handoff::{SessionHandoff, SessionReceiver, SessionSender};
pub use types::SessionHandle;
