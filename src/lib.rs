//! Workspace facade crate.
//!
//! Exposes the reconciliation service behind the `desktop-shims` feature so a
//! host binary can depend on `shelfsync-workspace` without wiring each crate
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
