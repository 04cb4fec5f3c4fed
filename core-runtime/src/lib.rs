//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the reconciliation core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other core crate depends
//! on. It establishes the logging conventions, the fail-fast configuration
//! builder and the event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ReconcileConfig, ReconcileConfigBuilder};
pub use error::{Error, Result};
