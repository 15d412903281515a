//! Shared utilities for presskit.
//!
//! This crate provides common utilities used across the presskit workspace:
//! - Error handling patterns
//! - ULID-based identifier generation for save attempts and coordinators
//! - Logging setup with tracing
//! - Data and config directory resolution
//! - RAII-based timing for persist latency

pub mod error;
pub mod id;
pub mod log;
pub mod path;
pub mod timing;

pub use error::{Error, ErrorKind, Result};
pub use id::{IdPrefix, Identifier};
pub use timing::TimingGuard;
