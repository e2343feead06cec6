//! Infrastructure layer module
//!
//! This module contains the concrete mechanisms behind the domain ports:
//! - Encryption at rest (AES-256-GCM codec and master key ring)
//! - Configuration management
//! - Logging infrastructure (scrubbing writers, audit trail)

pub mod config;
pub mod crypto;
pub mod logging;
