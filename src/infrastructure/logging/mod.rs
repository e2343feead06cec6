//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting
//! - Rolling log files with retention cleanup
//! - Secret scrubbing on every writer
//! - Credential audit trail

pub mod audit;
pub mod config;
pub mod logger;
pub mod secret_scrubbing;

pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditOutcome};
pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::{prune_old_logs, LoggerImpl};
pub use secret_scrubbing::{ScrubbingMakeWriter, ScrubbingWriter, SecretScrubber};
