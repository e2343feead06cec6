//! Audit logging for credential operations
//!
//! Provides a structured JSON-lines audit trail for:
//! - Credential additions and removals
//! - Store saves and key rotations
//! - Snapshots, remote transfers and workspace bindings
//!
//! Events carry ids and metadata only, never secret values.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::domain::models::config::AuditConfig;

/// Audit logger for credential operations
///
/// Cheap to clone. A disabled logger accepts events and drops them.
#[derive(Clone, Default)]
pub struct AuditLogger {
    log_file: Option<Arc<Mutex<File>>>,
}

/// Audit event types for categorizing operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CredentialAdded,
    CredentialRemoved,
    StoreSaved,
    SnapshotTaken,
    CredentialTransferred,
    CredentialBound,
    KeyRotated,
}

/// Outcome of an audited operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Complete audit event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub actor: String,
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
    pub metadata: Option<Value>,
}

impl AuditLogger {
    /// Create a new audit logger appending to the specified file
    ///
    /// Creates parent directories if they don't exist
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();

        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create audit log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .context("failed to open audit log file")?;

        Ok(Self {
            log_file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// A logger that records nothing
    pub const fn disabled() -> Self {
        Self { log_file: None }
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        if config.enabled {
            Self::new(&config.path)
        } else {
            Ok(Self::disabled())
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.log_file.is_some()
    }

    /// Log an audit event
    ///
    /// Writes the event as a JSON line and mirrors it to tracing
    pub fn log_event(&self, event: &AuditEvent) -> Result<()> {
        let Some(ref log_file) = self.log_file else {
            return Ok(());
        };

        let json = serde_json::to_string(event).context("failed to serialize audit event")?;

        {
            let mut file = log_file
                .lock()
                .map_err(|e| anyhow::anyhow!("audit log mutex poisoned: {e}"))?;

            writeln!(file, "{json}").context("failed to write audit event")?;
            file.flush().context("failed to flush audit log")?;
        }

        info!(
            event_type = ?event.event_type,
            actor = %event.actor,
            resource_id = ?event.resource_id,
            outcome = ?event.outcome,
            "audit event"
        );

        Ok(())
    }

    /// Record an operation. Failures to write the trail are logged, not
    /// returned, so auditing never blocks the audited operation.
    pub fn record(
        &self,
        event_type: AuditEventType,
        actor: &str,
        resource_id: Option<&str>,
        success: bool,
        metadata: Option<Value>,
    ) {
        let event = AuditEvent {
            timestamp: Utc::now(),
            event_type,
            actor: actor.to_string(),
            resource_id: resource_id.map(String::from),
            outcome: if success {
                AuditOutcome::Success
            } else {
                AuditOutcome::Failure
            },
            metadata,
        };

        if let Err(e) = self.log_event(&event) {
            warn!(error = %e, event_type = ?event_type, "failed to write audit event");
        }
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_events(path: &Path) -> Vec<AuditEvent> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_audit_logger_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs/audit/events.log");

        let logger = AuditLogger::new(&log_path).unwrap();
        assert!(logger.is_enabled());
        assert!(log_path.exists());
    }

    #[test]
    fn test_record_writes_json_line() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        let logger = AuditLogger::new(&log_path).unwrap();

        logger.record(
            AuditEventType::CredentialAdded,
            "store:global",
            Some("myCert"),
            true,
            Some(serde_json::json!({ "type": "certificate" })),
        );

        let events = read_events(&log_path);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::CredentialAdded);
        assert_eq!(events[0].resource_id.as_deref(), Some("myCert"));
        assert_eq!(events[0].outcome, AuditOutcome::Success);
        assert_eq!(
            events[0].metadata,
            Some(serde_json::json!({ "type": "certificate" }))
        );
    }

    #[test]
    fn test_multiple_events_append() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        let logger = AuditLogger::new(&log_path).unwrap();

        logger.record(AuditEventType::SnapshotTaken, "engine", Some("a"), true, None);
        logger.record(AuditEventType::CredentialTransferred, "agent-1", Some("a"), false, None);

        // A second logger on the same file appends rather than truncates.
        AuditLogger::new(&log_path)
            .unwrap()
            .record(AuditEventType::KeyRotated, "cli", None, true, None);

        let events = read_events(&log_path);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].outcome, AuditOutcome::Failure);
        assert_eq!(events[2].event_type, AuditEventType::KeyRotated);
    }

    #[test]
    fn test_concurrent_writes() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        let logger = AuditLogger::new(&log_path).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    logger.record(
                        AuditEventType::CredentialBound,
                        &format!("agent{i}"),
                        Some(&format!("cred-{i}")),
                        true,
                        None,
                    );
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(read_events(&log_path).len(), 10);
    }

    #[test]
    fn test_disabled_logger_is_noop() {
        let logger = AuditLogger::from_config(&AuditConfig {
            enabled: false,
            path: String::new(),
        })
        .unwrap();
        assert!(!logger.is_enabled());
        logger.record(AuditEventType::StoreSaved, "x", None, true, None);
    }
}
