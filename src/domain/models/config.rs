use serde::{Deserialize, Serialize};

/// Main configuration structure for keywarden
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Credential store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Master key configuration
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote transfer configuration
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Workspace binding configuration
    #[serde(default)]
    pub binding: BindingConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Directory holding one store file per scope
    #[serde(default = "default_store_root")]
    pub root_dir: String,
}

fn default_store_root() -> String {
    ".keywarden/stores".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_store_root(),
        }
    }
}

/// Master key configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CryptoConfig {
    /// Path of the master key ring file
    #[serde(default = "default_master_key_path")]
    pub master_key_path: String,
}

fn default_master_key_path() -> String {
    ".keywarden/secrets/master.key".to_string()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_key_path: default_master_key_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Remote transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfig {
    /// Bound on establishing the channel
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Bound on the protocol handshake
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Bound on sending a credential and receiving the acknowledgement
    #[serde(default = "default_transfer_timeout_ms")]
    pub transfer_timeout_ms: u64,

    /// Largest frame accepted from the peer
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_handshake_timeout_ms() -> u64 {
    5_000
}

const fn default_transfer_timeout_ms() -> u64 {
    30_000
}

const fn default_max_frame_bytes() -> u32 {
    16 * 1024 * 1024
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            transfer_timeout_ms: default_transfer_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Workspace binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BindingConfig {
    /// Directory, relative to the workspace, that receives bound keystores
    #[serde(default = "default_secrets_dir_name")]
    pub secrets_dir_name: String,
}

fn default_secrets_dir_name() -> String {
    ".keywarden-secrets".to_string()
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            secrets_dir_name: default_secrets_dir_name(),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// JSON-lines audit file
    #[serde(default = "default_audit_path")]
    pub path: String,
}

const fn default_audit_enabled() -> bool {
    true
}

fn default_audit_path() -> String {
    ".keywarden/logs/audit.log".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: default_audit_path(),
        }
    }
}
