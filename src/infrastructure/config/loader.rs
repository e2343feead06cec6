use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Smallest frame limit that still fits a handshake and an error reason.
const MIN_FRAME_BYTES: u32 = 1024;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Store root directory cannot be empty")]
    EmptyStoreRoot,

    #[error("Master key path cannot be empty")]
    EmptyMasterKeyPath,

    #[error("Invalid timeout {name}: {value}ms. Must be greater than 0")]
    InvalidTimeout { name: &'static str, value: u64 },

    #[error("Invalid max_frame_bytes: {0}. Must be at least {MIN_FRAME_BYTES}")]
    InvalidMaxFrameBytes(u32),

    #[error("Invalid secrets_dir_name: {0:?}. Must be a single relative path component")]
    InvalidSecretsDirName(String),

    #[error("Audit log path cannot be empty when audit is enabled")]
    EmptyAuditPath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .keywarden/config.yaml (project config)
    /// 3. .keywarden/local.yaml (local overrides, optional)
    /// 4. Environment variables (KEYWARDEN_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with the project directory given explicitly.
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Config> {
        let base = project_dir.as_ref().join(".keywarden");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base.join("config.yaml")))
            .merge(Yaml::file(base.join("local.yaml")))
            .merge(Env::prefixed("KEYWARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.store.root_dir.trim().is_empty() {
            return Err(ConfigError::EmptyStoreRoot);
        }

        if config.crypto.master_key_path.trim().is_empty() {
            return Err(ConfigError::EmptyMasterKeyPath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        for (name, value) in [
            ("connect_timeout_ms", config.remote.connect_timeout_ms),
            ("handshake_timeout_ms", config.remote.handshake_timeout_ms),
            ("transfer_timeout_ms", config.remote.transfer_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidTimeout { name, value });
            }
        }

        if config.remote.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ConfigError::InvalidMaxFrameBytes(
                config.remote.max_frame_bytes,
            ));
        }

        let dir_name = &config.binding.secrets_dir_name;
        let mut components = Path::new(dir_name).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        );
        if !single_normal {
            return Err(ConfigError::InvalidSecretsDirName(dir_name.clone()));
        }

        if config.audit.enabled && config.audit.path.trim().is_empty() {
            return Err(ConfigError::EmptyAuditPath);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.root_dir, ".keywarden/stores");
        assert_eq!(config.crypto.master_key_path, ".keywarden/secrets/master.key");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.remote.connect_timeout_ms, 10_000);
        assert_eq!(config.binding.secrets_dir_name, ".keywarden-secrets");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
store:
  root_dir: /var/lib/keywarden/stores
crypto:
  master_key_path: /var/lib/keywarden/master.key
logging:
  level: debug
  format: json
  retention_days: 7
remote:
  connect_timeout_ms: 2000
  max_frame_bytes: 65536
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.store.root_dir, "/var/lib/keywarden/stores");
        assert_eq!(config.crypto.master_key_path, "/var/lib/keywarden/master.key");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.retention_days, 7);
        assert_eq!(config.remote.connect_timeout_ms, 2000);
        assert_eq!(config.remote.handshake_timeout_ms, 5000);
        assert_eq!(config.remote.max_frame_bytes, 65536);
        assert!(config.audit.enabled);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.remote.handshake_timeout_ms = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimeout {
                name: "handshake_timeout_ms",
                value: 0
            })
        ));
    }

    #[test]
    fn test_validate_tiny_frame_limit() {
        let mut config = Config::default();
        config.remote.max_frame_bytes = 16;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxFrameBytes(16))
        ));
    }

    #[test]
    fn test_validate_secrets_dir_name() {
        for bad in ["", "../escape", "a/b", "/abs"] {
            let mut config = Config::default();
            config.binding.secrets_dir_name = bad.to_string();
            assert!(
                matches!(
                    ConfigLoader::validate(&config),
                    Err(ConfigError::InvalidSecretsDirName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_empty_paths() {
        let mut config = Config::default();
        config.store.root_dir = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyStoreRoot)
        ));

        let mut config = Config::default();
        config.audit.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyAuditPath)
        ));
        config.audit.enabled = false;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join(".keywarden");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(
            base.join("config.yaml"),
            "logging:\n  level: info\n  format: json\nremote:\n  connect_timeout_ms: 1500\n",
        )
        .unwrap();
        std::fs::write(base.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        let config = temp_env::with_vars(
            [
                ("KEYWARDEN_REMOTE__TRANSFER_TIMEOUT_MS", Some("4000")),
                ("KEYWARDEN_LOGGING__LEVEL", None::<&str>),
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.logging.level, "debug", "Local override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.remote.connect_timeout_ms, 1500);
        assert_eq!(config.remote.transfer_timeout_ms, 4000, "Env should win");
    }

    #[test]
    fn test_env_override_beats_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join(".keywarden");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("config.yaml"), "logging:\n  level: warn\n").unwrap();

        let config = temp_env::with_var("KEYWARDEN_LOGGING__LEVEL", Some("trace"), || {
            ConfigLoader::load_from_dir(dir.path()).unwrap()
        });
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  format: xml\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }
}
