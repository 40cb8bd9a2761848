//! Configuration file management.

use std::path::PathBuf;

use secdrop_store::{GeoPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "SECDROP_DATA_DIR";

/// Environment variable holding the sweep shared secret.
pub const SWEEP_SECRET_ENV: &str = "SECDROP_SWEEP_SECRET";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drops: DropsConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unix socket path. Empty = $data_dir/secdrop.sock.
    #[serde(default)]
    pub socket_path: String,
    /// Base for share links: `{public_base_url}/secure/{urlHash}`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// How `reveal_drop` hands out ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealMode {
    /// Reveal now, redact after the client confirms decryption.
    #[default]
    TwoPhase,
    /// Reveal and redact in one transaction.
    Claim,
}

impl RevealMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RevealMode::TwoPhase => "two_phase",
            RevealMode::Claim => "claim",
        }
    }
}

/// Drop defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropsConfig {
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: u32,
    #[serde(default)]
    pub reveal_mode: RevealMode,
}

/// Location capture on decryption: "full" | "coarse" | "off".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoCapture {
    Full,
    #[default]
    Coarse,
    Off,
}

impl From<GeoCapture> for GeoPolicy {
    fn from(capture: GeoCapture) -> Self {
        match capture {
            GeoCapture::Full => GeoPolicy::Full,
            GeoCapture::Coarse => GeoPolicy::Coarse,
            GeoCapture::Off => GeoPolicy::Off,
        }
    }
}

/// Privacy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default)]
    pub geo_capture: GeoCapture,
}

/// Expiry sweep configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between in-process sweeps. 0 = disabled.
    #[serde(default)]
    pub interval_secs: u64,
    /// Secret required by the sweep RPC methods. Empty = methods refused.
    #[serde(default)]
    pub shared_secret: String,
}

/// Retry budget for idempotent store operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ttl_days() -> u32 {
    secdrop_types::DEFAULT_TTL_DAYS
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: String::new(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl Default for DropsConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
            reveal_mode: RevealMode::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            std::time::Duration::from_millis(self.base_delay_ms),
        )
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<DaemonConfig>(&content)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SWEEP_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.sweeper.shared_secret = secret;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|s| !s.is_empty()) {
            self.storage.data_dir = dir;
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        if self.server.socket_path.is_empty() {
            self.data_dir().join("secdrop.sock")
        } else {
            PathBuf::from(&self.server.socket_path)
        }
    }

    /// The sweep secret, if one is configured.
    pub fn sweep_secret(&self) -> Option<&str> {
        Some(self.sweeper.shared_secret.as_str()).filter(|s| !s.is_empty())
    }

    /// `{public_base_url}/secure/{hash}`, tolerating a trailing slash.
    pub fn secure_url(&self, url_hash: &str) -> String {
        format!(
            "{}/secure/{url_hash}",
            self.server.public_base_url.trim_end_matches('/')
        )
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/SecDrop")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".secdrop")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/secdrop"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.public_base_url, "http://localhost:3000");
        assert_eq!(config.drops.default_ttl_days, 7);
        assert_eq!(config.drops.reveal_mode, RevealMode::TwoPhase);
        assert_eq!(config.privacy.geo_capture, GeoCapture::Coarse);
        assert_eq!(config.sweeper.interval_secs, 0);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.sweep_secret().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [drops]
            reveal_mode = "claim"

            [privacy]
            geo_capture = "off"

            [sweeper]
            interval_secs = 3600
            "#,
        )
        .expect("parse");
        assert_eq!(config.drops.reveal_mode, RevealMode::Claim);
        assert_eq!(config.drops.default_ttl_days, 7);
        assert_eq!(GeoPolicy::from(config.privacy.geo_capture), GeoPolicy::Off);
        assert_eq!(config.sweeper.interval_secs, 3600);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_unknown_reveal_mode_rejected() {
        assert!(toml::from_str::<DaemonConfig>("[drops]\nreveal_mode = \"lazy\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DaemonConfig::default();
        config.apply_env(|key| match key {
            SWEEP_SECRET_ENV => Some("s3cret".to_string()),
            DATA_DIR_ENV => Some("/var/lib/secdrop".to_string()),
            _ => None,
        });
        assert_eq!(config.sweep_secret(), Some("s3cret"));
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/secdrop"));
        assert_eq!(
            config.socket_path(),
            PathBuf::from("/var/lib/secdrop/secdrop.sock")
        );
    }

    #[test]
    fn test_secure_url() {
        let mut config = DaemonConfig::default();
        config.server.public_base_url = "https://drop.example/".to_string();
        assert_eq!(
            config.secure_url("00112233445566778899aabbccddeeff"),
            "https://drop.example/secure/00112233445566778899aabbccddeeff"
        );
    }
}
