//! Configuration system for the Rendezvous CLI.

use rendezvous_signaling::{RelayConfig, SignalingServerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Rendezvous configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// STUN Binding responder
    #[serde(default)]
    pub stun: StunConfig,
    /// Signaling relay
    #[serde(default)]
    pub signaling: SignalingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// STUN Binding responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StunConfig {
    /// Run the responder
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// UDP listen address
    #[serde(default = "default_stun_addr")]
    pub listen_addr: String,
}

/// Signaling relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// Run the relay
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// WebSocket listen address
    #[serde(default = "default_signaling_addr")]
    pub listen_addr: String,
    /// Send a peers list to each joining client
    #[serde(default = "default_true")]
    pub announce_peers: bool,
    /// Relay event queue capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_true() -> bool {
    true
}

fn default_stun_addr() -> String {
    format!("0.0.0.0:{}", rendezvous_stun::DEFAULT_STUN_PORT)
}

fn default_signaling_addr() -> String {
    format!("0.0.0.0:{}", rendezvous_signaling::DEFAULT_SIGNALING_PORT)
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: default_stun_addr(),
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: default_signaling_addr(),
            announce_peers: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("rendezvous/config.toml")
    }

    /// Load config from default path, or create default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading or creating the config fails.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Parse STUN listen address
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn stun_addr(&self) -> anyhow::Result<SocketAddr> {
        self.stun
            .listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid STUN listen address '{}': {}", self.stun.listen_addr, e))
    }

    /// Parse signaling listen address
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn signaling_addr(&self) -> anyhow::Result<SocketAddr> {
        self.signaling.listen_addr.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid signaling listen address '{}': {}",
                self.signaling.listen_addr,
                e
            )
        })
    }

    /// Signaling server settings
    #[must_use]
    pub fn signaling_server_config(&self) -> SignalingServerConfig {
        SignalingServerConfig {
            relay: RelayConfig {
                announce_peers: self.signaling.announce_peers,
            },
            channel_capacity: self.signaling.channel_capacity,
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.stun.enabled && !self.signaling.enabled {
            anyhow::bail!("Both STUN and signaling are disabled; nothing to serve");
        }

        if self.stun.enabled {
            self.stun_addr()?;
        }

        if self.signaling.enabled {
            self.signaling_addr()?;
        }

        if self.signaling.channel_capacity == 0 {
            anyhow::bail!("Signaling channel capacity must be at least 1");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stun.listen_addr, "0.0.0.0:3478");
        assert_eq!(config.signaling.listen_addr, "0.0.0.0:8080");
        assert!(config.stun.enabled);
        assert!(config.signaling.announce_peers);
        assert_eq!(config.signaling.channel_capacity, 1024);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.stun.listen_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());

        // Disabled services are not checked
        config.stun.enabled = false;
        assert!(config.validate().is_ok());

        config.signaling.enabled = false;
        assert!(config.validate().is_err());

        config.signaling.enabled = true;
        config.signaling.channel_capacity = 0;
        assert!(config.validate().is_err());

        config.signaling.channel_capacity = 16;
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [signaling]
            listen_addr = "127.0.0.1:9000"
            announce_peers = false
            "#,
        )
        .unwrap();

        assert_eq!(config.signaling_addr().unwrap().port(), 9000);
        assert!(config.signaling.enabled);
        assert!(!config.signaling_server_config().relay.announce_peers);
        assert_eq!(config.stun.listen_addr, "0.0.0.0:3478");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.stun.listen_addr = "127.0.0.1:3479".to_string();
        config.signaling.channel_capacity = 64;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.stun.listen_addr, "127.0.0.1:3479");
        assert_eq!(loaded.signaling.channel_capacity, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }
}
