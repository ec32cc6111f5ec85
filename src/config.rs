//! Configuration handling for UrFU VPN

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const LOCAL_CONFIG: &str = "urfu-vpn.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vpn: VpnConfig,
    pub ppp: PppConfig,
}

/// Remote endpoint and the name of the native connection profile
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VpnConfig {
    pub server: String,
    pub peer_name: String,
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            server: "ras.urfu.ru".to_string(),
            peer_name: "urfu".to_string(),
        }
    }
}

/// pppd locations and the credential hand-off tuning
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PppConfig {
    pub peers_dir: PathBuf,
    pub secrets_path: PathBuf,
    /// How many times the secret is written to the channel. pppd reads
    /// chap-secrets once during negotiation and once more on retry.
    pub write_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for PppConfig {
    fn default() -> Self {
        Self {
            peers_dir: PathBuf::from("/etc/ppp/peers"),
            secrets_path: PathBuf::from("/etc/ppp/chap-secrets"),
            write_attempts: 2,
            poll_interval_ms: 100,
        }
    }
}

impl PppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or the first default location that exists
    ///
    /// Lookup order: `./urfu-vpn.toml`, then `~/.urfu-vpn/config.toml`.
    /// Falls back to built-in defaults when neither exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in default_locations() {
            if candidate.exists() {
                debug!("Loading config from {}", candidate.display());
                return Self::load(&candidate);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vpn.server.trim().is_empty() {
            return Err(ConfigError::Invalid("vpn.server cannot be empty".into()));
        }
        let peer = &self.vpn.peer_name;
        if peer.is_empty() || peer.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "vpn.peer_name must be a plain file name, got {:?}",
                peer
            )));
        }
        if self.ppp.write_attempts == 0 {
            return Err(ConfigError::Invalid(
                "ppp.write_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".urfu-vpn").join("config.toml"));
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.vpn.server, "ras.urfu.ru");
        assert_eq!(config.vpn.peer_name, "urfu");
        assert_eq!(config.ppp.secrets_path, PathBuf::from("/etc/ppp/chap-secrets"));
        assert_eq!(config.ppp.write_attempts, 2);
        assert_eq!(config.ppp.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[ppp]\nwrite_attempts = 3\n").unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.ppp.write_attempts, 3);
        assert_eq!(config.ppp.peers_dir, PathBuf::from("/etc/ppp/peers"));
        assert_eq!(config.vpn, VpnConfig::default());
    }

    #[test]
    fn test_full_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[vpn]
server = "vpn.example.org"
peer_name = "campus"

[ppp]
peers_dir = "/tmp/peers"
secrets_path = "/tmp/chap-secrets"
write_attempts = 3
poll_interval_ms = 250
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.vpn.server, "vpn.example.org");
        assert_eq!(config.vpn.peer_name, "campus");
        assert_eq!(config.ppp.peers_dir, PathBuf::from("/tmp/peers"));
        assert_eq!(config.ppp.secrets_path, PathBuf::from("/tmp/chap-secrets"));
        assert_eq!(config.ppp.write_attempts, 3);
        assert_eq!(config.ppp.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_write_attempts_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[ppp]\nwrite_attempts = 0\n").unwrap();

        let result = Config::load(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_peer_name_with_separator_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[vpn]\npeer_name = \"../evil\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_discover_explicit_missing_file() {
        let result = Config::discover(Some(Path::new("/nonexistent/urfu-vpn.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[vpn\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::ParseError(_))));
    }
}
