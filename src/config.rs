use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".pr-checkout.toml";
pub const DEFAULT_HOST: &str = "github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-checkout.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    /// Additional hosts to treat as GitHub (e.g. an Enterprise install)
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Preferred clone protocol for newly added remotes
    pub protocol: Option<Protocol>,

    /// Override for the REST API base URL
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
    Ssh,
    Git,
}

impl Config {
    /// Load configuration from .pr-checkout.toml in `dir`.
    /// Returns default config if the file doesn't exist.
    pub fn load(dir: &Path) -> Result<Config, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        if let Ok(host) = std::env::var("GITHUB_HOST") {
            if !host.is_empty() {
                config.github.hosts.push(host);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Every host recognised as GitHub, lowercased.
    pub fn known_hosts(&self) -> Vec<String> {
        std::iter::once(DEFAULT_HOST.to_string())
            .chain(self.github.hosts.iter().map(|h| h.to_ascii_lowercase()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert!(config.github.hosts.is_empty());
        assert!(config.github.protocol.is_none());
        assert_eq!(config.known_hosts(), vec!["github.com"]);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
token = "abc"
hosts = ["GHE.example.com"]
protocol = "ssh"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.github.protocol, Some(Protocol::Ssh));
        assert_eq!(config.known_hosts(), vec!["github.com", "ghe.example.com"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[github]\napi_url = \"http://127.0.0.1:9\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.github.api_url.as_deref(), Some("http://127.0.0.1:9"));
    }

    #[test]
    fn test_load_reads_file_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[github]\nprotocol = \"git\"\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.github.protocol, Some(Protocol::Git));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.github.protocol.is_none());
        assert!(config.github.api_url.is_none());
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        let result: Result<Config, _> = toml::from_str("[github]\nprotocol = \"ftp\"\n");
        assert!(result.is_err());
    }
}
