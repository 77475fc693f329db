mod env;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Default config file looked up when `DISCMASTER_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "discmaster.toml";

/// Complete Discmaster configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscmasterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discogs: DiscogsConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

/// HTTP server and cookie settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL of the app. Derived from the request Host header when unset.
    #[serde(default)]
    pub app_url: Option<String>,
    /// Base64-encoded key (at least 64 bytes) used to sign session cookies.
    #[serde(default)]
    pub cookie_key: Option<String>,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_seconds: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            app_url: None,
            cookie_key: None,
            cookie_secure: false,
            upstream_timeout_seconds: default_upstream_timeout(),
        }
    }
}

/// Discogs (OAuth 1.0a) settings
#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsConfig {
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    /// Personal access token used for anonymous artist lookups.
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default = "default_discogs_api_base")]
    pub api_base: String,
    /// Host of the user-facing authorize page.
    #[serde(default = "default_discogs_web_base")]
    pub web_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_discogs_api_base() -> String {
    "https://api.discogs.com".to_string()
}

fn default_discogs_web_base() -> String {
    "https://www.discogs.com".to_string()
}

fn default_user_agent() -> String {
    "DiscMaster/1.0".to_string()
}

impl Default for DiscogsConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            user_token: None,
            api_base: default_discogs_api_base(),
            web_base: default_discogs_web_base(),
            user_agent: default_user_agent(),
        }
    }
}

/// Spotify (OAuth 2.0) settings
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_spotify_accounts_base")]
    pub accounts_base: String,
    #[serde(default = "default_spotify_api_base")]
    pub api_base: String,
}

fn default_spotify_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_spotify_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            accounts_base: default_spotify_accounts_base(),
            api_base: default_spotify_api_base(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<DiscmasterConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: DiscmasterConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Resolve the effective configuration: optional TOML file, then env overrides.
///
/// `DISCMASTER_CONFIG` names the file; without it `discmaster.toml` is used
/// when present and defaults otherwise.
pub fn resolve() -> Result<DiscmasterConfig> {
    let mut config = match std::env::var("DISCMASTER_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)?,
        Err(_) => DiscmasterConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DiscmasterConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.upstream_timeout_seconds, 30);
        assert!(!config.server.cookie_secure);
        assert_eq!(config.discogs.api_base, "https://api.discogs.com");
        assert_eq!(config.discogs.user_agent, "DiscMaster/1.0");
        assert_eq!(config.spotify.api_base, "https://api.spotify.com/v1");
        assert!(config.spotify.client_id.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            port = 8080
            app_url = "https://discmaster.example"
            cookie_secure = true

            [discogs]
            consumer_key = "ck"
            consumer_secret = "cs"

            [spotify]
            client_id = "sid"
            client_secret = "ssecret"
            redirect_uri = "https://discmaster.example/api/spotify/auth/callback"
        "#;

        let config: DiscmasterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.app_url.as_deref(), Some("https://discmaster.example"));
        assert!(config.server.cookie_secure);
        assert_eq!(config.discogs.consumer_key.as_deref(), Some("ck"));
        assert_eq!(config.spotify.client_secret.as_deref(), Some("ssecret"));
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [spotify]
            client_id = "sid"
        "#;

        let config: DiscmasterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.spotify.client_id.as_deref(), Some("sid"));
        assert_eq!(config.spotify.accounts_base, "https://accounts.spotify.com");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.discogs.web_base, "https://www.discogs.com");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_load_config_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
