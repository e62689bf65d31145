//! Configuration management for writeverse.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "writeverse";

/// Default outbox database file name.
const DATABASE_FILE_NAME: &str = "outbox.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WRITEVERSE_`, sections separated
///    by `__`, e.g. `WRITEVERSE_SERVER__BASE_URL`)
/// 2. TOML config file at `~/.config/writeverse/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform server configuration.
    pub server: ServerConfig,
    /// Secure capture configuration.
    pub capture: CaptureConfig,
    /// Paragraph editor configuration.
    pub editor: EditorConfig,
    /// Offline outbox configuration.
    pub outbox: OutboxConfig,
}

/// Platform server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the platform, e.g. `https://writeverse.example`.
    pub base_url: String,
    /// Name of the cookie carrying the CSRF token.
    pub csrf_cookie: String,
    /// Request header the CSRF token is echoed in.
    pub csrf_header: String,
    /// Value of the authenticated session cookie (`sessionid`), if any.
    pub session_cookie: Option<String>,
    /// Extra cookies in `name=value; name2=value2` form.
    pub cookies: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

/// Secure capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum number of characters a session buffer may hold.
    pub max_length: usize,
    /// Accept multi-character field values (IME composition) instead of
    /// rejecting them as bulk insertions.
    pub bulk_insert_allowed: bool,
}

/// Paragraph editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of paragraphs in an essay.
    pub paragraphs: usize,
}

/// Offline outbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Keep failed submissions for manual retry.
    pub enabled: bool,
    /// Path to the database file.
    /// Defaults to `~/.local/share/writeverse/outbox.db`
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            csrf_cookie: "csrftoken".to_string(),
            csrf_header: "X-CSRFToken".to_string(),
            session_cookie: None,
            cookies: None,
            timeout_secs: 30,
            user_agent: concat!("wvcap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_length: 100_000,
            bulk_insert_allowed: false,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { paragraphs: 5 }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WRITEVERSE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.server.base_url).map_err(|e| {
            Error::ConfigValidation {
                message: format!("invalid base_url '{}': {e}", self.server.base_url),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConfigValidation {
                message: format!("base_url must be http or https, got '{}'", url.scheme()),
            });
        }

        if self.server.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.server.csrf_cookie.trim().is_empty() || self.server.csrf_header.trim().is_empty()
        {
            return Err(Error::ConfigValidation {
                message: "csrf_cookie and csrf_header must not be empty".to_string(),
            });
        }

        if self.capture.max_length == 0 {
            return Err(Error::ConfigValidation {
                message: "max_length must be greater than 0".to_string(),
            });
        }

        if self.editor.paragraphs == 0 {
            return Err(Error::ConfigValidation {
                message: "paragraphs must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get the outbox database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.outbox
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// A copy safe to print: cookie values are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "<redacted>".to_string());
        let mut shown = self.clone();
        shown.server.session_cookie = mask(&self.server.session_cookie);
        shown.server.cookies = mask(&self.server.cookies);
        shown
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_cookies() {
        let mut config = Config::default();
        config.server.session_cookie = Some("s3cr3t".to_string());
        let shown = config.redacted();

        assert_eq!(shown.server.session_cookie.as_deref(), Some("<redacted>"));
        assert!(shown.server.cookies.is_none());
        assert_eq!(shown.server.base_url, config.server.base_url);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.csrf_cookie, "csrftoken");
        assert_eq!(config.server.csrf_header, "X-CSRFToken");
        assert!(config.server.session_cookie.is_none());
        assert!(!config.capture.bulk_insert_allowed);
        assert_eq!(config.editor.paragraphs, 5);
        assert!(config.outbox.enabled);
    }

    #[test]
    fn test_default_user_agent_has_version() {
        let server = ServerConfig::default();
        assert!(server.user_agent.starts_with("wvcap/"));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_base_url() {
        let mut config = Config::default();
        config.server.base_url = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_non_http_scheme() {
        let mut config = Config::default();
        config.server.base_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http or https"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.server.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_empty_csrf_names() {
        let mut config = Config::default();
        config.server.csrf_header = " ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_paragraphs() {
        let mut config = Config::default();
        config.editor.paragraphs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("paragraphs"));
    }

    #[test]
    fn test_validate_zero_max_length() {
        let mut config = Config::default();
        config.capture.max_length = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("outbox.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.outbox.database_path = Some(PathBuf::from("/custom/outbox.sqlite"));

        assert_eq!(config.database_path(), PathBuf::from("/custom/outbox.sqlite"));
    }

    #[test]
    fn test_request_timeout() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("writeverse"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nbase_url = \"https://writeverse.example\"\ntimeout_secs = 5\n\n[editor]\nparagraphs = 3\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.base_url, "https://writeverse.example");
        assert_eq!(config.server.timeout_secs, 5);
        assert_eq!(config.editor.paragraphs, 3);
        assert_eq!(config.server.csrf_cookie, "csrftoken");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[editor]\nparagraphs = 0\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_server_config_deserialize() {
        let json = r#"{"base_url": "https://a.example", "session_cookie": "abc"}"#;
        let server: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.base_url, "https://a.example");
        assert_eq!(server.session_cookie.as_deref(), Some("abc"));
        assert_eq!(server.timeout_secs, 30);
    }
}
