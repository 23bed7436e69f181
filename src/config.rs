use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

use crate::constants::limits::MAX_AVATAR_BYTES;

pub const ENV_BACKEND_URL: &str = "CLUBDESK_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "CLUBDESK_BACKEND_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub backend: BackendConfig,

    pub login: LoginConfig,

    pub fallback: FallbackConfig,

    pub uploads: UploadConfig,

    pub links: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    pub log_format: LogFormat,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Hosted identity + data service. Both `url` and `anon_key` are required,
/// otherwise the app runs in local mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,

    pub anon_key: Option<String>,

    /// Server function that verifies and consumes reset tokens.
    pub reset_function: String,

    /// Request timeout in seconds, 0 waits indefinitely.
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            reset_function: "verify-reset-token".to_string(),
            request_timeout_seconds: 0,
        }
    }
}

impl BackendConfig {
    /// Both values, when present and non-blank.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((url, key))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Also revoke the session of an account still pending approval.
    /// Off by default: the login is refused but the session is left alone.
    pub sign_out_pending: bool,
}

/// Credentials accepted when no backend is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub username: String,

    pub password: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "change-me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_avatar_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_avatar_bytes: MAX_AVATAR_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Page the emailed reset link opens; token and email go in its fragment.
    pub reset_redirect_url: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reset_redirect_url: "http://localhost:5173/reset-password".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment values win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup(ENV_BACKEND_KEY) {
            self.backend.anon_key = Some(key);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("clubdesk").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".clubdesk").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((url, _)) = self.backend.credentials() {
            Url::parse(url).with_context(|| format!("Invalid backend URL: {url}"))?;
        }

        if self.backend.reset_function.trim().is_empty() {
            anyhow::bail!("backend.reset_function cannot be empty");
        }

        if self.uploads.max_avatar_bytes == 0 {
            anyhow::bail!("uploads.max_avatar_bytes must be > 0");
        }

        Url::parse(&self.links.reset_redirect_url).with_context(|| {
            format!(
                "Invalid reset redirect URL: {}",
                self.links.reset_redirect_url
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.uploads.max_avatar_bytes, 2 * 1024 * 1024);
        assert_eq!(config.fallback.username, "admin");
        assert!(config.backend.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[uploads]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [backend]
            url = "https://abc.example.co"
            anon_key = "public-anon-key"

            [uploads]
            max_avatar_bytes = 1024
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.backend.credentials(),
            Some(("https://abc.example.co", "public-anon-key"))
        );
        assert_eq!(config.uploads.max_avatar_bytes, 1024);
        assert_eq!(config.backend.reset_function, "verify-reset-token");
        assert_eq!(config.backend.request_timeout_seconds, 0);
        assert!(!config.login.sign_out_pending);
        assert_eq!(config.general.log_format, LogFormat::Text);
    }

    #[test]
    fn test_login_and_log_format_sections() {
        let toml_str = r#"
            [general]
            log_format = "json"

            [login]
            sign_out_pending = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_format, LogFormat::Json);
        assert!(config.login.sign_out_pending);
    }

    #[test]
    fn test_blank_credentials_mean_local_mode() {
        let mut config = Config::default();
        config.backend.url = Some("https://abc.example.co".to_string());
        config.backend.anon_key = Some("   ".to_string());
        assert!(config.backend.credentials().is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.backend.url = Some("https://file.example.co".to_string());

        config.apply_env(|key| match key {
            ENV_BACKEND_URL => Some("https://env.example.co".to_string()),
            ENV_BACKEND_KEY => Some("env-key".to_string()),
            _ => None,
        });

        assert_eq!(
            config.backend.credentials(),
            Some(("https://env.example.co", "env-key"))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.backend.url = Some("not a url".to_string());
        config.backend.anon_key = Some("key".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.uploads.max_avatar_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.general.log_level = "debug".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.general.log_level, "debug");
    }
}
