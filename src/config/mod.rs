use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::logging::LoggingConfig;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Used when the saved settings carry no API key
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
    pub crawl_poll_interval_seconds: u64,
    /// Upper bound on waiting for a crawl job to finish
    pub crawl_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = get_data_directory();

        Self {
            database: DatabaseConfig {
                path: data_dir.join("firedash.db"),
            },
            api: ApiConfig {
                base_url: "https://api.firecrawl.dev".to_string(),
                api_key: None,
                request_timeout_seconds: 60,
                crawl_poll_interval_seconds: 2,
                crawl_timeout_seconds: 600,
            },
            export: ExportConfig {
                output_directory: data_dir.join("exports"),
            },
            logging: LoggingConfig {
                log_directory: data_dir.join("logs"),
                ..LoggingConfig::default()
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from default locations
    pub async fn load() -> Result<Self> {
        let config_path = get_config_path();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path).await?
        } else {
            info!("No configuration file found, using defaults");
            let config = Self::default();
            config.save_to(&config_path).await?;
            config
        };

        ConfigOverrides::apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to the given path
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("API base_url must not be empty"));
        }

        url::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow::anyhow!("API base_url is invalid: {}", e))?;

        if self.api.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("API request_timeout_seconds must be > 0"));
        }

        if self.api.crawl_poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("API crawl_poll_interval_seconds must be > 0"));
        }

        if self.api.crawl_timeout_seconds < self.api.crawl_poll_interval_seconds {
            return Err(anyhow::anyhow!(
                "API crawl_timeout_seconds must be at least crawl_poll_interval_seconds"
            ));
        }

        Ok(())
    }
}

/// Get the default data directory
fn get_data_directory() -> PathBuf {
    directories::ProjectDirs::from("dev", "firedash", "firedash")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("data"))
}

/// Get the configuration file path
pub fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "firedash", "firedash")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("config.toml"))
}

/// Environment-based configuration overrides
pub struct ConfigOverrides;

impl ConfigOverrides {
    /// Apply environment variable overrides to configuration
    pub fn apply(config: &mut AppConfig) {
        Self::apply_from(config, |key| std::env::var(key).ok());
    }

    fn apply_from(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup("FIREDASH_API_KEY").filter(|key| !key.is_empty()) {
            config.api.api_key = Some(api_key);
        }

        if let Some(base_url) = lookup("FIREDASH_API_URL") {
            config.api.base_url = base_url;
        }

        if let Some(db_path) = lookup("FIREDASH_DB_PATH") {
            config.database.path = PathBuf::from(db_path);
        }

        if let Some(export_dir) = lookup("FIREDASH_EXPORT_DIR") {
            config.export.output_directory = PathBuf::from(export_dir);
        }

        if let Some(log_level) = lookup("FIREDASH_LOG_LEVEL") {
            config.logging.level = log_level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut config = AppConfig::default();
        config.api.crawl_poll_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_toml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.api.api_key = Some("fc-test".to_string());
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.api.api_key.as_deref(), Some("fc-test"));
        assert_eq!(loaded.database.path, config.database.path);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FIREDASH_API_KEY", "fc-env"),
            ("FIREDASH_API_URL", "http://localhost:3002"),
            ("FIREDASH_EXPORT_DIR", "/tmp/firedash-exports"),
            ("FIREDASH_LOG_LEVEL", "debug"),
        ]);

        let mut config = AppConfig::default();
        ConfigOverrides::apply_from(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.api_key.as_deref(), Some("fc-env"));
        assert_eq!(config.api.base_url, "http://localhost:3002");
        assert_eq!(config.export.output_directory, PathBuf::from("/tmp/firedash-exports"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_api_key_override_is_ignored() {
        let mut config = AppConfig::default();
        ConfigOverrides::apply_from(&mut config, |key| (key == "FIREDASH_API_KEY").then(String::new));
        assert!(config.api.api_key.is_none());
    }
}
