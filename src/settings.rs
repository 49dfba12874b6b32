//! User-facing settings persisted alongside the history.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::FiredashResult;
use crate::export::ExportFormat;
use crate::storage::StorageManager;

/// Record key the settings live under
pub const SETTINGS_KEY: &str = "firedash-settings";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub output_preferences: OutputPreferences,
    pub crawl_defaults: CrawlDefaults,
    pub rate_limit: RateLimit,
    pub retry_options: RetryOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputPreferences {
    pub format: ExportFormat,
    pub include_metadata: bool,
    pub prettify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlDefaults {
    pub max_depth: u32,
    pub respect_robots: bool,
    pub follow_external: bool,
    pub main_content_only: bool,
}

/// Not enforced anywhere; kept so saved preferences round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimit {
    pub enabled: bool,
    pub requests_per_minute: u32,
}

/// Not enforced anywhere; the gateway never retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryOptions {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            include_metadata: true,
            prettify: true,
        }
    }
}

impl Default for CrawlDefaults {
    fn default() -> Self {
        Self {
            max_depth: 3,
            respect_robots: true,
            follow_external: false,
            main_content_only: true,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
        }
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Saved API key, if one was entered
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

/// Load, save and reset lifecycle for [`Settings`]
pub struct SettingsStore {
    storage: Arc<StorageManager>,
}

impl SettingsStore {
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Saved settings, or the defaults when nothing usable is stored
    pub async fn load(&self) -> Settings {
        match self.storage.get_record::<Settings>(SETTINGS_KEY).await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Ignoring unreadable settings: {}", e);
                Settings::default()
            }
        }
    }

    pub async fn save(&self, settings: &Settings) -> FiredashResult<()> {
        self.storage.put_record(SETTINGS_KEY, settings).await?;
        info!("Settings saved");
        Ok(())
    }

    pub async fn set_api_key(&self, api_key: &str) -> FiredashResult<Settings> {
        let mut settings = self.load().await;
        settings.api_key = api_key.trim().to_string();
        self.save(&settings).await?;
        Ok(settings)
    }

    /// Forget saved settings and hand back the defaults
    pub async fn reset(&self) -> FiredashResult<Settings> {
        self.storage.remove_record(SETTINGS_KEY).await?;
        info!("Settings reset to defaults");
        Ok(Settings::default())
    }
}
