use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ApiGateway, FirecrawlClient, RemoteClient};
use crate::config::AppConfig;
use crate::error::{FiredashError, FiredashResult};
use crate::export::{ExportFormat, ExportManager, ExportOptions, ExportStats, ExportTarget};
use crate::history::HistoryStore;
use crate::settings::{Settings, SettingsStore};
use crate::storage::StorageManager;
use crate::workflow::WorkflowPanels;

const HISTORY_EXPORT_STAMP: &str = "%Y-%m-%d-%H%M%S";

/// Application state, built once at startup and handed to the front end
pub struct Firedash {
    config: AppConfig,
    settings: SettingsStore,
    history: Arc<HistoryStore>,
    panels: WorkflowPanels,
    export_manager: ExportManager,
}

impl Firedash {
    /// Initialize every subsystem against the configured database and API
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing Firedash core");

        let storage = Arc::new(StorageManager::new(&config.database).await?);
        info!("Storage manager initialized");

        let settings = SettingsStore::new(storage.clone()).load().await;
        let api_key = resolve_api_key(&settings, &config);
        if api_key.is_empty() {
            warn!("No API key configured; remote calls will be rejected");
        }

        let client = FirecrawlClient::new(api_key, &config.api)?;
        info!("Firecrawl client initialized for {}", config.api.base_url);

        Ok(Self::with_client(config, storage, Arc::new(client)).await)
    }

    /// Assemble the application around an existing store and remote client
    pub async fn with_client(config: AppConfig, storage: Arc<StorageManager>, client: Arc<dyn RemoteClient>) -> Self {
        let history = Arc::new(HistoryStore::load(storage.clone()).await);
        let panels = WorkflowPanels::new(ApiGateway::new(client), history.clone());
        let export_manager = ExportManager::new(&config.export);

        Self {
            config,
            settings: SettingsStore::new(storage),
            history,
            panels,
            export_manager,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn panels(&self) -> &WorkflowPanels {
        &self.panels
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn export_manager(&self) -> &ExportManager {
        &self.export_manager
    }

    /// Write a history entry's results to the export directory
    pub async fn export_entry(&self, id: &str, options: &ExportOptions) -> FiredashResult<ExportStats> {
        let entry = self
            .history
            .get_entry(id)
            .await
            .ok_or_else(|| FiredashError::validation("id", format!("No history entry with id {}", id)))?;

        let results = entry
            .results
            .ok_or_else(|| FiredashError::validation("results", "This entry has no results to download."))?;

        info!("Exporting results of {} {}", entry.kind, entry.url);
        self.export_manager.save(&results.to_value(), options).await
    }

    /// Write a summary row for every history entry in one format
    pub async fn export_history(&self, format: ExportFormat) -> FiredashResult<ExportStats> {
        let rows = serde_json::to_value(self.history.summary().await)
            .map_err(|e| FiredashError::storage(format!("Failed to summarize history: {}", e)))?;

        self.export_manager
            .save(&rows, &history_export_options(format, Local::now()))
            .await
    }
}

/// `firedash-history-<stamp>` with the stamp already in the base name
fn history_export_options(format: ExportFormat, now: DateTime<Local>) -> ExportOptions {
    ExportOptions {
        filename: format!("firedash-history-{}", now.format(HISTORY_EXPORT_STAMP)),
        timestamp: false,
        target: ExportTarget::Format(format),
    }
}

/// Saved key first, then the configured one
fn resolve_api_key(settings: &Settings, config: &AppConfig) -> String {
    settings
        .api_key()
        .or(config.api.api_key.as_deref())
        .unwrap_or_default()
        .to_string()
}
