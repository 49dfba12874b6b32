//! Capped log of past operations, newest first.
//!
//! The whole list is loaded once from storage and written back after every
//! mutation. Persistence is best-effort: a failed write is logged and the
//! in-memory list stays authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::OperationResult;
use crate::storage::StorageManager;

/// Record key the history lives under
pub const HISTORY_KEY: &str = "firedash-history";

/// Entries kept before the oldest are dropped
pub const MAX_HISTORY_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Crawl,
    Scrape,
    Extract,
    Map,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Crawl => "crawl",
            OperationKind::Scrape => "scrape",
            OperationKind::Extract => "extract",
            OperationKind::Map => "map",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crawl" => Ok(OperationKind::Crawl),
            "scrape" => Ok(OperationKind::Scrape),
            "extract" => Ok(OperationKind::Extract),
            "map" => Ok(OperationKind::Map),
            other => Err(format!("Unknown operation type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Error,
}

/// One recorded operation. `error` is set only on failures and `results`
/// only on successes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub url: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<OperationResult>,
}

/// An entry before the store assigns its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    kind: OperationKind,
    url: String,
    outcome: Result<OperationResult, String>,
}

impl NewHistoryEntry {
    pub fn success(kind: OperationKind, url: impl Into<String>, results: OperationResult) -> Self {
        Self {
            kind,
            url: url.into(),
            outcome: Ok(results),
        }
    }

    pub fn failure(kind: OperationKind, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            outcome: Err(error.into()),
        }
    }

    fn into_entry(self) -> HistoryEntry {
        let (status, error, results) = match self.outcome {
            Ok(results) => (OperationStatus::Success, None, Some(results)),
            Err(error) => (OperationStatus::Error, Some(error), None),
        };

        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind: self.kind,
            url: self.url,
            status,
            error,
            results,
        }
    }
}

impl HistoryEntry {
    /// Whether `error` is set exactly on failures and `results` only on successes
    pub fn is_consistent(&self) -> bool {
        match self.status {
            OperationStatus::Success => self.error.is_none(),
            OperationStatus::Error => self.error.is_some() && self.results.is_none(),
        }
    }
}

/// One row of a whole-history export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub url: String,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub has_results: bool,
}

impl From<&HistoryEntry> for HistorySummary {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp,
            kind: entry.kind,
            url: entry.url.clone(),
            status: entry.status,
            error: entry.error.clone(),
            has_results: entry.results.is_some(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryRecord {
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

/// Process-wide history, constructed once and shared as `Arc<HistoryStore>`
pub struct HistoryStore {
    storage: Arc<StorageManager>,
    entries: RwLock<Vec<HistoryEntry>>,
}

impl HistoryStore {
    /// Read the persisted history; a missing or unreadable record starts empty
    pub async fn load(storage: Arc<StorageManager>) -> Self {
        let entries = match storage.get_record::<HistoryRecord>(HISTORY_KEY).await {
            Ok(Some(record)) => {
                let stored = record.entries.len();
                let mut entries: Vec<HistoryEntry> =
                    record.entries.into_iter().filter(HistoryEntry::is_consistent).collect();
                if entries.len() < stored {
                    warn!("Dropped {} inconsistent history entries", stored - entries.len());
                }
                entries.truncate(MAX_HISTORY_ENTRIES);
                entries
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Discarding unreadable history: {}", e);
                Vec::new()
            }
        };

        info!("Loaded {} history entries", entries.len());

        Self {
            storage,
            entries: RwLock::new(entries),
        }
    }

    /// Record an operation at the front, dropping the oldest beyond the cap
    pub async fn add_entry(&self, entry: NewHistoryEntry) -> HistoryEntry {
        let entry = entry.into_entry();
        let mut entries = self.entries.write().await;

        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ENTRIES);
        debug!("Recorded {} {} as {}", entry.kind, entry.url, entry.id);

        self.persist(&entries).await;
        entry
    }

    /// Delete an entry; unknown ids are ignored
    pub async fn remove_entry(&self, id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);

        if entries.len() == before {
            return false;
        }

        self.persist(&entries).await;
        true
    }

    pub async fn clear_history(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await;
        info!("History cleared");
    }

    /// Entries matching an optional kind and a case-insensitive URL substring
    pub async fn list_entries(&self, kind: Option<OperationKind>, search: Option<&str>) -> Vec<HistoryEntry> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.entries
            .read()
            .await
            .iter()
            .filter(|entry| kind.map_or(true, |k| entry.kind == k))
            .filter(|entry| {
                needle
                    .as_deref()
                    .map_or(true, |n| entry.url.to_lowercase().contains(n))
            })
            .cloned()
            .collect()
    }

    /// Summary rows for every entry, newest first
    pub async fn summary(&self) -> Vec<HistorySummary> {
        self.entries.read().await.iter().map(HistorySummary::from).collect()
    }

    pub async fn get_entry(&self, id: &str) -> Option<HistoryEntry> {
        self.entries.read().await.iter().find(|entry| entry.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn persist(&self, entries: &[HistoryEntry]) {
        let record = serde_json::json!({ "entries": entries });
        if let Err(e) = self.storage.put_record(HISTORY_KEY, &record).await {
            warn!(category = e.category(), "Failed to persist history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResultPayload;
    use serde_json::json;

    async fn store() -> HistoryStore {
        HistoryStore::load(Arc::new(StorageManager::in_memory().unwrap())).await
    }

    fn scraped(markdown: &str) -> OperationResult {
        OperationResult::Document(ResultPayload {
            markdown: Some(markdown.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_add_entry_assigns_identity() {
        let store = store().await;

        let first = store
            .add_entry(NewHistoryEntry::success(OperationKind::Scrape, "https://a.example", scraped("# A")))
            .await;
        let second = store
            .add_entry(NewHistoryEntry::failure(OperationKind::Crawl, "https://b.example", "timeout"))
            .await;

        assert_ne!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(first.status, OperationStatus::Success);
        assert!(first.error.is_none() && first.results.is_some());
        assert_eq!(second.status, OperationStatus::Error);
        assert_eq!(second.error.as_deref(), Some("timeout"));
        assert!(second.results.is_none());

        let listed = store.list_entries(None, None).await;
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_keeps_last_hundred_newest_first() {
        let store = store().await;

        for i in 0..150 {
            store
                .add_entry(NewHistoryEntry::failure(
                    OperationKind::Map,
                    format!("https://example.com/{}", i),
                    "unreachable",
                ))
                .await;
            assert_eq!(store.len().await, (i + 1).min(MAX_HISTORY_ENTRIES));
        }

        let urls: Vec<String> = store.list_entries(None, None).await.into_iter().map(|e| e.url).collect();
        let expected: Vec<String> = (50..150).rev().map(|i| format!("https://example.com/{}", i)).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_noop() {
        let store = store().await;
        let entry = store
            .add_entry(NewHistoryEntry::success(OperationKind::Scrape, "https://a.example", scraped("# A")))
            .await;

        assert!(!store.remove_entry("missing").await);
        assert_eq!(store.list_entries(None, None).await, vec![entry.clone()]);

        assert!(store.remove_entry(&entry.id).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_filter_by_kind_and_search() {
        let store = store().await;
        store
            .add_entry(NewHistoryEntry::success(OperationKind::Scrape, "https://Docs.Example.com", scraped("a")))
            .await;
        store
            .add_entry(NewHistoryEntry::failure(OperationKind::Crawl, "https://docs.example.com/blog", "x"))
            .await;
        store
            .add_entry(NewHistoryEntry::failure(OperationKind::Crawl, "https://other.org", "x"))
            .await;

        assert_eq!(store.list_entries(Some(OperationKind::Crawl), None).await.len(), 2);
        assert_eq!(store.list_entries(None, Some("DOCS.example")).await.len(), 2);
        assert_eq!(
            store.list_entries(Some(OperationKind::Crawl), Some("docs")).await[0].url,
            "https://docs.example.com/blog"
        );
        assert_eq!(store.list_entries(None, Some("  ")).await.len(), 3);
    }

    #[tokio::test]
    async fn test_history_survives_reload() {
        let storage = Arc::new(StorageManager::in_memory().unwrap());

        let store = HistoryStore::load(storage.clone()).await;
        let entry = store
            .add_entry(NewHistoryEntry::success(OperationKind::Scrape, "https://a.example", scraped("# A")))
            .await;

        let reloaded = HistoryStore::load(storage.clone()).await;
        assert_eq!(reloaded.get_entry(&entry.id).await, Some(entry));

        reloaded.clear_history().await;
        assert!(HistoryStore::load(storage).await.is_empty().await);
    }

    #[tokio::test]
    async fn test_persisted_shape() {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        let store = HistoryStore::load(storage.clone()).await;
        store
            .add_entry(NewHistoryEntry::failure(OperationKind::Extract, "https://a.example", "bad schema"))
            .await;

        let record: serde_json::Value = storage.get_record(HISTORY_KEY).await.unwrap().unwrap();
        let entry = &record["entries"][0];
        assert_eq!(entry["type"], json!("extract"));
        assert_eq!(entry["status"], json!("error"));
        assert_eq!(entry["error"], json!("bad schema"));
        assert!(entry.get("results").is_none());
    }

    #[tokio::test]
    async fn test_summary_flags_results() {
        let store = store().await;
        store
            .add_entry(NewHistoryEntry::success(OperationKind::Scrape, "https://a.example", scraped("# A")))
            .await;
        store
            .add_entry(NewHistoryEntry::failure(OperationKind::Map, "https://b.example", "blocked"))
            .await;

        let rows = store.summary().await;
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].has_results);
        assert_eq!(rows[0].error.as_deref(), Some("blocked"));
        assert!(rows[1].has_results);

        let row = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(row["type"], json!("scrape"));
        assert_eq!(row["hasResults"], json!(true));
        assert_eq!(row["error"], json!(null));
    }

    #[tokio::test]
    async fn test_load_drops_inconsistent_entries() {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        storage
            .put_record(
                HISTORY_KEY,
                &json!({"entries": [
                    {"id": "ok", "timestamp": "2024-03-09T14:05:07Z", "type": "scrape",
                     "url": "https://a.example", "status": "success", "results": {"markdown": "# A"}},
                    {"id": "success-with-error", "timestamp": "2024-03-09T14:05:06Z", "type": "scrape",
                     "url": "https://b.example", "status": "success", "error": "boom"},
                    {"id": "error-without-message", "timestamp": "2024-03-09T14:05:05Z", "type": "crawl",
                     "url": "https://c.example", "status": "error"},
                    {"id": "error-with-results", "timestamp": "2024-03-09T14:05:04Z", "type": "map",
                     "url": "https://d.example", "status": "error", "error": "x", "results": {"links": []}}
                ]}),
            )
            .await
            .unwrap();

        let store = HistoryStore::load(storage).await;
        let ids: Vec<String> = store.list_entries(None, None).await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_unreadable_record_starts_empty() {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        storage.put_record(HISTORY_KEY, &json!({"entries": "oops"})).await.unwrap();

        assert!(HistoryStore::load(storage).await.is_empty().await);
    }
}
