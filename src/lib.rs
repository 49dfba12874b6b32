//! Firedash - a command-line dashboard for the Firecrawl web-scraping API
//!
//! This library provides the building blocks behind the `firedash` binary:
//! - Scrape, crawl, map and extract workflows over a remote API client
//! - A capped, persisted history of past operations
//! - Format conversion (JSON, YAML, CSV, Markdown, HTML, text, XML) and zip export
//! - Settings and configuration management

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod workflow;

// Re-export main types for convenience
pub use crate::api::{ApiGateway, ApiResponse, FirecrawlClient, RemoteClient};
pub use crate::config::AppConfig;
pub use crate::core::Firedash;
pub use crate::error::{CodecError, FiredashError, FiredashResult};
pub use crate::export::{ExportFormat, ExportManager, ExportOptions, ExportTarget};
pub use crate::history::{HistoryEntry, HistoryStore, OperationKind, OperationStatus};
pub use crate::workflow::{Notification, WorkflowOutcome, WorkflowPanels};
