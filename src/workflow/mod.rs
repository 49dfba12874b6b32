//! Per-operation panels: validate input, call the gateway, record the
//! outcome in history and describe it as a notification.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub mod progress;

pub use progress::{CrawlProgress, CrawlStatus};

use crate::api::{
    ApiGateway, ApiResponse, Channel, CrawlOptions, ExtractOptions, MapOptions, OperationResult,
    ResultPayload, ScrapeOptions,
};
use crate::error::{FiredashError, FiredashResult};
use crate::history::{HistoryEntry, HistoryStore, NewHistoryEntry, OperationKind};

/// Accepted crawl depths
pub const CRAWL_DEPTH_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<Channel>,
    pub only_main_content: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub url: String,
    pub max_depth: u32,
    pub limit: Option<u32>,
    pub formats: Vec<Channel>,
    pub follow_external: bool,
    pub only_main_content: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRequest {
    pub url: String,
    pub include_subdomains: bool,
    pub search: Option<String>,
}

/// Extraction guided by a prompt, a JSON schema (as typed by the user), or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractRequest {
    pub url: String,
    pub prompt: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// User-facing summary of what just happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level: NotificationLevel::Error,
        }
    }

    /// Notification for an input rejected before any network call
    pub fn for_validation(error: &FiredashError) -> Self {
        match error {
            FiredashError::Validation { field, message } => {
                let title = match field.as_str() {
                    "url" => "URL Required",
                    "formats" => "Format Required",
                    "input" => "Input Required",
                    "maxDepth" => "Invalid Depth",
                    "schema" => "Invalid Schema",
                    _ => "Invalid Input",
                };
                Self::error(title, message.clone())
            }
            other => Self::error("Error", other.to_string()),
        }
    }
}

/// A finished operation: its history entry and the notification to show
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutcome {
    pub entry: HistoryEntry,
    pub notification: Notification,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        self.notification.level == NotificationLevel::Success
    }

    pub fn results(&self) -> Option<&OperationResult> {
        self.entry.results.as_ref()
    }
}

/// The four operation panels sharing one gateway and one history
pub struct WorkflowPanels {
    gateway: ApiGateway,
    history: Arc<HistoryStore>,
    crawl_progress: RwLock<CrawlProgress>,
}

impl WorkflowPanels {
    pub fn new(gateway: ApiGateway, history: Arc<HistoryStore>) -> Self {
        Self {
            gateway,
            history,
            crawl_progress: RwLock::new(CrawlProgress::default()),
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Scrape one page. Only invalid input is returned as `Err`.
    pub async fn scrape(&self, request: ScrapeRequest) -> FiredashResult<WorkflowOutcome> {
        let url = validate_url(&request.url, "scrape")?;
        require_formats(&request.formats)?;

        let options = ScrapeOptions {
            formats: request.formats,
            only_main_content: Some(request.only_main_content),
        };

        let outcome = match self.gateway.scrape(&url, options).await {
            ApiResponse::Success { data } => self
                .record_success(
                    OperationKind::Scrape,
                    &url,
                    OperationResult::Document(data),
                    Notification::success("Scraping Complete", "Page has been successfully scraped."),
                )
                .await,
            ApiResponse::Failure { error } => {
                self.record_failure(OperationKind::Scrape, &url, error, "Scraping Failed").await
            }
        };
        Ok(outcome)
    }

    /// Crawl a site, tracking progress locally while the call is outstanding
    pub async fn crawl(&self, request: CrawlRequest) -> FiredashResult<WorkflowOutcome> {
        let url = validate_url(&request.url, "crawl")?;
        require_formats(&request.formats)?;
        if !CRAWL_DEPTH_RANGE.contains(&request.max_depth) {
            return Err(FiredashError::validation(
                "maxDepth",
                format!(
                    "Crawl depth must be between {} and {}.",
                    CRAWL_DEPTH_RANGE.start(),
                    CRAWL_DEPTH_RANGE.end()
                ),
            ));
        }

        let options = CrawlOptions {
            limit: request.limit,
            max_depth: Some(request.max_depth),
            follow_external: request.follow_external,
            formats: request.formats,
            only_main_content: Some(request.only_main_content),
        };

        self.crawl_progress.write().await.start(&url);
        let response = self.gateway.crawl(&url, options).await;
        self.crawl_progress.write().await.processing();

        let outcome = match response {
            ApiResponse::Success { data } => {
                let pages = data.pages.len();
                let outcome = self
                    .record_success(
                        OperationKind::Crawl,
                        &url,
                        OperationResult::Pages(data.pages),
                        Notification::success("Crawl Complete", "Website has been successfully crawled."),
                    )
                    .await;
                self.crawl_progress.write().await.complete(pages);
                outcome
            }
            ApiResponse::Failure { error } => {
                self.crawl_progress.write().await.fail(error.clone());
                self.record_failure(OperationKind::Crawl, &url, error, "Crawl Failed").await
            }
        };
        Ok(outcome)
    }

    pub async fn map(&self, request: MapRequest) -> FiredashResult<WorkflowOutcome> {
        let url = validate_url(&request.url, "map")?;

        let options = MapOptions {
            include_subdomains: request.include_subdomains,
            search: request.search.filter(|s| !s.trim().is_empty()),
        };

        let outcome = match self.gateway.map(&url, options).await {
            ApiResponse::Success { data } => {
                let description = format!("Found {} URLs", data.len());
                self.record_success(
                    OperationKind::Map,
                    &url,
                    OperationResult::Document(map_document(data)),
                    Notification::success("Mapping Complete", description),
                )
                .await
            }
            ApiResponse::Failure { error } => {
                self.record_failure(OperationKind::Map, &url, error, "Mapping Failed").await
            }
        };
        Ok(outcome)
    }

    pub async fn extract(&self, request: ExtractRequest) -> FiredashResult<WorkflowOutcome> {
        let url = validate_url(&request.url, "extract data from")?;

        let prompt = request.prompt.filter(|p| !p.trim().is_empty());
        let schema_text = request.schema.filter(|s| !s.trim().is_empty());
        if prompt.is_none() && schema_text.is_none() {
            return Err(FiredashError::validation(
                "input",
                "Please provide either a schema or a prompt for extraction.",
            ));
        }

        let schema = schema_text
            .map(|text| {
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| FiredashError::validation("schema", format!("Schema is not valid JSON: {}", e)))
            })
            .transpose()?;

        let options = ExtractOptions {
            prompt,
            schema,
            system_prompt: None,
        };

        let outcome = match self.gateway.extract(&url, options).await {
            ApiResponse::Success { data } => self
                .record_success(
                    OperationKind::Extract,
                    &url,
                    OperationResult::Document(extract_document(data.extract)),
                    Notification::success("Extraction Complete", "Data has been successfully extracted."),
                )
                .await,
            ApiResponse::Failure { error } => {
                self.record_failure(OperationKind::Extract, &url, error, "Extraction Failed").await
            }
        };
        Ok(outcome)
    }

    pub async fn crawl_progress(&self) -> CrawlProgress {
        self.crawl_progress.read().await.clone()
    }

    /// Forget local crawl state; the remote job is not cancelled
    pub async fn stop_crawl(&self) {
        self.crawl_progress.write().await.stop();
    }

    pub async fn reset_crawl(&self) {
        self.crawl_progress.write().await.reset();
    }

    async fn record_success(
        &self,
        kind: OperationKind,
        url: &str,
        results: OperationResult,
        notification: Notification,
    ) -> WorkflowOutcome {
        let entry = self.history.add_entry(NewHistoryEntry::success(kind, url, results)).await;
        info!("{} of {} succeeded", kind, url);
        WorkflowOutcome { entry, notification }
    }

    async fn record_failure(&self, kind: OperationKind, url: &str, error: String, title: &str) -> WorkflowOutcome {
        let entry = self
            .history
            .add_entry(NewHistoryEntry::failure(kind, url, error.clone()))
            .await;
        debug!("{} of {} recorded as failed", kind, url);
        WorkflowOutcome {
            entry,
            notification: Notification::error(title, error),
        }
    }
}

/// Trimmed URL, rejected when empty or not http(s)
fn validate_url(raw: &str, action: &str) -> FiredashResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FiredashError::validation("url", format!("Please enter a URL to {}.", action)));
    }

    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(FiredashError::validation("url", format!("'{}' is not a valid http(s) URL.", trimmed))),
    }
}

fn require_formats(formats: &[Channel]) -> FiredashResult<()> {
    if formats.is_empty() {
        return Err(FiredashError::validation(
            "formats",
            "Please select at least one output format.",
        ));
    }
    Ok(())
}

/// Links as a newline list, as anchors, and as-is
fn map_document(links: Vec<String>) -> ResultPayload {
    let markdown = links.join("\n");
    let html = links
        .iter()
        .map(|link| {
            let href = html_escape::encode_double_quoted_attribute(link);
            format!("<a href=\"{}\">{}</a>", href, html_escape::encode_text(link))
        })
        .collect::<Vec<_>>()
        .join("\n");

    ResultPayload {
        markdown: Some(markdown),
        html: Some(html),
        links: Some(links),
        ..Default::default()
    }
}

/// Extracted data as pretty JSON, plain and inside `<pre>`
fn extract_document(extracted: Option<Value>) -> ResultPayload {
    let extracted = extracted.unwrap_or(Value::Null);
    let pretty = serde_json::to_string_pretty(&extracted).unwrap_or_else(|_| extracted.to_string());

    ResultPayload {
        html: Some(format!("<pre>{}</pre>", html_escape::encode_text(&pretty))),
        markdown: Some(pretty),
        extract: Some(extracted),
        ..Default::default()
    }
}
