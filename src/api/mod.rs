//! Gateway over the remote scraping service.
//!
//! [`ApiGateway`] fills in request defaults and folds every failure of the
//! underlying [`RemoteClient`] into [`ApiResponse::Failure`]; nothing it
//! returns is an `Err`. It performs no retries, batching or rate limiting.

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod firecrawl;
pub mod types;

pub use firecrawl::FirecrawlClient;
pub use types::{
    Channel, ChannelContent, CrawlOptions, CrawlOutput, ExtractOptions, MapOptions, OperationResult,
    ResultPayload, ScrapeOptions,
};

use crate::error::FiredashResult;

/// Pages requested by a crawl that does not set a limit
pub const DEFAULT_CRAWL_LIMIT: u32 = 100;

const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Transport-independent access to the remote service
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn scrape_url(&self, url: &str, options: &ScrapeOptions) -> FiredashResult<ResultPayload>;

    /// Start a crawl and wait for it to finish
    async fn crawl_url(&self, url: &str, options: &CrawlOptions) -> FiredashResult<CrawlOutput>;

    async fn map_url(&self, url: &str, options: &MapOptions) -> FiredashResult<Vec<String>>;

    /// Scrape with structured extraction instead of content formats
    async fn extract_url(&self, url: &str, options: &ExtractOptions) -> FiredashResult<ResultPayload>;
}

/// Uniform outcome of a gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { data: T },
    Failure { error: String },
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Failure { error } => Err(error),
        }
    }

    fn from_result(operation: &str, result: FiredashResult<T>) -> Self {
        match result {
            Ok(data) => {
                debug!("{} succeeded", operation);
                ApiResponse::Success { data }
            }
            Err(e) => {
                let message = e.to_string();
                let error = if message.trim().is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    message
                };
                warn!(category = e.category(), "{} failed: {}", operation, error);
                ApiResponse::Failure { error }
            }
        }
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiResponse", 2)?;
        match self {
            ApiResponse::Success { data } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ApiResponse::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Facade exposing the four operations with defaults applied
#[derive(Clone)]
pub struct ApiGateway {
    client: Arc<dyn RemoteClient>,
}

impl ApiGateway {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn scrape(&self, url: &str, mut options: ScrapeOptions) -> ApiResponse<ResultPayload> {
        if options.formats.is_empty() {
            options.formats = vec![Channel::Markdown];
        }
        ApiResponse::from_result("scrape", self.client.scrape_url(url, &options).await)
    }

    pub async fn crawl(&self, url: &str, mut options: CrawlOptions) -> ApiResponse<CrawlOutput> {
        if options.formats.is_empty() {
            options.formats = vec![Channel::Markdown];
        }
        options.limit.get_or_insert(DEFAULT_CRAWL_LIMIT);
        ApiResponse::from_result("crawl", self.client.crawl_url(url, &options).await)
    }

    pub async fn map(&self, url: &str, options: MapOptions) -> ApiResponse<Vec<String>> {
        ApiResponse::from_result("map", self.client.map_url(url, &options).await)
    }

    pub async fn extract(&self, url: &str, options: ExtractOptions) -> ApiResponse<ResultPayload> {
        ApiResponse::from_result("extract", self.client.extract_url(url, &options).await)
    }
}
