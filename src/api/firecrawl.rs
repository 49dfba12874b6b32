//! Firecrawl v1 REST client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{Channel, CrawlOptions, CrawlOutput, ExtractOptions, MapOptions, ResultPayload, ScrapeOptions};
use super::RemoteClient;
use crate::config::ApiConfig;
use crate::error::{FiredashError, FiredashResult};

/// Request body for `/v1/scrape`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_main_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extract: Option<&'a ExtractOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_depth: Option<u32>,
    allow_external_links: bool,
    scrape_options: CrawlScrapeOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlScrapeOptions {
    formats: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_main_content: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapRequest<'a> {
    url: &'a str,
    include_subdomains: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ResultPayload>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlStarted {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlStatus {
    status: String,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    completed: u32,
    #[serde(default)]
    data: Vec<ResultPayload>,
    next: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    links: Vec<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Firecrawl API client authenticated with a bearer key
pub struct FirecrawlClient {
    api_key: String,
    base_url: String,
    client: Client,
    poll_interval: Duration,
    crawl_timeout: Duration,
}

impl FirecrawlClient {
    pub fn new(api_key: impl Into<String>, config: &ApiConfig) -> FiredashResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            poll_interval: Duration::from_secs(config.crawl_poll_interval_seconds),
            crawl_timeout: Duration::from_secs(config.crawl_timeout_seconds),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> FiredashResult<R> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| FiredashError::remote(format!("Firecrawl request failed: {}", e)))?;

        decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, url: &str) -> FiredashResult<R> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| FiredashError::remote(format!("Firecrawl request failed: {}", e)))?;

        decode(response).await
    }

    async fn scrape_document(&self, request: &ScrapeRequest<'_>, failure: &str) -> FiredashResult<ResultPayload> {
        let response: ScrapeResponse = self.post("scrape", request).await?;

        if !response.success {
            return Err(FiredashError::remote(response.error.unwrap_or_else(|| failure.to_string())));
        }

        Ok(response.data.unwrap_or_default())
    }

    /// Poll a crawl job until it settles, then gather every result page
    async fn wait_for_crawl(&self, id: &str) -> FiredashResult<CrawlOutput> {
        let started = Instant::now();
        let status_url = self.endpoint(&format!("crawl/{}", id));

        loop {
            let status: CrawlStatus = self.get(&status_url).await?;
            debug!("Crawl {} is {} ({}/{})", id, status.status, status.completed, status.total);

            match status.status.as_str() {
                "completed" => return self.collect_pages(status).await,
                "failed" | "cancelled" => {
                    return Err(FiredashError::remote(
                        status.error.unwrap_or_else(|| format!("Crawl job {}", status.status)),
                    ))
                }
                _ => {}
            }

            if started.elapsed() + self.poll_interval > self.crawl_timeout {
                return Err(FiredashError::remote(format!(
                    "Crawl {} did not finish within {}s",
                    id,
                    self.crawl_timeout.as_secs()
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn collect_pages(&self, first: CrawlStatus) -> FiredashResult<CrawlOutput> {
        let mut output = CrawlOutput {
            status: first.status,
            total: first.total,
            completed: first.completed,
            pages: first.data,
        };

        let mut next = first.next;
        while let Some(url) = next {
            let page: CrawlStatus = self.get(&url).await?;
            output.pages.extend(page.data);
            next = page.next;
        }

        Ok(output)
    }
}

fn channel_names(formats: &[Channel]) -> Vec<&'static str> {
    formats.iter().map(Channel::as_str).collect()
}

async fn decode<R: DeserializeOwned>(response: Response) -> FiredashResult<R> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("Firecrawl API error ({}): {}", status, body));
        return Err(FiredashError::remote(message));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| FiredashError::remote(format!("Failed to parse Firecrawl response: {}", e)))
}

#[async_trait]
impl RemoteClient for FirecrawlClient {
    async fn scrape_url(&self, url: &str, options: &ScrapeOptions) -> FiredashResult<ResultPayload> {
        let request = ScrapeRequest {
            url,
            formats: channel_names(&options.formats),
            only_main_content: options.only_main_content,
            extract: None,
        };
        self.scrape_document(&request, "Scraping failed").await
    }

    async fn crawl_url(&self, url: &str, options: &CrawlOptions) -> FiredashResult<CrawlOutput> {
        let request = CrawlRequest {
            url,
            limit: options.limit,
            max_depth: options.max_depth,
            allow_external_links: options.follow_external,
            scrape_options: CrawlScrapeOptions {
                formats: channel_names(&options.formats),
                only_main_content: options.only_main_content,
            },
        };

        let started: CrawlStarted = self.post("crawl", &request).await?;
        let id = match (started.success, started.id) {
            (true, Some(id)) => id,
            (_, _) => {
                return Err(FiredashError::remote(
                    started.error.unwrap_or_else(|| "Crawling failed".to_string()),
                ))
            }
        };

        info!("Crawl job {} started for {}", id, url);
        self.wait_for_crawl(&id).await
    }

    async fn map_url(&self, url: &str, options: &MapOptions) -> FiredashResult<Vec<String>> {
        let request = MapRequest {
            url,
            include_subdomains: options.include_subdomains,
            search: options.search.as_deref(),
        };

        let response: MapResponse = self.post("map", &request).await?;
        if !response.success {
            return Err(FiredashError::remote(response.error.unwrap_or_else(|| "Mapping failed".to_string())));
        }

        Ok(response.links)
    }

    async fn extract_url(&self, url: &str, options: &ExtractOptions) -> FiredashResult<ResultPayload> {
        let request = ScrapeRequest {
            url,
            formats: vec!["extract"],
            only_main_content: None,
            extract: Some(options),
        };
        self.scrape_document(&request, "Extraction failed").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve canned `(status, body)` replies, one per connection, and return
    /// the raw requests that were received.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let reply = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });

        (format!("http://{}", address), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buffer).to_string()
    }

    fn client(base_url: &str) -> FirecrawlClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            api_key: None,
            request_timeout_seconds: 5,
            crawl_poll_interval_seconds: 1,
            crawl_timeout_seconds: 5,
        };
        FirecrawlClient::new("fc-test", &config)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_scrape_sends_bearer_and_formats() {
        let (base_url, server) = serve(vec![(
            200,
            r##"{"success":true,"data":{"markdown":"# Example","metadata":{"statusCode":200}}}"##,
        )])
        .await;

        let options = ScrapeOptions {
            formats: vec![Channel::Markdown, Channel::RawHtml],
            only_main_content: Some(true),
        };
        let payload = client(&base_url).scrape_url("https://example.com", &options).await.unwrap();

        assert_eq!(payload.markdown.as_deref(), Some("# Example"));

        let requests = server.await.unwrap();
        let request = requests[0].to_lowercase();
        assert!(request.starts_with("post /v1/scrape "));
        assert!(request.contains("authorization: bearer fc-test"));
        assert!(requests[0].contains(r#""formats":["markdown","rawHtml"]"#));
        assert!(requests[0].contains(r#""onlyMainContent":true"#));
    }

    #[tokio::test]
    async fn test_remote_reported_failure() {
        let (base_url, _server) = serve(vec![(200, r#"{"success":false,"error":"Page blocked"}"#)]).await;

        let error = client(&base_url)
            .scrape_url("https://example.com", &ScrapeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Page blocked");
    }

    #[tokio::test]
    async fn test_http_error_uses_error_body() {
        let (base_url, _server) = serve(vec![(401, r#"{"success":false,"error":"Unauthorized: Invalid token"}"#)]).await;

        let error = client(&base_url)
            .map_url("https://example.com", &MapOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Unauthorized: Invalid token");
    }

    #[tokio::test]
    async fn test_map_returns_links() {
        let (base_url, server) = serve(vec![(200, r#"{"success":true,"links":["https://a.example","https://b.example"]}"#)]).await;

        let options = MapOptions {
            include_subdomains: true,
            search: Some("docs".to_string()),
        };
        let links = client(&base_url).map_url("https://example.com", &options).await.unwrap();

        assert_eq!(links, vec!["https://a.example", "https://b.example"]);
        let requests = server.await.unwrap();
        assert!(requests[0].contains(r#""includeSubdomains":true"#));
        assert!(requests[0].contains(r#""search":"docs""#));
    }

    #[tokio::test]
    async fn test_crawl_polls_until_completed() {
        let (base_url, server) = serve(vec![
            (200, r#"{"success":true,"id":"job-1","url":"https://api/v1/crawl/job-1"}"#),
            (200, r#"{"status":"scraping","total":2,"completed":1,"data":[]}"#),
            (200, r##"{"status":"completed","total":2,"completed":2,"data":[{"markdown":"# A"},{"markdown":"# B"}]}"##),
        ])
        .await;

        let options = CrawlOptions {
            limit: Some(10),
            max_depth: Some(2),
            formats: vec![Channel::Markdown],
            ..Default::default()
        };
        let output = client(&base_url).crawl_url("https://example.com", &options).await.unwrap();

        assert_eq!(output.status, "completed");
        assert_eq!(output.pages.len(), 2);

        let requests = server.await.unwrap();
        assert!(requests[0].contains(r#""limit":10"#));
        assert!(requests[0].contains(r#""maxDepth":2"#));
        assert!(requests[0].contains(r#""scrapeOptions":{"formats":["markdown"]}"#));
        assert!(requests[1].starts_with("GET /v1/crawl/job-1 "));
        assert!(requests[2].starts_with("GET /v1/crawl/job-1 "));
    }

    #[tokio::test]
    async fn test_crawl_without_limit_omits_it() {
        let (base_url, server) = serve(vec![
            (200, r#"{"success":true,"id":"job-3"}"#),
            (200, r#"{"status":"completed","total":0,"completed":0,"data":[]}"#),
        ])
        .await;

        client(&base_url)
            .crawl_url("https://example.com", &CrawlOptions::default())
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert!(!requests[0].contains("limit"));
        assert!(!requests[0].contains("null"));
    }

    #[tokio::test]
    async fn test_failed_crawl_job_is_an_error() {
        let (base_url, _server) = serve(vec![
            (200, r#"{"success":true,"id":"job-2"}"#),
            (200, r#"{"status":"failed","error":"Site unreachable"}"#),
        ])
        .await;

        let error = client(&base_url)
            .crawl_url("https://example.com", &CrawlOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Site unreachable");
    }

    #[tokio::test]
    async fn test_extract_requests_extract_format() {
        let (base_url, server) = serve(vec![(200, r#"{"success":true,"data":{"extract":{"title":"Example"}}}"#)]).await;

        let options = ExtractOptions {
            prompt: Some("Get the title".to_string()),
            ..Default::default()
        };
        let payload = client(&base_url).extract_url("https://example.com", &options).await.unwrap();

        assert_eq!(payload.extract, Some(serde_json::json!({"title": "Example"})));
        let requests = server.await.unwrap();
        let body = &requests[0][requests[0].find("\r\n\r\n").unwrap()..];
        assert!(body.contains(r#""formats":["extract"]"#));
        assert!(body.contains(r#""extract":{"prompt":"Get the title"}"#));
        assert!(!body.contains("null"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let error = client(&format!("http://{}", address))
            .scrape_url("https://example.com", &ScrapeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, FiredashError::Remote { .. }));
        assert!(error.to_string().starts_with("Firecrawl request failed"));
    }
}
