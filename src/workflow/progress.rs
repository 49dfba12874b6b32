use serde::Serialize;

/// Where the current crawl stands, as far as this process knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    #[default]
    Idle,
    Crawling,
    Processing,
    Complete,
    Error,
}

/// Local view of a crawl's progress.
///
/// `stop` and `reset` only clear this state; a request already sent to the
/// remote service keeps running.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub status: CrawlStatus,
    pub url: Option<String>,
    pub pages_crawled: usize,
    pub error: Option<String>,
}

impl CrawlProgress {
    pub fn start(&mut self, url: &str) {
        *self = Self {
            status: CrawlStatus::Crawling,
            url: Some(url.to_string()),
            ..Self::default()
        };
    }

    /// The remote call returned and its pages are being recorded
    pub fn processing(&mut self) {
        if self.status == CrawlStatus::Crawling {
            self.status = CrawlStatus::Processing;
        }
    }

    pub fn complete(&mut self, pages_crawled: usize) {
        if self.is_active() {
            self.status = CrawlStatus::Complete;
            self.pages_crawled = pages_crawled;
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_active() {
            self.status = CrawlStatus::Error;
            self.error = Some(error.into());
        }
    }

    pub fn stop(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, CrawlStatus::Crawling | CrawlStatus::Processing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_crawl() {
        let mut progress = CrawlProgress::default();
        progress.start("https://example.com");
        assert!(progress.is_active());

        progress.processing();
        assert_eq!(progress.status, CrawlStatus::Processing);

        progress.complete(12);
        assert_eq!(progress.status, CrawlStatus::Complete);
        assert_eq!(progress.pages_crawled, 12);
        assert!(!progress.is_active());
    }

    #[test]
    fn test_failed_crawl_keeps_message() {
        let mut progress = CrawlProgress::default();
        progress.start("https://example.com");
        progress.fail("Crawling failed");

        assert_eq!(progress.status, CrawlStatus::Error);
        assert_eq!(progress.error.as_deref(), Some("Crawling failed"));
    }

    #[test]
    fn test_stopped_crawl_ignores_late_result() {
        let mut progress = CrawlProgress::default();
        progress.start("https://example.com");
        progress.stop();
        assert_eq!(progress, CrawlProgress::default());

        progress.complete(3);
        assert_eq!(progress.status, CrawlStatus::Idle);
        assert_eq!(progress.pages_crawled, 0);
    }
}
