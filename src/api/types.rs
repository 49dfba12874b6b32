use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A content channel a document can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Markdown,
    Html,
    RawHtml,
    Screenshot,
    Links,
}

impl Channel {
    pub fn all() -> [Channel; 5] {
        [
            Channel::Markdown,
            Channel::Html,
            Channel::RawHtml,
            Channel::Screenshot,
            Channel::Links,
        ]
    }

    /// Name used on the wire and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Markdown => "markdown",
            Channel::Html => "html",
            Channel::RawHtml => "rawHtml",
            Channel::Screenshot => "screenshot",
            Channel::Links => "links",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::all()
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown output format: {}", s))
    }
}

/// Borrowed view of one channel's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelContent<'a> {
    Text(&'a str),
    List(&'a [String]),
}

/// Multi-channel content of one scraped document. Every channel is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    /// Screenshot URL or data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    /// Structured output of an extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ResultPayload {
    pub fn channel(&self, channel: Channel) -> Option<ChannelContent<'_>> {
        match channel {
            Channel::Markdown => self.markdown.as_deref().map(ChannelContent::Text),
            Channel::Html => self.html.as_deref().map(ChannelContent::Text),
            Channel::RawHtml => self.raw_html.as_deref().map(ChannelContent::Text),
            Channel::Screenshot => self.screenshot.as_deref().map(ChannelContent::Text),
            Channel::Links => self.links.as_deref().map(ChannelContent::List),
        }
    }

    /// Channels that carry content, in display order
    pub fn present_channels(&self) -> Vec<Channel> {
        Channel::all()
            .into_iter()
            .filter(|channel| self.channel(*channel).is_some())
            .collect()
    }
}

/// What a finished operation produced: one document, or one per crawled page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationResult {
    Pages(Vec<ResultPayload>),
    Document(ResultPayload),
}

impl OperationResult {
    pub fn documents(&self) -> &[ResultPayload] {
        match self {
            OperationResult::Pages(pages) => pages,
            OperationResult::Document(document) => std::slice::from_ref(document),
        }
    }

    /// Plain data for the export codecs
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Final state of a crawl job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutput {
    pub status: String,
    pub total: u32,
    pub completed: u32,
    pub pages: Vec<ResultPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    pub formats: Vec<Channel>,
    pub only_main_content: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOptions {
    /// Maximum number of pages; defaults to 100
    pub limit: Option<u32>,
    pub max_depth: Option<u32>,
    pub follow_external: bool,
    pub formats: Vec<Channel>,
    pub only_main_content: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub include_subdomains: bool,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}
