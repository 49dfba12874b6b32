use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, error, info};

pub mod archive;
pub mod codec;
pub mod csv_exporter;
pub mod json_exporter;
pub mod markup_exporter;
pub mod xml_exporter;

use crate::config::ExportConfig;
use crate::error::{FiredashError, FiredashResult};

/// Base file name used when none is given
pub const DEFAULT_EXPORT_FILENAME: &str = "data";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const ARCHIVE_EXTENSION: &str = "zip";
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Export format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Yaml,
    Csv,
    Markdown,
    Html,
    Txt,
    Xml,
}

impl std::str::FromStr for ExportFormat {
    type Err = FiredashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" | "htm" => Ok(ExportFormat::Html),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "xml" => Ok(ExportFormat::Xml),
            _ => Err(FiredashError::validation("format", format!("Invalid export format: {}", s))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Yaml => write!(f, "yaml"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Markdown => write!(f, "markdown"),
            ExportFormat::Html => write!(f, "html"),
            ExportFormat::Txt => write!(f, "txt"),
            ExportFormat::Xml => write!(f, "xml"),
        }
    }
}

impl ExportFormat {
    pub fn all() -> [ExportFormat; 7] {
        [
            ExportFormat::Json,
            ExportFormat::Yaml,
            ExportFormat::Csv,
            ExportFormat::Markdown,
            ExportFormat::Html,
            ExportFormat::Txt,
            ExportFormat::Xml,
        ]
    }

    /// File extension for downloads
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Txt => "txt",
            ExportFormat::Xml => "xml",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Yaml => "text/yaml",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Html => "text/html",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Xml => "application/xml",
        }
    }
}

/// What a single export produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    Format(ExportFormat),
    /// One zip bundling the data once per listed format
    Archive(Vec<ExportFormat>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub filename: String,
    /// Append `-yyyy-MM-dd-HH-mm-ss` to the file name
    pub timestamp: bool,
    pub target: ExportTarget,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_EXPORT_FILENAME.to_string(),
            timestamp: true,
            target: ExportTarget::Format(ExportFormat::Json),
        }
    }
}

/// A rendered, not yet written, download
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Export statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStats {
    pub target: ExportTarget,
    pub file_path: PathBuf,
    pub content_type: String,
    pub file_size_bytes: u64,
    pub export_duration_ms: u64,
}

/// Export manager producing named, timestamped files in the output directory
pub struct ExportManager {
    config: ExportConfig,
}

impl ExportManager {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn output_directory(&self) -> &std::path::Path {
        &self.config.output_directory
    }

    /// Render data into a named download without touching the filesystem
    pub fn render(&self, data: &Value, options: &ExportOptions) -> FiredashResult<ExportedFile> {
        render_at(data, options, Local::now())
    }

    /// Render and write the export into the output directory
    pub async fn save(&self, data: &Value, options: &ExportOptions) -> FiredashResult<ExportStats> {
        let start_time = std::time::Instant::now();

        let file = self.render(data, options).map_err(|e| {
            error!(category = e.category(), "Export failed: {}", e);
            e
        })?;

        tokio::fs::create_dir_all(&self.config.output_directory).await?;
        let file_path = self.config.output_directory.join(&file.filename);
        tokio::fs::write(&file_path, &file.bytes).await?;

        let stats = ExportStats {
            target: options.target.clone(),
            file_path,
            content_type: file.content_type.to_string(),
            file_size_bytes: file.bytes.len() as u64,
            export_duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Export completed: {} ({} bytes) in {}ms",
            stats.file_path.display(),
            stats.file_size_bytes,
            stats.export_duration_ms
        );

        Ok(stats)
    }

    /// Bundle the data in several formats into one archive download
    pub async fn save_multi_format(
        &self,
        data: &Value,
        formats: &[ExportFormat],
        options: &ExportOptions,
    ) -> FiredashResult<ExportStats> {
        let options = ExportOptions {
            target: ExportTarget::Archive(formats.to_vec()),
            ..options.clone()
        };
        self.save(data, &options).await
    }
}

/// `<base>[-<timestamp>].<extension>`
pub fn generate_filename(base: &str, extension: &str, timestamp: Option<DateTime<Local>>) -> String {
    match timestamp {
        Some(at) => format!("{}-{}.{}", base, at.format(TIMESTAMP_FORMAT), extension),
        None => format!("{}.{}", base, extension),
    }
}

fn render_at(data: &Value, options: &ExportOptions, now: DateTime<Local>) -> FiredashResult<ExportedFile> {
    let stamp = options.timestamp.then_some(now);

    let file = match &options.target {
        ExportTarget::Format(format) => {
            let content = codec::format(data, *format).map_err(FiredashError::export)?;
            ExportedFile {
                filename: generate_filename(&options.filename, format.extension(), stamp),
                content_type: format.content_type(),
                bytes: content.into_bytes(),
            }
        }
        ExportTarget::Archive(formats) => ExportedFile {
            filename: generate_filename(&options.filename, ARCHIVE_EXTENSION, stamp),
            content_type: ARCHIVE_CONTENT_TYPE,
            bytes: archive::build_archive(data, formats)?,
        },
    };

    debug!("Rendered {} ({} bytes)", file.filename, file.bytes.len());
    Ok(file)
}
