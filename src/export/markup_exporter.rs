//! Markdown, HTML and plain-text formatting.
//!
//! Only Markdown has a `parse` direction and it is lossy: it renders HTML
//! rather than recovering the data that was formatted.

use serde_json::Value;

use super::json_exporter::format_json;
use crate::error::CodecError;

const MARKDOWN_HEADING: &str = "# Extracted Data";

/// Render Markdown to HTML with tables, task lists, strikethrough and emoji
/// shortcodes enabled.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = comrak::Options::default();
    options.extension.table = true;
    options.extension.tasklist = true;
    options.extension.strikethrough = true;
    options.extension.shortcodes = true;
    comrak::markdown_to_html(markdown, &options)
}

pub fn format_markdown(data: &Value) -> Result<String, CodecError> {
    match data {
        Value::String(text) => Ok(text.clone()),
        other => Ok(format!("{}\n\n```json\n{}\n```\n", MARKDOWN_HEADING, format_json(other)?)),
    }
}

pub fn parse_markdown(text: &str) -> Value {
    Value::String(render_markdown(text))
}

pub fn format_html(data: &Value) -> Result<String, CodecError> {
    match data {
        Value::String(text) if text.trim_start().starts_with('<') => Ok(text.clone()),
        Value::String(text) => Ok(render_markdown(text)),
        other => Ok(render_markdown(&format_json(other)?)),
    }
}

pub fn format_text(data: &Value) -> Result<String, CodecError> {
    match data {
        Value::String(text) => Ok(text.clone()),
        other => format_json(other),
    }
}
