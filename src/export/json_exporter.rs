use serde_json::Value;

use super::ExportFormat;
use crate::error::CodecError;

/// Pretty-print with two-space indentation
pub fn format_json(data: &Value) -> Result<String, CodecError> {
    serde_json::to_string_pretty(data).map_err(|e| CodecError::encode(ExportFormat::Json, e))
}

/// Strict JSON parse
pub fn parse_json(text: &str) -> Result<Value, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::parse(ExportFormat::Json, e))
}

pub fn format_yaml(data: &Value) -> Result<String, CodecError> {
    serde_yaml::to_string(data).map_err(|e| CodecError::encode(ExportFormat::Yaml, e))
}

pub fn parse_yaml(text: &str) -> Result<Value, CodecError> {
    serde_yaml::from_str(text).map_err(|e| CodecError::parse(ExportFormat::Yaml, e))
}
