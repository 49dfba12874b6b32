//! Format/parse dispatch across every supported format.
//!
//! JSON and YAML round-trip. CSV parses back into row objects of strings,
//! Markdown parses into rendered HTML, and HTML, text and XML parse as the
//! identity on their text. Those five never reproduce the formatted data.

use serde_json::Value;

use super::csv_exporter::{format_csv, parse_csv};
use super::json_exporter::{format_json, format_yaml, parse_json, parse_yaml};
use super::markup_exporter::{format_html, format_markdown, format_text, parse_markdown};
use super::xml_exporter::format_xml;
use super::ExportFormat;
use crate::error::CodecError;

/// Serialize `data` into `target`
pub fn format(data: &Value, target: ExportFormat) -> Result<String, CodecError> {
    match target {
        ExportFormat::Json => format_json(data),
        ExportFormat::Yaml => format_yaml(data),
        ExportFormat::Csv => format_csv(data),
        ExportFormat::Markdown => format_markdown(data),
        ExportFormat::Html => format_html(data),
        ExportFormat::Txt => format_text(data),
        ExportFormat::Xml => Ok(format_xml(data)),
    }
}

/// Decode `text` that is written in `source`
pub fn parse(text: &str, source: ExportFormat) -> Result<Value, CodecError> {
    match source {
        ExportFormat::Json => parse_json(text),
        ExportFormat::Yaml => parse_yaml(text),
        ExportFormat::Csv => parse_csv(text),
        ExportFormat::Markdown => Ok(parse_markdown(text)),
        ExportFormat::Html | ExportFormat::Txt | ExportFormat::Xml => {
            Ok(Value::String(text.to_string()))
        }
    }
}

/// Parse string input as `from`, then format it as `to`. Non-string input is
/// taken as already-parsed data.
pub fn convert(data: &Value, from: ExportFormat, to: ExportFormat) -> Result<String, CodecError> {
    match data {
        Value::String(text) => format(&parse(text, from)?, to),
        parsed => format(parsed, to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_payload_as_json() {
        let output = format(&json!({"markdown": "# Title"}), ExportFormat::Json).unwrap();
        assert_eq!(output, "{\n  \"markdown\": \"# Title\"\n}");
    }

    #[test]
    fn test_every_format_accepts_a_payload() {
        let payload = json!({"markdown": "# Title", "links": ["https://example.com"]});
        for target in ExportFormat::all() {
            let output = format(&payload, target).unwrap();
            assert!(!output.is_empty(), "{} produced no output", target);
        }
    }

    #[test]
    fn test_identity_parsers() {
        for source in [ExportFormat::Html, ExportFormat::Txt, ExportFormat::Xml] {
            assert_eq!(parse("<b>x</b>", source).unwrap(), json!("<b>x</b>"));
        }
    }

    #[test]
    fn test_convert_json_text_to_yaml() {
        let output = convert(&json!("{\"a\": 1, \"b\": [true]}"), ExportFormat::Json, ExportFormat::Yaml).unwrap();
        assert_eq!(parse_yaml(&output).unwrap(), json!({"a": 1, "b": [true]}));
    }

    #[test]
    fn test_convert_csv_text_to_json() {
        let output = convert(&json!("a,b\n1,2"), ExportFormat::Csv, ExportFormat::Json).unwrap();
        assert_eq!(parse_json(&output).unwrap(), json!([{"a": "1", "b": "2"}]));
    }

    #[test]
    fn test_convert_skips_parse_for_structured_input() {
        // Would fail as JSON text; taken as data instead
        let output = convert(&json!({"a": 1}), ExportFormat::Csv, ExportFormat::Json).unwrap();
        assert_eq!(output, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_convert_reports_parse_failures() {
        let error = convert(&json!("{not json"), ExportFormat::Json, ExportFormat::Yaml).unwrap_err();
        assert!(matches!(error, CodecError::Parse { .. }));
    }
}
