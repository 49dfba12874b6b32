use serde_json::Value;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{codec, ExportFormat};
use crate::error::{FiredashError, FiredashResult};

/// Name of the archive member holding `format`
pub fn member_name(format: ExportFormat) -> String {
    format!("data.{}", format)
}

/// Bundle the same data formatted once per requested format into a zip.
/// Repeated formats are written once.
pub fn build_archive(data: &Value, formats: &[ExportFormat]) -> FiredashResult<Vec<u8>> {
    let mut members: Vec<ExportFormat> = Vec::with_capacity(formats.len());
    for format in formats {
        if !members.contains(format) {
            members.push(*format);
        }
    }

    if members.is_empty() {
        return Err(FiredashError::archive("no formats selected for the archive"));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for format in &members {
        let content = codec::format(data, *format).map_err(FiredashError::export)?;
        let name = member_name(*format);

        zip.start_file(name.as_str(), options)?;
        zip.write_all(content.as_bytes())
            .map_err(|e| FiredashError::archive(format!("writing {}: {}", name, e)))?;

        debug!("Added {} ({} bytes) to archive", name, content.len());
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_member(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_one_member_per_format() {
        let data = json!({"markdown": "# Title"});
        let bytes = build_archive(&data, &[ExportFormat::Json, ExportFormat::Markdown, ExportFormat::Xml]).unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["data.json", "data.markdown", "data.xml"]);

        assert_eq!(read_member(&bytes, "data.json"), "{\n  \"markdown\": \"# Title\"\n}");
        assert!(read_member(&bytes, "data.markdown").starts_with("# Extracted Data"));
    }

    #[test]
    fn test_duplicate_formats_collapse() {
        let bytes = build_archive(&json!({"a": 1}), &[ExportFormat::Json, ExportFormat::Json]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_empty_format_list_is_an_archive_error() {
        let error = build_archive(&json!({}), &[]).unwrap_err();
        assert!(matches!(error, FiredashError::Archive { .. }));
    }

    #[test]
    fn test_encoder_failure_names_the_format() {
        let error = build_archive(&json!("text"), &[ExportFormat::Json, ExportFormat::Csv]).unwrap_err();
        match error {
            FiredashError::Export { format, .. } => assert_eq!(format, "csv"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
