use serde_json::Value;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Informational XML: every key becomes a wrapping element and array values
/// repeat their element once per item. No attributes, namespaces or escaping
/// of reserved characters, so the output is not guaranteed to be well formed.
pub fn format_xml(data: &Value) -> String {
    let mut body = String::new();
    write_node(data, &mut body);
    format!("{}\n<root>{}</root>", XML_DECLARATION, body)
}

fn write_node(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                write_element(key, child, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                write_element(&index.to_string(), item, out);
            }
        }
        Value::String(text) => out.push_str(text),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_element(name: &str, value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(name, item, out);
            }
        }
        other => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            write_node(other, out);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_object() {
        let output = format_xml(&json!({"page": {"title": "Home", "status": 200}}));
        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root><page><title>Home</title><status>200</status></page></root>"
        );
    }

    #[test]
    fn test_array_values_repeat_the_tag() {
        let output = format_xml(&json!({"links": ["a", "b"]}));
        assert!(output.ends_with("<root><links>a</links><links>b</links></root>"));
    }

    #[test]
    fn test_reserved_characters_are_not_escaped() {
        let output = format_xml(&json!({"html": "<p>x & y</p>"}));
        assert!(output.contains("<html><p>x & y</p></html>"));
    }

    #[test]
    fn test_scalar_document() {
        assert!(format_xml(&json!(null)).ends_with("<root>null</root>"));
    }
}
