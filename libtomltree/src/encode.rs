//! Encode document trees as JSON.
//!
//! Mapping order follows the document. YAML, TOML and CBOR output is produced
//! by the CLI tool (tomltree) using dedicated libraries.

use crate::node::{Mapping, Node, ScalarValue};

/// Output format for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON indented by two spaces.
    Json,
    /// JSON on a single line.
    JsonCompact,
}

/// Encode a document tree to a string in the specified format.
pub fn encode(node: &Node, format: Format) -> String {
    match format {
        Format::Json => encode_json(node, 0),
        Format::JsonCompact => encode_json_compact(node),
    }
}

fn encode_json(node: &Node, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let pad1 = "  ".repeat(indent + 1);

    match node {
        Node::Scalar(scalar) => encode_json_scalar(&scalar.value),
        Node::Sequence(items) => {
            if items.is_empty() {
                "[]".to_string()
            } else {
                let items: Vec<String> = items
                    .iter()
                    .map(|v| format!("{}{}", pad1, encode_json(v, indent + 1)))
                    .collect();
                format!("[\n{}\n{}]", items.join(",\n"), pad)
            }
        }
        Node::Mapping(mapping) => {
            if mapping.is_empty() {
                "{}".to_string()
            } else {
                let items: Vec<String> = mapping
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{}{}: {}",
                            pad1,
                            encode_json_string(k),
                            encode_json(v, indent + 1)
                        )
                    })
                    .collect();
                format!("{{\n{}\n{}}}", items.join(",\n"), pad)
            }
        }
    }
}

fn encode_json_compact(node: &Node) -> String {
    match node {
        Node::Scalar(scalar) => encode_json_scalar(&scalar.value),
        Node::Sequence(items) => {
            let items: Vec<String> = items.iter().map(encode_json_compact).collect();
            format!("[{}]", items.join(","))
        }
        Node::Mapping(mapping) => format!("{{{}}}", compact_members(mapping)),
    }
}

fn compact_members(mapping: &Mapping) -> String {
    mapping
        .iter()
        .map(|(k, v)| format!("{}:{}", encode_json_string(k), encode_json_compact(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_json_scalar(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Bool(true) => "true".to_string(),
        ScalarValue::Bool(false) => "false".to_string(),
        ScalarValue::Integer(n) => n.to_string(),
        ScalarValue::Float(f) => {
            if f.is_nan() || f.is_infinite() {
                "null".to_string() // JSON doesn't support NaN/Infinity
            } else {
                format!("{:?}", f)
            }
        }
        ScalarValue::String(s) => encode_json_string(s),
        ScalarValue::Datetime(dt) => encode_json_string(&dt.to_string()),
    }
}

/// Encode a string as a JSON string literal.
pub fn encode_json_string(s: &str) -> String {
    let mut result = String::from("\"");
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\x08' => result.push_str("\\b"),
            '\x0c' => result.push_str("\\f"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result.push('"');
    result
}
