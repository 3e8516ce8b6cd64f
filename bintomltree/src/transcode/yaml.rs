//! YAML output: convert document trees to YAML text.
//!
//! Mapping from the document tree to YAML:
//!   - Mapping          -> YAML mapping (document order)
//!   - Sequence         -> YAML sequence
//!   - String / Bool    -> YAML string / bool
//!   - Integer / Float  -> YAML number (including .nan, .inf, -.inf)
//!   - Datetime         -> YAML string (RFC 3339 representation)
//!
//! Lossy edges:
//!   - Integer and float notation (`0xFF`, `1e3`) is normalized.
//!   - Datetimes become plain strings.

use libtomltree::{Node, ScalarValue};
use serde_yaml::{Mapping, Value};

/// Encode a document tree as a YAML string.
pub fn encode(node: &Node) -> Result<String, String> {
    let yaml_value = node_to_yaml(node);
    serde_yaml::to_string(&yaml_value).map_err(|e| format!("YAML encode error: {}", e))
}

fn node_to_yaml(node: &Node) -> Value {
    match node {
        Node::Mapping(mapping) => {
            let mut map = Mapping::new();
            for (key, value) in mapping.iter() {
                map.insert(Value::String(key.to_string()), node_to_yaml(value));
            }
            Value::Mapping(map)
        }
        Node::Sequence(items) => Value::Sequence(items.iter().map(node_to_yaml).collect()),
        Node::Scalar(scalar) => match &scalar.value {
            ScalarValue::String(s) => Value::String(s.clone()),
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Integer(n) => Value::Number((*n).into()),
            ScalarValue::Float(f) => Value::Number((*f).into()),
            ScalarValue::Datetime(dt) => Value::String(dt.to_string()),
        },
    }
}
