//! CBOR output: convert document trees to CBOR binary data.
//!
//! Mapping from the document tree to CBOR:
//!   - Mapping          -> CBOR map (text string keys, document order)
//!   - Sequence         -> CBOR array
//!   - String           -> CBOR text string
//!   - Bool             -> CBOR bool
//!   - Integer          -> CBOR integer (smallest encoding that fits)
//!   - Float            -> CBOR float
//!   - Offset datetime  -> tag 0 (RFC 3339 date/time string)
//!   - Local datetime, date or time -> CBOR text string

use ciborium::value::{Integer, Value};
use libtomltree::{Datetime, Node, ScalarValue};

/// Encode a document tree as CBOR bytes.
pub fn encode(node: &Node) -> Result<Vec<u8>, String> {
    let value = node_to_cbor(node);
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&value, &mut buf).map_err(|e| format!("CBOR encode error: {}", e))?;
    Ok(buf)
}

fn node_to_cbor(node: &Node) -> Value {
    match node {
        Node::Mapping(mapping) => Value::Map(
            mapping
                .iter()
                .map(|(key, value)| (Value::Text(key.to_string()), node_to_cbor(value)))
                .collect(),
        ),
        Node::Sequence(items) => Value::Array(items.iter().map(node_to_cbor).collect()),
        Node::Scalar(scalar) => match &scalar.value {
            ScalarValue::String(s) => Value::Text(s.clone()),
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Integer(n) => Value::Integer(Integer::from(*n)),
            ScalarValue::Float(f) => Value::Float(*f),
            ScalarValue::Datetime(dt @ Datetime::Offset(_)) => {
                Value::Tag(0, Box::new(Value::Text(dt.to_string())))
            }
            ScalarValue::Datetime(dt) => Value::Text(dt.to_string()),
        },
    }
}
