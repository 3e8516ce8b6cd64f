//! TOML output: re-emit document trees as normalized TOML text.
//!
//! Mapping from the document tree to TOML:
//!   - top-level Mapping                 -> document
//!   - Mapping                           -> table (inline table inside arrays)
//!   - Sequence of only mappings         -> array of tables
//!   - other Sequence                    -> array
//!   - Integer / Float / Datetime        -> value re-parsed from its literal,
//!                                          so `0xFF` and `1e3` survive
//!   - String / Bool                     -> string / boolean
//!
//! Comments and whitespace of the input are not preserved.

use libtomltree::{Mapping, Node, Scalar, ScalarValue};
use toml_edit::{Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table, Value};

/// Encode a document tree as a TOML string.
pub fn encode(node: &Node) -> Result<String, String> {
    let Node::Mapping(mapping) = node else {
        return Err("TOML requires the top-level value to be a table".to_string());
    };
    let mut doc = DocumentMut::new();
    for (key, value) in mapping.iter() {
        doc[key] = node_to_item(value)?;
    }
    Ok(doc.to_string())
}

fn node_to_item(node: &Node) -> Result<Item, String> {
    match node {
        Node::Mapping(mapping) => Ok(Item::Table(mapping_to_table(mapping)?)),
        Node::Sequence(items) if is_array_of_tables(items) => {
            let mut array = ArrayOfTables::new();
            for item in items {
                if let Node::Mapping(mapping) = item {
                    array.push(mapping_to_table(mapping)?);
                }
            }
            Ok(Item::ArrayOfTables(array))
        }
        other => node_to_value(other).map(Item::Value),
    }
}

fn is_array_of_tables(items: &[Node]) -> bool {
    !items.is_empty() && items.iter().all(|n| matches!(n, Node::Mapping(_)))
}

fn mapping_to_table(mapping: &Mapping) -> Result<Table, String> {
    let mut table = Table::new();
    for (key, value) in mapping.iter() {
        table.insert(key, node_to_item(value)?);
    }
    Ok(table)
}

fn node_to_value(node: &Node) -> Result<Value, String> {
    match node {
        Node::Mapping(mapping) => {
            let mut inline = InlineTable::new();
            for (key, value) in mapping.iter() {
                inline.insert(key, node_to_value(value)?);
            }
            Ok(Value::InlineTable(inline))
        }
        Node::Sequence(items) => {
            let mut array = Array::new();
            for item in items {
                array.push(node_to_value(item)?);
            }
            Ok(Value::Array(array))
        }
        Node::Scalar(scalar) => scalar_to_value(scalar),
    }
}

fn scalar_to_value(scalar: &Scalar) -> Result<Value, String> {
    match &scalar.value {
        ScalarValue::String(s) => Ok(Value::from(s.as_str())),
        ScalarValue::Bool(b) => Ok(Value::from(*b)),
        ScalarValue::Integer(n) => Ok(literal_or(scalar, Value::from(*n))),
        ScalarValue::Float(f) => Ok(literal_or(scalar, Value::from(*f))),
        ScalarValue::Datetime(dt) => scalar
            .literal
            .parse::<Value>()
            .or_else(|_| dt.to_string().parse::<Value>())
            .map_err(|e| format!("Cannot convert datetime {} to TOML: {}", dt, e)),
    }
}

/// Prefer the original notation when it still reads as the same kind.
fn literal_or(scalar: &Scalar, fallback: Value) -> Value {
    match scalar.literal.parse::<Value>() {
        Ok(parsed @ Value::Integer(_)) if matches!(fallback, Value::Integer(_)) => parsed,
        Ok(parsed @ Value::Float(_)) if matches!(fallback, Value::Float(_)) => parsed,
        _ => fallback,
    }
}
