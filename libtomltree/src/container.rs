//! Conversion of value events into tree nodes.
//!
//! Scalars go through the materializer; arrays and inline tables are built
//! here, recursing for nested containers.

use tracing::trace;

use crate::assign;
use crate::error::{DecodeError, Result};
use crate::event::{Event, Kind};
use crate::node::{Mapping, Node};
use crate::path::{self, Path};
use crate::scalar;

/// Convert any value event into a tree node.
pub fn decode_node(event: &Event) -> Result<Node> {
    match event.kind() {
        Kind::Key | Kind::String | Kind::Bool | Kind::Integer | Kind::Float | Kind::DateTime => {
            scalar::materialize(event).map(Node::Scalar)
        }
        Kind::Array => build_sequence(event),
        Kind::InlineTable => build_inline_mapping(event),
        kind => Err(DecodeError::UnsupportedEvent(kind)),
    }
}

/// Build a sequence from an array event. Elements are plain values.
pub fn build_sequence(array: &Event) -> Result<Node> {
    let items = array
        .children()
        .map(decode_node)
        .collect::<Result<Vec<_>>>()?;
    Ok(Node::Sequence(items))
}

/// Build a mapping from an inline table event.
///
/// Each member is assigned into its own scoped mapping first, so a dotted
/// member such as `a.b = 1` expands into nested mappings local to the
/// inline table. The scoped entries are then merged into the result in order.
pub fn build_inline_mapping(table: &Event) -> Result<Node> {
    let mut content = Mapping::new();
    for child in table.children() {
        if child.kind() != Kind::KeyValue {
            return Err(DecodeError::UnsupportedInlineContent(child.kind()));
        }

        let mut scoped = Mapping::new();
        assign_key_value(&mut scoped, child)?;
        for entry in scoped {
            let path = Path::from_iter([entry.key_str()]);
            assign::merge_entry(&mut content, &path, entry.key, entry.value)?;
        }
    }
    Ok(Node::Mapping(content))
}

/// Assign one key-value event into `target`.
pub fn assign_key_value(target: &mut Mapping, key_value: &Event) -> Result<()> {
    let (Some(key), Some(value)) = (key_value.key_part(), key_value.value_part()) else {
        return Err(DecodeError::UnsupportedEvent(key_value.kind()));
    };

    let path = path::resolve(key);
    trace!(%path, kind = %value.kind(), "assigning key-value");
    let node = decode_node(value)?;
    assign::deep_assign(target, &path, node)
}
