//! Path assignment into a mapping tree.
//!
//! Two operations, kept apart on purpose: `deep_assign` merges a value into
//! the node at a path, `append_at_path` adds a new trailing element to the
//! sequence at a path. Tables use the first, array tables the second.

use crate::error::{DecodeError, Result};
use crate::node::{Mapping, Node, Scalar};
use crate::path::Path;

/// Assign `value` at `path` under `root`, creating intermediate mappings.
///
/// A mapping assigned onto an existing mapping is merged into it, and a
/// sequence onto an existing sequence is appended to it. A mapping never
/// lands on a sequence or the reverse; that is an `AssignmentConflict`.
/// Anything else replaces the existing node in place.
pub fn deep_assign(root: &mut Mapping, path: &Path, value: Node) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        return match value {
            Node::Mapping(incoming) => merge_mapping(root, path, incoming),
            other => Err(conflict(path, "", other.kind_name())),
        };
    };

    let parent = descend(root, path, parents)?;
    merge_entry(parent, path, Scalar::string(last.as_str()), value)
}

/// Append `value` as a new element of the sequence at `path`, creating the
/// sequence if it is absent.
pub fn append_at_path(root: &mut Mapping, path: &Path, value: Mapping) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(conflict(path, "", "mapping"));
    };

    let parent = descend(root, path, parents)?;
    match parent.position(last) {
        None => parent.push(
            Scalar::string(last.as_str()),
            Node::Sequence(vec![Node::Mapping(value)]),
        ),
        Some(index) => match parent.value_at_mut(index) {
            Node::Sequence(items) => items.push(Node::Mapping(value)),
            other => return Err(conflict(path, last, other.kind_name())),
        },
    }
    Ok(())
}

/// Merge one entry into `parent`, keyed by the entry's key text. `path` names
/// the assignment in conflict errors.
pub fn merge_entry(parent: &mut Mapping, path: &Path, key: Scalar, value: Node) -> Result<()> {
    match parent.position(&key.literal) {
        Some(index) => merge_node(parent.value_at_mut(index), path, &key.literal, value),
        None => {
            parent.push(key, value);
            Ok(())
        }
    }
}

fn merge_mapping(target: &mut Mapping, path: &Path, incoming: Mapping) -> Result<()> {
    for entry in incoming {
        merge_entry(target, path, entry.key, entry.value)?;
    }
    Ok(())
}

fn merge_node(existing: &mut Node, path: &Path, segment: &str, value: Node) -> Result<()> {
    match (existing, value) {
        (Node::Mapping(current), Node::Mapping(incoming)) => merge_mapping(current, path, incoming),
        (Node::Sequence(current), Node::Sequence(incoming)) => {
            current.extend(incoming);
            Ok(())
        }
        (Node::Sequence(_), Node::Mapping(_)) => Err(conflict(path, segment, "sequence")),
        (Node::Mapping(_), Node::Sequence(_)) => Err(conflict(path, segment, "mapping")),
        (slot, value) => {
            *slot = value;
            Ok(())
        }
    }
}

/// Walk `segments` from `root`, creating missing mappings.
///
/// A sequence whose last element is a mapping is walked through that element,
/// so keys under an array table land in its most recent element.
fn descend<'a>(root: &'a mut Mapping, path: &Path, segments: &[String]) -> Result<&'a mut Mapping> {
    let mut current = root;
    for segment in segments {
        current = child_mapping(current, path, segment)?;
    }
    Ok(current)
}

fn child_mapping<'a>(parent: &'a mut Mapping, path: &Path, segment: &str) -> Result<&'a mut Mapping> {
    let index = match parent.position(segment) {
        Some(index) => index,
        None => {
            parent.push(Scalar::string(segment), Node::Mapping(Mapping::new()));
            parent.len() - 1
        }
    };

    match parent.value_at_mut(index) {
        Node::Mapping(mapping) => Ok(mapping),
        Node::Sequence(items) => match items.last_mut() {
            Some(Node::Mapping(mapping)) => Ok(mapping),
            _ => Err(conflict(path, segment, "sequence")),
        },
        Node::Scalar(_) => Err(conflict(path, segment, "scalar")),
    }
}

fn conflict(path: &Path, segment: &str, found: &'static str) -> DecodeError {
    DecodeError::AssignmentConflict {
        path: path.clone(),
        segment: segment.to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ScalarValue;

    fn int(n: i64) -> Node {
        Node::Scalar(Scalar::new(ScalarValue::Integer(n), n.to_string()))
    }

    fn path(segments: &[&str]) -> Path {
        Path::from_iter(segments.iter().copied())
    }

    #[test]
    fn test_deep_assign_creates_intermediates() {
        let mut root = Mapping::new();
        deep_assign(&mut root, &path(&["a", "b"]), int(1)).unwrap();
        let root = Node::Mapping(root);
        assert_eq!(root.get("a.b").and_then(Node::as_i64), Some(1));
    }

    #[test]
    fn test_deep_assign_merges_mappings() {
        let mut root = Mapping::new();
        let mut first = Mapping::new();
        first.push(Scalar::string("x"), int(1));
        let mut second = Mapping::new();
        second.push(Scalar::string("y"), int(2));

        deep_assign(&mut root, &path(&["a"]), Node::Mapping(first)).unwrap();
        deep_assign(&mut root, &path(&["a"]), Node::Mapping(second)).unwrap();

        assert_eq!(root.len(), 1);
        let a = root.get("a").and_then(Node::as_mapping).unwrap();
        assert_eq!(a.keys().collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn test_deep_assign_replaces_scalar_in_place() {
        let mut root = Mapping::new();
        deep_assign(&mut root, &path(&["a"]), int(1)).unwrap();
        deep_assign(&mut root, &path(&["b"]), int(2)).unwrap();
        deep_assign(&mut root, &path(&["a"]), int(3)).unwrap();
        assert_eq!(root.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(root.get("a").and_then(Node::as_i64), Some(3));
    }

    #[test]
    fn test_deep_assign_through_scalar_conflicts() {
        let mut root = Mapping::new();
        deep_assign(&mut root, &path(&["a"]), int(1)).unwrap();
        let err = deep_assign(&mut root, &path(&["a", "b"]), int(2)).unwrap_err();
        match err {
            DecodeError::AssignmentConflict { segment, found, .. } => {
                assert_eq!(segment, "a");
                assert_eq!(found, "scalar");
            }
            other => panic!("expected AssignmentConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_mapping_onto_sequence_conflicts() {
        let mut root = Mapping::new();
        append_at_path(&mut root, &path(&["a"]), Mapping::new()).unwrap();
        let err = deep_assign(&mut root, &path(&["a"]), Node::Mapping(Mapping::new())).unwrap_err();
        match err {
            DecodeError::AssignmentConflict { segment, found, .. } => {
                assert_eq!(segment, "a");
                assert_eq!(found, "sequence");
            }
            other => panic!("expected AssignmentConflict, got {:?}", other),
        }
        assert_eq!(root.get("a").and_then(Node::as_sequence).map(<[Node]>::len), Some(1));
    }

    #[test]
    fn test_sequence_onto_mapping_conflicts() {
        let mut root = Mapping::new();
        deep_assign(&mut root, &path(&["a"]), Node::Mapping(Mapping::new())).unwrap();
        let err = deep_assign(&mut root, &path(&["a"]), Node::Sequence(Vec::new())).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::AssignmentConflict { found: "mapping", .. }
        ));
    }

    #[test]
    fn test_append_creates_and_extends_sequence() {
        let mut root = Mapping::new();
        let mut first = Mapping::new();
        first.push(Scalar::string("x"), int(1));
        let mut second = Mapping::new();
        second.push(Scalar::string("x"), int(2));

        append_at_path(&mut root, &path(&["a"]), first).unwrap();
        append_at_path(&mut root, &path(&["a"]), second).unwrap();

        let items = root.get("a").and_then(Node::as_sequence).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("x").and_then(Node::as_i64), Some(1));
        assert_eq!(items[1].get("x").and_then(Node::as_i64), Some(2));
    }

    #[test]
    fn test_assign_walks_into_last_array_element() {
        let mut root = Mapping::new();
        append_at_path(&mut root, &path(&["fruit"]), Mapping::new()).unwrap();
        append_at_path(&mut root, &path(&["fruit"]), Mapping::new()).unwrap();
        deep_assign(&mut root, &path(&["fruit", "physical", "color"]), int(7)).unwrap();

        let root = Node::Mapping(root);
        assert!(root.get("fruit[0].physical").is_none());
        assert_eq!(root.get("fruit[1].physical.color").and_then(Node::as_i64), Some(7));
    }

    #[test]
    fn test_append_onto_mapping_conflicts() {
        let mut root = Mapping::new();
        deep_assign(&mut root, &path(&["a"]), Node::Mapping(Mapping::new())).unwrap();
        let err = append_at_path(&mut root, &path(&["a"]), Mapping::new()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::AssignmentConflict { found: "mapping", .. }
        ));
    }
}
