//! Document tree representation.
//!
//! A decoded document is a tree of mappings, sequences and scalars. Every
//! scalar keeps the literal text it was produced from so that a serializer
//! can reproduce the original notation (`0xFF` rather than `255`).

use std::collections::HashMap;
use std::fmt;
use std::vec;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};

/// A node of the document tree.
#[derive(Clone, PartialEq)]
pub enum Node {
    /// Ordered key-value pairs.
    Mapping(Mapping),
    /// Ordered list of nodes.
    Sequence(Vec<Node>),
    /// Typed terminal value.
    Scalar(Scalar),
}

/// An ordered mapping.
///
/// Duplicate keys are representable; the assembler never creates them.
/// Lookups by key resolve to the first entry with that key.
#[derive(Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

/// A single key-value pair of a mapping.
#[derive(Clone, PartialEq)]
pub struct Entry {
    pub key: Scalar,
    pub value: Node,
}

/// A typed value paired with the literal text it came from.
#[derive(Clone, PartialEq)]
pub struct Scalar {
    pub value: ScalarValue,
    pub literal: String,
}

/// The typed half of a scalar.
#[derive(Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Datetime(Datetime),
}

/// The date-time shapes of RFC 3339 that configuration files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datetime {
    /// Date and time with a UTC offset.
    Offset(DateTime<FixedOffset>),
    /// Date and time without an offset.
    Local(NaiveDateTime),
    /// Calendar date only.
    Date(NaiveDate),
    /// Time of day only.
    Time(NaiveTime),
}

impl Node {
    /// Short name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(_) => "scalar",
        }
    }

    /// Returns a reference to the mapping if this is a `Mapping`.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Returns a reference to the items if this is a `Sequence`.
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns a reference to the scalar if this is a `Scalar`.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    pub fn as_datetime(&self) -> Option<&Datetime> {
        self.as_scalar().and_then(Scalar::as_datetime)
    }

    /// Look up a node by a dotted path such as `servers.alpha.ip` or
    /// `products[1].name`.
    pub fn get(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(self);
        }

        let (segment, rest) = split_path(path);
        let child = match (self, parse_index(segment)) {
            (Node::Sequence(items), Some(index)) => items.get(index)?,
            (Node::Mapping(mapping), None) => mapping.get(segment)?,
            _ => return None,
        };
        child.get(rest)
    }
}

fn split_path(path: &str) -> (&str, &str) {
    if path.starts_with('[') {
        if let Some(end) = path.find(']') {
            let rest = &path[end + 1..];
            return (&path[..=end], rest.strip_prefix('.').unwrap_or(rest));
        }
    }

    match path.find(['.', '[']) {
        Some(pos) if path.as_bytes()[pos] == b'.' => (&path[..pos], &path[pos + 1..]),
        Some(pos) => (&path[..pos], &path[pos..]),
        None => (path, ""),
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .and_then(|s| s.parse().ok())
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry whose key text is `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|index| &self.entries[index].value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        let index = self.position(key)?;
        Some(self.value_at_mut(index))
    }

    /// Append an entry without checking for an existing key.
    pub fn push(&mut self, key: Scalar, value: Node) {
        let next = self.entries.len();
        self.index.entry(key.literal.clone()).or_insert(next);
        self.entries.push(Entry { key, value });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Value of the entry at `index`, as returned by `position`.
    pub fn value_at_mut(&mut self, index: usize) -> &mut Node {
        &mut self.entries[index].value
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::key_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries
            .iter()
            .map(|entry| (entry.key_str(), &entry.value))
    }
}

impl IntoIterator for Mapping {
    type Item = Entry;
    type IntoIter = vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Entry {
    pub fn key_str(&self) -> &str {
        &self.key.literal
    }
}

impl Scalar {
    pub fn new(value: ScalarValue, literal: impl Into<String>) -> Self {
        Self {
            value,
            literal: literal.into(),
        }
    }

    /// A string scalar whose literal is the string itself.
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: ScalarValue::String(text.clone()),
            literal: text,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            ScalarValue::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            ScalarValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&Datetime> {
        match &self.value {
            ScalarValue::Datetime(dt) => Some(dt),
            _ => None,
        }
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datetime::Offset(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Datetime::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Datetime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Datetime::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Mapping(mapping) => mapping.fmt(f),
            Node::Sequence(items) => f.debug_list().entries(items).finish(),
            Node::Scalar(scalar) => scalar.fmt(f),
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.key_str(), self.value)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ScalarValue::String(s) => write!(f, "{:?}", s),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(_) | ScalarValue::Float(_) => write!(f, "{}", self.literal),
            ScalarValue::Datetime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}
