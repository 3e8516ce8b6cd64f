//! Expression events produced by the upstream syntax parser.
//!
//! The parser emits one top-level expression at a time: a table header, an
//! array-table header, or a key-value pair. Compound values (arrays, inline
//! tables) and key chains hang off the expression as nested events.

use std::fmt;

use crate::error::SyntaxError;

/// Kind of an expression event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `[a.b]` header.
    Table,
    /// `[[a.b]]` header.
    ArrayTable,
    /// `key = value`.
    KeyValue,
    /// One segment of a (possibly dotted) key.
    Key,
    String,
    Bool,
    Integer,
    Float,
    DateTime,
    Array,
    InlineTable,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Table => "table",
            Kind::ArrayTable => "array table",
            Kind::KeyValue => "key-value",
            Kind::Key => "key",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::DateTime => "datetime",
            Kind::Array => "array",
            Kind::InlineTable => "inline table",
        };
        f.write_str(name)
    }
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A single parse event.
///
/// Scalars and keys carry their text in `raw` (strings already unescaped).
/// Headers and key-values point at the head of a key chain; each key segment
/// links to the next. Arrays and inline tables own their children.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: Kind,
    raw: String,
    position: Position,
    key: Option<Box<Event>>,
    value: Option<Box<Event>>,
    next: Option<Box<Event>>,
    children: Vec<Event>,
}

impl Event {
    fn leaf(kind: Kind, raw: String) -> Self {
        Self {
            kind,
            raw,
            position: Position::default(),
            key: None,
            value: None,
            next: None,
            children: Vec::new(),
        }
    }

    /// A scalar event with its literal text.
    pub fn scalar(kind: Kind, raw: impl Into<String>) -> Self {
        Self::leaf(kind, raw.into())
    }

    /// Link key segment events into a chain, returning its head.
    pub fn key_chain(segments: Vec<Event>) -> Self {
        let mut segments = segments.into_iter().rev();
        let mut head = segments
            .next()
            .unwrap_or_else(|| Self::leaf(Kind::Key, String::new()));
        for mut segment in segments {
            segment.next = Some(Box::new(head));
            head = segment;
        }
        head
    }

    /// A key chain from plain segment names.
    pub fn key<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::key_chain(
            segments
                .into_iter()
                .map(|s| Self::leaf(Kind::Key, s.into()))
                .collect(),
        )
    }

    pub fn table(key: Event) -> Self {
        Self::header(Kind::Table, key)
    }

    pub fn array_table(key: Event) -> Self {
        Self::header(Kind::ArrayTable, key)
    }

    fn header(kind: Kind, key: Event) -> Self {
        let mut event = Self::leaf(kind, String::new());
        event.position = key.position;
        event.key = Some(Box::new(key));
        event
    }

    pub fn key_value(key: Event, value: Event) -> Self {
        let mut event = Self::leaf(Kind::KeyValue, String::new());
        event.position = key.position;
        event.key = Some(Box::new(key));
        event.value = Some(Box::new(value));
        event
    }

    pub fn array(children: Vec<Event>) -> Self {
        let mut event = Self::leaf(Kind::Array, String::new());
        event.children = children;
        event
    }

    pub fn inline_table(children: Vec<Event>) -> Self {
        let mut event = Self::leaf(Kind::InlineTable, String::new());
        event.children = children;
        event
    }

    /// Set the source position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Head of the key chain of a header or key-value.
    pub fn key_part(&self) -> Option<&Event> {
        self.key.as_deref()
    }

    /// Value of a key-value.
    pub fn value_part(&self) -> Option<&Event> {
        self.value.as_deref()
    }

    /// The key segment following this one.
    pub fn next_key_segment(&self) -> Option<&Event> {
        self.next.as_deref()
    }

    /// Children of an array or inline table, in document order.
    pub fn children(&self) -> std::slice::Iter<'_, Event> {
        self.children.iter()
    }
}

/// A cursor over top-level expressions.
///
/// Implementations may abort by panicking; the assembler converts such
/// aborts into errors.
pub trait ExpressionSource {
    /// Replace the input and rewind to its start.
    fn reset(&mut self, input: Vec<u8>);

    /// Move to the next expression. Returns `false` when the input is
    /// exhausted or an error occurred.
    fn next_expression(&mut self) -> bool;

    /// The expression the cursor is on.
    fn expression(&self) -> Option<&Event>;

    /// The error that stopped the cursor, if any.
    fn error(&self) -> Option<&SyntaxError>;
}

impl<S: ExpressionSource + ?Sized> ExpressionSource for Box<S> {
    fn reset(&mut self, input: Vec<u8>) {
        (**self).reset(input)
    }

    fn next_expression(&mut self) -> bool {
        (**self).next_expression()
    }

    fn expression(&self) -> Option<&Event> {
        (**self).expression()
    }

    fn error(&self) -> Option<&SyntaxError> {
        (**self).error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_chain_links_segments_in_order() {
        let head = Event::key(["servers", "alpha", "ip"]);
        let mut segments = Vec::new();
        let mut cursor = Some(&head);
        while let Some(segment) = cursor {
            assert_eq!(segment.kind(), Kind::Key);
            segments.push(segment.raw().to_string());
            cursor = segment.next_key_segment();
        }
        assert_eq!(segments, ["servers", "alpha", "ip"]);
    }

    #[test]
    fn test_key_value_parts() {
        let kv = Event::key_value(Event::key(["a"]), Event::scalar(Kind::Integer, "1"));
        assert_eq!(kv.kind(), Kind::KeyValue);
        assert_eq!(kv.key_part().map(Event::raw), Some("a"));
        assert_eq!(kv.value_part().map(Event::kind), Some(Kind::Integer));
    }
}
