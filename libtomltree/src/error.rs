//! Error types for TOML document assembly.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::event::{Kind, Position};
use crate::node::Node;
use crate::path::Path;

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Parse context carrying filename for error reporting.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    pub filename: Option<String>,
}

impl ParseContext {
    /// Create a new parse context.
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(String::from),
        }
    }

    /// Format a location suffix for error messages.
    pub fn loc_suffix(&self, line: usize, col: usize) -> String {
        match &self.filename {
            Some(name) => format!(" at {}:{} of <{}>", line, col, name),
            None => format!(" at {}:{}", line, col),
        }
    }
}

/// A syntax error reported by the upstream parser.
///
/// Lines and columns are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{suffix}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    suffix: String,
}

impl SyntaxError {
    /// Create a syntax error at a position.
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        let ctx = ParseContext::default();
        Self {
            message: message.into(),
            line: position.line,
            column: position.column,
            suffix: ctx.loc_suffix(position.line, position.column),
        }
    }

    /// Re-render the location suffix for a parse context.
    pub fn with_context(mut self, ctx: &ParseContext) -> Self {
        self.suffix = ctx.loc_suffix(self.line, self.column);
        self
    }
}

/// Error type for document assembly.
#[derive(Error, Debug, Clone)]
pub enum DecodeError {
    /// The upstream parser rejected the input.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A literal does not parse as its declared kind.
    #[error("malformed {kind} literal {literal:?}: {reason}")]
    MalformedScalar {
        kind: Kind,
        literal: String,
        reason: String,
    },

    /// An inline table member that is not a key-value pair.
    #[error("only key-value pairs are supported in inline tables, got {0} instead")]
    UnsupportedInlineContent(Kind),

    /// An event that cannot be converted into a tree node.
    #[error("unsupported {0} expression")]
    UnsupportedEvent(Kind),

    /// A table header with nothing after it.
    #[error("error retrieving table [{path}] value{}", describe_cause(.cause))]
    MalformedTable {
        path: Path,
        cause: Option<SyntaxError>,
    },

    /// The path-assignment engine met a node it cannot walk through or merge with.
    #[error("cannot assign at {path}: {segment:?} is already bound to a {found}")]
    AssignmentConflict {
        path: Path,
        segment: String,
        found: &'static str,
    },

    /// A table header declared twice under the strict policy.
    #[error("table [{path}] is declared more than once")]
    DuplicateTable { path: Path },

    /// The upstream parser aborted instead of returning an error.
    #[error("internal parser failure: {0}")]
    InternalAbort(String),

    /// Reading the input failed.
    #[error("failed to read input: {0}")]
    Read(Arc<io::Error>),
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Read(Arc::new(err))
    }
}

fn describe_cause(cause: &Option<SyntaxError>) -> String {
    match cause {
        Some(err) => format!(": {}", err),
        None => ": unexpected end of input".to_string(),
    }
}

/// A failed decode call: the error plus whatever tree had been assembled.
///
/// The partial tree is diagnostic only and must not be treated as output.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct DecodeFailure {
    pub error: DecodeError,
    pub partial: Node,
}

impl DecodeFailure {
    /// Discard the partial tree.
    pub fn into_error(self) -> DecodeError {
        self.error
    }
}
