//! TOML document assembler.
//!
//! Decodes a TOML document into an ordered tree of mappings, sequences and
//! typed scalars. Every scalar keeps the literal it was written as, so a
//! serializer can reproduce `0xFF` or `1e3` rather than a normalized number.
//!
//! # Decoding Pipeline
//!
//! 1. **Scanner**: Validates encoding and control characters.
//!
//! 2. **Lexer**: A cursor that reads keys, strings and value literals.
//!
//! 3. **Expression Parser**: Produces one event per top-level expression
//!    (table header, array-table header or key-value pair). Any type that
//!    implements [`ExpressionSource`] can stand in for it.
//!
//! 4. **Assembler**: Consumes the expressions in order and builds the tree,
//!    merging reopened tables and appending array-table elements.

mod assembler;
mod assign;
mod container;
mod encode;
mod error;
mod event;
mod lexer;
mod node;
mod options;
mod parser;
mod path;
mod scalar;
mod scanner;

pub use assembler::{Decoder, State};
pub use encode::{encode, encode_json_string, Format};
pub use error::{DecodeError, DecodeFailure, ParseContext, Result, SyntaxError};
pub use event::{Event, ExpressionSource, Kind, Position};
pub use node::{Datetime, Entry, Mapping, Node, Scalar, ScalarValue};
pub use options::{DecodeOptions, TablePolicy};
pub use parser::{Parser, MAX_DEPTH};
pub use path::Path;

use std::io::Read;

/// Decode a TOML document from a string.
///
/// Returns `Ok(None)` when the document has no content.
///
/// # Example
///
/// ```
/// use libtomltree::decode_str;
///
/// let doc = decode_str("[server]\nport = 8080\n").unwrap().unwrap();
/// assert_eq!(doc.get("server.port").and_then(|n| n.as_i64()), Some(8080));
/// ```
pub fn decode_str(input: &str) -> Result<Option<Node>> {
    decode_bytes(input.as_bytes().to_vec())
}

/// Decode a TOML document from bytes.
pub fn decode_bytes(input: Vec<u8>) -> Result<Option<Node>> {
    decode_bytes_with_options(input, DecodeOptions::default())
}

/// Decode a TOML document from bytes with explicit options.
pub fn decode_bytes_with_options(input: Vec<u8>, options: DecodeOptions) -> Result<Option<Node>> {
    let mut decoder = Decoder::with_options(options);
    decoder.init_bytes(input);
    decoder.decode().map_err(DecodeFailure::into_error)
}

/// Decode a TOML document read from `reader`.
pub fn decode_reader<R: Read>(reader: R) -> Result<Option<Node>> {
    decode_reader_with_options(reader, DecodeOptions::default())
}

/// Decode a TOML document read from `reader` with explicit options.
pub fn decode_reader_with_options<R: Read>(
    reader: R,
    options: DecodeOptions,
) -> Result<Option<Node>> {
    let mut decoder = Decoder::with_options(options);
    decoder.init(reader)?;
    decoder.decode().map_err(DecodeFailure::into_error)
}
