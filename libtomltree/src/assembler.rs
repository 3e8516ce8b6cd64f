//! Document assembly.
//!
//! The assembler walks the expression stream and grows one root mapping:
//!
//! - a run of key-value expressions is assigned into the current target,
//!   reading one expression past the run to find where it ends;
//! - a table header collects the run that follows it into a scoped mapping
//!   and merges that mapping into the root at the header's path;
//! - an array-table header does the same but appends the scoped mapping as a
//!   new element of the sequence at its path.
//!
//! The expression that ends a run cannot be re-read from the source, so it
//! is kept in `pending` and handled by the next loop iteration.

use std::any::Any;
use std::collections::HashSet;
use std::io::Read;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::assign;
use crate::container;
use crate::error::{DecodeError, DecodeFailure, ParseContext, Result, SyntaxError};
use crate::event::{Event, ExpressionSource, Kind};
use crate::node::{Mapping, Node};
use crate::options::{DecodeOptions, TablePolicy};
use crate::parser::Parser;
use crate::path::{self, Path};

/// Lifecycle of a decode session.
#[derive(Debug, Clone)]
pub enum State {
    Running,
    /// The document was produced (or found empty); later calls report end of stream.
    Finished,
    /// A fatal error occurred; later calls report it again.
    Failed(DecodeError),
}

/// Where a key-value run stopped.
enum Boundary {
    /// A non key-value expression was read and must be handled next.
    Replay(Event),
    EndOfStream,
}

/// Decodes one document from an expression source into a tree.
pub struct Decoder<S = Parser> {
    source: S,
    options: DecodeOptions,
    context: ParseContext,
    root: Mapping,
    state: State,
    pending: Option<Event>,
    exhausted: bool,
    declared: HashSet<Path>,
}

impl Decoder<Parser> {
    pub fn new() -> Self {
        Self::with_options(DecodeOptions::default())
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self::from_source(Parser::new(), options)
    }
}

impl Default for Decoder<Parser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ExpressionSource> Decoder<S> {
    /// Build a decoder over an already prepared source.
    pub fn from_source(source: S, options: DecodeOptions) -> Self {
        let context = ParseContext::new(options.filename.as_deref());
        Self {
            source,
            options,
            context,
            root: Mapping::new(),
            state: State::Running,
            pending: None,
            exhausted: false,
            declared: HashSet::new(),
        }
    }

    /// Read the whole input and start a new session over it.
    pub fn init<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        self.init_bytes(input);
        Ok(())
    }

    /// Start a new session over an in-memory buffer.
    pub fn init_bytes(&mut self, input: Vec<u8>) {
        self.source.reset(input);
        self.root = Mapping::new();
        self.state = State::Running;
        self.pending = None;
        self.exhausted = false;
        self.declared.clear();
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Decode the document.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, including when the
    /// input held no content at all. On failure the partial tree assembled so
    /// far travels with the error.
    pub fn decode(&mut self) -> std::result::Result<Option<Node>, DecodeFailure> {
        match &self.state {
            State::Finished => return Ok(None),
            State::Failed(error) => {
                let error = error.clone();
                return Err(self.failure(error));
            }
            State::Running => {}
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run()))
            .unwrap_or_else(|payload| Err(abort_error(payload)));

        match outcome {
            Ok(()) => {
                self.state = State::Finished;
                if self.root.is_empty() {
                    debug!("no content decoded");
                    return Ok(None);
                }
                debug!(entries = self.root.len(), "document assembled");
                Ok(Some(Node::Mapping(mem::take(&mut self.root))))
            }
            Err(error) => {
                debug!(%error, "decode failed");
                self.state = State::Failed(error.clone());
                Err(self.failure(error))
            }
        }
    }

    fn failure(&self, error: DecodeError) -> DecodeFailure {
        DecodeFailure {
            error,
            partial: Node::Mapping(self.root.clone()),
        }
    }

    fn run(&mut self) -> Result<()> {
        loop {
            let event = match self.pending.take() {
                Some(event) => {
                    trace!(kind = %event.kind(), "replaying buffered expression");
                    event
                }
                None => match self.next_event()? {
                    Some(event) => event,
                    None => break,
                },
            };
            self.process_top_level(&event)?;
        }

        match self.source.error() {
            Some(error) => Err(DecodeError::Syntax(self.contextualize(error))),
            None => Ok(()),
        }
    }

    fn contextualize(&self, error: &SyntaxError) -> SyntaxError {
        error.clone().with_context(&self.context)
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        if self.exhausted {
            return Ok(None);
        }
        let event = pull(&mut self.source)?;
        if event.is_none() {
            self.exhausted = true;
        }
        Ok(event)
    }

    fn settle(&mut self, boundary: Boundary) {
        match boundary {
            Boundary::Replay(event) => self.pending = Some(event),
            Boundary::EndOfStream => self.exhausted = true,
        }
    }

    fn process_top_level(&mut self, event: &Event) -> Result<()> {
        debug!(
            kind = %event.kind(),
            line = event.position().line,
            "processing top-level expression"
        );
        match event.kind() {
            Kind::Table => self.process_table(event),
            Kind::ArrayTable => self.process_array_table(event),
            _ => {
                let boundary = consume_key_values(&mut self.source, &mut self.root, event)?;
                self.settle(boundary);
                if self.options.table_policy == TablePolicy::Strict {
                    declare_mappings(&mut self.declared, &Path::default(), &self.root);
                }
                Ok(())
            }
        }
    }

    fn process_table(&mut self, header: &Event) -> Result<()> {
        let path = header_path(header)?;
        debug!(%path, "processing table");

        if !self.declared.insert(path.clone()) && self.options.table_policy == TablePolicy::Strict {
            return Err(DecodeError::DuplicateTable { path });
        }

        let body = self.table_body(&path)?;
        self.declare_body(&path, &body);
        assign::deep_assign(&mut self.root, &path, Node::Mapping(body))
    }

    fn process_array_table(&mut self, header: &Event) -> Result<()> {
        let path = header_path(header)?;
        debug!(%path, "processing array table");

        // Tables under the new element start over.
        self.declared.retain(|declared| !declared.starts_with(&path));

        let body = self.table_body(&path)?;
        self.declare_body(&path, &body);
        assign::append_at_path(&mut self.root, &path, body)
    }

    /// Under the strict policy, tables defined by dotted keys or inline
    /// tables count as declared and cannot be reopened by a header.
    fn declare_body(&mut self, path: &Path, body: &Mapping) {
        if self.options.table_policy == TablePolicy::Strict {
            declare_mappings(&mut self.declared, path, body);
        }
    }

    /// Collect the key-value run following a header into a scoped mapping.
    fn table_body(&mut self, path: &Path) -> Result<Mapping> {
        let first = match self.next_event()? {
            Some(event) => event,
            None => {
                return Err(DecodeError::MalformedTable {
                    path: path.clone(),
                    cause: self.source.error().map(|e| self.contextualize(e)),
                })
            }
        };

        let mut scoped = Mapping::new();
        if first.kind() == Kind::KeyValue {
            let boundary = consume_key_values(&mut self.source, &mut scoped, &first)?;
            self.settle(boundary);
        } else {
            trace!(%path, "table has no members");
            self.pending = Some(first);
        }
        Ok(scoped)
    }
}

impl<S: ExpressionSource> Iterator for Decoder<S> {
    type Item = std::result::Result<Node, DecodeFailure>;

    /// Yields the document, or the failure, once.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Failed(_)) {
            return None;
        }
        self.decode().transpose()
    }
}

fn header_path(header: &Event) -> Result<Path> {
    header
        .key_part()
        .map(path::resolve)
        .ok_or(DecodeError::UnsupportedEvent(header.kind()))
}

fn declare_mappings(declared: &mut HashSet<Path>, prefix: &Path, mapping: &Mapping) {
    for (key, value) in mapping.iter() {
        if let Node::Mapping(child) = value {
            let path = prefix.child(key);
            declare_mappings(declared, &path, child);
            declared.insert(path);
        }
    }
}

fn pull<S: ExpressionSource>(source: &mut S) -> Result<Option<Event>> {
    if !source.next_expression() {
        return Ok(None);
    }
    match source.expression() {
        Some(event) => Ok(Some(event.clone())),
        None => Err(DecodeError::InternalAbort(
            "parser advanced without producing an expression".to_string(),
        )),
    }
}

/// Assign `first` and every key-value directly after it into `target`.
fn consume_key_values<S: ExpressionSource>(
    source: &mut S,
    target: &mut Mapping,
    first: &Event,
) -> Result<Boundary> {
    container::assign_key_value(target, first)?;

    loop {
        match pull(source)? {
            Some(event) if event.kind() == Kind::KeyValue => {
                container::assign_key_value(target, &event)?;
            }
            Some(event) => {
                debug!(kind = %event.kind(), "key-value run ended");
                return Ok(Boundary::Replay(event));
            }
            None => {
                debug!("key-value run reached end of input");
                return Ok(Boundary::EndOfStream);
            }
        }
    }
}

fn abort_error(payload: Box<dyn Any + Send>) -> DecodeError {
    let payload = match payload.downcast::<DecodeError>() {
        Ok(error) => return *error,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<SyntaxError>() {
        Ok(error) => return DecodeError::Syntax(*error),
        Err(payload) => payload,
    };
    if let Some(message) = payload.downcast_ref::<&str>() {
        return DecodeError::InternalAbort((*message).to_string());
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return DecodeError::InternalAbort(message.clone());
    }
    DecodeError::InternalAbort("unknown panic payload".to_string())
}
