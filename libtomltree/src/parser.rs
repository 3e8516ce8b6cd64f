//! Phase 3: Expression Parser
//!
//! Reads one top-level expression per step from the validated source and
//! turns it into an event tree. Blank lines and comments between expressions
//! are skipped; anything other than whitespace, a comment or a newline after
//! an expression is a syntax error.

use tracing::{debug, trace};

use crate::error::SyntaxError;
use crate::event::{Event, ExpressionSource, Kind, Position};
use crate::lexer::{classify_literal, Lexer, Mark};
use crate::scanner;

type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Deepest nesting of key segments, arrays and inline tables in one
/// expression.
pub const MAX_DEPTH: usize = 128;

/// Expression source over TOML text.
#[derive(Debug)]
pub struct Parser {
    source: String,
    mark: Mark,
    current: Option<Event>,
    error: Option<SyntaxError>,
    done: bool,
}

impl Parser {
    /// A parser with no input. Call `reset` before reading expressions.
    pub fn new() -> Self {
        Self {
            source: String::new(),
            mark: Mark::default(),
            current: None,
            error: None,
            done: true,
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionSource for Parser {
    fn reset(&mut self, input: Vec<u8>) {
        self.mark = Mark::default();
        self.current = None;
        match scanner::scan(input) {
            Ok(source) => {
                self.source = source;
                self.error = None;
                self.done = false;
            }
            Err(err) => {
                debug!(%err, "input rejected by scanner");
                self.source = String::new();
                self.error = Some(err);
                self.done = true;
            }
        }
    }

    fn next_expression(&mut self) -> bool {
        if self.done {
            return false;
        }

        let mut lexer = Lexer::new(&self.source, self.mark);
        let result = parse_expression(&mut lexer);
        self.mark = lexer.mark();

        match result {
            Ok(Some(event)) => {
                trace!(
                    kind = %event.kind(),
                    line = event.position().line,
                    "parsed expression"
                );
                self.current = Some(event);
                true
            }
            Ok(None) => {
                self.current = None;
                self.done = true;
                false
            }
            Err(err) => {
                debug!(%err, "syntax error");
                self.current = None;
                self.error = Some(err);
                self.done = true;
                false
            }
        }
    }

    fn expression(&self) -> Option<&Event> {
        self.current.as_ref()
    }

    fn error(&self) -> Option<&SyntaxError> {
        self.error.as_ref()
    }
}

fn parse_expression(lexer: &mut Lexer<'_>) -> ParseResult<Option<Event>> {
    lexer.skip_trivia();
    if lexer.is_eof() {
        return Ok(None);
    }

    let event = if lexer.peek() == Some(b'[') {
        parse_header(lexer)?
    } else {
        parse_key_value(lexer, 0)?
    };

    lexer.skip_whitespace();
    lexer.skip_comment();
    if !lexer.eat_newline() && !lexer.is_eof() {
        return Err(lexer.error(format!(
            "expected newline after {}, found {}",
            event.kind(),
            lexer.describe_next()
        )));
    }
    Ok(Some(event))
}

fn parse_header(lexer: &mut Lexer<'_>) -> ParseResult<Event> {
    let position = lexer.position();
    lexer.eat(b'[');
    let array = lexer.eat(b'[');

    let (key, _) = parse_key(lexer, 0)?;
    lexer.expect(b']', "`]` to close table header")?;
    let header = if array {
        lexer.expect(b']', "`]]` to close array table header")?;
        Event::array_table(key)
    } else {
        Event::table(key)
    };
    Ok(header.at(position))
}

/// Parse a possibly dotted key into a chain of key events, returning the
/// depth reached after its last segment.
fn parse_key(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<(Event, usize)> {
    let mut segments = Vec::new();
    loop {
        lexer.skip_whitespace();
        let position = lexer.position();
        check_depth(depth + segments.len() + 1, position)?;
        let text = match lexer.peek() {
            Some(b'"') if lexer.starts_with("\"\"\"") => {
                return Err(lexer.error("multi-line strings cannot be keys"))
            }
            Some(b'\'') if lexer.starts_with("'''") => {
                return Err(lexer.error("multi-line strings cannot be keys"))
            }
            Some(b'"') => lexer.read_basic_string()?,
            Some(b'\'') => lexer.read_literal_string()?,
            _ => match lexer.read_bare_key() {
                Some(key) => key.to_string(),
                None => {
                    return Err(lexer.error(format!(
                        "expected a key, found {}",
                        lexer.describe_next()
                    )))
                }
            },
        };
        segments.push(Event::scalar(Kind::Key, text).at(position));

        lexer.skip_whitespace();
        if !lexer.eat(b'.') {
            break;
        }
    }
    let depth = depth + segments.len();
    Ok((Event::key_chain(segments), depth))
}

fn check_depth(depth: usize, position: Position) -> ParseResult<()> {
    if depth > MAX_DEPTH {
        return Err(SyntaxError::new(
            format!("maximum nesting depth of {} exceeded", MAX_DEPTH),
            position,
        ));
    }
    Ok(())
}

fn parse_key_value(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Event> {
    let position = lexer.position();
    let (key, depth) = parse_key(lexer, depth)?;
    lexer.expect(b'=', "`=` after key")?;
    lexer.skip_whitespace();
    let value = parse_value(lexer, depth)?;
    Ok(Event::key_value(key, value).at(position))
}

fn parse_value(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Event> {
    let position = lexer.position();
    let event = match lexer.peek() {
        Some(b'"') => Event::scalar(Kind::String, lexer.read_basic_string()?),
        Some(b'\'') => Event::scalar(Kind::String, lexer.read_literal_string()?),
        Some(b'[') => {
            check_depth(depth + 1, position)?;
            parse_array(lexer, depth + 1)?
        }
        Some(b'{') => {
            check_depth(depth + 1, position)?;
            parse_inline_table(lexer, depth + 1)?
        }
        _ => {
            let literal = lexer.read_value_literal();
            match classify_literal(literal) {
                Some(kind) => Event::scalar(kind, literal),
                None if literal.is_empty() => {
                    return Err(SyntaxError::new(
                        format!("expected a value, found {}", lexer.describe_next()),
                        position,
                    ))
                }
                None => {
                    return Err(SyntaxError::new(
                        format!("invalid value `{}`", literal),
                        position,
                    ))
                }
            }
        }
    };
    Ok(event.at(position))
}

/// Arrays may span lines and carry comments and a trailing comma.
fn parse_array(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Event> {
    let start = lexer.position();
    lexer.eat(b'[');
    let mut children = Vec::new();
    loop {
        lexer.skip_trivia();
        if lexer.eat(b']') {
            break;
        }
        if lexer.is_eof() {
            return Err(SyntaxError::new("array is not closed by `]`", start));
        }
        children.push(parse_value(lexer, depth)?);
        lexer.skip_trivia();
        if lexer.eat(b',') {
            continue;
        }
        lexer.expect(b']', "`,` or `]` in array")?;
        break;
    }
    Ok(Event::array(children))
}

/// Inline tables stay on one line and take no trailing comma.
fn parse_inline_table(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Event> {
    lexer.eat(b'{');
    lexer.skip_whitespace();
    let mut children = Vec::new();
    if lexer.eat(b'}') {
        return Ok(Event::inline_table(children));
    }
    loop {
        lexer.skip_whitespace();
        children.push(parse_key_value(lexer, depth)?);
        lexer.skip_whitespace();
        if lexer.eat(b',') {
            continue;
        }
        lexer.expect(b'}', "`,` or `}` in inline table")?;
        break;
    }
    Ok(Event::inline_table(children))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expressions(input: &str) -> (Vec<Event>, Option<SyntaxError>) {
        let mut parser = Parser::new();
        parser.reset(input.as_bytes().to_vec());
        let mut events = Vec::new();
        while parser.next_expression() {
            events.extend(parser.expression().cloned());
        }
        (events, parser.error().cloned())
    }

    fn key_names(head: &Event) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = Some(head);
        while let Some(segment) = cursor {
            names.push(segment.raw().to_string());
            cursor = segment.next_key_segment();
        }
        names
    }

    #[test]
    fn test_empty_input() {
        let (events, error) = expressions("\n# only a comment\n\n");
        assert!(events.is_empty());
        assert!(error.is_none());
    }

    #[test]
    fn test_headers_and_key_values() {
        let (events, error) = expressions("title = \"x\"\n[server]\n[[fruits]]\n");
        assert!(error.is_none());
        let kinds: Vec<Kind> = events.iter().map(Event::kind).collect();
        assert_eq!(kinds, [Kind::KeyValue, Kind::Table, Kind::ArrayTable]);
        assert_eq!(events[1].position(), Position::new(2, 1));
    }

    #[test]
    fn test_dotted_and_quoted_keys() {
        let (events, _) = expressions("site.\"google.com\" . 'x y' = true\n");
        let key = events[0].key_part().unwrap();
        assert_eq!(key_names(key), ["site", "google.com", "x y"]);
        assert_eq!(events[0].value_part().map(Event::kind), Some(Kind::Bool));
    }

    #[test]
    fn test_header_with_spaces() {
        let (events, _) = expressions("[ a . b ]\n[[ c ]]\n");
        assert_eq!(key_names(events[0].key_part().unwrap()), ["a", "b"]);
        assert_eq!(key_names(events[1].key_part().unwrap()), ["c"]);
    }

    #[test]
    fn test_nesting_at_limit_is_accepted() {
        let depth = MAX_DEPTH - 1;
        let input = format!("a = {}{}\n", "[".repeat(depth), "]".repeat(depth));
        let (events, error) = expressions(&input);
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_nesting_past_limit_is_rejected() {
        let input = format!("a = {}\n", "[".repeat(10_000));
        let (events, error) = expressions(&input);
        assert!(events.is_empty());
        let error = error.unwrap();
        assert_eq!(error.message, "maximum nesting depth of 128 exceeded");
    }

    #[test]
    fn test_inline_tables_and_dotted_keys_count_toward_depth() {
        let inline = format!("a = {}{}\n", "{ b = ".repeat(200), "1 }".repeat(200));
        assert!(expressions(&inline).1.is_some());

        let dotted = format!("{} = 1\n", vec!["k"; MAX_DEPTH + 1].join("."));
        assert!(expressions(&dotted).1.is_some());

        let header = format!("[{}]\n", vec!["k"; MAX_DEPTH + 1].join("."));
        assert!(expressions(&header).1.is_some());
    }

    #[test]
    fn test_multiline_array_with_comments() {
        let (events, error) = expressions("a = [\n  1, # one\n  2,\n]\nb = 3\n");
        assert!(error.is_none());
        let array = events[0].value_part().unwrap();
        assert_eq!(array.kind(), Kind::Array);
        assert_eq!(array.children().map(Event::raw).collect::<Vec<_>>(), ["1", "2"]);
        assert_eq!(events[1].position(), Position::new(5, 1));
    }

    #[test]
    fn test_inline_table() {
        let (events, _) = expressions("point = { x = 1, y.z = 2 }\n");
        let table = events[0].value_part().unwrap();
        assert_eq!(table.kind(), Kind::InlineTable);
        assert_eq!(table.children().count(), 2);
        assert!(table.children().all(|c| c.kind() == Kind::KeyValue));
    }

    #[test]
    fn test_literal_kinds() {
        let (events, _) = expressions(
            "a = 0xFF\nb = 3.14\nc = 1979-05-27T07:32:00Z\nd = 1979-05-27 07:32:00\ne = false\n",
        );
        let values: Vec<(Kind, &str)> = events
            .iter()
            .filter_map(Event::value_part)
            .map(|v| (v.kind(), v.raw()))
            .collect();
        assert_eq!(
            values,
            [
                (Kind::Integer, "0xFF"),
                (Kind::Float, "3.14"),
                (Kind::DateTime, "1979-05-27T07:32:00Z"),
                (Kind::DateTime, "1979-05-27 07:32:00"),
                (Kind::Bool, "false"),
            ]
        );
    }

    #[test]
    fn test_trailing_garbage_error() {
        let (events, error) = expressions("a = 1 b = 2\n");
        assert!(events.is_empty());
        let error = error.unwrap();
        assert_eq!((error.line, error.column), (1, 7));
    }

    #[test]
    fn test_unterminated_string_error() {
        let (events, error) = expressions("a = 1\nb = \"unterminated\n");
        assert_eq!(events.len(), 1);
        let error = error.unwrap();
        assert_eq!((error.line, error.column), (2, 5));
    }

    #[test]
    fn test_invalid_value_error() {
        let (_, error) = expressions("a = notanumber\n");
        assert_eq!(error.unwrap().message, "invalid value `notanumber`");
    }

    #[test]
    fn test_missing_equals() {
        let (_, error) = expressions("a 1\n");
        assert_eq!(error.unwrap().message, "expected `=` after key, found '1'");
    }

    #[test]
    fn test_inline_table_trailing_comma_rejected() {
        let (_, error) = expressions("a = { x = 1, }\n");
        assert!(error.unwrap().message.starts_with("expected a key"));
    }

    #[test]
    fn test_reset_clears_error() {
        let mut parser = Parser::new();
        parser.reset(b"a = \x01".to_vec());
        assert!(!parser.next_expression());
        assert!(parser.error().is_some());

        parser.reset(b"a = 1".to_vec());
        assert!(parser.error().is_none());
        assert!(parser.next_expression());
        assert!(!parser.next_expression());
    }
}
