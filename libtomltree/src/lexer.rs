//! Phase 2: Lexer
//!
//! A cursor over validated source text. The lexer reads the individual
//! pieces of an expression (whitespace, comments, newlines, keys, strings and
//! bare value literals) and tracks line and column as it goes. Deciding which
//! piece comes next is left to the parser.

use crate::error::SyntaxError;
use crate::event::{Kind, Position};

/// A resumable location in the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mark {
    offset: usize,
    position: Position,
}

pub struct Lexer<'a> {
    src: &'a str,
    mark: Mark,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, mark: Mark) -> Self {
        Self { src, mark }
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn position(&self) -> Position {
        self.mark.position
    }

    pub fn is_eof(&self) -> bool {
        self.mark.offset >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.mark.offset..]
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.src.as_bytes().get(self.mark.offset + n).copied()
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.mark.offset += ch.len_utf8();
        if ch == '\n' {
            self.mark.position.line += 1;
            self.mark.position.column = 1;
        } else {
            self.mark.position.column += 1;
        }
        Some(ch)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    pub fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, b: u8, what: &str) -> Result<(), SyntaxError> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", what, self.describe_next())))
        }
    }

    /// Human description of the next character for error messages.
    pub fn describe_next(&self) -> String {
        match self.rest().chars().next() {
            None => "end of input".to_string(),
            Some('\n') | Some('\r') => "newline".to_string(),
            Some(ch) => format!("{:?}", ch),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.position())
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
    }

    /// Skip a `#` comment up to (not including) the line ending.
    pub fn skip_comment(&mut self) -> bool {
        if self.peek() != Some(b'#') {
            return false;
        }
        while let Some(b) = self.peek() {
            if b == b'\n' || b == b'\r' {
                break;
            }
            self.bump();
        }
        true
    }

    pub fn eat_newline(&mut self) -> bool {
        if self.eat(b'\n') {
            return true;
        }
        if self.starts_with("\r\n") {
            self.bump_n(2);
            return true;
        }
        false
    }

    /// Skip whitespace, comments and newlines.
    pub fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            self.skip_comment();
            if !self.eat_newline() {
                break;
            }
        }
    }

    pub fn read_bare_key(&mut self) -> Option<&'a str> {
        let start = self.mark.offset;
        while self.peek().is_some_and(is_keylike_byte) {
            self.bump();
        }
        (self.mark.offset > start).then(|| &self.src[start..self.mark.offset])
    }

    /// Read a `"basic"` or `"""multi-line basic"""` string, processing escapes.
    pub fn read_basic_string(&mut self) -> Result<String, SyntaxError> {
        let start = self.position();
        if self.starts_with("\"\"\"") {
            self.bump_n(3);
            self.eat_newline();
            return self.read_multiline(b'"', start, true);
        }

        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => {
                    return Err(SyntaxError::new(
                        "basic string not terminated by \"",
                        start,
                    ))
                }
                Some(b'"') => {
                    self.bump();
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.bump();
                    self.read_escape(&mut out)?;
                }
                Some(_) => out.extend(self.bump()),
            }
        }
    }

    /// Read a `'literal'` or `'''multi-line literal'''` string verbatim.
    pub fn read_literal_string(&mut self) -> Result<String, SyntaxError> {
        let start = self.position();
        if self.starts_with("'''") {
            self.bump_n(3);
            self.eat_newline();
            return self.read_multiline(b'\'', start, false);
        }

        self.bump();
        let begin = self.mark.offset;
        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => {
                    return Err(SyntaxError::new(
                        "literal string not terminated by '",
                        start,
                    ))
                }
                Some(b'\'') => {
                    let text = &self.src[begin..self.mark.offset];
                    self.bump();
                    return Ok(text.to_string());
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn read_multiline(
        &mut self,
        delim: u8,
        start: Position,
        escapes: bool,
    ) -> Result<String, SyntaxError> {
        let quote = delim as char;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(SyntaxError::new(
                        format!("multi-line string not terminated by {}", quote.to_string().repeat(3)),
                        start,
                    ))
                }
                Some(b) if b == delim => {
                    let run = self.rest().bytes().take_while(|&c| c == delim).count();
                    if run >= 3 {
                        if run > 5 {
                            return Err(self.error("too many quotes at end of multi-line string"));
                        }
                        out.extend(std::iter::repeat(quote).take(run - 3));
                        self.bump_n(run);
                        return Ok(out);
                    }
                    out.extend(std::iter::repeat(quote).take(run));
                    self.bump_n(run);
                }
                Some(b'\\') if escapes => {
                    self.bump();
                    if self.at_line_ending_backslash() {
                        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
                            self.bump();
                        }
                    } else {
                        self.read_escape(&mut out)?;
                    }
                }
                Some(b'\r') if self.peek_at(1) == Some(b'\n') => {
                    self.bump_n(2);
                    out.push('\n');
                }
                Some(_) => out.extend(self.bump()),
            }
        }
    }

    fn at_line_ending_backslash(&self) -> bool {
        let rest = self.rest().trim_start_matches([' ', '\t']);
        rest.starts_with('\n') || rest.starts_with("\r\n")
    }

    /// Read the escape sequence after a backslash.
    fn read_escape(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        let at = self.position();
        let Some(ch) = self.bump() else {
            return Err(SyntaxError::new("unterminated escape sequence", at));
        };
        let unescaped = match ch {
            'b' => '\u{8}',
            't' => '\t',
            'n' => '\n',
            'f' => '\u{c}',
            'r' => '\r',
            'e' => '\u{1b}',
            '"' => '"',
            '\\' => '\\',
            'u' => self.read_unicode_escape(4, at)?,
            'U' => self.read_unicode_escape(8, at)?,
            other => {
                return Err(SyntaxError::new(
                    format!("invalid escape sequence \\{}", other),
                    at,
                ))
            }
        };
        out.push(unescaped);
        Ok(())
    }

    fn read_unicode_escape(&mut self, digits: usize, at: Position) -> Result<char, SyntaxError> {
        let hex = self
            .rest()
            .get(..digits)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| {
                SyntaxError::new(format!("expected {} hex digits in unicode escape", digits), at)
            })?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|e| SyntaxError::new(format!("bad unicode escape: {}", e), at))?;
        let ch = char::from_u32(code).ok_or_else(|| {
            SyntaxError::new(format!("invalid unicode scalar value U+{:04X}", code), at)
        })?;
        self.bump_n(digits);
        Ok(ch)
    }

    /// Read an unquoted value literal (number, boolean or date-time).
    ///
    /// A date followed by a space and a time is read as one literal.
    pub fn read_value_literal(&mut self) -> &'a str {
        let start = self.mark.offset;
        self.bump_literal_run();
        if is_date_shape(&self.src[start..self.mark.offset])
            && self.peek() == Some(b' ')
            && is_time_start(&self.rest()[1..])
        {
            self.bump();
            self.bump_literal_run();
        }
        &self.src[start..self.mark.offset]
    }

    fn bump_literal_run(&mut self) {
        while let Some(b) = self.peek() {
            if matches!(
                b,
                b' ' | b'\t' | b'\n' | b'\r' | b',' | b'#' | b'=' | b'[' | b']' | b'{' | b'}'
            ) {
                break;
            }
            self.bump();
        }
    }
}

fn is_keylike_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

fn is_time_start(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 3 && b[0].is_ascii_digit() && b[1].is_ascii_digit() && b[2] == b':'
}

/// Classify a bare value literal by its shape.
///
/// Only the shape is checked here; whether the literal actually parses as
/// its kind is decided when the scalar is materialized.
pub fn classify_literal(literal: &str) -> Option<Kind> {
    match literal {
        "" => return None,
        "true" | "false" => return Some(Kind::Bool),
        "inf" | "+inf" | "-inf" | "nan" | "+nan" | "-nan" => return Some(Kind::Float),
        _ => {}
    }

    let bytes = literal.as_bytes();
    let digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    let date = (0..4).all(digit) && bytes.get(4) == Some(&b'-');
    let time = digit(0) && digit(1) && bytes.get(2) == Some(&b':');
    if date || time {
        return Some(Kind::DateTime);
    }

    let unsigned = literal.strip_prefix(['+', '-']).unwrap_or(literal);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if ["0x", "0o", "0b"].iter().any(|p| unsigned.starts_with(p)) {
        return Some(Kind::Integer);
    }
    if unsigned.contains(['.', 'e', 'E']) {
        Some(Kind::Float)
    } else {
        Some(Kind::Integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer(src: &str) -> Lexer<'_> {
        Lexer::new(src, Mark::default())
    }

    #[test]
    fn test_classify_literal() {
        assert_eq!(classify_literal("true"), Some(Kind::Bool));
        assert_eq!(classify_literal("42"), Some(Kind::Integer));
        assert_eq!(classify_literal("-17"), Some(Kind::Integer));
        assert_eq!(classify_literal("0xDEADBEEF"), Some(Kind::Integer));
        assert_eq!(classify_literal("6.626e-34"), Some(Kind::Float));
        assert_eq!(classify_literal("-inf"), Some(Kind::Float));
        assert_eq!(classify_literal("1979-05-27"), Some(Kind::DateTime));
        assert_eq!(classify_literal("07:32:00"), Some(Kind::DateTime));
        assert_eq!(classify_literal("notanumber"), None);
        assert_eq!(classify_literal(""), None);
    }

    #[test]
    fn test_basic_string_escapes() {
        let mut lx = lexer(r#""tab\there \"quoted\" \u00E9 \U0001F600""#);
        assert_eq!(
            lx.read_basic_string().unwrap(),
            "tab\there \"quoted\" \u{e9} \u{1F600}"
        );
        assert!(lx.is_eof());
    }

    #[test]
    fn test_basic_string_unterminated() {
        let err = lexer("\"hello\nworld\"").read_basic_string().unwrap_err();
        assert_eq!(err.message, "basic string not terminated by \"");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_invalid_escape() {
        let err = lexer(r#""bad \q""#).read_basic_string().unwrap_err();
        assert_eq!(err.message, "invalid escape sequence \\q");
    }

    #[test]
    fn test_multiline_basic_string() {
        let mut lx = lexer("\"\"\"\nRoses are red\nViolets are \\\n    blue\"\"\"");
        assert_eq!(lx.read_basic_string().unwrap(), "Roses are red\nViolets are blue");
    }

    #[test]
    fn test_multiline_string_with_trailing_quotes() {
        let mut lx = lexer("\"\"\"say \"hi\"\"\"\"\"");
        assert_eq!(lx.read_basic_string().unwrap(), "say \"hi\"\"");
    }

    #[test]
    fn test_literal_strings() {
        assert_eq!(
            lexer(r"'C:\Users\nodejs'").read_literal_string().unwrap(),
            r"C:\Users\nodejs"
        );
        assert_eq!(
            lexer("'''\nfirst\n  second'''").read_literal_string().unwrap(),
            "first\n  second"
        );
    }

    #[test]
    fn test_value_literal_stops_at_delimiters() {
        let mut lx = lexer("42, 43]");
        assert_eq!(lx.read_value_literal(), "42");
        assert_eq!(lx.peek(), Some(b','));
    }

    #[test]
    fn test_value_literal_datetime_with_space() {
        let mut lx = lexer("1979-05-27 07:32:00Z # comment");
        assert_eq!(lx.read_value_literal(), "1979-05-27 07:32:00Z");
    }

    #[test]
    fn test_position_tracking() {
        let mut lx = lexer("# comment\n  key");
        lx.skip_trivia();
        assert_eq!(lx.position(), Position::new(2, 3));
        assert_eq!(lx.read_bare_key(), Some("key"));
        assert_eq!(lx.position(), Position::new(2, 6));
    }
}
