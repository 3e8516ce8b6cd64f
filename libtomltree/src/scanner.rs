//! Phase 1: Scanner
//!
//! The scanner converts raw input bytes into source text. It performs:
//! - UTF-8 validation
//! - Byte order mark removal
//! - Control character validation (only tab, line feed and CRLF pairs)

use crate::error::SyntaxError;
use crate::event::Position;

/// Validate input bytes and return the source text.
pub fn scan(input: Vec<u8>) -> Result<String, SyntaxError> {
    let mut source = String::from_utf8(input).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let prefix = std::str::from_utf8(valid).unwrap_or_default();
        SyntaxError::new("invalid UTF-8 sequence", position_after(prefix))
    })?;

    if source.starts_with('\u{FEFF}') {
        source.drain(..'\u{FEFF}'.len_utf8());
    }

    validate_code_points(&source)?;
    Ok(source)
}

/// Check whether a code point may appear anywhere in a document.
fn is_allowed_code_point(ch: char) -> bool {
    ch == '\t' || ch == '\n' || !(ch < '\u{20}' || ch == '\u{7F}')
}

/// Validate that the source contains no forbidden control characters.
fn validate_code_points(source: &str) -> Result<(), SyntaxError> {
    let mut line = 1;
    let mut col = 1;
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() != Some(&'\n') {
                return Err(SyntaxError::new(
                    "carriage return must be followed by line feed",
                    Position::new(line, col),
                ));
            }
        } else if !is_allowed_code_point(ch) {
            return Err(SyntaxError::new(
                format!("forbidden control character U+{:04X}", ch as u32),
                Position::new(line, col),
            ));
        }

        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    Ok(())
}

fn position_after(prefix: &str) -> Position {
    let line = prefix.matches('\n').count() + 1;
    let col = prefix.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    Position::new(line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_simple() {
        assert_eq!(scan(b"a = 1\n".to_vec()).unwrap(), "a = 1\n");
    }

    #[test]
    fn test_scan_strips_bom() {
        let mut input = "\u{FEFF}".as_bytes().to_vec();
        input.extend_from_slice(b"a = 1");
        assert_eq!(scan(input).unwrap(), "a = 1");
    }

    #[test]
    fn test_scan_accepts_crlf_and_tabs() {
        assert!(scan(b"a\t= 1\r\nb = 2\r\n".to_vec()).is_ok());
    }

    #[test]
    fn test_bare_carriage_return_error() {
        let err = scan(b"a = 1\rb = 2".to_vec()).unwrap_err();
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn test_control_character_error() {
        let err = scan(b"a = 1\nb = \x07".to_vec()).unwrap_err();
        assert_eq!((err.line, err.column), (2, 5));
        assert!(err.message.contains("U+0007"));
    }

    #[test]
    fn test_invalid_utf8_error() {
        let err = scan(b"a = 1\nb = \xff".to_vec()).unwrap_err();
        assert_eq!((err.line, err.column), (2, 5));
    }
}
