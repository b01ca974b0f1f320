// lexer.rs - Splits source text into number, string, and word tokens

use crate::error::{Result, ScriptError};
use crate::location::{Location, SourceBuffer};
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// TOKEN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    String,
    Word,
}

/// One token of source text.  Numeric text is kept as written; the
/// constructor parses it when the token turns out not to name a word.
#[derive(Debug, Clone, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location, text: String) -> Self {
        Token {
            kind,
            location,
            text,
        }
    }
}

// Tokens compare by kind and text only.  Two occurrences of the same word on
// different lines are the same token.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.text.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", self.location)?;

        if self.kind == TokenKind::String {
            write!(f, "\"{}\"", self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

fn is_whitespace(next: char) -> bool {
    next == ' ' || next == '\t' || next == '\r' || next == '\n'
}

fn is_numeric(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();

    if chars[0].is_ascii_digit() {
        return true;
    }

    if (chars[0] == '-' || chars[0] == '+') && chars.len() >= 2 {
        return chars[1].is_ascii_digit();
    }

    false
}

fn skip_whitespace(buffer: &mut SourceBuffer) -> bool {
    while !buffer.eob() && is_whitespace(buffer.peek_next()) {
        buffer.next();
    }

    !buffer.eob()
}

fn skip_whitespace_until_column(buffer: &mut SourceBuffer, column: usize) {
    while !buffer.eob()
        && is_whitespace(buffer.peek_next())
        && buffer.current_location().column < column
    {
        buffer.next();
    }
}

fn process_escape_literal(buffer: &mut SourceBuffer) -> Result<char> {
    let next = buffer.next();

    match next {
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        't' => Ok('\t'),

        '0' => {
            // A numeric character literal, \0 followed by decimal digits.
            let start = buffer.current_location();
            let mut number_string = String::new();

            while !buffer.eob() && buffer.peek_next().is_ascii_digit() {
                number_string.push(buffer.next());
            }

            let numeric: u32 = number_string.parse().map_err(|_| {
                ScriptError::with_location(start.clone(), "Numeric literal out of range.")
            })?;

            if numeric >= 256 {
                return Err(ScriptError::with_location(
                    start,
                    "Numeric literal out of range.",
                ));
            }

            Ok(numeric as u8 as char)
        }

        _ => Ok(next),
    }
}

fn process_multi_line_string(buffer: &mut SourceBuffer) -> Result<String> {
    // Extract the *.
    buffer.next();

    skip_whitespace(buffer);

    // Whitespace up to this column is margin, not string content.
    let target_column = buffer.current_location().column;
    let mut new_string = String::new();

    while !buffer.eob() {
        let next = buffer.next();

        if next == '*' {
            // Check if the next character closes the string.
            if buffer.peek_next() == '"' {
                buffer.next();
                break;
            }

            new_string.push(next);
        } else if next == '\\' {
            new_string.push(process_escape_literal(buffer)?);
        } else if next == '\n' {
            new_string.push(next);

            let start_line = buffer.current_location().line;

            skip_whitespace_until_column(buffer, target_column);

            // Whole blank lines skipped by the margin trim still belong in
            // the string.
            let current_line = buffer.current_location().line;

            for _ in start_line..current_line {
                new_string.push('\n');
            }
        } else {
            new_string.push(next);
        }
    }

    Ok(new_string)
}

fn process_string(buffer: &mut SourceBuffer) -> Result<String> {
    let start = buffer.current_location();

    buffer.next();

    if buffer.peek_next() == '*' {
        return process_multi_line_string(buffer);
    }

    let mut new_string = String::new();
    let mut next = ' ';

    while !buffer.eob() {
        next = buffer.next();

        if next == '"' {
            break;
        }

        if next == '\n' {
            return Err(ScriptError::with_location(
                start,
                "Unexpected new line in string literal.",
            ));
        }

        if next == '\\' {
            next = process_escape_literal(buffer)?;
        }

        new_string.push(next);
    }

    if next != '"' {
        return Err(ScriptError::with_location(
            start,
            "Missing end of string literal.",
        ));
    }

    Ok(new_string)
}

fn get_while_not_whitespace(buffer: &mut SourceBuffer) -> String {
    let mut new_string = String::new();

    while !buffer.eob() && !is_whitespace(buffer.peek_next()) {
        new_string.push(buffer.next());
    }

    new_string
}

/// Convert a source buffer into a flat token list.
pub fn tokenize(buffer: &mut SourceBuffer) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    while !buffer.eob() {
        if !skip_whitespace(buffer) {
            break;
        }

        let location = buffer.current_location();
        let mut kind = TokenKind::Word;
        let text;

        if buffer.peek_next() == '"' {
            kind = TokenKind::String;
            text = process_string(buffer)?;
        } else {
            text = get_while_not_whitespace(buffer);
        }

        if kind != TokenKind::String && is_numeric(&text) {
            kind = TokenKind::Number;
        }

        tokens.push(Token::new(kind, location, text));
    }

    Ok(tokens)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_str(source: &str) -> Vec<Token> {
        let mut buffer = SourceBuffer::from_string("test", source);
        tokenize(&mut buffer).unwrap()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_simple_words() {
        let tokens = tokenize_str("dup swap over");

        assert_eq!(texts(&tokens), vec!["dup", "swap", "over"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Word));
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize_str("42 -17 +9 3.5 0xff 0b1010");

        assert_eq!(
            texts(&tokens),
            vec!["42", "-17", "+9", "3.5", "0xff", "0b1010"]
        );
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_symbols_are_words() {
        // A bare - is a word; a leading digit still classifies as a number.
        let tokens = tokenize_str("- <= swap!");

        assert!(tokens.iter().all(|t| t.kind == TokenKind::Word));
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize_str("\"hello world\" after");

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "hello world");
        assert_eq!(tokens[1].text, "after");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize_str(r#""a\tb\nc\065""#);

        assert_eq!(tokens[0].text, "a\tb\ncA");
    }

    #[test]
    fn test_unterminated_string() {
        let mut buffer = SourceBuffer::from_string("test", "\"no end");
        let result = tokenize(&mut buffer);

        assert!(result.is_err());
    }

    #[test]
    fn test_newline_in_string() {
        let mut buffer = SourceBuffer::from_string("test", "\"line\nbreak\"");
        let result = tokenize(&mut buffer);

        assert!(result.is_err());
    }

    #[test]
    fn test_multi_line_string() {
        let source = "\"* first\n   second *\"";
        let tokens = tokenize_str(source);

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "first\nsecond ");
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize_str("one\n  two");

        assert_eq!(tokens[0].location, Location::new("test", 1, 1));
        assert_eq!(tokens[1].location, Location::new("test", 2, 3));
    }

    #[test]
    fn test_token_equality_ignores_location() {
        let a = Token::new(TokenKind::Word, Location::new("a", 1, 1), "dup".to_string());
        let b = Token::new(TokenKind::Word, Location::new("b", 9, 9), "dup".to_string());

        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize_str("").is_empty());
        assert!(tokenize_str("  \t\n  ").is_empty());
    }
}
