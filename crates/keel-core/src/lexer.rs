//! The Keel lexer.
//!
//! Converts source text into tokens with line/column spans. Besides feeding
//! the parser, the importer runs it on single, already-isolated C macro tokens
//! to classify them as Keel literals.

use crate::ident::Span;

/// Lexical token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal and the text it was spelled with.
    Number { value: i64, raw: String },
    Float { value: f64, raw: String },
    Char(u8),
    StringLiteral(String),
    /// Identifier or keyword. Words that start with a digit but are not
    /// valid numbers also land here and are rejected by the parser.
    Identifier(String),
    Punct(char),
}

/// A token paired with where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Errors that can occur while lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// Integer literal larger than `i64::MAX`.
    #[error("integer literal `{raw}` does not fit in 64 bits")]
    IntegerOverflow { raw: String },

    /// A char or string literal ran off the end of input.
    #[error("unterminated {what} literal at {line}:{column}")]
    Unterminated {
        what: &'static str,
        line: u32,
        column: u32,
    },

    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),

    /// A char literal that is empty or does not hold a single byte.
    #[error("invalid character literal")]
    InvalidCharLiteral,

    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
}

/// Pull-based lexer over a source string.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    /// Create a lexer positioned at the start of `source`.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Lex the whole input.
    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Consume characters while `pred` holds and return them.
    pub fn collect_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia();
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let span = self.span();

        let kind = if c.is_ascii_digit() {
            self.number_or_word()?
        } else if is_identifier_start(c) {
            TokenKind::Identifier(self.collect_while(is_identifier_char))
        } else if c == '\'' {
            self.char_literal(span)?
        } else if c == '"' {
            self.string_literal(span)?
        } else if c.is_ascii_punctuation() {
            self.advance();
            TokenKind::Punct(c)
        } else {
            return Err(LexError::UnexpectedChar(c));
        };

        Ok(Some(Token { kind, span }))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.collect_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    fn number_or_word(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            let next_is_digit = self.peek_at(1).is_some_and(|n| n.is_ascii_digit());
            let after_exponent = self.pos > start && matches!(self.chars[self.pos - 1], 'e' | 'E');
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else if c == '.' && !seen_dot && next_is_digit {
                seen_dot = true;
                self.advance();
            } else if matches!(c, '+' | '-') && after_exponent && next_is_digit {
                self.advance();
            } else {
                break;
            }
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        classify_number(raw)
    }

    fn char_literal(&mut self, span: Span) -> Result<TokenKind, LexError> {
        self.advance();
        let c = match self.advance() {
            Some('\\') => self.escape()?,
            Some('\'') => return Err(LexError::InvalidCharLiteral),
            Some(c) if c.is_ascii() => c as u8,
            Some(_) => return Err(LexError::InvalidCharLiteral),
            None => return Err(unterminated("character", span)),
        };
        match self.advance() {
            Some('\'') => Ok(TokenKind::Char(c)),
            Some(_) => Err(LexError::InvalidCharLiteral),
            None => Err(unterminated("character", span)),
        }
    }

    fn string_literal(&mut self, span: Span) -> Result<TokenKind, LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(TokenKind::StringLiteral(value)),
                Some('\\') => value.push(char::from(self.escape()?)),
                Some(c) => value.push(c),
                None => return Err(unterminated("string", span)),
            }
        }
    }

    fn escape(&mut self) -> Result<u8, LexError> {
        let c = self.advance().ok_or(LexError::InvalidEscape(' '))?;
        match c {
            'n' => Ok(b'\n'),
            't' => Ok(b'\t'),
            'r' => Ok(b'\r'),
            '0' => Ok(0),
            '\\' => Ok(b'\\'),
            '\'' => Ok(b'\''),
            '"' => Ok(b'"'),
            'x' => {
                let hex: String = (0..2).filter_map(|_| {
                    let h = self.peek().filter(|h| h.is_ascii_hexdigit())?;
                    self.advance();
                    Some(h)
                }).collect();
                u8::from_str_radix(&hex, 16).map_err(|_| LexError::InvalidEscape('x'))
            }
            other => Err(LexError::InvalidEscape(other)),
        }
    }
}

fn unterminated(what: &'static str, span: Span) -> LexError {
    LexError::Unterminated {
        what,
        line: span.line,
        column: span.column,
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn classify_number(raw: String) -> Result<TokenKind, LexError> {
    if let Some(parsed) = parse_integer(&raw) {
        let value = parsed?;
        return Ok(TokenKind::Number { value, raw });
    }
    if is_float_shaped(&raw) {
        if let Ok(value) = raw.replace('_', "").parse::<f64>() {
            return Ok(TokenKind::Float { value, raw });
        }
    }
    Ok(TokenKind::Identifier(raw))
}

/// Parse a Keel integer literal: decimal, `0x`, `0b` or `0o`, with `_`
/// separators.
///
/// Returns `None` if `raw` is not shaped like an integer at all, and
/// `Some(Err(..))` if it is but overflows `i64`.
pub fn parse_integer(raw: &str) -> Option<Result<i64, LexError>> {
    let (digits, radix) = if let Some(rest) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = raw.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = raw.strip_prefix("0o") {
        (rest, 8)
    } else {
        (raw, 10)
    };
    if !digits.chars().next().is_some_and(|c| c.is_digit(radix)) {
        return None;
    }
    if !digits.chars().all(|c| c == '_' || c.is_digit(radix)) {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    Some(
        i64::from_str_radix(&cleaned, radix).map_err(|_| LexError::IntegerOverflow {
            raw: raw.to_string(),
        }),
    )
}

fn is_float_shaped(raw: &str) -> bool {
    raw.starts_with(|c: char| c.is_ascii_digit())
        && raw.contains(['.', 'e', 'E'])
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '_' | '.' | 'e' | 'E' | '+' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .lex()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn integers() {
        assert_eq!(
            kinds("42 0x1F 0b101 1_000"),
            vec![
                TokenKind::Number { value: 42, raw: "42".into() },
                TokenKind::Number { value: 31, raw: "0x1F".into() },
                TokenKind::Number { value: 5, raw: "0b101".into() },
                TokenKind::Number { value: 1000, raw: "1_000".into() },
            ]
        );
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let err = Lexer::new("18446744073709551615").lex().unwrap_err();
        assert!(matches!(err, LexError::IntegerOverflow { .. }));
        assert!(Lexer::new("9223372036854775807").lex().is_ok());
    }

    #[test]
    fn suffixed_numbers_lex_as_words() {
        assert_eq!(kinds("10UL"), vec![TokenKind::Identifier("10UL".into())]);
        assert_eq!(kinds("0x10u"), vec![TokenKind::Identifier("0x10u".into())]);
    }

    #[test]
    fn floats() {
        assert_eq!(
            kinds("3.25 1e3 2.5e-1"),
            vec![
                TokenKind::Float { value: 3.25, raw: "3.25".into() },
                TokenKind::Float { value: 1000.0, raw: "1e3".into() },
                TokenKind::Float { value: 0.25, raw: "2.5e-1".into() },
            ]
        );
    }

    #[test]
    fn member_access_is_not_a_float() {
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Number { value: 1, raw: "1".into() },
                TokenKind::Punct('.'),
                TokenKind::Identifier("x".into()),
            ]
        );
    }

    #[test]
    fn char_and_string_literals() {
        assert_eq!(
            kinds(r#"'a' '\n' '\x41' "hi\t""#),
            vec![
                TokenKind::Char(b'a'),
                TokenKind::Char(b'\n'),
                TokenKind::Char(b'A'),
                TokenKind::StringLiteral("hi\t".into()),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let err = Lexer::new("\"abc").lex().unwrap_err();
        assert!(matches!(err, LexError::Unterminated { what: "string", .. }));
    }

    #[test]
    fn spans_track_lines() {
        let tokens = Lexer::new("a\n  b").lex().unwrap();
        assert_eq!(tokens[1].span, Span { line: 2, column: 3 });
    }

    #[test]
    fn identifiers_and_punctuation() {
        assert_eq!(
            kinds("foo(_bar) // trailing"),
            vec![
                TokenKind::Identifier("foo".into()),
                TokenKind::Punct('('),
                TokenKind::Identifier("_bar".into()),
                TokenKind::Punct(')'),
            ]
        );
    }
}
