//! C tokenizer for header text.
//!
//! Produces the full token stream of a header, directives included. A
//! directive is the `#` punctuator, its tokens, and a closing
//! [`TokenKind::EndOfDirective`] token placed at the terminating newline.

use super::{Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "char", "const", "continue", "default", "do", "double",
    "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Atomic", "_Bool", "_Complex",
    "_Noreturn", "_Thread_local", "__asm", "__asm__", "__attribute", "__attribute__", "__const",
    "__declspec", "__extension__", "__inline", "__inline__", "__restrict", "__restrict__",
    "__signed__", "__thread", "__volatile__",
];

const PUNCT3: &[&str] = &["...", "<<=", ">>="];
const PUNCT2: &[&str] = &[
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "##",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Tokenize `source` into C tokens.
pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    Scanner::new(source).run()
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    at_line_start: bool,
    in_directive: bool,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            at_line_start: true,
            in_directive: false,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let spelling = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.tokens.push(Token::new(kind, spelling, start));
        self.at_line_start = false;
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek_at(0) {
            let start = self.pos;
            match c {
                b'\n' => {
                    if self.in_directive {
                        self.tokens.push(Token::new(TokenKind::EndOfDirective, "", start));
                        self.in_directive = false;
                    }
                    self.at_line_start = true;
                    self.pos += 1;
                }
                b'\\' if self.peek_at(1) == Some(b'\n') => self.pos += 2,
                b'\\' if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.pos += 3
                }
                c if c.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.peek_at(1) == Some(b'/') => {
                    while self.peek_at(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.src.len()
                        && !(self.peek_at(0) == Some(b'*') && self.peek_at(1) == Some(b'/'))
                    {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.src.len());
                }
                b'#' if self.at_line_start => {
                    self.pos += 1;
                    self.push(TokenKind::Punctuation, start);
                    self.in_directive = true;
                }
                c if c.is_ascii_alphabetic() || c == b'_' => self.word(start),
                c if c.is_ascii_digit() => self.number(start),
                b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(start),
                b'\'' | b'"' => {
                    self.quoted(c);
                    self.push(TokenKind::Literal, start);
                }
                _ => self.punctuation(start),
            }
        }
        if self.in_directive {
            let end = self.src.len();
            self.tokens.push(Token::new(TokenKind::EndOfDirective, "", end));
        }
        self.tokens
    }

    fn word(&mut self, start: usize) {
        while self
            .peek_at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let word = &self.src[start..self.pos];
        // Encoding prefixes glue onto the literal that follows.
        if matches!(word, b"L" | b"u" | b"U" | b"u8") {
            if let Some(q @ (b'\'' | b'"')) = self.peek_at(0) {
                self.quoted(q);
                self.push(TokenKind::Literal, start);
                return;
            }
        }
        let kind = match std::str::from_utf8(word) {
            Ok(w) if is_keyword(w) => TokenKind::Keyword,
            _ => TokenKind::Identifier,
        };
        self.push(kind, start);
    }

    fn number(&mut self, start: usize) {
        self.pos += 1;
        while let Some(c) = self.peek_at(0) {
            let prev = self.src[self.pos - 1];
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.pos += 1;
            } else if matches!(c, b'+' | b'-') && matches!(prev, b'e' | b'E' | b'p' | b'P') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Literal, start);
    }

    /// Scan a quoted literal starting at the opening quote.
    fn quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(c) = self.peek_at(0) {
            match c {
                b'\\' => self.pos += 2,
                b'\n' => break,
                c if c == quote => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.src.len());
    }

    fn punctuation(&mut self, start: usize) {
        let rest = &self.src[start..];
        let len = PUNCT3
            .iter()
            .chain(PUNCT2)
            .find(|p| rest.starts_with(p.as_bytes()))
            .map(|p| p.len())
            .unwrap_or(1);
        self.pos += len;
        self.push(TokenKind::Punctuation, start);
    }
}
