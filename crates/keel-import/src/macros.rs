//! Literal macro import.
//!
//! Only object-like macros whose body starts with a single literal are
//! imported. The literal is classified by running the Keel lexer on its
//! spelling alone, so C forms the lexer does not know (integer suffixes,
//! leading-zero octal) are handled here.

use std::rc::Rc;

use keel_core::lexer::{parse_integer, TokenKind as KeelToken};
use keel_core::{ConstValue, GlobalConst, LexError, Lexer};

use crate::error::{Outcome, SkipReason};
use crate::frontend::{Cursor, TokenKind, TranslationUnit};
use crate::importer::Importer;

/// Classify a C literal spelling as a constant value.
pub fn parse_macro_literal(spelling: &str) -> Result<ConstValue, SkipReason> {
    if let Some(octal) = c_octal(spelling) {
        return octal;
    }
    let mut lexer = Lexer::new(spelling);
    let token = match lexer.next_token() {
        Ok(Some(token)) => token,
        Ok(None) => return Err(SkipReason::NotALiteral),
        Err(LexError::IntegerOverflow { .. }) => return Err(SkipReason::LiteralOutOfRange),
        Err(_) => return Err(SkipReason::NotALiteral),
    };
    // The Keel lexer splits some C literals, `1.` and `1.e5` among them.
    if !matches!(lexer.next_token(), Ok(None)) {
        return c_float(spelling).ok_or(SkipReason::NotALiteral);
    }
    match token.kind {
        KeelToken::Number { value, raw } => Ok(ConstValue::Int { value, raw }),
        KeelToken::Float { value, raw } => Ok(ConstValue::Float { value, raw }),
        KeelToken::Char(c) => Ok(ConstValue::Char(c)),
        KeelToken::StringLiteral(s) => Ok(ConstValue::Str(s)),
        // `10UL` and `0x1fu` lex as one word.
        KeelToken::Identifier(word) => parse_suffixed(&word),
        KeelToken::Punct(_) => Err(SkipReason::NotALiteral),
    }
}

/// A leading-zero C integer, read in base 8.
fn c_octal(spelling: &str) -> Option<Result<ConstValue, SkipReason>> {
    let digits = spelling.strip_prefix('0')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if digits.chars().any(|c| c > '7') {
        return Some(Err(SkipReason::NotALiteral));
    }
    Some(
        i64::from_str_radix(digits, 8)
            .map(|value| ConstValue::Int {
                value,
                raw: spelling.to_string(),
            })
            .map_err(|_| SkipReason::LiteralOutOfRange),
    )
}

/// A decimal floating literal in a C-only spelling.
fn c_float(spelling: &str) -> Option<ConstValue> {
    let leading = spelling.starts_with(|c: char| c.is_ascii_digit() || c == '.');
    let decimal = spelling
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !leading || !decimal || !spelling.contains(['.', 'e', 'E']) {
        return None;
    }
    let value = spelling.parse::<f64>().ok()?;
    Some(ConstValue::Float {
        value,
        raw: spelling.to_string(),
    })
}

/// An integer followed by a suffix made only of `u` and `l`.
fn parse_suffixed(word: &str) -> Result<ConstValue, SkipReason> {
    let (prefix, digits, radix) = match word.get(..2) {
        Some("0x" | "0X") => (&word[..2], &word[2..], 16),
        _ => ("", word, 10),
    };
    let body_len = digits.find(|c: char| !c.is_digit(radix)).unwrap_or(digits.len());
    if body_len == 0 {
        return Err(SkipReason::NotALiteral);
    }
    let (body, suffix) = digits.split_at(body_len);
    if suffix.is_empty() || !suffix.chars().all(|c| matches!(c, 'u' | 'U' | 'l' | 'L')) {
        return Err(SkipReason::InvalidSuffix);
    }

    let number = format!("{prefix}{body}");
    let value = match c_octal(&number) {
        Some(octal) => return octal.map(|v| with_raw(v, word)),
        None => parse_integer(&number),
    };
    match value {
        Some(Ok(value)) => Ok(ConstValue::Int {
            value,
            raw: word.to_string(),
        }),
        Some(Err(_)) => Err(SkipReason::LiteralOutOfRange),
        None => Err(SkipReason::NotALiteral),
    }
}

fn with_raw(value: ConstValue, raw: &str) -> ConstValue {
    match value {
        ConstValue::Int { value, .. } => ConstValue::Int {
            value,
            raw: raw.to_string(),
        },
        other => other,
    }
}

impl Importer<'_> {
    /// Import a `#define NAME <literal> ...` as an immutable global.
    ///
    /// The extent's tokens are the name, the body and the end of the
    /// directive, so anything shorter than three tokens has no body.
    pub fn import_macro(&mut self, cursor: &Cursor, unit: &TranslationUnit) -> Outcome<Rc<GlobalConst>> {
        let tokens = unit.tokenize(cursor.extent);
        if tokens.len() < 3 {
            return Outcome::Skipped(SkipReason::MacroTooShort);
        }
        if self.registry().global_named(&cursor.spelling).is_some() {
            return Outcome::Skipped(SkipReason::AlreadyDeclared);
        }
        let literal = &tokens[1];
        if literal.kind != TokenKind::Literal {
            return Outcome::Skipped(SkipReason::NotALiteral);
        }
        match parse_macro_literal(&literal.spelling) {
            Ok(value) => self.register_global(GlobalConst::constant(
                cursor.spelling.as_str(),
                value.data_type(),
                Some(value),
            )),
            Err(reason) => Outcome::Skipped(reason),
        }
    }
}
