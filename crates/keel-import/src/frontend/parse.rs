//! Declaration parser for the source frontend.
//!
//! Works on raw header tokens without preprocessing. Directives are cut out
//! first (each `#define` becomes a macro cursor), then the remaining tokens
//! are read as a sequence of external declarations. A declaration that does
//! not parse is skipped up to its terminator.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{Cursor, CursorKind, ForeignType, SourceRange, Token, TokenKind};

/// Pointer qualifiers that clang treats as keywords but we see as identifiers.
const NULLABILITY: &[&str] = &[
    "_Nonnull",
    "_Nullable",
    "_Null_unspecified",
    "__nonnull",
    "__nullable",
];

#[derive(Debug)]
struct Unexpected {
    offset: usize,
    found: String,
}

type PResult<T> = std::result::Result<T, Unexpected>;

/// Parse a header's tokens into top-level cursors in source order.
pub(crate) fn parse(tokens: &[Token]) -> Vec<Cursor> {
    let (macros, code) = split_directives(tokens);
    let decls = Parser::new(code).run();
    merge(decls, macros)
}

fn split_directives(tokens: &[Token]) -> (Vec<Cursor>, Vec<&Token>) {
    let mut macros = Vec::new();
    let mut code = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if !token.is_punct("#") {
            code.push(token);
            i += 1;
            continue;
        }
        let end = tokens[i..]
            .iter()
            .position(|t| t.kind == TokenKind::EndOfDirective)
            .map_or(tokens.len() - 1, |p| i + p);
        if let [keyword, name, ..] = &tokens[i + 1..=end] {
            let is_name = matches!(name.kind, TokenKind::Identifier | TokenKind::Keyword);
            if keyword.spelling == "define" && is_name {
                let extent = SourceRange::new(name.offset, tokens[end].offset + 1);
                macros.push(
                    Cursor::new(CursorKind::MacroDefinition, name.spelling.clone(), ForeignType::Invalid)
                        .with_extent(extent),
                );
            }
        }
        i = end + 1;
    }
    (macros, code)
}

fn merge(decls: Vec<Cursor>, macros: Vec<Cursor>) -> Vec<Cursor> {
    let mut merged = Vec::with_capacity(decls.len() + macros.len());
    let mut macros = macros.into_iter().peekable();
    for decl in decls {
        while let Some(m) = macros.next_if(|m| m.extent.start < decl.extent.start) {
            merged.push(m);
        }
        merged.push(decl);
    }
    merged.extend(macros);
    merged
}

#[derive(Debug, Clone)]
struct ParamDecl {
    name: Option<String>,
    ty: ForeignType,
    extent: SourceRange,
}

/// One layer a declarator wraps around its base type, innermost first.
#[derive(Debug, Clone)]
enum Op {
    Pointer,
    Array(Option<usize>),
    Function {
        params: Vec<ParamDecl>,
        variadic: bool,
        prototyped: bool,
    },
}

#[derive(Debug, Default)]
struct Declarator {
    name: Option<String>,
    ops: Vec<Op>,
}

impl Declarator {
    fn apply(&self, base: ForeignType) -> ForeignType {
        self.ops.iter().fold(base, |ty, op| match op {
            Op::Pointer => ty.pointer_to(),
            Op::Array(Some(len)) => ForeignType::ConstantArray {
                element: Box::new(ty),
                len: *len,
            },
            Op::Array(None) => ForeignType::IncompleteArray(Box::new(ty)),
            Op::Function {
                params,
                variadic,
                prototyped: true,
            } => ForeignType::FunctionProto {
                result: Box::new(ty),
                params: params.iter().map(|p| p.ty.clone()).collect(),
                variadic: *variadic,
            },
            Op::Function { .. } => ForeignType::FunctionNoProto {
                result: Box::new(ty),
            },
        })
    }

    /// Parameters of the function being declared, if it is one.
    fn parameters(&self) -> Option<&[ParamDecl]> {
        match self.ops.last()? {
            Op::Function { params, .. } => Some(params),
            _ => None,
        }
    }
}

/// Arrays and functions passed as parameters are pointers.
fn decay(ty: ForeignType) -> ForeignType {
    match ty {
        ForeignType::ConstantArray { element, .. } | ForeignType::IncompleteArray(element) => {
            ForeignType::Pointer(element)
        }
        ty if ty.is_function() => ty.pointer_to(),
        ty => ty,
    }
}

#[derive(Debug)]
struct DeclSpecs {
    base: ForeignType,
    is_typedef: bool,
    no_return: bool,
}

/// Type specifier keywords seen so far in one declaration.
#[derive(Debug, Default)]
struct Specifiers {
    void: bool,
    bool: bool,
    char: bool,
    short: bool,
    int: bool,
    long: u8,
    float: bool,
    double: bool,
    signed: bool,
    unsigned: bool,
    complex: bool,
    named: Option<ForeignType>,
}

impl Specifiers {
    fn set(&mut self, word: &str) -> bool {
        match word {
            "void" => self.void = true,
            "_Bool" | "bool" => self.bool = true,
            "char" => self.char = true,
            "short" => self.short = true,
            "int" => self.int = true,
            "long" => self.long += 1,
            "float" => self.float = true,
            "double" => self.double = true,
            "signed" | "__signed__" => self.signed = true,
            "unsigned" => self.unsigned = true,
            "_Complex" => self.complex = true,
            _ => return false,
        }
        true
    }

    fn any(&self) -> bool {
        self.named.is_some()
            || self.void
            || self.bool
            || self.char
            || self.short
            || self.int
            || self.long > 0
            || self.float
            || self.double
            || self.signed
            || self.unsigned
            || self.complex
    }

    fn resolve(self) -> ForeignType {
        if let Some(named) = self.named {
            return named;
        }
        let unsigned = self.unsigned;
        if self.complex {
            ForeignType::Other("complex".to_string())
        } else if self.void {
            ForeignType::Void
        } else if self.bool {
            ForeignType::Bool
        } else if self.char {
            match (unsigned, self.signed) {
                (true, _) => ForeignType::UChar,
                (_, true) => ForeignType::SChar,
                _ => ForeignType::CharS,
            }
        } else if self.short {
            if unsigned { ForeignType::UShort } else { ForeignType::Short }
        } else if self.double {
            if self.long > 0 { ForeignType::LongDouble } else { ForeignType::Double }
        } else if self.float {
            ForeignType::Float
        } else {
            match (self.long, unsigned) {
                (0, false) => ForeignType::Int,
                (0, true) => ForeignType::UInt,
                (1, false) => ForeignType::Long,
                (1, true) => ForeignType::ULong,
                (_, false) => ForeignType::LongLong,
                (_, true) => ForeignType::ULongLong,
            }
        }
    }
}

struct Parser<'t> {
    tokens: Vec<&'t Token>,
    pos: usize,
    /// Cursor sinks: the file, then one per open record body.
    scopes: Vec<Vec<Cursor>>,
    typedefs: HashSet<String>,
    /// Latest declaration of each record tag, definitions replacing forwards.
    records: HashMap<String, Cursor>,
    /// Enumerator values folded so far.
    constants: HashMap<String, i64>,
    anonymous: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: Vec<&'t Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            scopes: vec![Vec::new()],
            typedefs: HashSet::new(),
            records: HashMap::new(),
            constants: HashMap::new(),
            anonymous: 0,
        }
    }

    fn run(mut self) -> Vec<Cursor> {
        while let Some(token) = self.peek() {
            if token.is_punct(";") || token.is_punct("}") {
                self.pos += 1;
                continue;
            }
            let linkage_block = token.is_keyword("extern")
                && self
                    .peek_at(1)
                    .is_some_and(|t| t.kind == TokenKind::Literal && t.spelling.starts_with('"'));
            if linkage_block {
                self.pos += 2;
                self.eat_punct("{");
                continue;
            }
            let start = self.pos;
            if let Err(err) = self.external_declaration() {
                debug!(offset = err.offset, found = %err.found, "skipping unparseable declaration");
                self.recover(start);
            }
        }
        self.scopes.into_iter().next().unwrap_or_default()
    }

    // ---- token access ----

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn at_punct(&self, spelling: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(spelling))
    }

    fn at_keyword(&self, spelling: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(spelling))
    }

    fn eat_punct(&mut self, spelling: &str) -> bool {
        let found = self.at_punct(spelling);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_punct(&mut self, spelling: &str) -> PResult<()> {
        if self.eat_punct(spelling) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> PResult<&'t Token> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> Unexpected {
        match self.peek() {
            Some(t) => Unexpected {
                offset: t.offset,
                found: t.spelling.clone(),
            },
            None => Unexpected {
                offset: self.prev_end(),
                found: "end of file".to_string(),
            },
        }
    }

    fn offset(&self) -> usize {
        self.peek().map_or_else(|| self.prev_end(), |t| t.offset)
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.end())
    }

    fn emit(&mut self, cursor: Cursor) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(cursor);
        }
    }

    // ---- declarations ----

    fn external_declaration(&mut self) -> PResult<()> {
        let start = self.offset();
        let specs = self.decl_specs()?;
        if self.eat_punct(";") {
            return Ok(());
        }
        loop {
            let declarator = self.declarator()?;
            let no_return = self.skip_trailing()? || specs.no_return;
            let name = declarator.name.clone().ok_or_else(|| self.unexpected())?;
            let ty = declarator.apply(specs.base.clone());

            if ty.is_function() && self.at_punct("{") {
                self.skip_group("{", "}")?;
                let extent = SourceRange::new(start, self.prev_end());
                self.declare(&specs, &declarator, name, ty, no_return, extent, true);
                return Ok(());
            }
            if self.eat_punct("=") {
                self.expression();
            }
            let extent = SourceRange::new(start, self.prev_end());
            let more = self.eat_punct(",");
            if !more {
                self.expect_punct(";")?;
            }
            self.declare(&specs, &declarator, name, ty, no_return, extent, false);
            if !more {
                return Ok(());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn declare(
        &mut self,
        specs: &DeclSpecs,
        declarator: &Declarator,
        name: String,
        ty: ForeignType,
        no_return: bool,
        extent: SourceRange,
        has_body: bool,
    ) {
        if specs.is_typedef {
            let mut cursor = Cursor::typedef(&name, ty.clone()).with_extent(extent);
            if let ForeignType::Record(record) = &ty {
                if let Some(decl) = self.records.get(record) {
                    cursor = cursor.with_underlying_decl(decl.clone());
                }
            }
            self.typedefs.insert(name);
            self.emit(cursor);
            return;
        }
        if !ty.is_function() {
            self.emit(Cursor::new(CursorKind::VarDecl, name, ty).with_extent(extent));
            return;
        }
        let params: Vec<Cursor> = declarator
            .parameters()
            .unwrap_or_default()
            .iter()
            .map(|p| {
                Cursor::new(CursorKind::ParmDecl, p.name.clone().unwrap_or_default(), p.ty.clone())
                    .with_extent(p.extent)
            })
            .collect();
        let mut cursor = Cursor::new(CursorKind::FunctionDecl, name, ty)
            .with_arity(Some(params.len()))
            .with_children(params)
            .with_extent(extent);
        cursor.is_definition = has_body;
        cursor.no_return = no_return;
        self.emit(cursor);
    }

    fn decl_specs(&mut self) -> PResult<DeclSpecs> {
        let mut specs = Specifiers::default();
        let mut is_typedef = false;
        let mut no_return = false;
        let start = self.pos;

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Keyword => match token.spelling.as_str() {
                    "typedef" => {
                        is_typedef = true;
                        self.pos += 1;
                    }
                    "_Noreturn" => {
                        no_return = true;
                        self.pos += 1;
                    }
                    "__attribute__" | "__attribute" | "__declspec" => {
                        self.pos += 1;
                        no_return |= self.skip_group("(", ")")?;
                    }
                    "__asm" | "__asm__" | "_Alignas" => {
                        self.pos += 1;
                        self.skip_group("(", ")")?;
                    }
                    "_Atomic" if self.peek_at(1).is_some_and(|t| t.is_punct("(")) => {
                        self.pos += 2;
                        let inner = self.type_name()?;
                        self.expect_punct(")")?;
                        specs.named = Some(inner);
                    }
                    "extern" | "static" | "inline" | "__inline" | "__inline__" | "register"
                    | "auto" | "_Thread_local" | "__thread" | "const" | "__const" | "volatile"
                    | "__volatile__" | "restrict" | "__restrict" | "__restrict__"
                    | "__extension__" | "_Atomic" => self.pos += 1,
                    "struct" | "union" => specs.named = Some(self.record_specifier(is_typedef)?),
                    "enum" => specs.named = Some(self.enum_specifier()?),
                    word => {
                        if !specs.set(word) {
                            break;
                        }
                        self.pos += 1;
                    }
                },
                TokenKind::Identifier if NULLABILITY.contains(&token.spelling.as_str()) => {
                    self.pos += 1;
                }
                TokenKind::Identifier if !specs.any() && self.names_type(token) => {
                    specs.named = Some(ForeignType::Typedef(token.spelling.clone()));
                    self.pos += 1;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(DeclSpecs {
            base: specs.resolve(),
            is_typedef,
            no_return,
        })
    }

    /// Whether the identifier under the cursor is a type name. Typedefs from
    /// headers we never saw are recognised by what follows them.
    fn names_type(&self, token: &Token) -> bool {
        if self.typedefs.contains(&token.spelling) {
            return true;
        }
        self.peek_at(1).is_some_and(|next| {
            next.kind == TokenKind::Identifier
                || [")", ",", "*", "[", ";"].iter().any(|p| next.is_punct(p))
        })
    }

    /// A type name inside `_Atomic(...)` and friends.
    fn type_name(&mut self) -> PResult<ForeignType> {
        let specs = self.decl_specs()?;
        let declarator = self.declarator()?;
        Ok(declarator.apply(specs.base))
    }

    fn declarator(&mut self) -> PResult<Declarator> {
        let mut pointers = 0;
        // `^` is a block pointer.
        while self.eat_punct("*") || self.eat_punct("^") {
            pointers += 1;
            self.skip_qualifiers()?;
        }
        self.skip_qualifiers()?;

        let mut inner = Declarator::default();
        if self.at_punct("(") && self.starts_nested_declarator() {
            self.pos += 1;
            inner = self.declarator()?;
            self.expect_punct(")")?;
        } else if let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Identifier) {
            inner.name = Some(token.spelling.clone());
            self.pos += 1;
        }

        let mut suffixes = Vec::new();
        loop {
            if self.eat_punct("[") {
                suffixes.push(Op::Array(self.array_length()?));
            } else if self.at_punct("(") {
                suffixes.push(self.parameter_list()?);
            } else {
                break;
            }
        }

        let mut ops: Vec<Op> = (0..pointers).map(|_| Op::Pointer).collect();
        ops.extend(suffixes.into_iter().rev());
        ops.extend(inner.ops);
        Ok(Declarator {
            name: inner.name,
            ops,
        })
    }

    fn starts_nested_declarator(&self) -> bool {
        self.peek_at(1).is_some_and(|next| match next.kind {
            TokenKind::Punctuation => ["*", "^", "("].iter().any(|p| next.is_punct(p)),
            TokenKind::Identifier => !self.typedefs.contains(&next.spelling),
            TokenKind::Keyword => next.spelling.starts_with("__attribute"),
            _ => false,
        })
    }

    fn array_length(&mut self) -> PResult<Option<usize>> {
        let expr = self.expression();
        self.expect_punct("]")?;
        if expr.is_empty() {
            return Ok(None);
        }
        Ok(evaluate(&expr, &self.constants).and_then(|v| usize::try_from(v).ok()))
    }

    fn parameter_list(&mut self) -> PResult<Op> {
        self.expect_punct("(")?;
        if self.eat_punct(")") {
            return Ok(Op::Function {
                params: Vec::new(),
                variadic: false,
                prototyped: false,
            });
        }
        if self.at_keyword("void") && self.peek_at(1).is_some_and(|t| t.is_punct(")")) {
            self.pos += 2;
            return Ok(Op::Function {
                params: Vec::new(),
                variadic: false,
                prototyped: true,
            });
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.eat_punct("...") {
                variadic = true;
            } else {
                let start = self.offset();
                let specs = self.decl_specs()?;
                let declarator = self.declarator()?;
                self.skip_trailing()?;
                params.push(ParamDecl {
                    ty: decay(declarator.apply(specs.base)),
                    name: declarator.name,
                    extent: SourceRange::new(start, self.prev_end()),
                });
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(Op::Function {
            params,
            variadic,
            prototyped: true,
        })
    }

    fn record_specifier(&mut self, is_typedef: bool) -> PResult<ForeignType> {
        let keyword = self.bump().ok_or_else(|| self.unexpected())?;
        let kind = if keyword.spelling == "union" {
            CursorKind::UnionDecl
        } else {
            CursorKind::StructDecl
        };
        self.skip_qualifiers()?;
        let tag = self
            .peek()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.spelling.clone());
        if tag.is_some() {
            self.pos += 1;
        }

        if !self.at_punct("{") {
            let tag = tag.ok_or_else(|| self.unexpected())?;
            if !self.records.contains_key(&tag) {
                let forward = Cursor::new(kind, tag.clone(), ForeignType::Record(tag.clone()))
                    .with_extent(SourceRange::new(keyword.offset, self.prev_end()))
                    .forward();
                self.records.insert(tag.clone(), forward.clone());
                self.emit(forward);
            }
            return Ok(ForeignType::Record(tag));
        }

        let name = match tag {
            Some(tag) => tag,
            None => self.anonymous_name(is_typedef),
        };
        self.pos += 1;
        self.scopes.push(Vec::new());
        let body = self.record_body();
        let children = self.scopes.pop().unwrap_or_default();
        body?;
        self.skip_qualifiers()?;

        let cursor = Cursor::new(kind, name.clone(), ForeignType::Record(name.clone()))
            .with_children(children)
            .with_extent(SourceRange::new(keyword.offset, self.prev_end()));
        if !name.is_empty() {
            self.records.insert(name.clone(), cursor.clone());
        }
        self.emit(cursor);
        Ok(ForeignType::Record(name))
    }

    /// Name for a tagless record whose `{` is under the cursor. Inside a
    /// typedef it borrows the typedef's name; otherwise it stays unnamed.
    fn anonymous_name(&mut self, is_typedef: bool) -> String {
        if is_typedef {
            let mut i = self.matching_close(self.pos).map_or(self.tokens.len(), |i| i + 1);
            while self.tokens.get(i).is_some_and(|t| t.spelling.starts_with("__attribute")) {
                i = self.matching_close(i + 1).map_or(self.tokens.len(), |j| j + 1);
            }
            if let [name, next, ..] = &self.tokens[i.min(self.tokens.len())..] {
                if name.kind == TokenKind::Identifier && (next.is_punct(";") || next.is_punct(",")) {
                    return name.spelling.clone();
                }
            }
        }
        self.anonymous += 1;
        debug!(index = self.anonymous, "unnamed record");
        String::new()
    }

    /// Index of the token closing the group opened at `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            if token.kind != TokenKind::Punctuation {
                continue;
            }
            match token.spelling.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn record_body(&mut self) -> PResult<()> {
        loop {
            if self.eat_punct("}") {
                return Ok(());
            }
            if self.eat_punct(";") {
                continue;
            }
            let start = self.offset();
            let specs = self.decl_specs()?;
            // Anonymous member struct or union.
            if self.eat_punct(";") {
                continue;
            }
            loop {
                let declarator = if self.at_punct(":") {
                    Declarator::default()
                } else {
                    self.declarator()?
                };
                // Bit-field width.
                if self.eat_punct(":") {
                    self.expression();
                }
                self.skip_trailing()?;
                if let Some(name) = declarator.name.clone() {
                    let ty = declarator.apply(specs.base.clone());
                    let extent = SourceRange::new(start, self.prev_end());
                    self.emit(Cursor::new(CursorKind::FieldDecl, name, ty).with_extent(extent));
                }
                if !self.eat_punct(",") {
                    self.expect_punct(";")?;
                    break;
                }
            }
        }
    }

    fn enum_specifier(&mut self) -> PResult<ForeignType> {
        let keyword = self.bump().ok_or_else(|| self.unexpected())?;
        self.skip_qualifiers()?;
        let tag = self
            .peek()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.spelling.clone());
        if tag.is_some() {
            self.pos += 1;
        }
        // Fixed underlying type.
        if self.eat_punct(":") {
            self.decl_specs()?;
        }
        if !self.eat_punct("{") {
            tag.ok_or_else(|| self.unexpected())?;
            return Ok(ForeignType::Enum);
        }

        let mut enumerators = Vec::new();
        let mut next = Some(0i64);
        while !self.eat_punct("}") {
            let token = self.identifier()?;
            self.skip_qualifiers()?;
            let value = if self.eat_punct("=") {
                let expr = self.expression();
                evaluate(&expr, &self.constants)
            } else {
                next
            };
            if let Some(value) = value {
                self.constants.insert(token.spelling.clone(), value);
            }
            next = value.and_then(|v| v.checked_add(1));

            let mut constant = Cursor::new(CursorKind::EnumConstantDecl, token.spelling.clone(), ForeignType::Int)
                .with_extent(SourceRange::new(token.offset, self.prev_end()));
            constant.enum_value = value;
            enumerators.push(constant);

            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        self.skip_qualifiers()?;

        let cursor = Cursor::new(CursorKind::EnumDecl, tag.unwrap_or_default(), ForeignType::Enum)
            .with_children(enumerators)
            .with_extent(SourceRange::new(keyword.offset, self.prev_end()));
        self.emit(cursor);
        Ok(ForeignType::Enum)
    }

    // ---- skipping ----

    /// Skip a balanced group starting at `open`. Reports whether a noreturn
    /// attribute was spelled inside it.
    fn skip_group(&mut self, open: &str, close: &str) -> PResult<bool> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        let mut no_return = false;
        while depth > 0 {
            let token = self.bump().ok_or_else(|| self.unexpected())?;
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
            } else if matches!(token.spelling.as_str(), "noreturn" | "__noreturn__") {
                no_return = true;
            }
        }
        Ok(no_return)
    }

    /// Qualifiers and attributes that may sit between `*`s and a name.
    fn skip_qualifiers(&mut self) -> PResult<()> {
        while let Some(token) = self.peek() {
            match token.spelling.as_str() {
                "const" | "__const" | "volatile" | "__volatile__" | "restrict" | "__restrict"
                | "__restrict__" | "_Atomic"
                    if token.kind == TokenKind::Keyword =>
                {
                    self.pos += 1;
                }
                "__attribute__" | "__attribute" | "__declspec" if token.kind == TokenKind::Keyword => {
                    self.pos += 1;
                    self.skip_group("(", ")")?;
                }
                s if token.kind == TokenKind::Identifier && NULLABILITY.contains(&s) => self.pos += 1,
                _ => break,
            }
        }
        Ok(())
    }

    /// Attributes, asm labels and unexpanded annotation macros after a
    /// declarator. Returns whether any of them marks the function noreturn.
    fn skip_trailing(&mut self) -> PResult<bool> {
        let mut no_return = false;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Keyword if token.spelling.starts_with("__attribute") || token.spelling == "__declspec" => {
                    self.pos += 1;
                    no_return |= self.skip_group("(", ")")?;
                }
                TokenKind::Keyword if token.spelling.starts_with("__asm") => {
                    self.pos += 1;
                    self.skip_group("(", ")")?;
                }
                TokenKind::Identifier => {
                    no_return |= token.spelling.to_ascii_lowercase().contains("noreturn")
                        || token.spelling == "__dead2";
                    self.pos += 1;
                    if self.at_punct("(") {
                        no_return |= self.skip_group("(", ")")?;
                    }
                }
                _ => break,
            }
        }
        Ok(no_return)
    }

    /// Consume an expression up to the next `,`, `;` or unbalanced closer.
    fn expression(&mut self) -> Vec<&'t Token> {
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Punctuation {
                match token.spelling.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" if depth == 0 => break,
                    ")" | "]" | "}" => depth -= 1,
                    "," | ";" if depth == 0 => break,
                    _ => {}
                }
            }
            tokens.push(token);
            self.pos += 1;
        }
        tokens
    }

    fn recover(&mut self, start: usize) {
        self.pos = start;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Punctuation {
                match token.spelling.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    "}" if depth == 0 => break,
                    "}" if depth == 1 => {
                        self.pos += 1;
                        let continues = self.peek().is_some_and(|t| {
                            t.kind == TokenKind::Identifier || t.is_punct(";") || t.is_punct("*")
                        });
                        if !continues {
                            return;
                        }
                        depth = 0;
                        continue;
                    }
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    ";" if depth == 0 => {
                        self.pos += 1;
                        return;
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1;
        }
    }
}

/// Fold an integer constant expression. `None` if any operand is unknown.
fn evaluate(tokens: &[&Token], constants: &HashMap<String, i64>) -> Option<i64> {
    let mut eval = ConstEval {
        tokens,
        pos: 0,
        constants,
    };
    let value = eval.conditional()?;
    (eval.pos == tokens.len()).then_some(value)
}

const PRECEDENCE: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

struct ConstEval<'a, 't> {
    tokens: &'a [&'t Token],
    pos: usize,
    constants: &'a HashMap<String, i64>,
}

impl<'a, 't> ConstEval<'a, 't> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, punct: &str) -> bool {
        let found = self.peek().is_some_and(|t| t.is_punct(punct));
        if found {
            self.pos += 1;
        }
        found
    }

    fn conditional(&mut self) -> Option<i64> {
        let condition = self.binary(0)?;
        if !self.eat("?") {
            return Some(condition);
        }
        let then = self.conditional()?;
        if !self.eat(":") {
            return None;
        }
        let otherwise = self.conditional()?;
        Some(if condition != 0 { then } else { otherwise })
    }

    fn binary(&mut self, level: usize) -> Option<i64> {
        let Some(ops) = PRECEDENCE.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self
            .peek()
            .and_then(|t| ops.iter().find(|op| t.is_punct(op)).copied())
        {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        if self.eat("-") {
            return self.unary()?.checked_neg();
        }
        if self.eat("+") {
            return self.unary();
        }
        if self.eat("~") {
            return Some(!self.unary()?);
        }
        if self.eat("!") {
            return Some(i64::from(self.unary()? == 0));
        }
        if self.eat("(") {
            // A cast: `(int)5`.
            if self.peek().is_some_and(|t| t.kind == TokenKind::Keyword) {
                while !self.eat(")") {
                    self.pos += 1;
                    if self.pos > self.tokens.len() {
                        return None;
                    }
                }
                return self.unary();
            }
            let value = self.conditional()?;
            return self.eat(")").then_some(value);
        }
        let token = self.peek()?;
        self.pos += 1;
        match token.kind {
            TokenKind::Literal => c_integer(&token.spelling),
            TokenKind::Identifier => self.constants.get(&token.spelling).copied(),
            _ => None,
        }
    }
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Option<i64> {
    let shift = || u32::try_from(rhs).ok();
    Some(match op {
        "+" => lhs.checked_add(rhs)?,
        "-" => lhs.checked_sub(rhs)?,
        "*" => lhs.checked_mul(rhs)?,
        "/" => lhs.checked_div(rhs)?,
        "%" => lhs.checked_rem(rhs)?,
        "<<" => lhs.checked_shl(shift()?)?,
        ">>" => lhs.checked_shr(shift()?)?,
        "<" => i64::from(lhs < rhs),
        ">" => i64::from(lhs > rhs),
        "<=" => i64::from(lhs <= rhs),
        ">=" => i64::from(lhs >= rhs),
        "==" => i64::from(lhs == rhs),
        "!=" => i64::from(lhs != rhs),
        "&" => lhs & rhs,
        "^" => lhs ^ rhs,
        "|" => lhs | rhs,
        "&&" => i64::from(lhs != 0 && rhs != 0),
        "||" => i64::from(lhs != 0 || rhs != 0),
        _ => return None,
    })
}

/// Value of a C integer or character literal in an enumerator.
fn c_integer(spelling: &str) -> Option<i64> {
    if let Some(body) = spelling.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        let value = match body.as_bytes() {
            [c] => *c,
            [b'\\', b'n'] => b'\n',
            [b'\\', b't'] => b'\t',
            [b'\\', b'r'] => b'\r',
            [b'\\', b'0'] => 0,
            [b'\\', c @ (b'\\' | b'\'' | b'"')] => *c,
            _ => return None,
        };
        return Some(i64::from(value));
    }
    let digits = spelling.trim_end_matches(['u', 'U', 'l', 'L']);
    let (digits, radix) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (bin, 2)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };
    // Reinterpret the bit pattern, as clang reports unsigned enumerators.
    u64::from_str_radix(digits, radix).ok().map(|v| v as i64)
}
