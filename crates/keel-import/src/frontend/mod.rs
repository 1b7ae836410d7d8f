//! The C frontend interface.
//!
//! A frontend turns a header path into a [`TranslationUnit`]: a flat list of
//! top-level [`Cursor`]s plus the token stream they were parsed from. The
//! importer only reads what is modelled here, so any C parser that can fill
//! these structures can drive it. [`SourceFrontend`] is the in-tree one.

use std::fmt;
use std::path::{Path, PathBuf};

mod parse;
mod source;
mod tokenize;

pub use source::SourceFrontend;

/// A C type as reported by the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignType {
    Void,
    Bool,
    /// `char` where plain char is signed.
    CharS,
    SChar,
    UChar,
    /// `char` where plain char is unsigned.
    CharU,
    Char16,
    Char32,
    WChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    /// A value of some enum type.
    Enum,
    Float,
    Double,
    LongDouble,
    NullPtr,
    /// Objective-C `id`.
    ObjCId,
    /// Objective-C `SEL`.
    ObjCSel,
    /// A type the frontend could parse but not classify.
    Unexposed,
    Invalid,
    Pointer(Box<ForeignType>),
    ConstantArray {
        element: Box<ForeignType>,
        len: usize,
    },
    IncompleteArray(Box<ForeignType>),
    FunctionProto {
        result: Box<ForeignType>,
        params: Vec<ForeignType>,
        variadic: bool,
    },
    /// A K&R style function type: `int f()`.
    FunctionNoProto {
        result: Box<ForeignType>,
    },
    Typedef(String),
    Record(String),
    /// Any other kind the frontend knows by name (vectors, complex, ...).
    Other(String),
}

impl ForeignType {
    pub fn pointer_to(self) -> Self {
        ForeignType::Pointer(Box::new(self))
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            ForeignType::FunctionProto { .. } | ForeignType::FunctionNoProto { .. }
        )
    }
}

/// Kinds of cursor the importer dispatches on (and a few it walks past).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    TypedefDecl,
    EnumDecl,
    EnumConstantDecl,
    StructDecl,
    UnionDecl,
    FieldDecl,
    FunctionDecl,
    ParmDecl,
    VarDecl,
    MacroDefinition,
    Invalid,
}

/// Byte range into the header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One node of a parsed declaration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub kind: CursorKind,
    pub spelling: String,
    /// The cursor's type: the function type of a function, the record of a
    /// struct, the declared type of a field, parameter or variable.
    pub ty: ForeignType,
    pub extent: SourceRange,
    /// Fields of a struct, enumerators of an enum, parameters of a function.
    pub children: Vec<Cursor>,
    /// False for forward declarations.
    pub is_definition: bool,
    pub no_return: bool,
    /// Declared parameter count; `None` when the frontend cannot tell.
    pub arity: Option<usize>,
    /// Aliased type of a typedef.
    pub underlying: Option<ForeignType>,
    /// Declaration of the aliased record, when a typedef names one.
    pub underlying_decl: Option<Box<Cursor>>,
    /// Value of an enumerator, when it is a constant the frontend could fold.
    pub enum_value: Option<i64>,
}

impl Cursor {
    pub fn new(kind: CursorKind, spelling: impl Into<String>, ty: ForeignType) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            ty,
            extent: SourceRange::default(),
            children: Vec::new(),
            is_definition: true,
            no_return: false,
            arity: None,
            underlying: None,
            underlying_decl: None,
            enum_value: None,
        }
    }

    /// A struct definition with the given fields.
    #[cfg(test)]
    pub(crate) fn record(name: &str, fields: Vec<(&str, ForeignType)>) -> Self {
        Self::new(CursorKind::StructDecl, name, ForeignType::Record(name.to_string())).with_children(
            fields
                .into_iter()
                .map(|(field, ty)| Cursor::new(CursorKind::FieldDecl, field, ty))
                .collect(),
        )
    }

    /// A prototyped function declaration.
    #[cfg(test)]
    pub(crate) fn function(name: &str, result: ForeignType, params: Vec<ForeignType>, variadic: bool) -> Self {
        let arity = params.len();
        Self::new(
            CursorKind::FunctionDecl,
            name,
            ForeignType::FunctionProto {
                result: Box::new(result),
                params,
                variadic,
            },
        )
        .with_arity(Some(arity))
    }

    /// A typedef of `underlying`.
    pub fn typedef(name: &str, underlying: ForeignType) -> Self {
        let mut cursor = Self::new(CursorKind::TypedefDecl, name, ForeignType::Typedef(name.to_string()));
        cursor.underlying = Some(underlying);
        cursor
    }

    /// An enum with the given enumerators.
    #[cfg(test)]
    pub(crate) fn enumeration(name: &str, constants: Vec<(&str, Option<i64>)>) -> Self {
        Self::new(CursorKind::EnumDecl, name, ForeignType::Enum).with_children(
            constants
                .into_iter()
                .map(|(constant, value)| {
                    let mut c = Cursor::new(CursorKind::EnumConstantDecl, constant, ForeignType::Int);
                    c.enum_value = value;
                    c
                })
                .collect(),
        )
    }

    pub fn with_children(mut self, children: Vec<Cursor>) -> Self {
        self.children = children;
        self
    }

    pub fn with_extent(mut self, extent: SourceRange) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_arity(mut self, arity: Option<usize>) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_underlying_decl(mut self, decl: Cursor) -> Self {
        self.underlying_decl = Some(Box::new(decl));
        self
    }

    pub fn forward(mut self) -> Self {
        self.is_definition = false;
        self
    }

    pub fn no_return(mut self) -> Self {
        self.no_return = true;
        self
    }
}

/// Token kinds as the C frontend classifies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    /// End of a preprocessor directive line.
    EndOfDirective,
}

/// A C token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            offset,
        }
    }

    pub(crate) fn is_punct(&self, spelling: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.spelling == spelling
    }

    pub(crate) fn is_keyword(&self, spelling: &str) -> bool {
        self.kind == TokenKind::Keyword && self.spelling == spelling
    }

    /// Offset just past the token's last byte.
    pub(crate) fn end(&self) -> usize {
        self.offset + self.spelling.len()
    }
}

/// Whether a depth-one walk should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    Continue,
    Break,
}

/// One parsed header.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub path: PathBuf,
    /// Top-level cursors in source order.
    pub cursors: Vec<Cursor>,
    /// Every token of the header in source order.
    pub tokens: Vec<Token>,
}

impl TranslationUnit {
    pub fn new(path: impl Into<PathBuf>, cursors: Vec<Cursor>, tokens: Vec<Token>) -> Self {
        Self {
            path: path.into(),
            cursors,
            tokens,
        }
    }

    /// Visit the direct children of the root, in order, until `visitor`
    /// asks to stop.
    pub fn visit_children<F>(&self, mut visitor: F)
    where
        F: FnMut(&Cursor) -> VisitControl,
    {
        for cursor in &self.cursors {
            if visitor(cursor) == VisitControl::Break {
                break;
            }
        }
    }

    /// The tokens that start inside `extent`.
    pub fn tokenize(&self, extent: SourceRange) -> &[Token] {
        let first = self.tokens.partition_point(|t| t.offset < extent.start);
        let last = self.tokens.partition_point(|t| t.offset < extent.end);
        &self.tokens[first..last.max(first)]
    }
}

/// Why a frontend could not produce a translation unit.
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("frontend failed: {detail}")]
    Failure { detail: String },

    #[error("frontend crashed")]
    Crashed,

    #[error("invalid frontend arguments")]
    InvalidArguments,

    #[error("could not read AST")]
    AstRead,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A status code outside the documented set.
    #[error("unknown frontend status code {0}")]
    Unknown(i32),
}

impl FrontendError {
    /// Map a C-frontend status code. `0` is success.
    pub fn from_status(code: i32) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::Failure {
                detail: "generic failure".to_string(),
            }),
            2 => Some(Self::Crashed),
            3 => Some(Self::InvalidArguments),
            4 => Some(Self::AstRead),
            other => Some(Self::Unknown(other)),
        }
    }

    /// Whether this error means the frontend itself is in an impossible state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

/// Something that parses C headers.
pub trait Frontend {
    /// Parse the header at `path` with the given compiler arguments.
    fn parse(&mut self, path: &Path, args: &[String]) -> Result<TranslationUnit, FrontendError>;
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CursorKind::TypedefDecl => "typedef",
            CursorKind::EnumDecl => "enum",
            CursorKind::EnumConstantDecl => "enumerator",
            CursorKind::StructDecl => "struct",
            CursorKind::UnionDecl => "union",
            CursorKind::FieldDecl => "field",
            CursorKind::FunctionDecl => "function",
            CursorKind::ParmDecl => "parameter",
            CursorKind::VarDecl => "variable",
            CursorKind::MacroDefinition => "macro",
            CursorKind::Invalid => "invalid",
        };
        f.write_str(name)
    }
}
