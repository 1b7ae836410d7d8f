//! Top-level declarations.
//!
//! Declarations are immutable once registered. The registry and any cache
//! that needs to hand out "the same" declaration share it through an `Rc`.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::ident::Identifier;
use crate::types::DataType;

/// Declaration attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// Implementation supplied by external native code; never mangled.
    Foreign,
    /// Control never returns to the caller.
    NoReturn,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreign => write!(f, "foreign"),
            Self::NoReturn => write!(f, "noreturn"),
        }
    }
}

/// A stored field of a [`TypeDecl`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: Identifier,
    pub ty: DataType,
    pub mutable: bool,
}

/// A nominal aggregate type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDecl {
    pub name: Identifier,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
    pub attributes: BTreeSet<Attribute>,
}

impl TypeDecl {
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// The nominal type this declaration introduces.
    pub fn data_type(&self) -> DataType {
        DataType::Custom(self.name.name.clone())
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Internal name; empty for positional foreign parameters.
    pub name: Identifier,
    /// External call-site label, if the parameter declares one.
    pub external_name: Option<Identifier>,
    pub ty: DataType,
    /// The receiver of a method, initializer or deinitializer.
    pub implicit_self: bool,
}

impl Param {
    /// An unlabeled parameter.
    pub fn new(name: impl Into<Identifier>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            ty,
            implicit_self: false,
        }
    }

    /// A parameter whose call-site label is `external`.
    pub fn labeled(external: impl Into<Identifier>, name: impl Into<Identifier>, ty: DataType) -> Self {
        Self {
            external_name: Some(external.into()),
            ..Self::new(name, ty)
        }
    }

    /// The implicit receiver of type `owner`.
    pub fn implicit_self(owner: DataType) -> Self {
        Self {
            implicit_self: true,
            ..Self::new("self", owner)
        }
    }
}

/// What a function is declared as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FuncKind {
    Global,
    Initializer(DataType),
    Deinitializer(DataType),
    Method(DataType),
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncDecl {
    pub name: Identifier,
    pub returns: DataType,
    pub params: Vec<Param>,
    pub attributes: BTreeSet<Attribute>,
    pub has_var_args: bool,
    pub kind: FuncKind,
}

impl FuncDecl {
    /// A global function with the given parameters.
    pub fn new(name: impl Into<Identifier>, params: Vec<Param>, returns: DataType) -> Self {
        Self {
            name: name.into(),
            returns,
            params,
            attributes: BTreeSet::new(),
            has_var_args: false,
            kind: FuncKind::Global,
        }
    }

    /// Synthesize a global function with unlabeled, positional parameters.
    ///
    /// This is the only shape imported C functions take: parameters carry
    /// their type and nothing else.
    pub fn positional(
        name: impl Into<Identifier>,
        args: Vec<DataType>,
        returns: DataType,
        has_var_args: bool,
        attributes: impl IntoIterator<Item = Attribute>,
    ) -> Self {
        Self {
            has_var_args,
            attributes: attributes.into_iter().collect(),
            ..Self::new(name, args.into_iter().map(|ty| Param::new("", ty)).collect(), returns)
        }
    }

    pub fn with_kind(mut self, kind: FuncKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute);
        self
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn is_foreign(&self) -> bool {
        self.has_attribute(Attribute::Foreign)
    }

    /// The function's type, receiver excluded.
    pub fn data_type(&self) -> DataType {
        DataType::function(
            self.params
                .iter()
                .filter(|p| !p.implicit_self)
                .map(|p| p.ty.clone())
                .collect(),
            self.returns.clone(),
        )
    }
}

/// A constant value attached to a global.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValue {
    /// An integer and the literal text it was spelled with.
    Int { value: i64, raw: String },
    Float { value: f64, raw: String },
    Char(u8),
    Str(String),
}

impl ConstValue {
    /// An integer whose raw text is its decimal rendering.
    pub fn int(value: i64) -> Self {
        ConstValue::Int {
            value,
            raw: value.to_string(),
        }
    }

    /// The type a global initialized with this value has.
    pub fn data_type(&self) -> DataType {
        match self {
            ConstValue::Int { .. } => DataType::int64(),
            ConstValue::Float { .. } => DataType::double(),
            ConstValue::Char(_) => DataType::int8(),
            ConstValue::Str(_) => DataType::opaque_pointer(),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int { raw, .. } | ConstValue::Float { raw, .. } => write!(f, "{raw}"),
            ConstValue::Char(c) => write!(f, "{:?}", char::from(*c)),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A top-level variable or constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalConst {
    pub name: Identifier,
    pub ty: DataType,
    pub value: Option<ConstValue>,
    pub mutable: bool,
}

impl GlobalConst {
    /// An immutable global.
    pub fn constant(name: impl Into<Identifier>, ty: DataType, value: Option<ConstValue>) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
            mutable: false,
        }
    }
}

/// `type Name = Target`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAlias {
    pub name: Identifier,
    pub target: DataType,
}

impl TypeAlias {
    pub fn new(name: impl Into<Identifier>, target: DataType) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Any top-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "decl", rename_all = "lowercase")]
pub enum Declaration {
    Type(Rc<TypeDecl>),
    Function(Rc<FuncDecl>),
    Global(Rc<GlobalConst>),
    Alias(Rc<TypeAlias>),
}

impl Declaration {
    pub fn name(&self) -> &Identifier {
        match self {
            Declaration::Type(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::Global(d) => &d.name,
            Declaration::Alias(d) => &d.name,
        }
    }
}

impl From<TypeDecl> for Declaration {
    fn from(decl: TypeDecl) -> Self {
        Declaration::Type(Rc::new(decl))
    }
}

impl From<FuncDecl> for Declaration {
    fn from(decl: FuncDecl) -> Self {
        Declaration::Function(Rc::new(decl))
    }
}

impl From<GlobalConst> for Declaration {
    fn from(decl: GlobalConst) -> Self {
        Declaration::Global(Rc::new(decl))
    }
}

impl From<TypeAlias> for Declaration {
    fn from(decl: TypeAlias) -> Self {
        Declaration::Alias(Rc::new(decl))
    }
}

fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &BTreeSet<Attribute>) -> fmt::Result {
    for attribute in attributes {
        write!(f, "{attribute} ")?;
    }
    Ok(())
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Type(d) => {
                write_attributes(f, &d.attributes)?;
                write!(f, "type {} {{", d.name)?;
                for (i, field) in d.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    let keyword = if field.mutable { "var" } else { "let" };
                    write!(f, " {keyword} {}: {}", field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            Declaration::Function(d) => {
                write_attributes(f, &d.attributes)?;
                write!(f, "func {}(", d.name)?;
                for (i, param) in d.params.iter().filter(|p| !p.implicit_self).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(external) = &param.external_name {
                        write!(f, "{external} ")?;
                    }
                    if param.name.name.is_empty() {
                        write!(f, "_: {}", param.ty)?;
                    } else {
                        write!(f, "{}: {}", param.name, param.ty)?;
                    }
                }
                if d.has_var_args {
                    if !d.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")?;
                if !d.returns.is_void() {
                    write!(f, " -> {}", d.returns)?;
                }
                Ok(())
            }
            Declaration::Global(d) => {
                let keyword = if d.mutable { "var" } else { "let" };
                write!(f, "{keyword} {}: {}", d.name, d.ty)?;
                if let Some(value) = &d.value {
                    write!(f, " = {value}")?;
                }
                Ok(())
            }
            Declaration::Alias(d) => write!(f, "type {} = {}", d.name, d.target),
        }
    }
}
