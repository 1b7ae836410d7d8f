//! The Keel type universe.
//!
//! `DataType` is deliberately small: it is the common ground between Keel
//! source, imported C declarations and the symbol mangler. Nominal types are
//! referenced by name through [`DataType::Custom`] and resolved later through
//! the declaration registry.

use std::fmt;

use serde::Serialize;

/// Floating-point flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FloatKind {
    /// IEEE 754 binary32.
    Float,
    /// IEEE 754 binary64.
    Double,
    /// x87 80-bit extended precision.
    Float80,
}

/// The core type representation.
///
/// Equality is structural; `Custom` compares by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Void,
    Bool,
    /// Signed integer of the given bit width.
    Int(u8),
    Float(FloatKind),
    Pointer(Box<DataType>),
    Function {
        args: Vec<DataType>,
        returns: Box<DataType>,
    },
    Tuple(Vec<DataType>),
    /// Nominal reference, resolved through the registry.
    Custom(String),
}

// === Convenience constructors ===

impl DataType {
    pub fn int8() -> Self {
        DataType::Int(8)
    }
    pub fn int16() -> Self {
        DataType::Int(16)
    }
    pub fn int32() -> Self {
        DataType::Int(32)
    }
    pub fn int64() -> Self {
        DataType::Int(64)
    }
    pub fn float() -> Self {
        DataType::Float(FloatKind::Float)
    }
    pub fn double() -> Self {
        DataType::Float(FloatKind::Double)
    }
    pub fn float80() -> Self {
        DataType::Float(FloatKind::Float80)
    }

    /// `*Int8`, the type every opaque foreign reference degrades to.
    pub fn opaque_pointer() -> Self {
        DataType::int8().pointer_to()
    }

    pub fn custom(name: impl Into<String>) -> Self {
        DataType::Custom(name.into())
    }

    pub fn function(args: Vec<DataType>, returns: DataType) -> Self {
        DataType::Function {
            args,
            returns: Box::new(returns),
        }
    }

    /// Wrap this type in one level of indirection.
    pub fn pointer_to(self) -> Self {
        DataType::Pointer(Box::new(self))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    /// Number of consecutive pointer layers wrapping the root type.
    pub fn pointer_level(&self) -> usize {
        match self {
            DataType::Pointer(inner) => 1 + inner.pointer_level(),
            _ => 0,
        }
    }

    /// The type left after peeling every pointer layer.
    pub fn root_type(&self) -> &DataType {
        match self {
            DataType::Pointer(inner) => inner.root_type(),
            other => other,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[DataType]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Void => write!(f, "Void"),
            DataType::Bool => write!(f, "Bool"),
            DataType::Int(64) => write!(f, "Int"),
            DataType::Int(width) => write!(f, "Int{width}"),
            DataType::Float(FloatKind::Float) => write!(f, "Float"),
            DataType::Float(FloatKind::Double) => write!(f, "Double"),
            DataType::Float(FloatKind::Float80) => write!(f, "Float80"),
            DataType::Pointer(inner) => write!(f, "*{inner}"),
            DataType::Function { args, returns } => {
                write_list(f, args)?;
                write!(f, " -> {returns}")
            }
            DataType::Tuple(fields) => write_list(f, fields),
            DataType::Custom(name) => write!(f, "{name}"),
        }
    }
}
