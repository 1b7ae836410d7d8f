//! Encoders.
//!
//! Grammar, with `<n>` the decimal character count of what follows:
//!
//! ```text
//! function   := "_KF" body
//! closure    := "_KC" body
//! type-sym   := "_KT" type
//! body       := "D" type
//!             | "I" type params "_" return?
//!             | "M" type <n>name params "_" return?
//!             | <n>name params "_" return?
//! params     := (label? <n>name type)*
//! label      := "S" | "E" <n>label
//! return     := "R" type
//! type       := "F" type* "R" type | "t" type* "T"
//!             | "sI" | "si" width | "sf" | "sd" | "sF" | "sb" | "sv"
//!             | "P" depth "T" type | <n>rendering
//! ```
//!
//! Foreign functions are never encoded and keep their declared name.

use keel_core::{DataType, FloatKind, FuncDecl, FuncKind};

use crate::MANGLE_PREFIX;

/// Mangle a function declaration.
pub fn mangle_function(decl: &FuncDecl) -> String {
    if decl.is_foreign() {
        return decl.name.name.clone();
    }
    let mut out = format!("{MANGLE_PREFIX}F");
    write_function_body(&mut out, decl);
    out
}

/// Mangle a closure declared inside `enclosing`.
///
/// Sibling closures of one function share a symbol; callers that emit more
/// than one closure per function must disambiguate them.
pub fn mangle_closure(enclosing: &FuncDecl) -> String {
    let mut out = format!("{MANGLE_PREFIX}C");
    if enclosing.is_foreign() {
        out.push_str(&enclosing.name.name);
    } else {
        write_function_body(&mut out, enclosing);
    }
    out
}

/// Mangle a type as a standalone symbol.
pub fn mangle_type(ty: &DataType) -> String {
    let mut out = format!("{MANGLE_PREFIX}T");
    write_type(&mut out, ty);
    out
}

/// Whether `symbol` is in the Keel namespace.
pub fn is_mangled(symbol: &str) -> bool {
    symbol.starts_with(MANGLE_PREFIX)
}

fn write_function_body(out: &mut String, decl: &FuncDecl) {
    match &decl.kind {
        FuncKind::Deinitializer(owner) => {
            out.push('D');
            write_type(out, owner);
            return;
        }
        FuncKind::Initializer(owner) => {
            out.push('I');
            write_type(out, owner);
        }
        FuncKind::Method(owner) => {
            out.push('M');
            write_type(out, owner);
            write_counted(out, &decl.name.name);
        }
        FuncKind::Global => write_counted(out, &decl.name.name),
    }

    for param in decl.params.iter().filter(|p| !p.implicit_self) {
        match &param.external_name {
            Some(external) if *external == param.name => out.push('S'),
            Some(external) => {
                out.push('E');
                write_counted(out, &external.name);
            }
            None => {}
        }
        write_counted(out, &param.name.name);
        write_type(out, &param.ty);
    }

    out.push('_');
    if !decl.returns.is_void() {
        out.push('R');
        write_type(out, &decl.returns);
    }
}

fn write_type(out: &mut String, ty: &DataType) {
    match ty {
        DataType::Function { args, returns } => {
            out.push('F');
            for arg in args {
                write_type(out, arg);
            }
            out.push('R');
            write_type(out, returns);
        }
        DataType::Tuple(fields) => {
            out.push('t');
            for field in fields {
                write_type(out, field);
            }
            out.push('T');
        }
        DataType::Int(64) => out.push_str("sI"),
        DataType::Int(width) => out.push_str(&format!("si{width}")),
        DataType::Float(kind) => out.push_str(match kind {
            FloatKind::Float => "sf",
            FloatKind::Double => "sd",
            FloatKind::Float80 => "sF",
        }),
        DataType::Bool => out.push_str("sb"),
        DataType::Void => out.push_str("sv"),
        DataType::Pointer(_) => {
            out.push_str(&format!("P{}T", ty.pointer_level()));
            write_type(out, ty.root_type());
        }
        DataType::Custom(_) => write_counted(out, &ty.to_string()),
    }
}

/// `<char count><text>`.
fn write_counted(out: &mut String, text: &str) {
    out.push_str(&format!("{}{text}", text.chars().count()));
}
