//! Declaration registry: every top-level declaration known to one compilation.

use std::collections::HashMap;
use std::rc::Rc;

use crate::decl::{Declaration, FuncDecl, GlobalConst, TypeAlias, TypeDecl};
use crate::ident::Identifier;
use crate::types::DataType;

/// Upper bound on alias hops followed by [`DeclRegistry::resolve`].
const MAX_ALIAS_DEPTH: usize = 64;

/// Append-only table of top-level declarations, keyed by name.
///
/// Types, aliases and globals are unique per name: a second `add` under a
/// name already taken is tolerated and ignored. Functions may be overloaded,
/// so only re-adding the very same instance is ignored.
#[derive(Debug, Clone, Default)]
pub struct DeclRegistry {
    decls: Vec<Declaration>,
    types: HashMap<Identifier, Rc<TypeDecl>>,
    aliases: HashMap<Identifier, Rc<TypeAlias>>,
    globals: HashMap<Identifier, Rc<GlobalConst>>,
    functions: HashMap<Identifier, Vec<Rc<FuncDecl>>>,
}

impl DeclRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration. Returns `false` if it was a tolerated duplicate.
    pub fn add(&mut self, decl: impl Into<Declaration>) -> bool {
        let decl = decl.into();
        let added = match &decl {
            Declaration::Type(d) => insert_unique(&mut self.types, d),
            Declaration::Alias(d) => insert_unique(&mut self.aliases, d),
            Declaration::Global(d) => insert_unique(&mut self.globals, d),
            Declaration::Function(d) => {
                let overloads = self.functions.entry(d.name.clone()).or_default();
                if overloads.iter().any(|existing| Rc::ptr_eq(existing, d)) {
                    false
                } else {
                    overloads.push(Rc::clone(d));
                    true
                }
            }
        };
        if added {
            self.decls.push(decl);
        }
        added
    }

    pub fn type_named(&self, name: &str) -> Option<&Rc<TypeDecl>> {
        self.types.get(name)
    }

    pub fn alias_named(&self, name: &str) -> Option<&Rc<TypeAlias>> {
        self.aliases.get(name)
    }

    pub fn global_named(&self, name: &str) -> Option<&Rc<GlobalConst>> {
        self.globals.get(name)
    }

    /// Every overload registered under `name`, in registration order.
    pub fn functions_named(&self, name: &str) -> &[Rc<FuncDecl>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All declarations in registration order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.decls
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Follow `Custom` names through alias chains, recursively through
    /// pointers, tuples and function types.
    ///
    /// Unknown names and alias cycles are left as they are.
    pub fn resolve(&self, ty: &DataType) -> DataType {
        self.resolve_bounded(ty, MAX_ALIAS_DEPTH)
    }

    fn resolve_bounded(&self, ty: &DataType, budget: usize) -> DataType {
        match ty {
            DataType::Custom(name) => match self.aliases.get(name.as_str()) {
                Some(alias) if budget > 0 => self.resolve_bounded(&alias.target, budget - 1),
                _ => ty.clone(),
            },
            DataType::Pointer(inner) => self.resolve_bounded(inner, budget).pointer_to(),
            DataType::Tuple(fields) => {
                DataType::Tuple(fields.iter().map(|f| self.resolve_bounded(f, budget)).collect())
            }
            DataType::Function { args, returns } => DataType::function(
                args.iter().map(|a| self.resolve_bounded(a, budget)).collect(),
                self.resolve_bounded(returns, budget),
            ),
            other => other.clone(),
        }
    }

    /// The aggregate a (possibly aliased) custom type names.
    pub fn type_decl_for(&self, ty: &DataType) -> Option<&Rc<TypeDecl>> {
        match self.resolve(ty) {
            DataType::Custom(name) => self.types.get(name.as_str()),
            _ => None,
        }
    }
}

fn insert_unique<T>(map: &mut HashMap<Identifier, Rc<T>>, decl: &Rc<T>) -> bool
where
    T: Named,
{
    if map.contains_key(decl.ident()) {
        return false;
    }
    map.insert(decl.ident().clone(), Rc::clone(decl));
    true
}

trait Named {
    fn ident(&self) -> &Identifier;
}

impl Named for TypeDecl {
    fn ident(&self) -> &Identifier {
        &self.name
    }
}

impl Named for TypeAlias {
    fn ident(&self) -> &Identifier {
        &self.name
    }
}

impl Named for GlobalConst {
    fn ident(&self) -> &Identifier {
        &self.name
    }
}
