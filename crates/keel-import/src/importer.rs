//! Declaration importer.
//!
//! Walks the direct children of each translation unit and turns structs,
//! typedefs, functions, enums and literal macros into Keel declarations in
//! a shared [`DeclRegistry`]. Each declaration is imported whole or not at
//! all; anything that cannot be represented is skipped with a reason.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use keel_core::{
    Attribute, ConstValue, DataType, DeclRegistry, Declaration, Field, FuncDecl, GlobalConst,
    Identifier, TypeAlias, TypeDecl,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bridge::convert_type;
use crate::config::ImportConfig;
use crate::error::{Outcome, Result, SkipReason};
use crate::frontend::{Cursor, CursorKind, ForeignType, Frontend, TranslationUnit, VisitControl};

/// Name of the runtime's fatal error entry point, declared by the prelude.
pub const FATAL_ERROR_FN: &str = "keel_fatal_error";

/// Counts of what an importer registered and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub types: usize,
    pub aliases: usize,
    pub functions: usize,
    pub globals: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} types, {} aliases, {} functions, {} globals ({} skipped)",
            self.types, self.aliases, self.functions, self.globals, self.skipped
        )
    }
}

/// What happened to one header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeaderStatus {
    /// Parsed; `declarations` new declarations were registered from it.
    Imported { declarations: usize },
    /// The frontend could not parse it.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: HeaderStatus,
}

/// Result of a full import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub headers: Vec<HeaderReport>,
    pub stats: ImportStats,
}

impl ImportSummary {
    pub fn failed_headers(&self) -> impl Iterator<Item = &HeaderReport> {
        self.headers
            .iter()
            .filter(|h| matches!(h.status, HeaderStatus::Failed { .. }))
    }
}

/// Imports foreign declarations into a registry for one compilation.
///
/// The importer memoizes structs and functions by name: importing the same
/// name again hands back the instance built the first time.
pub struct Importer<'r> {
    registry: &'r mut DeclRegistry,
    imported_types: HashMap<Identifier, Rc<TypeDecl>>,
    imported_functions: HashMap<Identifier, Rc<FuncDecl>>,
    stats: ImportStats,
}

impl<'r> Importer<'r> {
    pub fn new(registry: &'r mut DeclRegistry) -> Self {
        Self {
            registry,
            imported_types: HashMap::new(),
            imported_functions: HashMap::new(),
            stats: ImportStats::default(),
        }
    }

    pub fn registry(&self) -> &DeclRegistry {
        self.registry
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Declare what the runtime and common headers need but C cannot spell
    /// portably.
    pub fn seed_prelude(&mut self) {
        let aliases = [
            ("uint16_t", DataType::int16()),
            ("__builtin_va_list", DataType::opaque_pointer()),
            ("__darwin_pthread_handler_rec", DataType::opaque_pointer()),
        ];
        for (name, target) in aliases {
            if self.registry.add(TypeAlias::new(name, target)) {
                self.stats.aliases += 1;
            }
        }
        if self.registry.functions_named(FATAL_ERROR_FN).is_empty() {
            let fatal = FuncDecl::positional(
                FATAL_ERROR_FN,
                vec![DataType::opaque_pointer()],
                DataType::Void,
                false,
                [Attribute::Foreign, Attribute::NoReturn],
            );
            self.registry.add(fatal);
            self.stats.functions += 1;
        }
    }

    /// Import a struct definition. Fails whole if any field cannot be
    /// converted, and a failed attempt leaves nothing behind.
    pub fn import_struct(&mut self, cursor: &Cursor) -> Outcome<Rc<TypeDecl>> {
        if cursor.kind != CursorKind::StructDecl {
            return Outcome::Skipped(SkipReason::NotAStruct);
        }
        let name = match &cursor.ty {
            ForeignType::Record(name) if !name.is_empty() => name.as_str(),
            _ => cursor.spelling.as_str(),
        };
        if name.is_empty() {
            return Outcome::Skipped(SkipReason::Unconvertible("unnamed struct".to_string()));
        }
        if let Some(existing) = self.imported_types.get(name) {
            return Outcome::Imported(Rc::clone(existing));
        }
        if !cursor.is_definition {
            return Outcome::Skipped(SkipReason::ForwardDeclaration);
        }

        let mut fields = Vec::new();
        for child in cursor.children.iter().filter(|c| c.kind == CursorKind::FieldDecl) {
            let Some(ty) = convert_type(&child.ty) else {
                return Outcome::Skipped(SkipReason::Unconvertible(format!(
                    "field `{}` of `{name}`",
                    child.spelling
                )));
            };
            fields.push(Field {
                name: Identifier::new(child.spelling.as_str()),
                ty,
                mutable: true,
            });
        }

        let decl = Rc::new(TypeDecl {
            name: Identifier::new(name),
            fields,
            attributes: [Attribute::Foreign].into_iter().collect(),
        });
        self.imported_types.insert(decl.name.clone(), Rc::clone(&decl));
        if self.registry.add(Declaration::Type(Rc::clone(&decl))) {
            self.stats.types += 1;
        }
        Outcome::Imported(decl)
    }

    /// Import a typedef as a type alias. The first alias of a name wins.
    pub fn import_typedef(&mut self, cursor: &Cursor) -> Outcome<Rc<TypeAlias>> {
        let name = cursor.spelling.as_str();
        if self.registry.alias_named(name).is_some() {
            return Outcome::Skipped(SkipReason::AlreadyDeclared);
        }
        let Some(underlying) = &cursor.underlying else {
            return Outcome::Skipped(SkipReason::Unconvertible(format!("target of `{name}`")));
        };

        let target = match (underlying, &cursor.underlying_decl) {
            (ForeignType::Record(_), Some(record))
                if record.kind == CursorKind::StructDecl && record.is_definition => match self.import_struct(record) {
                Outcome::Imported(decl) => decl.data_type(),
                Outcome::Skipped(reason) => return Outcome::Skipped(reason),
            },
            _ => match convert_type(underlying) {
                Some(ty) => ty,
                None => return Outcome::Skipped(SkipReason::Unconvertible(format!("target of `{name}`"))),
            },
        };
        if target.to_string() == name {
            return Outcome::Skipped(SkipReason::SelfAlias);
        }

        let alias = Rc::new(TypeAlias::new(name, target));
        if self.registry.add(Declaration::Alias(Rc::clone(&alias))) {
            self.stats.aliases += 1;
        }
        Outcome::Imported(alias)
    }

    /// Import a function prototype or definition as a foreign function with
    /// positional parameters.
    pub fn import_function(&mut self, cursor: &Cursor) -> Outcome<Rc<FuncDecl>> {
        if cursor.kind != CursorKind::FunctionDecl {
            return Outcome::Skipped(SkipReason::NotAFunction);
        }
        let name = cursor.spelling.as_str();
        if let Some(existing) = self.imported_functions.get(name) {
            return Outcome::Imported(Rc::clone(existing));
        }
        if !self.registry.functions_named(name).is_empty() {
            return Outcome::Skipped(SkipReason::AlreadyDeclared);
        }
        let Some(arity) = cursor.arity else {
            return Outcome::Skipped(SkipReason::UnknownArity);
        };
        let (result, params, variadic) = match &cursor.ty {
            ForeignType::FunctionProto {
                result,
                params,
                variadic,
            } => (result, params.as_slice(), *variadic),
            ForeignType::FunctionNoProto { result } => (result, &[][..], false),
            _ => return Outcome::Skipped(SkipReason::NotAFunction),
        };

        let Some(returns) = convert_type(result) else {
            return Outcome::Skipped(SkipReason::Unconvertible(format!("return type of `{name}`")));
        };
        let mut args = Vec::with_capacity(arity);
        for index in 0..arity {
            let Some(ty) = params.get(index).and_then(convert_type) else {
                return Outcome::Skipped(SkipReason::Unconvertible(format!(
                    "parameter {index} of `{name}`"
                )));
            };
            args.push(ty);
        }

        let mut attributes = vec![Attribute::Foreign];
        if cursor.no_return {
            attributes.push(Attribute::NoReturn);
        }
        let decl = Rc::new(FuncDecl::positional(name, args, returns, variadic, attributes));
        self.imported_functions.insert(decl.name.clone(), Rc::clone(&decl));
        if self.registry.add(Declaration::Function(Rc::clone(&decl))) {
            self.stats.functions += 1;
        }
        Outcome::Imported(decl)
    }

    /// Import each enumerator as an immutable `Int32` global. No enum type
    /// is declared.
    pub fn import_enum(&mut self, cursor: &Cursor) -> Vec<Outcome<Rc<GlobalConst>>> {
        let mut outcomes = Vec::new();
        for constant in cursor
            .children
            .iter()
            .filter(|c| c.kind == CursorKind::EnumConstantDecl)
        {
            let global = GlobalConst::constant(
                constant.spelling.as_str(),
                DataType::int32(),
                constant.enum_value.map(ConstValue::int),
            );
            outcomes.push(self.register_global(global));
        }
        outcomes
    }

    /// Register a global unless one of that name exists.
    pub(crate) fn register_global(&mut self, global: GlobalConst) -> Outcome<Rc<GlobalConst>> {
        if self.registry.global_named(global.name.as_str()).is_some() {
            return Outcome::Skipped(SkipReason::AlreadyDeclared);
        }
        let global = Rc::new(global);
        if self.registry.add(Declaration::Global(Rc::clone(&global))) {
            self.stats.globals += 1;
        }
        Outcome::Imported(global)
    }

    /// Import every top-level declaration of `unit`. Returns how many
    /// declarations were registered.
    pub fn import_translation_unit(&mut self, unit: &TranslationUnit) -> usize {
        let before = self.registry.len();
        unit.visit_children(|cursor| {
            match cursor.kind {
                CursorKind::StructDecl => {
                    let outcome = self.import_struct(cursor);
                    self.tally(cursor, outcome);
                }
                CursorKind::TypedefDecl => {
                    let outcome = self.import_typedef(cursor);
                    self.tally(cursor, outcome);
                }
                CursorKind::FunctionDecl => {
                    let outcome = self.import_function(cursor);
                    self.tally(cursor, outcome);
                }
                CursorKind::EnumDecl => {
                    let constants = cursor
                        .children
                        .iter()
                        .filter(|c| c.kind == CursorKind::EnumConstantDecl);
                    for (constant, outcome) in constants.zip(self.import_enum(cursor)) {
                        self.tally(constant, outcome);
                    }
                }
                CursorKind::MacroDefinition => {
                    let outcome = self.import_macro(cursor, unit);
                    self.tally(cursor, outcome);
                }
                _ => {}
            }
            VisitControl::Continue
        });
        self.registry.len() - before
    }

    fn tally<T>(&mut self, cursor: &Cursor, outcome: Outcome<T>) {
        if let Outcome::Skipped(reason) = outcome {
            self.stats.skipped += 1;
            debug!(kind = %cursor.kind, name = %cursor.spelling, %reason, "skipped declaration");
        }
    }

    /// Seed the prelude, then import every configured header in order.
    ///
    /// A header the frontend cannot parse is reported and the run moves on;
    /// only an unknown frontend status aborts.
    pub fn run<F>(&mut self, frontend: &mut F, config: &ImportConfig) -> Result<ImportSummary>
    where
        F: Frontend + ?Sized,
    {
        self.seed_prelude();
        let args = config.compiler_args();
        let mut headers = Vec::new();

        for path in config.header_paths() {
            let status = match frontend.parse(&path, &args) {
                Ok(unit) => HeaderStatus::Imported {
                    declarations: self.import_translation_unit(&unit),
                },
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not parse header");
                    HeaderStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            headers.push(HeaderReport { path, status });
        }

        info!(headers = headers.len(), stats = %self.stats, "import finished");
        Ok(ImportSummary {
            headers,
            stats: self.stats.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontendError, SourceFrontend, SourceRange, Token, TokenKind};
    use std::path::Path;

    fn unit(cursors: Vec<Cursor>) -> TranslationUnit {
        TranslationUnit::new("test.h", cursors, Vec::new())
    }

    fn tm() -> Cursor {
        Cursor::record(
            "tm",
            vec![("tm_sec", ForeignType::Int), ("tm_zone", ForeignType::CharS.pointer_to())],
        )
    }

    #[test]
    fn struct_import_is_memoized() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);

        let first = importer.import_struct(&tm()).imported().unwrap();
        assert_eq!(first.fields.len(), 2);
        assert!(first.fields.iter().all(|f| f.mutable));
        assert_eq!(first.fields[1].ty, DataType::opaque_pointer());
        assert!(first.has_attribute(Attribute::Foreign));

        let second = importer.import_struct(&tm()).imported().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(importer.registry().len(), 1);
    }

    #[test]
    fn struct_import_is_atomic() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);

        let broken = Cursor::record("tm", vec![("tm_sec", ForeignType::Int), ("bad", ForeignType::Invalid)]);
        let outcome = importer.import_struct(&broken);
        assert!(matches!(outcome.skip_reason(), Some(SkipReason::Unconvertible(_))));
        assert!(importer.registry().is_empty());

        // Nothing was cached, so a later attempt starts fresh.
        assert!(importer.import_struct(&tm()).is_imported());
        assert_eq!(importer.registry().type_named("tm").unwrap().fields.len(), 2);
    }

    #[test]
    fn forward_struct_is_skipped() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let forward = Cursor::record("node", vec![]).forward();
        assert_eq!(
            importer.import_struct(&forward).skip_reason(),
            Some(&SkipReason::ForwardDeclaration)
        );
        assert!(importer.registry().is_empty());
    }

    #[test]
    fn typedef_of_primitive() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let alias = importer
            .import_typedef(&Cursor::typedef("pid_t", ForeignType::Int))
            .imported()
            .unwrap();
        assert_eq!(alias.target, DataType::int32());

        // First alias of a name wins.
        let again = importer.import_typedef(&Cursor::typedef("pid_t", ForeignType::Long));
        assert_eq!(again.skip_reason(), Some(&SkipReason::AlreadyDeclared));
        assert_eq!(importer.registry().alias_named("pid_t").unwrap().target, DataType::int32());
    }

    #[test]
    fn typedef_forces_struct_import() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let typedef = Cursor::typedef("tm_t", ForeignType::Record("tm".into())).with_underlying_decl(tm());
        let alias = importer.import_typedef(&typedef).imported().unwrap();
        assert_eq!(alias.target, DataType::custom("tm"));
        assert!(importer.registry().type_named("tm").is_some());
    }

    #[test]
    fn typedef_over_broken_struct_imports_nothing() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let broken = Cursor::record("tm", vec![("tm_sec", ForeignType::Int), ("bad", ForeignType::Invalid)]);
        let typedef = Cursor::typedef("tm_t", ForeignType::Record("tm".into())).with_underlying_decl(broken);
        assert!(matches!(
            importer.import_typedef(&typedef).skip_reason(),
            Some(SkipReason::Unconvertible(_))
        ));
        assert!(importer.registry().is_empty());

        let typedef = Cursor::typedef("tm_t", ForeignType::Record("tm".into())).with_underlying_decl(tm());
        let alias = importer.import_typedef(&typedef).imported().unwrap();
        assert_eq!(alias.target, DataType::custom("tm"));
        assert_eq!(importer.registry().type_named("tm").unwrap().fields.len(), 2);
        assert_eq!(importer.registry().len(), 2);
    }

    #[test]
    fn unions_are_not_structs() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let mut union = Cursor::record("num", vec![("i", ForeignType::Int), ("d", ForeignType::Double)]);
        union.kind = CursorKind::UnionDecl;
        assert_eq!(
            importer.import_struct(&union).skip_reason(),
            Some(&SkipReason::NotAStruct)
        );

        let typedef = Cursor::typedef("num_t", ForeignType::Record("num".into())).with_underlying_decl(union);
        let alias = importer.import_typedef(&typedef).imported().unwrap();
        assert_eq!(alias.target, DataType::custom("num"));
        assert!(importer.registry().type_named("num").is_none());
    }

    #[test]
    fn union_typedef_from_source() {
        let unit = SourceFrontend::new().parse_source(
            Path::new("num.h"),
            "typedef union num { int i; double d; } num_t;\n",
        );
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        importer.import_translation_unit(&unit);
        assert!(importer.registry().type_named("num").is_none());
        assert_eq!(
            importer.registry().alias_named("num_t").unwrap().target,
            DataType::custom("num")
        );
    }

    #[test]
    fn oversized_array_is_skipped() {
        let unit = SourceFrontend::new().parse_source(
            Path::new("huge.h"),
            "typedef char huge_t[0x7fffffffffffffff];\ntypedef char small_t[4];\n",
        );
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        importer.import_translation_unit(&unit);
        assert!(importer.registry().alias_named("huge_t").is_none());
        assert_eq!(
            importer.registry().alias_named("small_t").unwrap().target,
            DataType::Tuple(vec![DataType::int8(); 4])
        );
        assert_eq!(importer.stats().skipped, 1);
    }

    #[test]
    fn self_alias_is_skipped() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let record = Cursor::record("point_t", vec![("x", ForeignType::Double)]);
        let typedef = Cursor::typedef("point_t", ForeignType::Record("point_t".into())).with_underlying_decl(record);
        assert_eq!(
            importer.import_typedef(&typedef).skip_reason(),
            Some(&SkipReason::SelfAlias)
        );
        assert!(importer.registry().type_named("point_t").is_some());
        assert!(importer.registry().alias_named("point_t").is_none());
    }

    #[test]
    fn typedef_of_forward_struct_does_not_import_it() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let typedef = Cursor::typedef("FILE", ForeignType::Record("__sFILE".into()))
            .with_underlying_decl(Cursor::record("__sFILE", vec![]).forward());
        let alias = importer.import_typedef(&typedef).imported().unwrap();
        assert_eq!(alias.target, DataType::custom("__sFILE"));
        assert!(importer.registry().type_named("__sFILE").is_none());
    }

    #[test]
    fn function_import() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let printf = Cursor::function("printf", ForeignType::Int, vec![ForeignType::CharS.pointer_to()], true);
        let decl = importer.import_function(&printf).imported().unwrap();
        assert_eq!(decl.returns, DataType::int32());
        assert!(decl.has_var_args);
        assert!(decl.is_foreign());
        assert!(!decl.has_attribute(Attribute::NoReturn));
        assert!(decl.params.iter().all(|p| p.external_name.is_none()));

        let again = importer.import_function(&printf).imported().unwrap();
        assert!(Rc::ptr_eq(&decl, &again));
        assert_eq!(importer.registry().functions_named("printf").len(), 1);
    }

    #[test]
    fn noreturn_function() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let exit = Cursor::function("exit", ForeignType::Void, vec![ForeignType::Int], false).no_return();
        let decl = importer.import_function(&exit).imported().unwrap();
        assert!(decl.has_attribute(Attribute::NoReturn));
        assert_eq!(
            Declaration::Function(decl).to_string(),
            "foreign noreturn func exit(_: Int32)"
        );
    }

    #[test]
    fn function_import_is_atomic() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let bad = Cursor::function("f", ForeignType::Int, vec![ForeignType::Int, ForeignType::Invalid], false);
        assert!(matches!(
            importer.import_function(&bad).skip_reason(),
            Some(SkipReason::Unconvertible(_))
        ));
        let bad_return = Cursor::function("g", ForeignType::Invalid, vec![], false);
        assert!(!importer.import_function(&bad_return).is_imported());
        assert!(importer.registry().is_empty());
    }

    #[test]
    fn function_skips() {
        let mut registry = DeclRegistry::new();
        registry.add(FuncDecl::new("puts", vec![], DataType::int32()));
        let mut importer = Importer::new(&mut registry);

        let puts = Cursor::function("puts", ForeignType::Int, vec![ForeignType::CharS.pointer_to()], false);
        assert_eq!(
            importer.import_function(&puts).skip_reason(),
            Some(&SkipReason::AlreadyDeclared)
        );

        let unknown = Cursor::function("h", ForeignType::Int, vec![], false).with_arity(None);
        assert_eq!(
            importer.import_function(&unknown).skip_reason(),
            Some(&SkipReason::UnknownArity)
        );

        let var = Cursor::new(CursorKind::VarDecl, "errno", ForeignType::Int);
        assert_eq!(
            importer.import_function(&var).skip_reason(),
            Some(&SkipReason::NotAFunction)
        );
    }

    #[test]
    fn enum_flattens_to_globals() {
        let mut registry = DeclRegistry::new();
        registry.add(GlobalConst::constant("TAKEN", DataType::int64(), None));
        let mut importer = Importer::new(&mut registry);

        let colors = Cursor::enumeration("color", vec![("RED", Some(0)), ("TAKEN", Some(1)), ("BLUE", None)]);
        let outcomes = importer.import_enum(&colors);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1].skip_reason(), Some(&SkipReason::AlreadyDeclared));

        let red = importer.registry().global_named("RED").unwrap();
        assert_eq!(red.ty, DataType::int32());
        assert!(!red.mutable);
        assert_eq!(red.value, Some(ConstValue::int(0)));
        assert_eq!(importer.registry().global_named("BLUE").unwrap().value, None);
        assert!(importer.registry().type_named("color").is_none());
    }

    #[test]
    fn prelude_is_seeded_once() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        importer.seed_prelude();
        importer.seed_prelude();

        let fatal = importer.registry().functions_named(FATAL_ERROR_FN);
        assert_eq!(fatal.len(), 1);
        assert!(fatal[0].has_attribute(Attribute::NoReturn));
        assert_eq!(
            importer.registry().alias_named("__builtin_va_list").unwrap().target,
            DataType::opaque_pointer()
        );
        assert_eq!(importer.stats().aliases, 3);
    }

    #[test]
    fn translation_unit_dispatch() {
        let macro_cursor = Cursor::new(CursorKind::MacroDefinition, "LIMIT", ForeignType::Invalid)
            .with_extent(SourceRange::new(0, 10));
        let mut tu = unit(vec![
            tm(),
            Cursor::typedef("tm_t", ForeignType::Record("tm".into())),
            Cursor::function("mktime", ForeignType::Long, vec![ForeignType::Record("tm".into()).pointer_to()], false),
            Cursor::enumeration("", vec![("A", Some(1))]),
            Cursor::new(CursorKind::VarDecl, "errno", ForeignType::Int),
            macro_cursor,
        ]);
        tu.tokens = vec![
            Token::new(TokenKind::Identifier, "LIMIT", 0),
            Token::new(TokenKind::Literal, "64", 6),
            Token::new(TokenKind::EndOfDirective, "", 9),
        ];

        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        assert_eq!(importer.import_translation_unit(&tu), 5);
        let stats = importer.stats().clone();
        assert_eq!(
            stats,
            ImportStats {
                types: 1,
                aliases: 1,
                functions: 1,
                globals: 2,
                skipped: 0,
            }
        );
        let mktime = &importer.registry().functions_named("mktime")[0];
        assert_eq!(mktime.params[0].ty, DataType::custom("tm").pointer_to());
    }

    #[test]
    fn run_over_headers_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.h"),
            "#define DEMO_VERSION 3\n\
             #define DEMO_MASK 0xFFu\n\
             typedef unsigned long size_t;\n\
             typedef struct demo { int id; const char *name; } demo_t;\n\
             enum mode { MODE_A, MODE_B = 4 };\n\
             demo_t *demo_open(const char *path, size_t len);\n\
             void demo_fail(const char *msg) __attribute__((noreturn));\n",
        )
        .unwrap();
        let config = ImportConfig {
            headers: vec!["demo.h".into(), "missing.h".into()],
            search_prefix: dir.path().to_path_buf(),
            runtime_header: None,
            ..ImportConfig::default()
        };

        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let summary = importer.run(&mut SourceFrontend::new(), &config).unwrap();

        assert_eq!(summary.headers.len(), 2);
        assert!(matches!(
            summary.headers[0].status,
            HeaderStatus::Imported { declarations: 9 }
        ));
        assert_eq!(summary.failed_headers().count(), 1);

        let registry = importer.registry();
        assert_eq!(registry.global_named("DEMO_MASK").unwrap().value, Some(ConstValue::Int { value: 255, raw: "0xFFu".into() }));
        assert_eq!(registry.global_named("MODE_B").unwrap().value, Some(ConstValue::int(4)));
        assert_eq!(registry.alias_named("size_t").unwrap().target, DataType::int64());
        assert_eq!(registry.alias_named("demo_t").unwrap().target, DataType::custom("demo"));
        let open = &registry.functions_named("demo_open")[0];
        assert_eq!(open.returns, DataType::custom("demo_t").pointer_to());
        assert_eq!(open.params[1].ty, DataType::custom("size_t"));
        assert_eq!(
            registry.resolve(&open.params[1].ty),
            DataType::int64()
        );
        assert!(registry.functions_named("demo_fail")[0].has_attribute(Attribute::NoReturn));
    }

    struct Broken(i32);

    impl Frontend for Broken {
        fn parse(&mut self, _path: &std::path::Path, _args: &[String]) -> std::result::Result<TranslationUnit, FrontendError> {
            Err(FrontendError::from_status(self.0).unwrap_or(FrontendError::Crashed))
        }
    }

    #[test]
    fn unknown_status_aborts_the_run() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let err = importer.run(&mut Broken(42), &ImportConfig::default()).unwrap_err();
        assert!(matches!(err, crate::ImportError::Frontend(FrontendError::Unknown(42))));
    }

    #[test]
    fn known_failures_are_reported() {
        let mut registry = DeclRegistry::new();
        let mut importer = Importer::new(&mut registry);
        let summary = importer.run(&mut Broken(2), &ImportConfig::default()).unwrap();
        assert_eq!(summary.headers.len(), 9);
        assert_eq!(summary.failed_headers().count(), 9);
        assert_eq!(
            summary.headers[0].status,
            HeaderStatus::Failed {
                error: "frontend crashed".into()
            }
        );
        // The prelude is still there.
        assert!(!importer.registry().functions_named(FATAL_ERROR_FN).is_empty());
    }

    #[test]
    fn summary_serializes() {
        let summary = ImportSummary {
            headers: vec![HeaderReport {
                path: PathBuf::from("a.h"),
                status: HeaderStatus::Imported { declarations: 2 },
            }],
            stats: ImportStats::default(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["headers"][0]["status"], "imported");
        assert_eq!(json["headers"][0]["declarations"], 2);
        assert_eq!(json["stats"]["skipped"], 0);
    }
}
