//! Decoding mangled symbols.
//!
//! The inverse of [`crate::mangle`]: a symbol is parsed back into the
//! declaration shape it encodes. Anything that is not a complete, well-formed
//! Keel symbol (foreign names included) yields `None`.
//!
//! Integer widths are followed directly by the next segment, which may start
//! with a digit, so only the widths `1`, `2`, `4`, `8`, `16`, `32` and `128`
//! are recognized after `si`.

use std::fmt;

use keel_core::{DataType, FuncDecl, FuncKind, Param};

use crate::MANGLE_PREFIX;

/// Widths tried after `si`, longest spelling first.
const INT_WIDTHS: &[&str] = &["128", "16", "32", "1", "2", "4", "8"];

const MAX_POINTER_DEPTH: usize = 255;

/// A decoded symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Demangled {
    Function(FuncDecl),
    /// A closure and the function it is declared in.
    Closure(FuncDecl),
    Type(DataType),
}

/// Decode a mangled symbol.
pub fn demangle(symbol: &str) -> Option<Demangled> {
    let rest = symbol.strip_prefix(MANGLE_PREFIX)?;
    let mut parser = Parser { rest: rest.get(1..)? };
    let demangled = match rest.as_bytes().first()? {
        b'F' => Demangled::Function(parser.function()?),
        b'C' => Demangled::Closure(parser.function()?),
        b'T' => Demangled::Type(parser.data_type()?),
        _ => return None,
    };
    parser.rest.is_empty().then_some(demangled)
}

struct Parser<'a> {
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.rest.as_bytes().first().copied()
    }

    fn eat(&mut self, tag: &str) -> bool {
        match self.rest.strip_prefix(tag) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, tag: &str) -> Option<()> {
        self.eat(tag).then_some(())
    }

    fn number(&mut self) -> Option<usize> {
        let len = self.rest.bytes().take_while(u8::is_ascii_digit).count();
        let (digits, rest) = self.rest.split_at(len);
        let value = digits.parse().ok()?;
        self.rest = rest;
        Some(value)
    }

    /// `<char count><text>`.
    fn counted(&mut self) -> Option<&'a str> {
        let count = self.number()?;
        let end = match self.rest.char_indices().nth(count) {
            Some((index, _)) => index,
            None if self.rest.chars().count() == count => self.rest.len(),
            None => return None,
        };
        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(text)
    }

    fn function(&mut self) -> Option<FuncDecl> {
        let (name, kind) = match self.peek()? {
            b'D' => {
                self.rest = &self.rest[1..];
                let owner = self.data_type()?;
                return Some(
                    FuncDecl::new("deinit", Vec::new(), DataType::Void)
                        .with_kind(FuncKind::Deinitializer(owner)),
                );
            }
            b'I' => {
                self.rest = &self.rest[1..];
                ("init", FuncKind::Initializer(self.data_type()?))
            }
            b'M' => {
                self.rest = &self.rest[1..];
                let owner = self.data_type()?;
                (self.counted()?, FuncKind::Method(owner))
            }
            _ => (self.counted()?, FuncKind::Global),
        };

        let mut params = Vec::new();
        while !self.eat("_") {
            params.push(self.param()?);
        }
        let returns = if self.eat("R") {
            self.data_type()?
        } else {
            DataType::Void
        };
        Some(FuncDecl::new(name, params, returns).with_kind(kind))
    }

    fn param(&mut self) -> Option<Param> {
        let param = if self.eat("S") {
            let name = self.counted()?;
            Param::labeled(name, name, self.data_type()?)
        } else if self.eat("E") {
            let external = self.counted()?;
            let name = self.counted()?;
            Param::labeled(external, name, self.data_type()?)
        } else {
            let name = self.counted()?;
            Param::new(name, self.data_type()?)
        };
        Some(param)
    }

    fn data_type(&mut self) -> Option<DataType> {
        let ty = match self.peek()? {
            b'F' => {
                self.rest = &self.rest[1..];
                let mut args = Vec::new();
                while !self.eat("R") {
                    args.push(self.data_type()?);
                }
                DataType::function(args, self.data_type()?)
            }
            b't' => {
                self.rest = &self.rest[1..];
                let mut fields = Vec::new();
                while !self.eat("T") {
                    fields.push(self.data_type()?);
                }
                DataType::Tuple(fields)
            }
            b's' => {
                self.rest = &self.rest[1..];
                self.scalar()?
            }
            b'P' => {
                self.rest = &self.rest[1..];
                let depth = self.number()?;
                self.expect("T")?;
                let root = self.data_type()?;
                if depth == 0 || depth > MAX_POINTER_DEPTH || matches!(root, DataType::Pointer(_)) {
                    return None;
                }
                (0..depth).fold(root, |ty, _| ty.pointer_to())
            }
            b'0'..=b'9' => {
                let rendering = self.counted()?;
                if rendering.is_empty() {
                    return None;
                }
                DataType::custom(rendering)
            }
            _ => return None,
        };
        Some(ty)
    }

    fn scalar(&mut self) -> Option<DataType> {
        let ty = match self.peek()? {
            b'I' => DataType::int64(),
            b'f' => DataType::float(),
            b'd' => DataType::double(),
            b'F' => DataType::float80(),
            b'b' => DataType::Bool,
            b'v' => DataType::Void,
            b'i' => {
                self.rest = &self.rest[1..];
                let width = INT_WIDTHS.iter().find(|w| self.rest.starts_with(**w))?;
                self.rest = &self.rest[width.len()..];
                return width.parse().ok().map(DataType::Int);
            }
            _ => return None,
        };
        self.rest = &self.rest[1..];
        Some(ty)
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, decl: &FuncDecl) -> fmt::Result {
    match &decl.kind {
        FuncKind::Deinitializer(owner) => return write!(f, "{owner}.deinit"),
        FuncKind::Initializer(owner) => write!(f, "{owner}.init(")?,
        FuncKind::Method(owner) => write!(f, "{owner}.{}(", decl.name)?,
        FuncKind::Global => write!(f, "{}(", decl.name)?,
    }
    for (i, param) in decl.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match &param.external_name {
            Some(external) if *external == param.name => {}
            Some(external) => write!(f, "{external} ")?,
            None if param.name.name.is_empty() => write!(f, "_")?,
            None => write!(f, "_ ")?,
        }
        if !param.name.name.is_empty() {
            write!(f, "{}", param.name)?;
        }
        write!(f, ": {}", param.ty)?;
    }
    write!(f, ")")?;
    if !decl.returns.is_void() {
        write!(f, " -> {}", decl.returns)?;
    }
    Ok(())
}

impl fmt::Display for Demangled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demangled::Function(decl) => write_signature(f, decl),
            Demangled::Closure(decl) => {
                write!(f, "closure in ")?;
                write_signature(f, decl)
            }
            Demangled::Type(ty) => write!(f, "{ty}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mangle::{mangle_closure, mangle_function, mangle_type};

    fn render(symbol: &str) -> Option<String> {
        demangle(symbol).map(|d| d.to_string())
    }

    #[test]
    fn functions() {
        assert_eq!(render("_KF3fooS1xsi32_RsI").as_deref(), Some("foo(x: Int32) -> Int"));
        assert_eq!(render("_KF4main_").as_deref(), Some("main()"));
        assert_eq!(
            render("_KF4copyE2to4destP1T5Point1nsI0sb_").as_deref(),
            Some("copy(to dest: *Point, _ n: Int, _: Bool)")
        );
    }

    #[test]
    fn members() {
        assert_eq!(
            render("_KFI5PointS1xsI_R5Point").as_deref(),
            Some("Point.init(x: Int) -> Point")
        );
        assert_eq!(render("_KFD5Point").as_deref(), Some("Point.deinit"));
        assert_eq!(
            render("_KFM5Point4norm_Rsd").as_deref(),
            Some("Point.norm() -> Double")
        );
    }

    #[test]
    fn closures_and_types() {
        assert_eq!(
            render("_KC3foo1nsI_").as_deref(),
            Some("closure in foo(_ n: Int)")
        );
        assert_eq!(render("_KTP2Tsi32").as_deref(), Some("**Int32"));
        assert_eq!(
            render("_KTFtsi16sbTsFRsv").as_deref(),
            Some("((Int16, Bool), Float80) -> Void")
        );
    }

    #[test]
    fn widths_next_to_digits() {
        let decl = FuncDecl::new(
            "f",
            vec![Param::new("a", DataType::int32()), Param::new("b", DataType::Int(1))],
            DataType::int16(),
        );
        let symbol = mangle_function(&decl);
        assert_eq!(symbol, "_KF1f1asi321bsi1_Rsi16");
        assert_eq!(demangle(&symbol), Some(Demangled::Function(decl)));
    }

    #[test]
    fn rejects_foreign_and_malformed_symbols() {
        for symbol in [
            "printf",
            "",
            "_K",
            "_KX3foo_",
            "_KF3foo",
            "_KF9foo_",
            "_KF3foo_R",
            "_KF3foo_sv",
            "_KTsi",
            "_KTsi7",
            "_KTP0Tsv",
            "_KTP99999999999Tsv",
            "_KTP1TP1Tsv",
            "_KTtsb",
            "_KT0",
            "_KTsvsv",
            "_KCprintf",
        ] {
            assert_eq!(demangle(symbol), None, "{symbol:?}");
        }
    }

    #[test]
    fn inverts_the_mangler() {
        let point = DataType::custom("Point");
        let decls = vec![
            FuncDecl::new(
                "move",
                vec![
                    Param::labeled("by", "delta", DataType::Tuple(vec![DataType::double(); 2])),
                    Param::labeled("animated", "animated", DataType::Bool),
                ],
                DataType::Void,
            )
            .with_kind(FuncKind::Method(point.clone())),
            FuncDecl::new(
                "apply",
                vec![Param::new(
                    "callback",
                    DataType::function(vec![DataType::opaque_pointer()], DataType::int32()),
                )],
                DataType::float().pointer_to().pointer_to().pointer_to(),
            ),
            FuncDecl::new("ünïcode", vec![Param::new("ß", DataType::custom("Größe"))], DataType::Void),
        ];
        for decl in decls {
            let symbol = mangle_function(&decl);
            assert_eq!(demangle(&symbol), Some(Demangled::Function(decl.clone())), "{symbol}");
            let closure = mangle_closure(&decl);
            assert_eq!(demangle(&closure), Some(Demangled::Closure(decl)), "{closure}");
        }

        let ty = DataType::Tuple(vec![point, DataType::int8().pointer_to()]);
        assert_eq!(demangle(&mangle_type(&ty)), Some(Demangled::Type(ty)));
    }
}
