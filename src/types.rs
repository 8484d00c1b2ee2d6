//! The Indigo type model.
//!
//! A [`Type`] is a closed sum over every type shape the language has. Types
//! are plain trees; the only back-edges are [`DeclId`] indices into the
//! [`Decls`] arena, which is how a named type reaches its declaration
//! (aliased type + method set) without owning it. Canonical-string equality
//! (the `Display` form) is the primary equality operation for unnamed types;
//! a named type renders as its bare name, which also keeps recursive
//! declarations from looping the formatter.

use core::fmt;

use la_arena::{Arena, Idx};
use smallvec::SmallVec;

/// Index of a type declaration inside [`Decls`].
pub type DeclId = Idx<TypeDecl>;

/// Short type lists (function args/results, tuple members) stay inline.
pub type TypeList = SmallVec<[Type; 2]>;

/// Primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Bool,
    Int,
    Float64,
    Complex128,
    String,
    Byte,
    Rune,
}

impl SimpleKind {
    pub const fn name(self) -> &'static str {
        match self {
            SimpleKind::Bool => "bool",
            SimpleKind::Int => "int",
            SimpleKind::Float64 => "float64",
            SimpleKind::Complex128 => "complex128",
            SimpleKind::String => "string",
            SimpleKind::Byte => "byte",
            SimpleKind::Rune => "rune",
        }
    }
}

/// Channel directionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Discriminant of a [`Type`], for quick shape dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Unknown,
    Simple,
    Pointer,
    Slice,
    Array,
    Map,
    Chan,
    Func,
    Struct,
    Interface,
    Tuple,
    Custom,
}

/// A function signature: ordered argument types and ordered result types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub args: TypeList,
    pub results: TypeList,
}

/// One method of a named type or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub sig: FuncType,
    /// Methods declared on `*T` rather than `T`. They only count towards
    /// interface satisfaction when the checked value is itself a pointer.
    pub ptr_receiver: bool,
}

/// A struct shape: ordered named members plus the struct's own method set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructType {
    pub members: Vec<(String, Type)>,
    pub methods: Vec<Method>,
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&Type> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// An interface shape: a set of required method signatures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IfaceType {
    pub methods: Vec<Method>,
}

impl IfaceType {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// The closed set of Indigo types.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Unification placeholder. Never survives a successful negotiation.
    Unknown,
    Simple(SimpleKind),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    /// `size == 0` is permitted, for the empty literal.
    Array { size: usize, elem: Box<Type> },
    Map { key: Box<Type>, value: Box<Type> },
    Chan { dir: ChanDir, elem: Box<Type> },
    Func(Box<FuncType>),
    Struct(StructType),
    Interface(IfaceType),
    /// Only produced for multi-result calls and the two-value
    /// receive/assert/index forms; never a declared type.
    Tuple(Box<TypeList>),
    /// A named type: the declaration carries the aliased type and methods.
    Custom { name: String, decl: DeclId },
}

impl Type {
    pub fn kind(&self) -> Kind {
        match self {
            Type::Unknown => Kind::Unknown,
            Type::Simple(_) => Kind::Simple,
            Type::Pointer(_) => Kind::Pointer,
            Type::Slice(_) => Kind::Slice,
            Type::Array { .. } => Kind::Array,
            Type::Map { .. } => Kind::Map,
            Type::Chan { .. } => Kind::Chan,
            Type::Func(_) => Kind::Func,
            Type::Struct(_) => Kind::Struct,
            Type::Interface(_) => Kind::Interface,
            Type::Tuple(_) => Kind::Tuple,
            Type::Custom { .. } => Kind::Custom,
        }
    }

    /// A type is known when no component of it is [`Type::Unknown`].
    pub fn known(&self) -> bool {
        match self {
            Type::Unknown => false,
            Type::Simple(_) | Type::Custom { .. } => true,
            Type::Pointer(t) | Type::Slice(t) => t.known(),
            Type::Array { elem, .. } => elem.known(),
            Type::Map { key, value } => key.known() && value.known(),
            Type::Chan { elem, .. } => elem.known(),
            Type::Func(sig) => {
                sig.args.iter().all(Type::known) && sig.results.iter().all(Type::known)
            }
            Type::Struct(s) => s.members.iter().all(|(_, t)| t.known()),
            Type::Interface(_) => true,
            Type::Tuple(members) => members.iter().all(Type::known),
        }
    }

    pub fn pointer(to: Type) -> Type {
        Type::Pointer(Box::new(to))
    }

    pub fn slice(of: Type) -> Type {
        Type::Slice(Box::new(of))
    }

    pub fn chan(dir: ChanDir, elem: Type) -> Type {
        Type::Chan { dir, elem: Box::new(elem) }
    }

    /// The implicit `(value, bool)` shape of the two-value forms.
    pub fn pair(first: Type, second: Type) -> Type {
        let mut members = TypeList::new();
        members.push(first);
        members.push(second);
        Type::Tuple(Box::new(members))
    }

    // The predicates below expect an already-rooted type; named types must
    // be unwrapped with `Decls::root` first.

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Simple(
                SimpleKind::Int
                    | SimpleKind::Float64
                    | SimpleKind::Complex128
                    | SimpleKind::Byte
                    | SimpleKind::Rune
            )
        )
    }

    pub fn is_float_kind(&self) -> bool {
        matches!(self, Type::Simple(SimpleKind::Float64))
    }

    pub fn is_complex_kind(&self) -> bool {
        matches!(self, Type::Simple(SimpleKind::Complex128))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Simple(SimpleKind::Int))
    }
}

/// `func(args) results` — also how function types print inside error
/// messages and method-set comparisons.
impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func")?;
        write_signature(f, self)
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, sig: &FuncType) -> fmt::Result {
    f.write_str("(")?;
    for (i, arg) in sig.args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")?;
    match sig.results.len() {
        0 => Ok(()),
        1 => write!(f, " {}", sig.results[0]),
        _ => {
            f.write_str(" (")?;
            for (i, res) in sig.results.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{res}")?;
            }
            f.write_str(")")
        }
    }
}

/// The canonical string form. Structural equality of unnamed types is
/// defined as equality of these strings.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown => f.write_str("<unknown>"),
            Type::Simple(kind) => f.write_str(kind.name()),
            Type::Pointer(to) => write!(f, "*{to}"),
            Type::Slice(of) => write!(f, "[]{of}"),
            Type::Array { size, elem } => write!(f, "[{size}]{elem}"),
            Type::Map { key, value } => write!(f, "map[{key}]{value}"),
            Type::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {elem}"),
                ChanDir::Send => write!(f, "chan<- {elem}"),
                ChanDir::Recv => write!(f, "<-chan {elem}"),
            },
            Type::Func(sig) => write!(f, "{sig}"),
            Type::Struct(s) => {
                f.write_str("struct {")?;
                for (i, (name, typ)) in s.members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{name} {typ}")?;
                }
                f.write_str("}")
            }
            Type::Interface(iface) => {
                // Method order must not matter for canonical equality.
                let mut names: Vec<&Method> = iface.methods.iter().collect();
                names.sort_by(|a, b| a.name.cmp(&b.name));
                f.write_str("interface {")?;
                for (i, m) in names.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", m.name)?;
                    write_signature(f, &m.sig)?;
                }
                f.write_str("}")
            }
            Type::Tuple(members) => {
                f.write_str("(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{m}")?;
                }
                f.write_str(")")
            }
            Type::Custom { name, .. } => f.write_str(name),
        }
    }
}

/// A type declaration: `type Name = aliased` plus the methods declared on
/// the name.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub aliased: Type,
    pub methods: Vec<Method>,
}

/// Arena of type declarations. Named types point back into it by index.
#[derive(Debug, Default)]
pub struct Decls {
    arena: Arena<TypeDecl>,
}

impl Decls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, decl: TypeDecl) -> DeclId {
        self.arena.alloc(decl)
    }

    pub fn get(&self, id: DeclId) -> &TypeDecl {
        &self.arena[id]
    }

    /// The named reference to a declaration.
    pub fn custom(&self, id: DeclId) -> Type {
        Type::Custom { name: self.arena[id].name.clone(), decl: id }
    }

    /// One unwrap of a named type's alias; anything else is itself.
    pub fn underlying<'t>(&'t self, t: &'t Type) -> &'t Type {
        match t {
            Type::Custom { decl, .. } => &self.arena[*decl].aliased,
            _ => t,
        }
    }

    /// Full transitive unwrap of named aliases.
    pub fn root<'t>(&'t self, t: &'t Type) -> &'t Type {
        let mut cur = t;
        while let Type::Custom { decl, .. } = cur {
            cur = &self.arena[*decl].aliased;
        }
        cur
    }

    /// Named types are `Custom` or `Simple`; everything else is unnamed.
    pub fn is_named(t: &Type) -> bool {
        matches!(t.kind(), Kind::Custom | Kind::Simple)
    }

    /// Works through named aliases of interfaces.
    pub fn is_interface(&self, t: &Type) -> bool {
        self.root(t).kind() == Kind::Interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(args: &[Type], results: &[Type]) -> FuncType {
        FuncType {
            args: args.iter().cloned().collect(),
            results: results.iter().cloned().collect(),
        }
    }

    #[test]
    fn canonical_strings() {
        let int = Type::Simple(SimpleKind::Int);
        assert_eq!(Type::slice(int.clone()).to_string(), "[]int");
        assert_eq!(Type::pointer(Type::slice(int.clone())).to_string(), "*[]int");
        assert_eq!(
            Type::Map {
                key: Box::new(Type::Simple(SimpleKind::String)),
                value: Box::new(int.clone()),
            }
            .to_string(),
            "map[string]int"
        );
        assert_eq!(Type::chan(ChanDir::Recv, int.clone()).to_string(), "<-chan int");
        assert_eq!(Type::chan(ChanDir::Send, int.clone()).to_string(), "chan<- int");
        assert_eq!(
            Type::Func(Box::new(sig(&[int.clone()], &[int.clone(), Type::Simple(SimpleKind::Bool)])))
                .to_string(),
            "func(int) (int, bool)"
        );
        assert_eq!(Type::Array { size: 3, elem: Box::new(int) }.to_string(), "[3]int");
    }

    #[test]
    fn interface_canonical_form_ignores_method_order() {
        let a = Type::Interface(IfaceType {
            methods: vec![
                Method { name: "b".into(), sig: sig(&[], &[]), ptr_receiver: false },
                Method { name: "a".into(), sig: sig(&[], &[]), ptr_receiver: false },
            ],
        });
        let b = Type::Interface(IfaceType {
            methods: vec![
                Method { name: "a".into(), sig: sig(&[], &[]), ptr_receiver: false },
                Method { name: "b".into(), sig: sig(&[], &[]), ptr_receiver: false },
            ],
        });
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn knownness_is_recursive() {
        assert!(!Type::Unknown.known());
        assert!(!Type::slice(Type::Unknown).known());
        assert!(!Type::pair(Type::Simple(SimpleKind::Int), Type::Unknown).known());
        assert!(Type::slice(Type::Simple(SimpleKind::Int)).known());
        assert!(Type::Interface(IfaceType::default()).known());
    }

    #[test]
    fn root_unwraps_alias_chains() {
        let mut decls = Decls::new();
        let base = decls.declare(TypeDecl {
            name: "Celsius".into(),
            aliased: Type::Simple(SimpleKind::Int),
            methods: vec![],
        });
        let alias = decls.declare(TypeDecl {
            name: "Temp".into(),
            aliased: decls.custom(base),
            methods: vec![],
        });

        let named = decls.custom(alias);
        assert_eq!(decls.underlying(&named).to_string(), "Celsius");
        assert_eq!(decls.root(&named), &Type::Simple(SimpleKind::Int));
        assert!(Decls::is_named(&named));
        assert!(!Decls::is_named(&Type::slice(Type::Simple(SimpleKind::Int))));
    }
}
