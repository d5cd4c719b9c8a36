//! Go type model and the type-system capability interface.
//!
//! The resolver never touches syntax trees. It sees the package only through
//! [`TypeSystem`]: name lookup, structural shape via [`TypeSystem::underlying`],
//! and struct field lists. [`PackageTypes`] is the in-memory implementation
//! filled by the source extractor, and the one tests build by hand.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound on named-type hops while looking for an underlying type.
const MAX_NAMED_DEPTH: usize = 64;

/// Go's predeclared basic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl BasicKind {
    /// Maps a predeclared identifier to its kind. `byte` and `rune` are aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => BasicKind::Bool,
            "string" => BasicKind::String,
            "int" => BasicKind::Int,
            "int8" => BasicKind::Int8,
            "int16" => BasicKind::Int16,
            "int32" | "rune" => BasicKind::Int32,
            "int64" => BasicKind::Int64,
            "uint" => BasicKind::Uint,
            "uint8" | "byte" => BasicKind::Uint8,
            "uint16" => BasicKind::Uint16,
            "uint32" => BasicKind::Uint32,
            "uint64" => BasicKind::Uint64,
            "uintptr" => BasicKind::Uintptr,
            "float32" => BasicKind::Float32,
            "float64" => BasicKind::Float64,
            "complex64" => BasicKind::Complex64,
            "complex128" => BasicKind::Complex128,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
        }
    }
}

/// A Go type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    Basic(BasicKind),
    /// A declared type. `package` holds the import path for qualified names
    /// and is `None` for types of the package being processed.
    Named {
        package: Option<String>,
        name: String,
        args: Vec<GoType>,
    },
    /// A type parameter of the enclosing generic declaration
    TypeParam(String),
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array { len: String, elem: Box<GoType> },
    Map { key: Box<GoType>, value: Box<GoType> },
    /// An anonymous struct literal type
    Struct(Vec<StructField>),
    /// Any interface type, including `any` and `error`
    Interface,
    /// Function, channel and other types with no JSON shape
    Other(String),
}

impl GoType {
    /// A named type of the current package without type arguments.
    pub fn named(name: &str) -> Self {
        GoType::Named {
            package: None,
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    /// A named type imported from `package`.
    pub fn qualified(package: &str, name: &str) -> Self {
        GoType::Named {
            package: Some(package.to_string()),
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn pointer(inner: GoType) -> Self {
        GoType::Pointer(Box::new(inner))
    }

    pub fn slice(elem: GoType) -> Self {
        GoType::Slice(Box::new(elem))
    }

    pub fn map(key: GoType, value: GoType) -> Self {
        GoType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Replaces type parameters named in `params` with the matching entry of `args`.
    pub fn substitute(&self, params: &[String], args: &[GoType]) -> GoType {
        if params.is_empty() || args.is_empty() {
            return self.clone();
        }
        match self {
            GoType::TypeParam(name) => params
                .iter()
                .position(|p| p == name)
                .and_then(|i| args.get(i))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            GoType::Named {
                package,
                name,
                args: inner,
            } => GoType::Named {
                package: package.clone(),
                name: name.clone(),
                args: inner.iter().map(|a| a.substitute(params, args)).collect(),
            },
            GoType::Pointer(inner) => GoType::pointer(inner.substitute(params, args)),
            GoType::Slice(elem) => GoType::slice(elem.substitute(params, args)),
            GoType::Array { len, elem } => GoType::Array {
                len: len.clone(),
                elem: Box::new(elem.substitute(params, args)),
            },
            GoType::Map { key, value } => {
                GoType::map(key.substitute(params, args), value.substitute(params, args))
            }
            GoType::Struct(fields) => GoType::Struct(
                fields
                    .iter()
                    .map(|f| StructField {
                        ty: f.ty.substitute(params, args),
                        ..f.clone()
                    })
                    .collect(),
            ),
            GoType::Basic(_) | GoType::Interface | GoType::Other(_) => self.clone(),
        }
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Basic(kind) => f.write_str(kind.name()),
            GoType::Named {
                package,
                name,
                args,
            } => {
                if let Some(package) = package {
                    write!(f, "{}.", package)?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                    write!(f, "[{}]", args.join(", "))?;
                }
                Ok(())
            }
            GoType::TypeParam(name) => f.write_str(name),
            GoType::Pointer(inner) => write!(f, "*{}", inner),
            GoType::Slice(elem) => write!(f, "[]{}", elem),
            GoType::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            GoType::Map { key, value } => write!(f, "map[{}]{}", key, value),
            GoType::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if !field.tag.is_empty() {
                        write!(f, " `{}`", field.tag)?;
                    }
                }
                f.write_str("}")
            }
            GoType::Interface => f.write_str("interface{}"),
            GoType::Other(text) => f.write_str(text),
        }
    }
}

/// One field of a struct type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub ty: GoType,
    /// Raw tag text without the surrounding quotes
    pub tag: String,
    pub embedded: bool,
}

impl StructField {
    pub fn new(name: &str, ty: GoType, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            tag: tag.to_string(),
            embedded: false,
        }
    }

    /// Exported fields start with an upper-case letter.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }

    /// Looks up `key` in the field's tag, e.g. `json` in `json:"id,omitempty"`.
    pub fn tag_value(&self, key: &str) -> Option<String> {
        lookup_tag(&self.tag, key)
    }
}

/// Looks up `key` in a conventional Go struct tag (`key:"value" other:"value"`).
///
/// Scanning stops at the first malformed pair, as Go's `reflect.StructTag` does.
pub fn lookup_tag(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() && bytes[i] > b' ' && bytes[i] != b':' && bytes[i] != b'"' && bytes[i] != 0x7f {
            i += 1;
        }
        if i == 0 || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            return None;
        }
        let name = &rest[..i];
        rest = &rest[i + 1..];

        let bytes = rest.as_bytes();
        let mut j = 1;
        while j < bytes.len() && bytes[j] != b'"' {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let quoted = &rest[1..j];
        rest = &rest[j + 1..];

        if name == key {
            return Some(unquote(quoted));
        }
    }
}

fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// A package-scope type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<String>,
    /// The declared type; for an alias, the aliased type
    pub ty: GoType,
    pub is_alias: bool,
}

impl TypeDecl {
    /// A defined type, `type Name T`.
    pub fn defined(name: &str, ty: GoType) -> Self {
        Self {
            name: name.to_string(),
            type_params: Vec::new(),
            ty,
            is_alias: false,
        }
    }

    /// An alias, `type Name = T`.
    pub fn alias(name: &str, ty: GoType) -> Self {
        Self {
            is_alias: true,
            ..Self::defined(name, ty)
        }
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// The declared type with `args` bound to the type parameters.
    pub fn instantiate(&self, args: &[GoType]) -> GoType {
        self.ty.substitute(&self.type_params, args)
    }
}

/// Read-only view of a package's types.
pub trait TypeSystem {
    /// Looks up a package-scope type declaration by name.
    fn lookup(&self, name: &str) -> Option<&TypeDecl>;

    /// Follows named types and aliases of this package down to a structural type.
    ///
    /// Generic instantiations are substituted on the way, so the underlying
    /// type of `Response[User]` is the struct of `Response` with `T` replaced
    /// by `User`.
    ///
    /// # Returns
    ///
    /// `None` for unknown names and for types imported from other packages,
    /// whose shape is not available.
    fn underlying(&self, ty: &GoType) -> Option<GoType> {
        let mut current = ty.clone();
        for _ in 0..MAX_NAMED_DEPTH {
            let next = match &current {
                GoType::Named {
                    package: None,
                    name,
                    args,
                } => self.lookup(name)?.instantiate(args),
                GoType::Named { .. } => return None,
                other => return Some(other.clone()),
            };
            current = next;
        }
        None
    }

    /// Returns the ordered field list of the named struct type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructNotFound`] if no type has this name, and
    /// [`Error::NotAStruct`] if the type exists but is not a struct.
    fn struct_fields(&self, name: &str) -> Result<Vec<StructField>> {
        if self.lookup(name).is_none() {
            return Err(Error::StructNotFound(name.to_string()));
        }
        match self.underlying(&GoType::named(name)) {
            Some(GoType::Struct(fields)) => Ok(fields),
            _ => Err(Error::NotAStruct(name.to_string())),
        }
    }
}

/// Type declarations of one package, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PackageTypes {
    decls: BTreeMap<String, TypeDecl>,
}

impl PackageTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: TypeDecl) {
        self.decls.insert(decl.name.clone(), decl);
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.values()
    }
}

impl FromIterator<TypeDecl> for PackageTypes {
    fn from_iter<I: IntoIterator<Item = TypeDecl>>(iter: I) -> Self {
        let mut types = PackageTypes::new();
        for decl in iter {
            types.insert(decl);
        }
        types
    }
}

impl TypeSystem for PackageTypes {
    fn lookup(&self, name: &str) -> Option<&TypeDecl> {
        self.decls.get(name)
    }
}
