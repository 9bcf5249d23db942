//! Declared static types of schema fields.
//!
//! A small closed algebra: primitives, `optional<T>`, `list<T>`, and the
//! distinguished `Untyped` marker for fields declared without a type.
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
    Path,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// No static annotation was given for the field.
    Untyped,
    Primitive(Primitive),
    Optional(Box<TypeExpr>),
    Sequence(Box<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeExprError {
    #[error("empty type expression")]
    Empty,
    #[error("unknown type `{0}`")]
    Unknown(String),
}

// `optional<...>` / `list<...>`; anchored, so the capture keeps nested wrappers whole
static WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(optional|list)\s*<\s*(.+?)\s*>$").expect("static regex")
});

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Str => "str",
            Primitive::Path => "path",
            Primitive::Any => "any",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Bool,
            "int" => Primitive::Int,
            "float" => Primitive::Float,
            "str" | "string" => Primitive::Str,
            "path" => Primitive::Path,
            "any" => Primitive::Any,
            _ => return None,
        })
    }
}

impl TypeExpr {
    pub const BOOL: TypeExpr = TypeExpr::Primitive(Primitive::Bool);
    pub const INT: TypeExpr = TypeExpr::Primitive(Primitive::Int);
    pub const FLOAT: TypeExpr = TypeExpr::Primitive(Primitive::Float);
    pub const STR: TypeExpr = TypeExpr::Primitive(Primitive::Str);
    pub const PATH: TypeExpr = TypeExpr::Primitive(Primitive::Path);
    pub const ANY: TypeExpr = TypeExpr::Primitive(Primitive::Any);

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn list(item: TypeExpr) -> Self {
        TypeExpr::Sequence(Box::new(item))
    }

    pub fn is_annotated(&self) -> bool {
        !matches!(self, TypeExpr::Untyped)
    }

    /// True when `null` is a valid value without any mode-dependent leniency.
    pub fn accepts_null(&self) -> bool {
        matches!(self, TypeExpr::Optional(_) | TypeExpr::Primitive(Primitive::Any))
    }
}

impl FromStr for TypeExpr {
    type Err = TypeExprError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let src = src.trim();
        if src.is_empty() {
            return Err(TypeExprError::Empty);
        }
        if let Some(caps) = WRAPPER.captures(src) {
            let inner = caps[2].parse::<TypeExpr>()?;
            return Ok(match &caps[1] {
                "optional" => TypeExpr::optional(inner),
                _ => TypeExpr::list(inner),
            });
        }
        Primitive::from_name(src)
            .map(TypeExpr::Primitive)
            .ok_or_else(|| TypeExprError::Unknown(src.to_string()))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Untyped => write!(f, "<untyped>"),
            TypeExpr::Primitive(p) => write!(f, "{}", p.name()),
            TypeExpr::Optional(inner) => write!(f, "optional<{inner}>"),
            TypeExpr::Sequence(item) => write!(f, "list<{item}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitives_and_wrappers() {
        assert_eq!("int".parse::<TypeExpr>().unwrap(), TypeExpr::INT);
        assert_eq!("string".parse::<TypeExpr>().unwrap(), TypeExpr::STR);
        assert_eq!(
            "optional<list<str>>".parse::<TypeExpr>().unwrap(),
            TypeExpr::optional(TypeExpr::list(TypeExpr::STR))
        );
        assert_eq!(
            " list< optional<int> > ".parse::<TypeExpr>().unwrap(),
            TypeExpr::list(TypeExpr::optional(TypeExpr::INT))
        );
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!("".parse::<TypeExpr>(), Err(TypeExprError::Empty));
        assert_eq!(
            "optional<complex>".parse::<TypeExpr>(),
            Err(TypeExprError::Unknown("complex".into()))
        );
        assert!("dict<str>".parse::<TypeExpr>().is_err());
    }

    #[test]
    fn display_is_parseable() {
        let ty = TypeExpr::optional(TypeExpr::list(TypeExpr::PATH));
        assert_eq!(ty.to_string(), "optional<list<path>>");
        assert_eq!(ty.to_string().parse::<TypeExpr>().unwrap(), ty);
    }

    #[test]
    fn untyped_is_not_annotated() {
        assert!(!TypeExpr::Untyped.is_annotated());
        assert!(TypeExpr::BOOL.is_annotated());
        assert!(TypeExpr::optional(TypeExpr::BOOL).accepts_null());
        assert!(!TypeExpr::BOOL.accepts_null());
    }
}
