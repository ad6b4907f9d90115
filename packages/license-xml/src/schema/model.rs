//! Compiled form of an XML Schema.
//!
//! A [`Schema`] is immutable once compiled and can be shared freely between
//! threads; validators only ever borrow it.

use std::collections::HashMap;

use regex::Regex;

pub(crate) const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub(crate) const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Builtin XSD datatypes the validator distinguishes.
///
/// String-like types (token, anyURI, NCName, date, ...) are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    String,
    Boolean,
    Integer,
    NonNegativeInteger,
    PositiveInteger,
    Decimal,
    AnySimpleType,
    AnyType,
}

impl Builtin {
    /// Map an XSD local type name to a builtin.
    #[must_use]
    pub fn from_local_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "string" | "normalizedString" | "token" | "anyURI" | "language" | "Name"
            | "NCName" | "NMTOKEN" | "NMTOKENS" | "ID" | "IDREF" | "IDREFS" | "QName"
            | "date" | "dateTime" | "time" | "duration" | "gYear" | "gYearMonth" | "base64Binary"
            | "hexBinary" => Self::String,
            "boolean" => Self::Boolean,
            "integer" | "int" | "long" | "short" | "byte" | "negativeInteger"
            | "nonPositiveInteger" => Self::Integer,
            "nonNegativeInteger" | "unsignedInt" | "unsignedLong" | "unsignedShort"
            | "unsignedByte" => Self::NonNegativeInteger,
            "positiveInteger" => Self::PositiveInteger,
            "decimal" | "double" | "float" => Self::Decimal,
            "anySimpleType" => Self::AnySimpleType,
            "anyType" => Self::AnyType,
            _ => return None,
        };
        Some(builtin)
    }

    /// Check a lexical value against this datatype.
    pub fn check(self, value: &str) -> Result<(), String> {
        let collapsed = value.trim();
        let ok = match self {
            Self::String | Self::AnySimpleType | Self::AnyType => true,
            Self::Boolean => matches!(collapsed, "true" | "false" | "1" | "0"),
            Self::Integer => collapsed.parse::<i64>().is_ok(),
            Self::NonNegativeInteger => collapsed.parse::<u64>().is_ok(),
            Self::PositiveInteger => collapsed.parse::<u64>().is_ok_and(|v| v > 0),
            Self::Decimal => collapsed.parse::<f64>().is_ok_and(f64::is_finite),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{value}' is not a valid value for '{}'", self.label()))
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::Decimal => "decimal",
            Self::AnySimpleType => "anySimpleType",
            Self::AnyType => "anyType",
        }
    }
}

/// Reference to a type definition.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Builtin(Builtin),
    /// A top-level named type, resolved lazily so types can be recursive.
    Named(String),
    /// Index into [`Schema::types`] of an anonymous type.
    Inline(usize),
}

/// Element declaration, global or local.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: String,
    pub type_ref: TypeRef,
}

/// Upper bound of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    pub(crate) fn reached(self, count: u32) -> bool {
        match self {
            Self::Bounded(max) => count >= max,
            Self::Unbounded => false,
        }
    }
}

/// A term with occurrence bounds.
#[derive(Debug, Clone)]
pub struct Particle {
    pub term: Term,
    pub min: u32,
    pub max: MaxOccurs,
}

impl Particle {
    pub(crate) fn once(term: Term) -> Self {
        Self {
            term,
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Term {
    Element(ElementDecl),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    All(Vec<Particle>),
    /// `xs:any` wildcard; matched elements are not validated further.
    Any,
}

#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub required: bool,
    pub fixed: Option<String>,
}

/// How a complex type derives from a named base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    pub mixed: bool,
    /// Element content; `None` means no child elements are allowed.
    pub content: Option<Particle>,
    /// Text-only content type (`xs:simpleContent`).
    pub simple_content: Option<TypeRef>,
    pub attributes: Vec<AttributeDecl>,
    pub any_attribute: bool,
    /// Named complex base still to be merged in.
    pub base: Option<(String, Derivation)>,
}

#[derive(Debug, Clone)]
pub struct SimpleType {
    pub base: TypeRef,
    pub enumeration: Vec<String>,
    pub patterns: Vec<Regex>,
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Simple(SimpleType),
    Complex(ComplexType),
}

/// A compiled XML Schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) target_namespace: Option<String>,
    pub(crate) qualified: bool,
    pub(crate) types: Vec<TypeDef>,
    pub(crate) named_types: HashMap<String, usize>,
    pub(crate) elements: HashMap<String, ElementDecl>,
}

/// A type reference resolved against a schema.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedType<'s> {
    Builtin(Builtin),
    Simple(&'s SimpleType),
    Complex(&'s ComplexType),
}

impl Schema {
    /// Namespace the schema's elements live in.
    #[must_use]
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Global element declaration by local name.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Names of all global element declarations.
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a type reference.
    ///
    /// Returns `None` for a dangling named reference; compilation rejects
    /// those, so this only happens for hand-built schemas.
    #[must_use]
    pub fn resolve(&self, type_ref: &TypeRef) -> Option<ResolvedType<'_>> {
        let index = match type_ref {
            TypeRef::Builtin(builtin) => return Some(ResolvedType::Builtin(*builtin)),
            TypeRef::Named(name) => *self.named_types.get(name)?,
            TypeRef::Inline(index) => *index,
        };
        match self.types.get(index)? {
            TypeDef::Simple(simple) => Some(ResolvedType::Simple(simple)),
            TypeDef::Complex(complex) => Some(ResolvedType::Complex(complex)),
        }
    }

    /// Check a simple value against a simple or builtin type.
    pub fn check_simple_value(&self, type_ref: &TypeRef, value: &str) -> Result<(), String> {
        self.check_simple_value_depth(type_ref, value, 0)
    }

    fn check_simple_value_depth(
        &self,
        type_ref: &TypeRef,
        value: &str,
        depth: usize,
    ) -> Result<(), String> {
        if depth > 32 {
            return Err("type derivation is too deep".to_string());
        }
        match self.resolve(type_ref) {
            Some(ResolvedType::Builtin(builtin)) => builtin.check(value),
            Some(ResolvedType::Simple(simple)) => {
                if !simple.enumeration.is_empty() && !simple.enumeration.iter().any(|e| e == value)
                {
                    return Err(format!(
                        "Value '{value}' is not facet-valid with respect to enumeration '[{}]'",
                        simple.enumeration.join(", ")
                    ));
                }
                if let Some(pattern) = simple.patterns.iter().find(|p| !p.is_match(value)) {
                    return Err(format!(
                        "Value '{value}' is not facet-valid with respect to pattern '{}'",
                        pattern.as_str()
                    ));
                }
                self.check_simple_value_depth(&simple.base, value, depth + 1)
            }
            Some(ResolvedType::Complex(complex)) => match &complex.simple_content {
                Some(inner) => self.check_simple_value_depth(inner, value, depth + 1),
                None => Err("a complex type cannot be used for a simple value".to_string()),
            },
            None => Err("reference to an undefined type".to_string()),
        }
    }
}
