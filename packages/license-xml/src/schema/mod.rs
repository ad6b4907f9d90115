//! License XML schema: loading, compilation and validation.
//!
//! The schema is an XSD document. It is compiled into a [`Schema`] once per
//! [`SchemaProvider`] and every document is validated against it before any
//! text is derived.

mod compile;
mod model;
mod provider;
mod validate;

pub use model::{
    AttributeDecl, Builtin, ComplexType, Derivation, ElementDecl, MaxOccurs, Particle,
    ResolvedType, Schema, SimpleType, Term, TypeRef,
};
pub use provider::{global_schema_provider, SchemaProvider, PACKAGED_SCHEMA};
pub use validate::Validator;
