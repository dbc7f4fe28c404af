//! Resolved representation of the supported XSD subset.

use super::types::BuiltinType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Occurs {
    pub const ONCE: Occurs = Occurs { min: 1, max: MaxOccurs::Bounded(1) };
}

impl Default for Occurs {
    fn default() -> Self {
        Self::ONCE
    }
}

/// Type reference of an element, attribute or restriction base.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Builtin(BuiltinType),
    /// Global `complexType` or `simpleType` defined in the schema.
    Named(String),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub name: String,
    pub type_def: TypeDef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Element(ElementDecl),
    /// `<element ref="..."/>` pointing at a global element.
    Ref(String),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub term: Term,
    pub occurs: Occurs,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    #[default]
    Empty,
    Elements(Particle),
    Simple(TypeDef),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexType {
    pub content: Content,
    pub attributes: Vec<AttributeDecl>,
    pub mixed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: String,
    pub type_def: TypeDef,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    pub base: TypeDef,
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    Enumeration(Vec<String>),
    MinInclusive(f64),
    MaxInclusive(f64),
    MinExclusive(f64),
    MaxExclusive(f64),
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
}
