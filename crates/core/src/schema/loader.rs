//! Turns an XSD document tree into a [`Schema`].
//!
//! Anything outside the supported subset is rejected with
//! [`SchemaError::Unsupported`] so that validation fails closed instead of
//! silently accepting documents the schema would forbid.

use std::collections::HashSet;
use std::collections::hash_map::Entry;

use super::model::{
    AttributeDecl, ComplexType, Content, ElementDecl, Facet, MaxOccurs, Occurs, Particle, SimpleType, Term,
    TypeDef,
};
use super::types::BuiltinType;
use super::{Schema, SchemaError};
use crate::number::parse_double;
use crate::tree::XmlElement;

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

pub(super) fn load(root: &XmlElement) -> Result<Schema, SchemaError> {
    if root.name != "schema" {
        return Err(SchemaError::NotASchema { root: root.name.clone() });
    }
    allow_attributes(root, &["id", "version", "elementFormDefault", "attributeFormDefault"])?;
    let loader = Loader::new(root);
    let mut schema = Schema::default();

    for child in root.child_elements() {
        match child.name.as_str() {
            "annotation" => {}
            "element" => {
                allow_attributes(child, &["id", "name", "type"])?;
                let decl = loader.element_decl(child)?;
                insert_unique(&mut schema.elements, "element", decl.name.clone(), decl)?;
            }
            "complexType" => {
                let name = required(child, "name")?;
                let def = loader.complex_type(child)?;
                insert_unique(&mut schema.complex_types, "complexType", name, def)?;
            }
            "simpleType" => {
                let name = required(child, "name")?;
                let def = loader.simple_type(child)?;
                insert_unique(&mut schema.simple_types, "simpleType", name, def)?;
            }
            other => return Err(unsupported(other)),
        }
    }

    verify(&schema)?;
    tracing::debug!(
        elements = schema.elements.len(),
        complex_types = schema.complex_types.len(),
        simple_types = schema.simple_types.len(),
        "schema loaded"
    );
    Ok(schema)
}

struct Loader {
    xsd_prefixes: HashSet<String>,
    default_is_xsd: bool,
}

impl Loader {
    fn new(root: &XmlElement) -> Self {
        let mut xsd_prefixes = HashSet::new();
        let mut default_is_xsd = false;
        for attr in root.attributes.iter().filter(|a| a.value == XSD_NAMESPACE) {
            match attr.name.strip_prefix("xmlns:") {
                Some(prefix) => {
                    xsd_prefixes.insert(prefix.to_owned());
                }
                None if attr.name == "xmlns" => default_is_xsd = true,
                None => {}
            }
        }
        Self { xsd_prefixes, default_is_xsd }
    }

    fn type_ref(&self, qname: &str) -> Result<TypeDef, SchemaError> {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qname),
        };
        let in_xsd_namespace = match prefix {
            Some(prefix) => self.xsd_prefixes.contains(prefix),
            None => self.default_is_xsd,
        };
        if in_xsd_namespace {
            if let Some(builtin) = BuiltinType::from_local_name(local) {
                return Ok(TypeDef::Builtin(builtin));
            }
            if prefix.is_some() {
                return Err(SchemaError::UnresolvedType { name: qname.to_owned() });
            }
        }
        Ok(TypeDef::Named(local.to_owned()))
    }

    fn element_decl(&self, element: &XmlElement) -> Result<ElementDecl, SchemaError> {
        let name = required(element, "name")?;
        let mut anonymous = None;
        for child in element.child_elements() {
            match child.name.as_str() {
                "annotation" => {}
                "complexType" => anonymous = Some(TypeDef::Complex(Box::new(self.complex_type(child)?))),
                "simpleType" => anonymous = Some(TypeDef::Simple(Box::new(self.simple_type(child)?))),
                other => return Err(unsupported(other)),
            }
        }
        let type_def = match (element.attribute("type"), anonymous) {
            (Some(type_name), None) => self.type_ref(type_name)?,
            (None, Some(def)) => def,
            (None, None) => TypeDef::Builtin(BuiltinType::AnyType),
            (Some(type_name), Some(_)) => {
                return Err(SchemaError::InvalidAttribute {
                    element: element.name.clone(),
                    attribute: "type",
                    value: type_name.to_owned(),
                });
            }
        };
        Ok(ElementDecl { name, type_def })
    }

    fn particle(&self, element: &XmlElement) -> Result<Particle, SchemaError> {
        let occurs = occurs(element)?;
        let term = match element.name.as_str() {
            "element" => match element.attribute("ref") {
                Some(reference) => {
                    allow_attributes(element, &["id", "ref", "minOccurs", "maxOccurs"])?;
                    Term::Ref(local_name(reference).to_owned())
                }
                None => {
                    allow_attributes(element, &["id", "name", "type", "minOccurs", "maxOccurs"])?;
                    Term::Element(self.element_decl(element)?)
                }
            },
            "sequence" | "choice" => {
                allow_attributes(element, &["id", "minOccurs", "maxOccurs"])?;
                let items = self.group_items(element)?;
                if element.name == "sequence" { Term::Sequence(items) } else { Term::Choice(items) }
            }
            other => return Err(unsupported(other)),
        };
        Ok(Particle { term, occurs })
    }

    fn group_items(&self, group: &XmlElement) -> Result<Vec<Particle>, SchemaError> {
        group.child_elements().filter(|c| c.name != "annotation").map(|c| self.particle(c)).collect()
    }

    fn complex_type(&self, element: &XmlElement) -> Result<ComplexType, SchemaError> {
        allow_attributes(element, &["id", "name", "mixed"])?;
        let mut def = ComplexType { mixed: boolean_attribute(element, "mixed")?, ..ComplexType::default() };
        for child in element.child_elements() {
            match child.name.as_str() {
                "annotation" => {}
                "sequence" | "choice" => {
                    if def.content != Content::Empty {
                        return Err(unsupported("complexType with several content models"));
                    }
                    def.content = Content::Elements(self.particle(child)?);
                }
                "attribute" => def.attributes.push(self.attribute_decl(child)?),
                "simpleContent" => {
                    if def.content != Content::Empty {
                        return Err(unsupported("complexType with several content models"));
                    }
                    def.content = self.simple_content(child, &mut def.attributes)?;
                }
                other => return Err(unsupported(other)),
            }
        }
        Ok(def)
    }

    fn simple_content(
        &self,
        element: &XmlElement,
        attributes: &mut Vec<AttributeDecl>,
    ) -> Result<Content, SchemaError> {
        let extension = element
            .child_elements()
            .find(|c| c.name != "annotation")
            .ok_or_else(|| unsupported("simpleContent without extension"))?;
        if extension.name != "extension" {
            return Err(unsupported(&format!("simpleContent/{}", extension.name)));
        }
        allow_attributes(element, &["id"])?;
        allow_attributes(extension, &["id", "base"])?;
        let base = self.type_ref(&required(extension, "base")?)?;
        for child in extension.child_elements() {
            match child.name.as_str() {
                "annotation" => {}
                "attribute" => attributes.push(self.attribute_decl(child)?),
                other => return Err(unsupported(other)),
            }
        }
        Ok(Content::Simple(base))
    }

    fn attribute_decl(&self, element: &XmlElement) -> Result<AttributeDecl, SchemaError> {
        if element.attribute("ref").is_some() {
            return Err(unsupported("attribute ref"));
        }
        allow_attributes(element, &["id", "name", "type", "use"])?;
        let name = required(element, "name")?;
        let anonymous = element
            .child_elements()
            .find(|c| c.name == "simpleType")
            .map(|c| self.simple_type(c))
            .transpose()?;
        let type_def = match (element.attribute("type"), anonymous) {
            (Some(type_name), None) => self.type_ref(type_name)?,
            (None, Some(def)) => TypeDef::Simple(Box::new(def)),
            (None, None) => TypeDef::Builtin(BuiltinType::AnySimpleType),
            (Some(type_name), Some(_)) => {
                return Err(SchemaError::InvalidAttribute {
                    element: element.name.clone(),
                    attribute: "type",
                    value: type_name.to_owned(),
                });
            }
        };
        let required = match element.attribute("use") {
            None | Some("optional") => false,
            Some("required") => true,
            Some("prohibited") => return Err(unsupported("prohibited attribute")),
            Some(other) => {
                return Err(SchemaError::InvalidAttribute {
                    element: element.name.clone(),
                    attribute: "use",
                    value: other.to_owned(),
                });
            }
        };
        Ok(AttributeDecl { name, type_def, required })
    }

    fn simple_type(&self, element: &XmlElement) -> Result<SimpleType, SchemaError> {
        let restriction = element
            .child_elements()
            .find(|c| c.name != "annotation")
            .ok_or_else(|| unsupported("empty simpleType"))?;
        if restriction.name != "restriction" {
            return Err(unsupported(&restriction.name));
        }
        allow_attributes(element, &["id", "name"])?;
        allow_attributes(restriction, &["id", "base"])?;

        let mut base = restriction.attribute("base").map(|b| self.type_ref(b)).transpose()?;
        let mut enumeration = Vec::new();
        let mut facets = Vec::new();
        for facet in restriction.child_elements() {
            if facet.name != "annotation" && facet.name != "simpleType" {
                allow_attributes(facet, &["id", "value", "fixed"])?;
            }
            match facet.name.as_str() {
                "annotation" => {}
                "simpleType" => base = Some(TypeDef::Simple(Box::new(self.simple_type(facet)?))),
                "enumeration" => enumeration.push(required(facet, "value")?),
                "minInclusive" => facets.push(Facet::MinInclusive(number_value(facet)?)),
                "maxInclusive" => facets.push(Facet::MaxInclusive(number_value(facet)?)),
                "minExclusive" => facets.push(Facet::MinExclusive(number_value(facet)?)),
                "maxExclusive" => facets.push(Facet::MaxExclusive(number_value(facet)?)),
                "length" => facets.push(Facet::Length(length_value(facet)?)),
                "minLength" => facets.push(Facet::MinLength(length_value(facet)?)),
                "maxLength" => facets.push(Facet::MaxLength(length_value(facet)?)),
                other => return Err(unsupported(other)),
            }
        }
        if !enumeration.is_empty() {
            facets.push(Facet::Enumeration(enumeration));
        }
        let base = base.ok_or(SchemaError::MissingAttribute {
            element: restriction.name.clone(),
            attribute: "base",
        })?;
        Ok(SimpleType { base, facets })
    }
}

fn required(element: &XmlElement, attribute: &'static str) -> Result<String, SchemaError> {
    element
        .attribute(attribute)
        .map(str::to_owned)
        .ok_or_else(|| SchemaError::MissingAttribute { element: element.name.clone(), attribute })
}

fn invalid(element: &XmlElement, attribute: &'static str, value: &str) -> SchemaError {
    SchemaError::InvalidAttribute { element: element.name.clone(), attribute, value: value.to_owned() }
}

fn occurs(element: &XmlElement) -> Result<Occurs, SchemaError> {
    let min = match element.attribute("minOccurs") {
        Some(text) => text.trim().parse::<u32>().map_err(|_| invalid(element, "minOccurs", text))?,
        None => 1,
    };
    let max = match element.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(text) => {
            let max = text.parse::<u32>().map_err(|_| invalid(element, "maxOccurs", text))?;
            if max < min {
                return Err(invalid(element, "maxOccurs", text));
            }
            MaxOccurs::Bounded(max)
        }
        None if min > 1 => return Err(invalid(element, "minOccurs", &min.to_string())),
        None => MaxOccurs::Bounded(1),
    };
    Ok(Occurs { min, max })
}

fn boolean_attribute(element: &XmlElement, attribute: &'static str) -> Result<bool, SchemaError> {
    match element.attribute(attribute).map(str::trim) {
        None | Some("false" | "0") => Ok(false),
        Some("true" | "1") => Ok(true),
        Some(other) => Err(invalid(element, attribute, other)),
    }
}

fn number_value(facet: &XmlElement) -> Result<f64, SchemaError> {
    let text = required(facet, "value")?;
    parse_double(text.trim()).ok_or_else(|| invalid(facet, "value", &text))
}

fn length_value(facet: &XmlElement) -> Result<usize, SchemaError> {
    let text = required(facet, "value")?;
    text.trim().parse::<usize>().map_err(|_| invalid(facet, "value", &text))
}

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

/// Rejects attributes that would change validation, such as `fixed`,
/// `default`, `nillable` or `targetNamespace`. Namespace declarations and
/// `xml:*` attributes are always allowed.
fn allow_attributes(element: &XmlElement, allowed: &[&str]) -> Result<(), SchemaError> {
    let unknown = element.attributes.iter().map(|a| a.name.as_str()).find(|name| {
        !(allowed.contains(name) || *name == "xmlns" || name.starts_with("xmlns:") || name.starts_with("xml:"))
    });
    match unknown {
        Some(name) => Err(unsupported(&format!("{}/@{name}", element.name))),
        None => Ok(()),
    }
}

fn unsupported(construct: &str) -> SchemaError {
    SchemaError::Unsupported { construct: construct.to_owned() }
}

fn insert_unique<V>(
    map: &mut std::collections::HashMap<String, V>,
    kind: &'static str,
    name: String,
    value: V,
) -> Result<(), SchemaError> {
    match map.entry(name) {
        Entry::Occupied(entry) => Err(SchemaError::Duplicate { kind, name: entry.key().clone() }),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Usage {
    Element,
    SimpleValue,
}

/// Checks that every type and element reference resolves and that simple
/// positions only use simple types. Named types are verified where they are
/// defined, which keeps recursive content models finite.
fn verify(schema: &Schema) -> Result<(), SchemaError> {
    for decl in schema.elements.values() {
        verify_type(schema, &decl.type_def, Usage::Element)?;
    }
    for def in schema.complex_types.values() {
        verify_complex(schema, def)?;
    }
    for def in schema.simple_types.values() {
        verify_type(schema, &def.base, Usage::SimpleValue)?;
    }
    Ok(())
}

fn verify_type(schema: &Schema, type_def: &TypeDef, usage: Usage) -> Result<(), SchemaError> {
    match type_def {
        TypeDef::Builtin(BuiltinType::AnyType) if usage == Usage::SimpleValue => {
            Err(SchemaError::MisusedType { name: "anyType".into(), reason: "a simple type is required" })
        }
        TypeDef::Builtin(_) => Ok(()),
        TypeDef::Named(name) => {
            if schema.simple_types.contains_key(name) {
                Ok(())
            } else if schema.complex_types.contains_key(name) {
                match usage {
                    Usage::Element => Ok(()),
                    Usage::SimpleValue => {
                        Err(SchemaError::MisusedType { name: name.clone(), reason: "a simple type is required" })
                    }
                }
            } else {
                Err(SchemaError::UnresolvedType { name: name.clone() })
            }
        }
        TypeDef::Complex(def) => verify_complex(schema, def),
        TypeDef::Simple(def) => verify_type(schema, &def.base, Usage::SimpleValue),
    }
}

fn verify_complex(schema: &Schema, def: &ComplexType) -> Result<(), SchemaError> {
    match &def.content {
        Content::Empty => {}
        Content::Elements(particle) => verify_particle(schema, particle)?,
        Content::Simple(base) => verify_type(schema, base, Usage::SimpleValue)?,
    }
    for attribute in &def.attributes {
        verify_type(schema, &attribute.type_def, Usage::SimpleValue)?;
    }
    Ok(())
}

fn verify_particle(schema: &Schema, particle: &Particle) -> Result<(), SchemaError> {
    match &particle.term {
        Term::Element(decl) => verify_type(schema, &decl.type_def, Usage::Element),
        Term::Ref(name) => {
            if schema.elements.contains_key(name) {
                Ok(())
            } else {
                Err(SchemaError::UnresolvedElement { name: name.clone() })
            }
        }
        Term::Sequence(items) | Term::Choice(items) => {
            items.iter().try_for_each(|item| verify_particle(schema, item))
        }
    }
}
