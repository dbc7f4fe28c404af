use std::collections::{BTreeMap, HashMap};

use super::model::{AttributeDecl, ComplexType, Content, ElementDecl, Facet, MaxOccurs, Particle, SimpleType, Term, TypeDef};
use super::types::BuiltinType;
use super::{Schema, SchemaError, ValidationError};
use crate::tree::XmlElement;

const MAX_DERIVATION_DEPTH: usize = 32;

/// Content-model matching state: child position reached, mapped to the
/// declarations assigned to the children consumed so far.
type Frontier<'s> = BTreeMap<usize, Vec<&'s ElementDecl>>;

/// Element still to be checked, with its declaration and path.
type Pending<'d, 's> = (&'d XmlElement, &'s ElementDecl, String);

enum Resolved<'s> {
    Builtin(BuiltinType),
    Simple(&'s SimpleType),
    Complex(&'s ComplexType),
}

pub(super) struct Validator<'s> {
    schema: &'s Schema,
}

impl<'s> Validator<'s> {
    pub(super) fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Walks the document depth-first with an explicit work list, so nesting
    /// depth is bounded by memory rather than the call stack.
    pub(super) fn validate_document<'d>(&self, root: &'d XmlElement) -> Result<(), ValidationError> {
        let decl = self
            .schema
            .elements
            .get(&root.name)
            .ok_or_else(|| ValidationError::UnexpectedRoot { found: root.name.clone() })?;
        let mut pending: Vec<Pending<'d, 's>> = vec![(root, decl, format!("/{}", root.name))];
        while let Some((element, decl, path)) = pending.pop() {
            let children = self.validate_element(element, decl, &path)?;
            // reversed so that siblings are visited in document order
            pending.extend(children.into_iter().rev());
        }
        Ok(())
    }

    fn resolve(&self, type_def: &'s TypeDef) -> Option<Resolved<'s>> {
        match type_def {
            TypeDef::Builtin(builtin) => Some(Resolved::Builtin(*builtin)),
            TypeDef::Complex(def) => Some(Resolved::Complex(def)),
            TypeDef::Simple(def) => Some(Resolved::Simple(def)),
            TypeDef::Named(name) => self
                .schema
                .simple_types
                .get(name)
                .map(Resolved::Simple)
                .or_else(|| self.schema.complex_types.get(name).map(Resolved::Complex)),
        }
    }

    /// Checks one element and returns its children paired with the
    /// declarations they matched.
    fn validate_element<'d>(
        &self,
        element: &'d XmlElement,
        decl: &'s ElementDecl,
        path: &str,
    ) -> Result<Vec<Pending<'d, 's>>, ValidationError> {
        match self.resolve(&decl.type_def) {
            Some(Resolved::Builtin(BuiltinType::AnyType)) => Ok(Vec::new()),
            Some(Resolved::Complex(def)) => self.validate_complex(element, def, path),
            Some(Resolved::Builtin(_) | Resolved::Simple(_)) => {
                self.check_attributes(element, &[], path)?;
                self.validate_simple_content(element, &decl.type_def, path)?;
                Ok(Vec::new())
            }
            None => Err(unresolved(&decl.type_def)),
        }
    }

    fn validate_complex<'d>(
        &self,
        element: &'d XmlElement,
        def: &'s ComplexType,
        path: &str,
    ) -> Result<Vec<Pending<'d, 's>>, ValidationError> {
        self.check_attributes(element, &def.attributes, path)?;
        match &def.content {
            Content::Simple(base) => {
                self.validate_simple_content(element, base, path)?;
                Ok(Vec::new())
            }
            Content::Empty => {
                let children: Vec<&XmlElement> = element.child_elements().collect();
                if !children.is_empty() {
                    return Err(ValidationError::UnexpectedContent { path: path.to_owned(), found: names(&children) });
                }
                if !def.mixed && element.has_significant_text() {
                    return Err(ValidationError::UnexpectedText { path: path.to_owned() });
                }
                Ok(Vec::new())
            }
            Content::Elements(particle) => {
                if !def.mixed && element.has_significant_text() {
                    return Err(ValidationError::UnexpectedText { path: path.to_owned() });
                }
                let children: Vec<&'d XmlElement> = element.child_elements().collect();
                let decls = self.match_content(particle, &children).ok_or_else(|| {
                    ValidationError::UnexpectedContent { path: path.to_owned(), found: names(&children) }
                })?;

                let mut ordinals: HashMap<&str, usize> = HashMap::new();
                Ok(children
                    .into_iter()
                    .zip(decls)
                    .map(|(child, decl)| {
                        let ordinal = ordinals.entry(child.name.as_str()).or_insert(0);
                        *ordinal += 1;
                        (child, decl, format!("{path}/{}[{ordinal}]", child.name))
                    })
                    .collect())
            }
        }
    }

    fn validate_simple_content(
        &self,
        element: &XmlElement,
        type_def: &'s TypeDef,
        path: &str,
    ) -> Result<(), ValidationError> {
        if element.child_elements().next().is_some() {
            return Err(ValidationError::UnexpectedChildren { path: path.to_owned() });
        }
        let value = element.text();
        self.check_value(type_def, &value, 0).map_err(|reason| ValidationError::InvalidValue {
            path: path.to_owned(),
            value: value.trim().to_owned(),
            reason,
        })
    }

    fn check_attributes(
        &self,
        element: &XmlElement,
        decls: &'s [AttributeDecl],
        path: &str,
    ) -> Result<(), ValidationError> {
        for attribute in element.attributes.iter().filter(|a| !is_reserved_attribute(&a.name)) {
            let decl = decls.iter().find(|d| d.name == attribute.name).ok_or_else(|| {
                ValidationError::UndeclaredAttribute { path: path.to_owned(), attribute: attribute.name.clone() }
            })?;
            self.check_value(&decl.type_def, &attribute.value, 0).map_err(|reason| {
                ValidationError::InvalidValue {
                    path: format!("{path}/@{}", attribute.name),
                    value: attribute.value.clone(),
                    reason,
                }
            })?;
        }
        if let Some(missing) = decls.iter().find(|d| d.required && element.attribute(&d.name).is_none()) {
            return Err(ValidationError::MissingAttribute { path: path.to_owned(), attribute: missing.name.clone() });
        }
        Ok(())
    }

    /// Checks `value` against a simple type, following restriction bases
    /// down to the built-in type that defines its lexical space.
    fn check_value(&self, type_def: &'s TypeDef, value: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err("type derivation is too deep".to_owned());
        }
        match self.resolve(type_def) {
            Some(Resolved::Builtin(builtin)) => builtin.check(&builtin.normalize(value)),
            Some(Resolved::Simple(def)) => {
                self.check_value(&def.base, value, depth + 1)?;
                let primitive = self.primitive(&def.base, depth + 1)?;
                let lexical = primitive.normalize(value);
                def.facets.iter().try_for_each(|facet| check_facet(facet, primitive, &lexical))
            }
            Some(Resolved::Complex(_)) => Err("a complex type cannot describe a simple value".to_owned()),
            None => Err(unresolved(type_def).to_string()),
        }
    }

    fn primitive(&self, type_def: &'s TypeDef, depth: usize) -> Result<BuiltinType, String> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err("type derivation is too deep".to_owned());
        }
        match self.resolve(type_def) {
            Some(Resolved::Builtin(builtin)) => Ok(builtin),
            Some(Resolved::Simple(def)) => self.primitive(&def.base, depth + 1),
            Some(Resolved::Complex(_)) => Err("a complex type cannot describe a simple value".to_owned()),
            None => Err(unresolved(type_def).to_string()),
        }
    }

    /// Assigns a declaration to every child, or `None` when the children
    /// cannot be produced by the content model.
    fn match_content(&self, particle: &'s Particle, children: &[&XmlElement]) -> Option<Vec<&'s ElementDecl>> {
        let start = Frontier::from([(0, Vec::new())]);
        self.match_particle(particle, children, start).remove(&children.len())
    }

    fn match_particle(&self, particle: &'s Particle, children: &[&XmlElement], from: Frontier<'s>) -> Frontier<'s> {
        let min = particle.occurs.min;
        // every useful repetition consumes a child, so one more than the
        // number of children is enough for an unbounded particle
        let limit = match particle.occurs.max {
            MaxOccurs::Bounded(max) => max,
            MaxOccurs::Unbounded => u32::try_from(children.len()).unwrap_or(u32::MAX).saturating_add(1).max(min),
        };

        let mut reached = Frontier::new();
        if min == 0 {
            merge(&mut reached, from.clone());
        }
        let mut current = from;
        for count in 1..=limit {
            current = self.match_term(&particle.term, children, &current);
            if current.is_empty() {
                break;
            }
            if count >= min {
                merge(&mut reached, current.clone());
            }
        }
        reached
    }

    fn match_term(&self, term: &'s Term, children: &[&XmlElement], from: &Frontier<'s>) -> Frontier<'s> {
        match term {
            Term::Element(decl) => step(decl, children, from),
            Term::Ref(name) => self.schema.elements.get(name).map(|decl| step(decl, children, from)).unwrap_or_default(),
            Term::Sequence(items) => {
                let mut current = from.clone();
                for item in items {
                    if current.is_empty() {
                        break;
                    }
                    current = self.match_particle(item, children, current);
                }
                current
            }
            Term::Choice(items) => {
                let mut reached = Frontier::new();
                for item in items {
                    merge(&mut reached, self.match_particle(item, children, from.clone()));
                }
                reached
            }
        }
    }
}

fn step<'s>(decl: &'s ElementDecl, children: &[&XmlElement], from: &Frontier<'s>) -> Frontier<'s> {
    from.iter()
        .filter(|(position, _)| children.get(**position).is_some_and(|child| child.name == decl.name))
        .map(|(position, assigned)| {
            let mut assigned = assigned.clone();
            assigned.push(decl);
            (position + 1, assigned)
        })
        .collect()
}

fn merge<'s>(target: &mut Frontier<'s>, other: Frontier<'s>) {
    for (position, assigned) in other {
        target.entry(position).or_insert(assigned);
    }
}

fn check_facet(facet: &Facet, primitive: BuiltinType, lexical: &str) -> Result<(), String> {
    let numeric = || {
        primitive
            .numeric_value(lexical)
            .ok_or_else(|| format!("range facet on non-numeric type xs:{}", primitive.name()))
    };
    let length = || lexical.chars().count();
    match facet {
        Facet::Enumeration(values) => {
            if values.iter().any(|v| primitive.normalize(v) == lexical) {
                Ok(())
            } else {
                Err(format!("not one of [{}]", values.join(", ")))
            }
        }
        Facet::MinInclusive(limit) => bound(numeric()? >= *limit, || format!("must be >= {limit}")),
        Facet::MaxInclusive(limit) => bound(numeric()? <= *limit, || format!("must be <= {limit}")),
        Facet::MinExclusive(limit) => bound(numeric()? > *limit, || format!("must be > {limit}")),
        Facet::MaxExclusive(limit) => bound(numeric()? < *limit, || format!("must be < {limit}")),
        Facet::Length(expected) => bound(length() == *expected, || format!("length must be {expected}")),
        Facet::MinLength(min) => bound(length() >= *min, || format!("length must be at least {min}")),
        Facet::MaxLength(max) => bound(length() <= *max, || format!("length must be at most {max}")),
    }
}

fn bound(ok: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if ok { Ok(()) } else { Err(reason()) }
}

fn unresolved(type_def: &TypeDef) -> ValidationError {
    let name = match type_def {
        TypeDef::Named(name) => name.clone(),
        TypeDef::Builtin(builtin) => builtin.name().to_owned(),
        TypeDef::Complex(_) | TypeDef::Simple(_) => "<anonymous>".to_owned(),
    };
    ValidationError::Schema(SchemaError::UnresolvedType { name })
}

fn names(children: &[&XmlElement]) -> Vec<String> {
    children.iter().map(|c| c.name.clone()).collect()
}

fn is_reserved_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:") || name.starts_with("xsi:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn schema() -> Schema {
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="list">
               <xs:complexType>
                 <xs:sequence>
                   <xs:element name="head" type="xs:string" minOccurs="0"/>
                   <xs:choice maxOccurs="unbounded">
                     <xs:element name="n" type="percent"/>
                     <xs:element ref="list"/>
                   </xs:choice>
                   <xs:element name="tail" type="code" minOccurs="0" maxOccurs="2"/>
                 </xs:sequence>
                 <xs:attribute name="mode" use="required">
                   <xs:simpleType>
                     <xs:restriction base="xs:token">
                       <xs:enumeration value="fast"/>
                       <xs:enumeration value="slow"/>
                     </xs:restriction>
                   </xs:simpleType>
                 </xs:attribute>
                 <xs:attribute name="weight" type="xs:double"/>
               </xs:complexType>
             </xs:element>
             <xs:simpleType name="percent">
               <xs:restriction base="xs:decimal">
                 <xs:minInclusive value="0"/>
                 <xs:maxInclusive value="100"/>
               </xs:restriction>
             </xs:simpleType>
             <xs:simpleType name="code">
               <xs:restriction base="xs:string">
                 <xs:length value="3"/>
               </xs:restriction>
             </xs:simpleType>
           </xs:schema>"#
            .parse()
            .unwrap()
    }

    fn validate(schema: &Schema, xml: &str) -> Result<(), ValidationError> {
        Validator::new(schema).validate_document(&XmlElement::parse_str(xml).unwrap())
    }

    #[rstest]
    #[case(r#"<list mode="fast"><n>1</n></list>"#)]
    #[case(r#"<list mode=" slow " weight="2.5"><head>h</head><n>0</n><n>100</n><tail>abc</tail><tail>xyz</tail></list>"#)]
    #[case(r#"<list mode="fast"><n> 50.5 </n><list mode="slow"><n>3</n></list></list>"#)]
    #[case(r#"<list xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="x.xsd" mode="fast"><n>1</n></list>"#)]
    fn accepts_conforming_documents(schema: Schema, #[case] xml: &str) {
        validate(&schema, xml).unwrap();
    }

    #[rstest]
    #[case(r#"<other/>"#, "not declared by the schema")]
    #[case(r#"<list mode="fast"/>"#, "do not match the content model")]
    #[case(r#"<list mode="fast"><tail>abc</tail><n>1</n></list>"#, "do not match the content model")]
    #[case(r#"<list mode="fast"><n>1</n><tail>abc</tail><tail>abc</tail><tail>abc</tail></list>"#, "do not match")]
    #[case(r#"<list><n>1</n></list>"#, "missing required attribute 'mode'")]
    #[case(r#"<list mode="medium"><n>1</n></list>"#, "not one of [fast, slow]")]
    #[case(r#"<list mode="fast" extra="1"><n>1</n></list>"#, "attribute 'extra' is not declared")]
    #[case(r#"<list mode="fast" weight="heavy"><n>1</n></list>"#, "not a valid xs:double")]
    #[case(r#"<list mode="fast"><n>101</n></list>"#, "/list/n[1]: invalid value '101': must be <= 100")]
    #[case(r#"<list mode="fast"><n>1</n><n>x</n></list>"#, "/list/n[2]: invalid value 'x'")]
    #[case(r#"<list mode="fast"><n>1</n><tail>ab</tail></list>"#, "length must be 3")]
    #[case(r#"<list mode="fast">stray<n>1</n></list>"#, "text is not allowed")]
    #[case(r#"<list mode="fast"><n><b/></n></list>"#, "must not contain child elements")]
    #[case(r#"<list mode="fast"><list mode="bad"><n>1</n></list></list>"#, "/list/list[1]/@mode")]
    fn reports_first_violation(schema: Schema, #[case] xml: &str, #[case] message: &str) {
        let err = validate(&schema, xml).unwrap_err();
        assert!(err.to_string().contains(message), "'{err}' should mention '{message}'");
    }

    #[rstest]
    fn many_optional_repetitions_stay_polynomial() {
        let schema: Schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
               <xs:element name="r"><xs:complexType>
                 <xs:sequence maxOccurs="unbounded">
                   <xs:element name="a" minOccurs="0" maxOccurs="unbounded"/>
                   <xs:element name="a" minOccurs="0" maxOccurs="unbounded"/>
                 </xs:sequence>
               </xs:complexType></xs:element>
             </xs:schema>"#
            .parse()
            .unwrap();
        let xml = format!("<r>{}</r>", "<a/>".repeat(200));
        validate(&schema, &xml).unwrap();
        let bad = format!("<r>{}<b/></r>", "<a/>".repeat(200));
        assert!(validate(&schema, &bad).is_err());
    }

    #[rstest]
    fn simple_content_extension_checks_text_and_attributes() {
        let schema: Schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
               <xs:element name="price"><xs:complexType><xs:simpleContent>
                 <xs:extension base="xs:double"><xs:attribute name="currency" type="xs:string" use="required"/></xs:extension>
               </xs:simpleContent></xs:complexType></xs:element>
             </xs:schema>"#
            .parse()
            .unwrap();
        validate(&schema, r#"<price currency="EUR">9.5</price>"#).unwrap();
        assert!(matches!(
            validate(&schema, r#"<price currency="EUR">cheap</price>"#),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(validate(&schema, "<price>1</price>"), Err(ValidationError::MissingAttribute { .. })));
    }

    #[rstest]
    fn cyclic_restriction_is_reported_not_followed_forever() {
        let schema: Schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
               <xs:simpleType name="a"><xs:restriction base="b"/></xs:simpleType>
               <xs:simpleType name="b"><xs:restriction base="a"/></xs:simpleType>
               <xs:element name="v" type="a"/>
             </xs:schema>"#
            .parse()
            .unwrap();
        let err = validate(&schema, "<v>1</v>").unwrap_err();
        assert!(err.to_string().contains("too deep"), "{err}");
    }
}
