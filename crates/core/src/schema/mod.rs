//! Validation of XML documents against a subset of XML Schema 1.0.
//!
//! [`Schema`] is loaded from an XSD document and checks [`XmlElement`] trees.
//! Constructs outside the subset make loading fail, so [`is_valid`] never
//! reports a document as valid against a schema it could not fully understand.

mod error;
mod loader;
mod model;
mod types;
mod validator;

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub use error::{SchemaError, ValidationError};
pub use loader::XSD_NAMESPACE;
pub use model::{
    AttributeDecl, ComplexType, Content, ElementDecl, Facet, MaxOccurs, Occurs, Particle, SimpleType, Term, TypeDef,
};
pub use types::BuiltinType;

use crate::reader::XmlEventSource;
use crate::tree::XmlElement;
use validator::Validator;

/// XSD describing both calculator input documents and result documents.
pub const CALCULATOR_XSD: &str = include_str!("../../resources/Calculator.xsd");

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) elements: HashMap<String, ElementDecl>,
    pub(crate) complex_types: HashMap<String, ComplexType>,
    pub(crate) simple_types: HashMap<String, SimpleType>,
}

impl Schema {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = XmlEventSource::from_path(path)
            .map_err(|source| SchemaError::Open { path: path.to_path_buf(), source })?;
        let root = XmlElement::from_events(source)?;
        Self::from_element(&root)
    }

    pub fn from_element(root: &XmlElement) -> Result<Self, SchemaError> {
        loader::load(root)
    }

    /// The bundled [`CALCULATOR_XSD`].
    pub fn calculator() -> Result<Self, SchemaError> {
        CALCULATOR_XSD.parse()
    }

    /// Global element declaration, i.e. an allowed document root.
    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    pub fn complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types.get(name)
    }

    pub fn simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_types.get(name)
    }

    /// Reports the first violation found in document order.
    pub fn validate(&self, document: &XmlElement) -> Result<(), ValidationError> {
        Validator::new(self).validate_document(document)
    }

    pub fn validate_str(&self, xml: &str) -> Result<(), ValidationError> {
        let root = XmlElement::parse_str(xml)?;
        self.validate(&root)
    }

    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let path = path.as_ref();
        let source = XmlEventSource::from_path(path)
            .map_err(|source| ValidationError::Open { path: path.to_path_buf(), source })?;
        let root = XmlElement::from_events(source)?;
        self.validate(&root)
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(xsd: &str) -> Result<Self, Self::Err> {
        let root = XmlElement::parse_str(xsd)?;
        Self::from_element(&root)
    }
}

/// Validates `document` against the schema at `schema`.
///
/// Any failure, including an unreadable or unsupported schema, counts as
/// invalid and is logged.
pub fn is_valid(document: impl AsRef<Path>, schema: impl AsRef<Path>) -> bool {
    let document = document.as_ref();
    let schema = schema.as_ref();
    let outcome = Schema::from_path(schema)
        .map_err(ValidationError::from)
        .and_then(|schema| schema.validate_path(document));
    log_outcome(document, schema, outcome)
}

pub(crate) fn log_outcome(document: &Path, schema: &Path, outcome: Result<(), ValidationError>) -> bool {
    match outcome {
        Ok(()) => {
            tracing::info!(document = %document.display(), schema = %schema.display(), "XML is valid");
            true
        }
        Err(error) => {
            tracing::error!(%error, document = %document.display(), schema = %schema.display(), "XML is not valid");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn bundled_schema_loads() {
        let schema = Schema::calculator().unwrap();
        assert!(schema.element("simpleCalculator").is_some());
    }

    #[rstest]
    fn bundled_schema_accepts_input_and_result_shapes() {
        let schema = Schema::calculator().unwrap();
        schema
            .validate_str(
                r#"<simpleCalculator><expressions><expression>
                     <operation OperationType="DIV"><arg>1</arg><operation OperationType="SUM"><arg>2</arg><arg>3</arg></operation></operation>
                   </expression><expression><arg>4.5</arg></expression></expressions></simpleCalculator>"#,
            )
            .unwrap();
        schema
            .validate_str(&crate::writer::ResultWriter::new().render(&[1.0, f64::NAN, f64::INFINITY]).unwrap())
            .unwrap();
    }

    #[rstest]
    #[case(r#"<simpleCalculator><expressions><expression><operation><arg>1</arg><arg>2</arg></operation></expression></expressions></simpleCalculator>"#)]
    #[case(r#"<simpleCalculator><expressions><expression><operation OperationType="POW"><arg>1</arg><arg>2</arg></operation></expression></expressions></simpleCalculator>"#)]
    #[case(r#"<simpleCalculator><expressions><expression><operation OperationType="SUM"><arg>1</arg></operation></expression></expressions></simpleCalculator>"#)]
    #[case(r#"<simpleCalculator><expressions><arg>1</arg></expressions></simpleCalculator>"#)]
    #[case(r#"<simpleCalculator><expressions><expression><arg>one</arg></expression></expressions></simpleCalculator>"#)]
    fn bundled_schema_rejects_bad_input(#[case] xml: &str) {
        assert!(Schema::calculator().unwrap().validate_str(xml).is_err());
    }

    #[rstest]
    fn is_valid_fails_closed_on_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("doc.xml");
        std::fs::write(&document, "<a/>").unwrap();
        assert!(!is_valid(&document, dir.path().join("missing.xsd")));
        assert!(!is_valid(dir.path().join("missing.xml"), &document));
    }

    fn nested_operations(depth: usize) -> String {
        let mut xml = String::from("<simpleCalculator><expressions><expression>");
        for _ in 0..depth {
            xml.push_str(r#"<operation OperationType="SUM"><arg>1</arg>"#);
        }
        xml.push_str("<arg>1</arg>");
        xml.push_str(&"</operation>".repeat(depth));
        xml.push_str("</expression></expressions></simpleCalculator>");
        xml
    }

    #[rstest]
    #[case(1_000)]
    #[case(5_000)]
    fn deeply_nested_document_is_validated(#[case] depth: usize) {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("deep.xml");
        let schema = dir.path().join("Calculator.xsd");
        std::fs::write(&document, nested_operations(depth)).unwrap();
        std::fs::write(&schema, CALCULATOR_XSD).unwrap();

        assert!(is_valid(&document, &schema));
        let results = crate::Calculator::new(&document).solve().unwrap();
        assert_eq!(results, vec![(depth + 1) as f64]);
    }

    #[rstest]
    fn deep_violation_is_reported_not_fatal() {
        let xml = nested_operations(5_000).replacen("<arg>1</arg></operation>", "</operation>", 1);
        let err = Schema::calculator().unwrap().validate_str(&xml).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedContent { .. }), "{err}");
    }
}
