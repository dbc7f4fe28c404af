//! Calculator bound to a single input document.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{SolveError, WriteError};
use crate::reader::XmlEventSource;
use crate::reducer::{DEFAULT_OPERATOR_ATTRIBUTE, ExpressionReducer, ReductionObserver};
use crate::schema::{self, Schema, ValidationError};
use crate::writer::{DEFAULT_INDENT, ResultWriter, default_result_path};

/// Reports reduction anomalies through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReductionObserver for TracingObserver {
    fn expression_reduced(&self, index: usize, value: f64) {
        tracing::trace!(index, value, "expression reduced");
    }

    fn operator_unrecognized(&self, code: &str) {
        tracing::warn!(code, "unrecognized operator, result is NaN");
    }

    fn division_by_zero(&self, left: f64) {
        tracing::warn!(left, "division by zero, result is NaN");
    }
}

#[derive(Clone)]
pub struct CalculatorOptions {
    pub operator_attribute: String,
    pub indent: usize,
    pub observer: Arc<dyn ReductionObserver + Send + Sync>,
}

impl Default for CalculatorOptions {
    fn default() -> Self {
        Self {
            operator_attribute: DEFAULT_OPERATOR_ATTRIBUTE.to_owned(),
            indent: DEFAULT_INDENT,
            observer: Arc::new(TracingObserver),
        }
    }
}

impl fmt::Debug for CalculatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorOptions")
            .field("operator_attribute", &self.operator_attribute)
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

impl CalculatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_operator_attribute(mut self, name: impl Into<String>) -> Self {
        self.operator_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ReductionObserver + Send + Sync>) -> Self {
        self.observer = observer;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Calculator {
    input: PathBuf,
    options: CalculatorOptions,
}

impl Calculator {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self::with_options(input, CalculatorOptions::default())
    }

    pub fn with_options(input: impl Into<PathBuf>, options: CalculatorOptions) -> Self {
        Self { input: input.into(), options }
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn options(&self) -> &CalculatorOptions {
        &self.options
    }

    /// Reduces every expression of the input document, in document order.
    pub fn solve(&self) -> Result<Vec<f64>, SolveError> {
        let source = XmlEventSource::from_path(&self.input)
            .map_err(|source| SolveError::Open { path: self.input.clone(), source })?;
        let results = self.reducer().reduce(source)?;
        tracing::debug!(input = %self.input.display(), count = results.len(), "document solved");
        Ok(results)
    }

    /// Like [`solve`](Self::solve) for an in-memory document.
    pub fn solve_str(&self, xml: &str) -> Result<Vec<f64>, SolveError> {
        Ok(self.reducer().reduce(XmlEventSource::from_xml_str(xml))?)
    }

    /// Validates the input document against the XSD at `schema_path`.
    /// Failures of any kind count as invalid and are logged.
    pub fn is_valid(&self, schema_path: impl AsRef<Path>) -> bool {
        schema::is_valid(&self.input, schema_path)
    }

    pub fn validate(&self, schema: &Schema) -> Result<(), ValidationError> {
        schema.validate_path(&self.input)
    }

    /// Writes `results` next to the input document and returns the path used.
    pub fn write_results(&self, results: &[f64]) -> Result<PathBuf, WriteError> {
        let path = default_result_path(&self.input);
        self.write_results_to(results, &path)?;
        Ok(path)
    }

    pub fn write_results_to(&self, results: &[f64], path: impl AsRef<Path>) -> Result<(), WriteError> {
        self.writer().write_to_path(results, path.as_ref())
    }

    pub fn render_results(&self, results: &[f64]) -> Result<String, WriteError> {
        self.writer().render(results)
    }

    fn reducer(&self) -> ExpressionReducer<'_> {
        ExpressionReducer::new()
            .with_operator_attribute(self.options.operator_attribute.as_str())
            .with_observer(self.options.observer.as_ref())
    }

    fn writer(&self) -> ResultWriter {
        ResultWriter::new().with_indent(self.options.indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl ReductionObserver for Collect {
        fn operator_unrecognized(&self, code: &str) {
            self.0.lock().unwrap().push(format!("unknown {code}"));
        }

        fn division_by_zero(&self, left: f64) {
            self.0.lock().unwrap().push(format!("div0 {left}"));
        }
    }

    const DOC: &str = r#"<simpleCalculator><expressions>
        <expression><operation op="DIV"><arg>5</arg><arg>0</arg></operation></expression>
        <expression><operation op="POW"><arg>2</arg><arg>3</arg></operation></expression>
        <expression><operation op="MUL"><arg>2</arg><arg>3</arg></operation></expression>
    </expressions></simpleCalculator>"#;

    #[rstest]
    fn options_reach_the_reducer_and_observer() {
        let observer = Arc::new(Collect::default());
        let options = CalculatorOptions::new().with_operator_attribute("op").with_observer(observer.clone());
        let calc = Calculator::with_options("unused.xml", options);

        let results = calc.solve_str(DOC).unwrap();
        assert!(results[0].is_nan());
        assert!(results[1].is_nan());
        assert_eq!(results[2], 6.0);
        assert_eq!(*observer.0.lock().unwrap(), vec!["div0 5".to_owned(), "unknown POW".to_owned()]);
    }

    #[rstest]
    fn missing_input_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let calc = Calculator::new(dir.path().join("absent.xml"));
        assert!(matches!(calc.solve(), Err(SolveError::Open { .. })));
    }

    #[rstest]
    fn writes_next_to_the_input_with_configured_indent() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("numbers.xml");
        std::fs::write(&input, "<simpleCalculator><expressions><expression><arg>2</arg></expression></expressions></simpleCalculator>").unwrap();
        let calc = Calculator::with_options(&input, CalculatorOptions::new().with_indent(0));

        let results = calc.solve().unwrap();
        let path = calc.write_results(&results).unwrap();

        assert_eq!(path, dir.path().join("numbersResult.xml"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<expressionResult><result>2.0</result></expressionResult>"));
        assert_eq!(written, calc.render_results(&results).unwrap());
    }

    #[rstest]
    fn debug_output_hides_the_observer() {
        let rendered = format!("{:?}", CalculatorOptions::default());
        assert!(rendered.contains("OperationType"));
        assert!(rendered.ends_with(".. }"));
    }
}
