//! Two-stack reducer turning an event stream into expression results.
//!
//! Operands are shifted onto a value stack as `arg` text arrives; every
//! closing `operation` reduces the two topmost values with the operator code
//! pushed when that operation opened, and every closing `expression` moves the
//! remaining value into the result sequence. Nesting in the document is the
//! only source of precedence.

use crate::error::{MalformedInputError, ReduceError, StreamError};
use crate::event::{Attribute, Event};
use crate::number::parse_double;
use crate::operator::{OperatorCode, OperatorTable};

pub const EXPRESSION: &str = "expression";
pub const OPERATION: &str = "operation";
pub const ARG: &str = "arg";

/// Attribute holding the operator code unless configured otherwise.
pub const DEFAULT_OPERATOR_ATTRIBUTE: &str = "OperationType";

/// Receives notifications about noteworthy steps of a reduction.
///
/// All methods default to no-ops; implementors pick what they care about.
pub trait ReductionObserver {
    fn expression_reduced(&self, _index: usize, _value: f64) {}
    fn operator_unrecognized(&self, _code: &str) {}
    fn division_by_zero(&self, _left: f64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReductionObserver for NoopObserver {}

pub struct ExpressionReducer<'o> {
    table: &'o OperatorTable,
    operator_attribute: String,
    observer: &'o dyn ReductionObserver,
}

impl Default for ExpressionReducer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionReducer<'static> {
    pub fn new() -> Self {
        Self {
            table: OperatorTable::global(),
            operator_attribute: DEFAULT_OPERATOR_ATTRIBUTE.to_owned(),
            observer: &NoopObserver,
        }
    }
}

impl<'o> ExpressionReducer<'o> {
    #[must_use]
    pub fn with_operator_attribute(mut self, name: impl Into<String>) -> Self {
        self.operator_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_observer<'n>(self, observer: &'n dyn ReductionObserver) -> ExpressionReducer<'n>
    where
        'o: 'n,
    {
        ExpressionReducer { table: self.table, operator_attribute: self.operator_attribute, observer }
    }

    pub fn operator_attribute(&self) -> &str {
        &self.operator_attribute
    }

    /// Consumes `events` and returns one result per `expression` element.
    ///
    /// A failing event source aborts the reduction; the results completed up
    /// to that point travel inside [`ReduceError::Stream`].
    pub fn reduce<S>(&self, events: S) -> Result<Vec<f64>, ReduceError>
    where
        S: IntoIterator<Item = Result<Event, StreamError>>,
    {
        let mut state = Reduction::default();
        for event in events {
            match event {
                Ok(event) => self.step(&mut state, event)?,
                Err(source) => {
                    return Err(ReduceError::Stream { source, partial: state.results });
                }
            }
        }
        Ok(state.results)
    }

    fn step(&self, state: &mut Reduction, event: Event) -> Result<(), MalformedInputError> {
        match event {
            Event::ElementStart { name, attributes } => {
                if name == OPERATION {
                    state.operators.push(self.operator_code(&attributes));
                }
                state.current = name;
            }
            Event::Text(content) => {
                let text = content.trim();
                if !text.is_empty() && state.current == ARG {
                    let value = parse_double(text)
                        .ok_or_else(|| MalformedInputError::InvalidNumber { text: text.to_owned() })?;
                    state.values.push(value);
                }
            }
            Event::ElementEnd { name } => match name.as_str() {
                EXPRESSION => {
                    let index = state.results.len();
                    let value =
                        state.values.pop().ok_or(MalformedInputError::EmptyExpression { index })?;
                    self.observer.expression_reduced(index, value);
                    state.results.push(value);
                }
                OPERATION => {
                    let available = state.values.len();
                    let (Some(right), Some(left)) = (state.values.pop(), state.values.pop()) else {
                        return Err(MalformedInputError::MissingOperand { available });
                    };
                    let code = state.operators.pop().ok_or(MalformedInputError::MissingOperator)?;
                    state.values.push(self.apply(&code, left, right));
                }
                _ => {}
            },
        }
        Ok(())
    }

    fn operator_code(&self, attributes: &[Attribute]) -> String {
        attributes
            .iter()
            .find(|a| a.name == self.operator_attribute)
            .or_else(|| attributes.first())
            .map(|a| a.value.clone())
            .unwrap_or_default()
    }

    fn apply(&self, code: &str, left: f64, right: f64) -> f64 {
        match code.parse::<OperatorCode>() {
            Ok(op) => {
                if op == OperatorCode::Div && right == 0.0 {
                    self.observer.division_by_zero(left);
                }
                self.table.get(op)(left, right)
            }
            Err(_) => {
                self.observer.operator_unrecognized(code);
                f64::NAN
            }
        }
    }
}

#[derive(Debug, Default)]
struct Reduction {
    operators: Vec<String>,
    values: Vec<f64>,
    results: Vec<f64>,
    current: String,
}
