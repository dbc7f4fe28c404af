//! Core of calcxml: solves arithmetic expressions described in XML.
//!
//! Input documents are read as a stream of structural events
//! ([`XmlEventSource`]) and reduced by [`ExpressionReducer`] into one `f64`
//! per `expression` element. [`ResultWriter`] turns the results back into a
//! `simpleCalculator` document and [`schema`] validates documents against a
//! supported subset of XML Schema. [`Calculator`] ties these together for a
//! single input file.

pub mod calculator;
pub mod error;
pub mod event;
pub mod number;
pub mod operator;
pub mod reader;
pub mod reducer;
pub mod schema;
pub mod tree;
pub mod writer;

pub use calculator::{Calculator, CalculatorOptions, TracingObserver};
pub use error::{MalformedInputError, ReduceError, SolveError, StreamError, WriteError};
pub use event::{Attribute, Event, EventSource};
pub use operator::{BinaryOp, OperatorCode, OperatorTable, UnrecognizedOperator, division, mul, sub, sum};
pub use reader::XmlEventSource;
pub use reducer::{ExpressionReducer, NoopObserver, ReductionObserver};
pub use schema::{Schema, SchemaError, ValidationError, is_valid};
pub use tree::{XmlElement, XmlNode};
pub use writer::{ResultWriter, default_result_path};
