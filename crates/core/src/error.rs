//! Error types for reading, reducing and writing calculator documents.
//!
//! Arithmetic anomalies are not errors: division by zero and unknown operator
//! codes produce `NaN` and the reduction continues. Everything here aborts the
//! current document.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of the underlying event source.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("document ended inside <{element}> ({open} element(s) left open)")]
    Truncated { element: String, open: usize },

    #[error("document has no root element")]
    Empty,

    #[error("reading the document timed out")]
    TimedOut(#[source] io::Error),

    #[error("I/O error while reading the document: {0}")]
    Io(#[source] io::Error),
}

impl StreamError {
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => StreamError::TimedOut(err),
            _ => StreamError::Io(err),
        }
    }
}

/// Structurally valid XML whose arithmetic content cannot be reduced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedInputError {
    #[error("argument text '{text}' is not a floating-point literal")]
    InvalidNumber { text: String },

    #[error("operation needs two operands but only {available} value(s) are on the stack")]
    MissingOperand { available: usize },

    #[error("operation closed without an operator code")]
    MissingOperator,

    #[error("expression #{index} closed without a value")]
    EmptyExpression { index: usize },
}

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInputError),

    #[error("event stream failed after {} result(s): {source}", .partial.len())]
    Stream {
        #[source]
        source: StreamError,
        /// Results appended before the failure, in document order.
        partial: Vec<f64>,
    },
}

impl ReduceError {
    /// Results that were complete when the stream failed. Empty for malformed input.
    pub fn partial_results(&self) -> &[f64] {
        match self {
            ReduceError::Stream { partial, .. } => partial,
            ReduceError::MalformedInput(_) => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("cannot open input document '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create result document '{}': {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while writing results: {0}")]
    Io(#[from] io::Error),

    #[error("XML writer error: {0}")]
    Xml(#[from] quick_xml::Error),
}
