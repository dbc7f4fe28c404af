use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::StreamError;

/// The schema document could not be turned into a [`Schema`](super::Schema).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot open schema '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("schema is not well-formed XML: {0}")]
    Document(#[from] StreamError),

    #[error("root element <{root}> is not an XML Schema <schema>")]
    NotASchema { root: String },

    #[error("unsupported schema construct <{construct}>")]
    Unsupported { construct: String },

    #[error("<{element}> requires attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: &'static str },

    #[error("<{element}> has invalid {attribute}='{value}'")]
    InvalidAttribute { element: String, attribute: &'static str, value: String },

    #[error("duplicate global {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("reference to undefined type '{name}'")]
    UnresolvedType { name: String },

    #[error("reference to undefined element '{name}'")]
    UnresolvedElement { name: String },

    #[error("type '{name}' cannot be used here: {reason}")]
    MisusedType { name: String, reason: &'static str },
}

/// A document failed validation, or could not be read for validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot open document '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("document is not well-formed XML: {0}")]
    Document(#[from] StreamError),

    #[error("root element <{found}> is not declared by the schema")]
    UnexpectedRoot { found: String },

    #[error("{path}: children [{}] do not match the content model", .found.join(", "))]
    UnexpectedContent { path: String, found: Vec<String> },

    #[error("{path}: element with simple content must not contain child elements")]
    UnexpectedChildren { path: String },

    #[error("{path}: text is not allowed in element-only content")]
    UnexpectedText { path: String },

    #[error("{path}: missing required attribute '{attribute}'")]
    MissingAttribute { path: String, attribute: String },

    #[error("{path}: attribute '{attribute}' is not declared")]
    UndeclaredAttribute { path: String, attribute: String },

    #[error("{path}: invalid value '{value}': {reason}")]
    InvalidValue { path: String, value: String, reason: String },
}
