//! Structural events consumed by the expression reducer.
//!
//! Events form a SAX-style stream: every `ElementStart` has a matching
//! `ElementEnd`, text arrives in between. Any producer of
//! `Result<Event, StreamError>` items can drive the reducer; the quick-xml
//! backed [`XmlEventSource`](crate::reader::XmlEventSource) is one of them.

use crate::error::StreamError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ElementStart { name: String, attributes: Vec<Attribute> },
    Text(String),
    ElementEnd { name: String },
}

impl Event {
    pub fn start(name: impl Into<String>) -> Self {
        Event::ElementStart { name: name.into(), attributes: Vec::new() }
    }

    pub fn start_with(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Event::ElementStart { name: name.into(), attributes }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Event::Text(content.into())
    }

    pub fn end(name: impl Into<String>) -> Self {
        Event::ElementEnd { name: name.into() }
    }

    /// Looks up an attribute of an `ElementStart` event by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Event::ElementStart { attributes, .. } => {
                attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
            }
            _ => None,
        }
    }
}

/// Pull-based producer of structural events.
///
/// Blanket-implemented for every iterator over `Result<Event, StreamError>`,
/// so plain vectors of events work as sources in tests.
pub trait EventSource: Iterator<Item = Result<Event, StreamError>> {}

impl<I> EventSource for I where I: Iterator<Item = Result<Event, StreamError>> {}
