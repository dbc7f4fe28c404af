//! Minimal in-memory element tree built from an event stream.
//!
//! Used by the schema loader and the instance validator, which need random
//! access to children. The reducer never builds a tree.

use crate::error::StreamError;
use crate::event::{Attribute, Event};
use crate::reader::XmlEventSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Builds the tree of the document's root element.
    pub fn from_events<S>(events: S) -> Result<Self, StreamError>
    where
        S: IntoIterator<Item = Result<Event, StreamError>>,
    {
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        for event in events {
            match event? {
                Event::ElementStart { name, attributes } => {
                    stack.push(XmlElement { name, attributes, children: Vec::new() });
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Event::ElementEnd { name } => {
                    let element = stack.pop().ok_or_else(|| StreamError::Syntax {
                        position: 0,
                        message: format!("end of <{name}> without matching start"),
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => {
                            root.get_or_insert(element);
                        }
                    }
                }
            }
        }
        if let Some(open) = stack.last() {
            return Err(StreamError::Truncated { element: open.name.clone(), open: stack.len() });
        }
        root.ok_or(StreamError::Empty)
    }

    pub fn parse_str(xml: &str) -> Result<Self, StreamError> {
        Self::from_events(XmlEventSource::from_xml_str(xml))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    pub fn has_significant_text(&self) -> bool {
        self.children.iter().any(|node| matches!(node, XmlNode::Text(text) if !text.trim().is_empty()))
    }
}

// Deep documents would otherwise recurse once per nesting level on drop.
impl Drop for XmlElement {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let XmlNode::Element(mut element) = node {
                pending.append(&mut element.children);
            }
        }
    }
}
