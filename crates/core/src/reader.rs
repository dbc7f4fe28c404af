//! quick-xml backed [`EventSource`](crate::event::EventSource).
//!
//! Element names are reported by local name (prefix stripped), attribute
//! names keep their prefix. Adjacent text, CDATA and entity references are
//! coalesced into a single [`Event::Text`]. Comments, processing instructions
//! and the XML declaration are skipped.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::error::StreamError;
use crate::event::{Attribute, Event};

pub struct XmlEventSource<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<String>,
    pending_text: Option<String>,
    queued: VecDeque<Event>,
    seen_root: bool,
    finished: bool,
}

impl XmlEventSource<BufReader<File>> {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<'a> XmlEventSource<&'a [u8]> {
    pub fn from_xml_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlEventSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::new(),
            open: Vec::new(),
            pending_text: None,
            queued: VecDeque::new(),
            seen_root: false,
            finished: false,
        }
    }

    /// Reads until the next structural event, text or end of input.
    fn read_raw(&mut self) -> Result<Raw, StreamError> {
        loop {
            self.buf.clear();
            let decoder = self.reader.decoder();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    let position = u64::try_from(self.reader.error_position()).unwrap_or(u64::MAX);
                    return Err(convert_error(err, position));
                }
            };
            let position = u64::try_from(self.reader.buffer_position()).unwrap_or(u64::MAX);
            let syntax = |err: quick_xml::Error| convert_error(err, position);

            return match event {
                XmlEvent::Start(start) => {
                    let (name, attributes) = element_parts(&start, decoder).map_err(syntax)?;
                    self.open.push(name.clone());
                    self.seen_root = true;
                    Ok(Raw::Start { name, attributes, empty: false })
                }
                XmlEvent::Empty(start) => {
                    let (name, attributes) = element_parts(&start, decoder).map_err(syntax)?;
                    self.seen_root = true;
                    Ok(Raw::Start { name, attributes, empty: true })
                }
                XmlEvent::End(end) => {
                    let name = decoder
                        .decode(end.local_name().as_ref())
                        .map_err(|e| syntax(e.into()))?
                        .into_owned();
                    self.open.pop();
                    Ok(Raw::End(name))
                }
                XmlEvent::Text(text) => {
                    let raw = decoder.decode(&text).map_err(|e| syntax(e.into()))?;
                    let text = unescape(&raw).map_err(|e| syntax(e.into()))?;
                    Ok(Raw::Text(text.into_owned()))
                }
                XmlEvent::CData(data) => {
                    let text = decoder.decode(&data).map_err(|e| syntax(e.into()))?;
                    Ok(Raw::Text(text.into_owned()))
                }
                XmlEvent::GeneralRef(reference) => {
                    let name = decoder.decode(&reference).map_err(|e| syntax(e.into()))?;
                    let resolved = resolve_reference(&name).ok_or_else(|| StreamError::Syntax {
                        position,
                        message: format!("unknown entity reference '&{name};'"),
                    })?;
                    Ok(Raw::Text(resolved))
                }
                XmlEvent::Eof => Ok(Raw::Eof),
                // comments, processing instructions, declaration, doctype
                _ => continue,
            };
        }
    }

    fn finish(&mut self) -> Option<Result<Event, StreamError>> {
        self.finished = true;
        if let Some(element) = self.open.last() {
            return Some(Err(StreamError::Truncated { element: element.clone(), open: self.open.len() }));
        }
        if !self.seen_root {
            return Some(Err(StreamError::Empty));
        }
        None
    }
}

enum Raw {
    Start { name: String, attributes: Vec<Attribute>, empty: bool },
    End(String),
    Text(String),
    Eof,
}

impl<R: BufRead> Iterator for XmlEventSource<R> {
    type Item = Result<Event, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queued.pop_front() {
            return Some(Ok(event));
        }
        if self.finished {
            return None;
        }
        loop {
            let structural = match self.read_raw() {
                Ok(Raw::Text(text)) => {
                    self.pending_text.get_or_insert_with(String::new).push_str(&text);
                    continue;
                }
                Ok(Raw::Start { name, attributes, empty }) => {
                    if empty {
                        self.queued.push_back(Event::ElementEnd { name: name.clone() });
                    }
                    Event::ElementStart { name, attributes }
                }
                Ok(Raw::End(name)) => Event::ElementEnd { name },
                Ok(Raw::Eof) => {
                    // Text after the root element is never significant.
                    self.pending_text = None;
                    return self.finish();
                }
                Err(err) => {
                    self.finished = true;
                    self.queued.clear();
                    return Some(Err(err));
                }
            };
            return match self.pending_text.take() {
                Some(text) => {
                    self.queued.push_front(structural);
                    Some(Ok(Event::Text(text)))
                }
                None => Some(Ok(structural)),
            };
        }
    }
}

fn element_parts(
    start: &BytesStart<'_>,
    decoder: Decoder,
) -> Result<(String, Vec<Attribute>), quick_xml::Error> {
    let name = decoder.decode(start.local_name().as_ref())?.into_owned();
    let attributes = start
        .attributes()
        .map(|attr| {
            let attr = attr?;
            let name = decoder.decode(attr.key.as_ref())?.into_owned();
            let value = attr.decode_and_unescape_value(decoder)?.into_owned();
            Ok(Attribute { name, value })
        })
        .collect::<Result<Vec<_>, quick_xml::Error>>()?;
    Ok((name, attributes))
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse::<u32>().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_owned)
}

fn convert_error(err: quick_xml::Error, position: u64) -> StreamError {
    match err {
        quick_xml::Error::Io(shared) => {
            let io = Arc::try_unwrap(shared)
                .unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string()));
            StreamError::from_io(io)
        }
        other => StreamError::Syntax { position, message: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn collect(xml: &str) -> Vec<Result<Event, StreamError>> {
        XmlEventSource::from_xml_str(xml).collect()
    }

    #[rstest]
    fn emits_start_text_end_in_order() {
        let events: Vec<Event> =
            collect(r#"<?xml version="1.0"?><a x="1"><!-- c --><b>2.5</b></a>"#)
                .into_iter()
                .collect::<Result<_, _>>()
                .unwrap();
        assert_eq!(
            events,
            vec![
                Event::start_with("a", vec![Attribute::new("x", "1")]),
                Event::start("b"),
                Event::text("2.5"),
                Event::end("b"),
                Event::end("a"),
            ]
        );
    }

    #[rstest]
    fn empty_elements_become_start_end_pairs() {
        let events: Vec<Event> = collect("<a><b/></a>").into_iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(events, vec![Event::start("a"), Event::start("b"), Event::end("b"), Event::end("a")]);
    }

    #[rstest]
    fn prefixes_are_stripped_from_element_names() {
        let events: Vec<Event> = collect(r#"<xs:schema xmlns:xs="urn:x"><xs:element/></xs:schema>"#)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events[0], Event::start_with("schema", vec![Attribute::new("xmlns:xs", "urn:x")]));
        assert_eq!(events[1], Event::start("element"));
    }

    #[rstest]
    fn text_pieces_are_coalesced() {
        let events: Vec<Event> = collect("<arg>1<![CDATA[2]]>&#51;&amp;</arg>")
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events[1], Event::text("123&"));
    }

    #[rstest]
    fn attribute_values_are_unescaped() {
        let events = collect(r#"<a v="&lt;x&gt;"/>"#);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.attribute("v"), Some("<x>"));
    }

    #[rstest]
    fn truncated_document_is_reported() {
        let events = collect("<a><b>1</b>");
        let last = events.last().unwrap();
        assert!(matches!(last, Err(StreamError::Truncated { element, open: 1 }) if element == "a"));
    }

    #[rstest]
    fn mismatched_end_tag_is_a_syntax_error() {
        let events = collect("<a><b></a>");
        assert!(events.iter().any(|e| matches!(e, Err(StreamError::Syntax { .. }))));
        // Nothing is produced after the error.
        assert!(events.last().unwrap().is_err());
    }

    #[rstest]
    fn empty_input_has_no_root() {
        let events = collect("  ");
        assert!(matches!(events.as_slice(), [Err(StreamError::Empty)]));
    }

    struct TimingOut;

    impl io::Read for TimingOut {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "slow source"))
        }
    }

    #[rstest]
    fn timeouts_map_to_timed_out() {
        let mut source = XmlEventSource::new(BufReader::new(TimingOut));
        assert!(matches!(source.next(), Some(Err(StreamError::TimedOut(_)))));
        assert!(source.next().is_none());
    }
}
