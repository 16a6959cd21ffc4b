//! Owned XML element tree.
//!
//! The importer works over a fully materialized tree rather than raw reader
//! events: the recursive BPMN walk needs parent context (current process,
//! current shape) and child lookahead (event definitions), which is awkward
//! to express against a streaming reader. Documents are diagram-sized, so
//! materializing is cheap.

use quick_xml::{Reader, events::Event};

use crate::error::XmlError;

/// A single XML element with its attributes, text content, and children.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    /// Qualified tag name as written in the document (prefix kept).
    pub tag: String,
    attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content of this element.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Look up an attribute by name, tolerating a namespace prefix on the
    /// attribute key.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| {
                key == name || key.rsplit(':').next().is_some_and(|local| local == name)
            })
            .map(|(_, value)| value.as_str())
    }

    /// Parse a byte buffer into an element tree.
    ///
    /// The document encoding is taken from the XML declaration (or BOM);
    /// comments and processing instructions are skipped.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(bytes);
        read_tree(&mut reader)
    }

    /// Parse a UTF-8 string into an element tree.
    pub fn parse_str(source: &str) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(source.as_bytes());
        read_tree(&mut reader)
    }
}

fn read_tree(reader: &mut Reader<&[u8]>) -> Result<Element, XmlError> {
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event()?;
        let decoder = reader.decoder();
        match event {
            Event::Start(start) => {
                stack.push(open_element(&start, decoder)?);
            }
            Event::Empty(start) => {
                // Treat <tag ... /> as start + immediate end.
                let element = open_element(&start, decoder)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = decoder
                        .decode(text.as_ref())
                        .map_err(quick_xml::Error::from)?;
                    let chunk =
                        quick_xml::escape::unescape(&raw).map_err(quick_xml::Error::from)?;
                    parent.text.push_str(chunk.trim());
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let chunk = decoder
                        .decode(cdata.as_ref())
                        .map_err(quick_xml::Error::from)?;
                    parent.text.push_str(chunk.trim());
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(XmlError::EmptyDocument)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    root.ok_or(XmlError::EmptyDocument)
}

fn open_element(
    start: &quick_xml::events::BytesStart<'_>,
    decoder: quick_xml::Decoder,
) -> Result<Element, XmlError> {
    let mut element = Element {
        tag: decoder
            .decode(start.name().as_ref())
            .map_err(quick_xml::Error::from)?
            .into_owned(),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr?;
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(quick_xml::Error::from)?
            .into_owned();
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            // Keep the first root; trailing siblings would be ill-formed XML
            // and quick-xml reports them before we get here.
            root.get_or_insert(element);
        }
    }
}
