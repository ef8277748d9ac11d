//! XML document replay
//!
//! The validators are driven by start tags, attributes, text and end tags
//! in document order. This module reads an XML text with `quick-xml` and
//! records that stream with names already resolved against the in-scope
//! namespace declarations.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};

/// One step of the replayed stream
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// A start tag (or the start half of an empty element)
    Start {
        /// Resolved element name
        name: QName,
        /// Attributes other than namespace declarations, in document order
        attributes: Vec<(QName, String)>,
        /// Namespace declarations in scope for this element
        namespaces: Arc<NamespaceContext>,
        /// 1-based line of the tag
        line: u32,
        /// 1-based column of the tag
        column: u32,
    },
    /// An end tag, with the element's own text content
    End {
        /// Resolved element name
        name: QName,
        /// Concatenated character data directly inside the element
        text: String,
        /// Namespace declarations in scope for this element
        namespaces: Arc<NamespaceContext>,
    },
}

struct OpenElement {
    name: QName,
    text: String,
    namespaces: Arc<NamespaceContext>,
}

/// A replayed XML document
#[derive(Debug, Clone, Default)]
pub struct Document {
    events: Vec<DocumentEvent>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        // Character content is kept verbatim; typed values apply their own
        // whitespace facet.
        let mut reader = Reader::from_reader(xml);

        let mut events = Vec::new();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let offset = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let (line, column) = line_column(xml, offset);
                    let open = Self::start_element(&e, &stack, line, column, &mut events)?;
                    stack.push(open);
                }
                Ok(Event::Empty(e)) => {
                    let (line, column) = line_column(xml, offset);
                    let open = Self::start_element(&e, &stack, line, column, &mut events)?;
                    events.push(DocumentEvent::End {
                        name: open.name,
                        text: open.text,
                        namespaces: open.namespaces,
                    });
                }
                Ok(Event::End(_)) => {
                    let open = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unexpected end tag".to_string()))?;
                    events.push(DocumentEvent::End {
                        name: open.name,
                        text: open.text,
                        namespaces: open.namespaces,
                    });
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let bytes = e.into_inner();
                        let text = std::str::from_utf8(&bytes)
                            .map_err(|e| Error::Xml(format!("Invalid CDATA: {}", e)))?;
                        current.text.push_str(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // comments, processing instructions, doctype
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(Error::Xml(format!("element '{}' is not closed", open.name)));
        }
        Ok(Self { events })
    }

    fn start_element(
        start: &BytesStart,
        stack: &[OpenElement],
        line: u32,
        column: u32,
        events: &mut Vec<DocumentEvent>,
    ) -> Result<OpenElement> {
        let inherited = stack
            .last()
            .map(|open| Arc::clone(&open.namespaces))
            .unwrap_or_default();

        let mut declared: Option<NamespaceContext> = None;
        let mut raw_attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                declared
                    .get_or_insert_with(|| (*inherited).clone())
                    .set_default_namespace(attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                declared
                    .get_or_insert_with(|| (*inherited).clone())
                    .add_prefix(prefix, attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }
        let namespaces = declared.map(Arc::new).unwrap_or(inherited);

        let name_bytes = start.name();
        let raw_name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;
        let name = namespaces.resolve(raw_name)?;

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (raw, value) in raw_attributes {
            // unprefixed attributes are never in the default namespace
            let qname = match raw.split_once(':') {
                Some(_) => namespaces.resolve(&raw)?,
                None => QName::local(raw),
            };
            attributes.push((qname, value));
        }

        events.push(DocumentEvent::Start {
            name: name.clone(),
            attributes,
            namespaces: Arc::clone(&namespaces),
            line,
            column,
        });
        Ok(OpenElement {
            name,
            text: String::new(),
            namespaces,
        })
    }

    /// The replayed events
    pub fn events(&self) -> &[DocumentEvent] {
        &self.events
    }

    /// Number of elements in the document
    pub fn element_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, DocumentEvent::Start { .. }))
            .count()
    }
}

/// Line and column of the first markup at or after `offset`
fn line_column(xml: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(xml.len());
    let start = xml[offset..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(offset, |skip| offset + skip);

    let before = &xml[..start];
    let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
    (line, (start - line_start) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts(doc: &Document) -> Vec<String> {
        doc.events()
            .iter()
            .filter_map(|event| match event {
                DocumentEvent::Start { name, .. } => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_simple_xml() {
        let doc = Document::from_string("<root><child>text</child><empty/></root>").unwrap();
        assert_eq!(doc.element_count(), 3);
        assert_eq!(doc.events().len(), 6);

        match &doc.events()[2] {
            DocumentEvent::End { name, text, .. } => {
                assert_eq!(name.local_name, "child");
                assert_eq!(text, "text");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_text_whitespace_is_preserved() {
        let doc = Document::from_string("<root><v>  x </v><w>\n</w></root>").unwrap();
        let texts: Vec<&str> = doc
            .events()
            .iter()
            .filter_map(|event| match event {
                DocumentEvent::End { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["  x ", "\n", ""]);
    }

    #[test]
    fn test_namespace_resolution() {
        let xml = r#"<root xmlns="urn:a" xmlns:b="urn:b"><b:child b:id="1" id="2"/><inner xmlns="urn:c"/></root>"#;
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(starts(&doc), vec!["{urn:a}root", "{urn:b}child", "{urn:c}inner"]);

        match &doc.events()[1] {
            DocumentEvent::Start { attributes, .. } => {
                assert_eq!(attributes[0].0, QName::namespaced("urn:b", "id"));
                assert_eq!(attributes[1].0, QName::local("id"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_positions() {
        let doc = Document::from_string("<root>\n  <a/>\n  <b/>\n</root>").unwrap();
        let positions: Vec<(u32, u32)> = doc
            .events()
            .iter()
            .filter_map(|event| match event {
                DocumentEvent::Start { line, column, .. } => Some((*line, *column)),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![(1, 1), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Document::from_string("<a><b></a>"), Err(Error::Xml(_))));
        assert!(matches!(Document::from_string("<p:a/>"), Err(Error::Namespace(_))));
        assert!(Document::from_string("<a>").is_err());
    }
}
