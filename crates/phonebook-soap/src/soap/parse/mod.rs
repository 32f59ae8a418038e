//! `PhoneBookSearch` XML parsing.
//!
//! Both documents are read with a small namespace-aware walker over the
//! `quick-xml` event stream: elements are resolved to `(namespace, local name)`
//! and the text directly inside each element is handed to a visitor on close.

mod error;
pub mod response;
pub mod search;

use std::ops::ControlFlow;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use response::parse_search_response;
pub use search::parse_search_request;

/// Element name resolved against the namespace declarations in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementName {
    pub namespace: Option<String>,
    pub local_name: String,
}

impl ElementName {
    pub(crate) fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }
}

/// Receives elements of a document in order.
pub(crate) trait Visitor {
    fn start(&mut self, name: &ElementName);

    /// Called when an element closes, with the text directly inside it.
    fn end(&mut self, name: &ElementName, text: &str) -> ControlFlow<()>;
}

/// Namespace declarations in scope, one frame per open element.
#[derive(Debug, Default)]
struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    /// Pushes the declarations carried by `e` and resolves its name.
    fn enter(&mut self, e: &BytesStart<'_>) -> ParseResult<ElementName> {
        let mut frame = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.push((prefix.to_owned(), value.to_owned()));
            } else if key == "xmlns" {
                frame.push((String::new(), value.to_owned()));
            } else {
                // Other attributes ignored
            }
        }
        self.frames.push(frame);

        let name_bytes = e.name();
        let name = std::str::from_utf8(name_bytes.as_ref())?;
        let (prefix, local_name) = name.split_once(':').unwrap_or(("", name));

        Ok(ElementName {
            namespace: self.lookup(prefix).map(str::to_owned),
            local_name: local_name.to_owned(),
        })
    }

    fn leave(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str())
            .filter(|ns| !ns.is_empty())
    }
}

/// Appends character data of a text-like event to `out`.
///
/// Entity and character references arrive as separate events and are resolved here.
fn append_text(event: &Event<'_>, out: &mut String) -> ParseResult<()> {
    match event {
        Event::Text(e) => out.push_str(&e.decode()?),
        Event::CData(e) => out.push_str(&e.decode()?),
        Event::GeneralRef(e) => {
            if let Some(ch) = e.resolve_char_ref()? {
                out.push(ch);
            } else {
                let name = e.decode()?;
                let resolved = resolve_predefined_entity(&name)
                    .ok_or_else(|| ParseError::invalid_value(format!("unknown entity: &{name};")))?;
                out.push_str(resolved);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Walks `xml` and feeds every element to `visitor` until it breaks or the document ends.
pub(crate) fn walk<V: Visitor>(xml: &[u8], visitor: &mut V) -> ParseResult<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut scope = NamespaceScope::default();
    let mut open: Vec<ElementName> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = scope.enter(e)?;
                visitor.start(&name);
                open.push(name);
                text.clear();
            }
            Ok(Event::Empty(ref e)) => {
                let name = scope.enter(e)?;
                visitor.start(&name);
                scope.leave();
                text.clear();
                if visitor.end(&name, "").is_break() {
                    break;
                }
            }
            Ok(Event::End(_)) => {
                scope.leave();
                let Some(name) = open.pop() else {
                    return Err(ParseError::xml("unbalanced end tag"));
                };
                let flow = visitor.end(&name, &text);
                text.clear();
                if flow.is_break() {
                    break;
                }
            }
            Ok(ref event @ (Event::Text(_) | Event::CData(_) | Event::GeneralRef(_))) => {
                append_text(event, &mut text)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::xml(e.to_string())),
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok(())
}
