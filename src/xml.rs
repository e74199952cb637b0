//! Minimal XML element tree built on `quick-xml` events.
//!
//! PubMed records are looked up by element name at arbitrary depth
//! (`PMID`, `ArticleTitle`, `PubDate`, `Author`), so the document is
//! materialized once and queried with [`Element::find`] and friends.
//!
//! Syntax errors anywhere in the document are fatal. Text that cannot be
//! unescaped is kept as a [`Node::Invalid`] marker so the caller can decide
//! to skip only the enclosing record.

use crate::error::{ExtractorError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::trace;

/// A node in the element tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Text that failed to unescape, with the decoder's message
    Invalid(String),
}

/// An XML element. Attributes are not retained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Direct children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// All descendant elements in document order (pre-order), excluding `self`
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// First descendant with the given name
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.name == name)
    }

    /// All descendants with the given name, in document order
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |e| e.name == name)
    }

    /// Concatenated text of this element and all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Invalid(_) => {}
            }
        }
    }

    /// Trimmed text of the first descendant named `name`
    pub fn find_text(&self, name: &str) -> Option<String> {
        self.find(name).map(|e| e.text().trim().to_string())
    }

    /// Trimmed text of the first direct child named `name`
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|e| e.text().trim().to_string())
    }

    /// First text decoding error anywhere in this subtree
    pub fn first_invalid(&self) -> Option<&str> {
        for node in &self.children {
            match node {
                Node::Invalid(msg) => return Some(msg),
                Node::Element(e) => {
                    if let Some(msg) = e.first_invalid() {
                        return Some(msg);
                    }
                }
                Node::Text(_) => {}
            }
        }
        None
    }

    fn push(&mut self, node: Node) {
        self.children.push(node);
    }
}

/// Pre-order iterator over descendant elements
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(next.elements());
        self.stack[start..].reverse();
        Some(next)
    }
}

/// Parse a complete XML document and return its root element.
///
/// # Errors
///
/// Returns [`ExtractorError::DataProcessing`] when the document is not
/// well-formed: syntax errors, mismatched or unclosed tags, a missing root
/// element, or content after the root.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractorError::DataProcessing(format!(
                "Failed to parse XML at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                if root.is_some() && stack.is_empty() {
                    return Err(junk_after_root(&reader));
                }
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(Element::new(name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                attach(&mut stack, &mut root, Element::new(name), &reader)?;
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    ExtractorError::DataProcessing(format!(
                        "Unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element, &reader)?;
            }
            Event::Text(e) => match stack.last_mut() {
                Some(parent) => match e.unescape() {
                    Ok(text) => parent.push(Node::Text(text.into_owned())),
                    Err(err) => {
                        trace!(error = %err, "Undecodable text node");
                        parent.push(Node::Invalid(err.to_string()));
                    }
                },
                None => {
                    if !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(ExtractorError::DataProcessing(
                            "Text content outside the root element".to_string(),
                        ));
                    }
                }
            },
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.push(Node::Text(text)),
                    None => {
                        return Err(ExtractorError::DataProcessing(
                            "CDATA outside the root element".to_string(),
                        ))
                    }
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, DOCTYPE
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ExtractorError::DataProcessing(format!(
            "Unexpected end of document: <{}> is not closed",
            open.name
        )));
    }

    root.ok_or_else(|| ExtractorError::DataProcessing("Document has no root element".to_string()))
}

/// Attach a finished element to its parent, or make it the root
fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    reader: &Reader<&[u8]>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(Node::Element(element)),
        None if root.is_some() => return Err(junk_after_root(reader)),
        None => *root = Some(element),
    }
    Ok(())
}

fn junk_after_root(reader: &Reader<&[u8]>) -> ExtractorError {
    ExtractorError::DataProcessing(format!(
        "Content after the root element at position {}",
        reader.buffer_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() -> Result<()> {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<!DOCTYPE Set>
<Set><A><B>one</B></A><B>two</B><C/></Set>"#,
        )?;
        assert_eq!(root.name(), "Set");
        assert_eq!(root.find_text("B").as_deref(), Some("one"));
        assert_eq!(root.child_text("B").as_deref(), Some("two"));
        assert_eq!(root.find_all("B").count(), 2);
        assert!(root.child("C").is_some());
        Ok(())
    }

    #[test]
    fn test_descendants_document_order() -> Result<()> {
        let root = parse_document("<r><a><b/><c/></a><d><e/></d></r>")?;
        let names: Vec<&str> = root.descendants().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        Ok(())
    }

    #[test]
    fn test_text_includes_inline_markup() -> Result<()> {
        let root = parse_document("<t>Effect of <i>in vitro</i> H<sub>2</sub>O &amp; salt</t>")?;
        assert_eq!(root.text(), "Effect of in vitro H2O & salt");
        Ok(())
    }

    #[test]
    fn test_cdata() -> Result<()> {
        let root = parse_document("<t><![CDATA[a < b]]></t>")?;
        assert_eq!(root.text(), "a < b");
        Ok(())
    }

    #[test]
    fn test_invalid_entity_is_isolated() -> Result<()> {
        let root = parse_document("<r><a>&bogus;</a><b>fine</b></r>")?;
        assert!(root.child("a").and_then(|a| a.first_invalid()).is_some());
        assert!(root.child("b").and_then(|b| b.first_invalid()).is_none());
        assert_eq!(root.child_text("b").as_deref(), Some("fine"));
        Ok(())
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "<a><b></a>",
            "<a><b>",
            "",
            "   ",
            "just text",
            "<a/><b/>",
            "</a>",
        ] {
            assert!(
                matches!(parse_document(xml), Err(ExtractorError::DataProcessing(_))),
                "expected failure for {:?}",
                xml
            );
        }
    }
}
