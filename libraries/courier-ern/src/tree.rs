//! Owned XML element tree and its serializer

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Indentation width of serialized documents
const INDENT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes and children
///
/// Names are written as given, prefix included (`ernm:NewReleaseMessage`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element holding a single text node
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(text.into()));
        element
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text_child(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.child(Self::text(name, text))
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Descend by child names, e.g. `find(&["ReleaseList", "Release"])`
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        self.elements()
            .find(|e| e.name == *first)
            .and_then(|e| e.find(rest))
    }

    /// Concatenated text of direct text children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Serialize as a UTF-8 document with declaration and indentation
    pub fn write_document<W: Write>(&self, out: W) -> Result<(), quick_xml::Error> {
        let mut writer = Writer::new_with_indent(out, b' ', INDENT);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_element(&mut writer)?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String, quick_xml::Error> {
        let mut buffer = Vec::new();
        self.write_document(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn write_element<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), quick_xml::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_element(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_nested() {
        let doc = Element::new("Root")
            .attr("Version", "1")
            .child(Element::new("Header").text_child("Id", "123-4"))
            .child(Element::new("Empty"));

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<Root Version="1">"#));
        assert!(xml.contains("    <Id>123-4</Id>"));
        assert!(xml.contains("<Empty/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = Element::text("Label", "Tom & Jerry <Records>");
        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains("Tom &amp; Jerry &lt;Records&gt;"));

        let parsed = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(
            parsed.root_element().text(),
            Some("Tom & Jerry <Records>")
        );
    }

    #[test]
    fn test_find() {
        let doc = Element::new("A").child(Element::new("B").text_child("C", "value"));
        assert_eq!(doc.find(&["B", "C"]).unwrap().text_content(), "value");
        assert!(doc.find(&["B", "D"]).is_none());
    }
}
