//! Minimal XML document tree
//!
//! Definition files are small, so they are read into an owned tree once and
//! the parsers walk that tree. Element and attribute names match
//! case-insensitively.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{LoadError, Result};

/// One XML element with its attributes, child elements and text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    fn from_start(e: &BytesStart) -> Result<Self> {
        let name = String::from_utf8(e.name().as_ref().to_vec())
            .map_err(|_| LoadError::Xml("invalid UTF-8 in element name".into()))?;
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| LoadError::Xml(err.to_string()))?;
            let key = String::from_utf8(attr.key.as_ref().to_vec())
                .map_err(|_| LoadError::Xml(format!("invalid UTF-8 in attribute of <{name}>")))?;
            let value = String::from_utf8(attr.value.to_vec())
                .map_err(|_| LoadError::Xml(format!("invalid UTF-8 in attribute '{key}' of <{name}>")))?;
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| {
            LoadError::bad_definition(format!("<{}>", self.name), format!("missing attribute '{name}'"))
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.is(name))
    }

    pub fn required_child(&self, name: &str) -> Result<&XmlNode> {
        self.child(name).ok_or_else(|| {
            LoadError::bad_definition(format!("<{}>", self.name), format!("missing <{name}>"))
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.is(name))
    }

    /// Trimmed text content
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Text of the named child, `None` if the child is absent or empty
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|child| child.text().to_string())
            .filter(|text| !text.is_empty())
    }

    /// The single child element, or an error naming `context`
    pub fn only_child(&self) -> Result<&XmlNode> {
        match self.children.as_slice() {
            [child] => Ok(child),
            children => Err(LoadError::bad_definition(
                format!("<{}>", self.name),
                format!("expected exactly one child, found {}", children.len()),
            )),
        }
    }
}

/// Read a whole document and return its root element
pub fn parse_document(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(XmlNode::from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = XmlNode::from_start(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| LoadError::Xml("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| LoadError::Xml(err.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8(e.to_vec())
                    .map_err(|_| LoadError::Xml("invalid UTF-8 in CDATA".into()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(LoadError::Xml(e.to_string())),
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(LoadError::Xml(format!("unexpected EOF inside <{}>", open.name)));
    }
    root.ok_or_else(|| LoadError::Xml("document has no root element".into()))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(LoadError::Xml(format!("second root element <{}>", node.name))),
    }
    Ok(())
}
