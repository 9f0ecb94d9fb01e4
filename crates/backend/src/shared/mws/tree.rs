use super::error::MwsError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Schema-agnostic XML tree used on both sides of the wire: feed
/// documents are built up from nodes, responses are parsed into them.
///
/// Access is deliberately forgiving: Amazon treats most response
/// fields as optional, so absent children read as `None` or as an
/// empty iterator instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Leaf element with text content
    pub fn elem(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text content of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text.as_deref())
    }

    /// Own text content, empty when absent
    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// All children with the given name; empty for absent fields
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Amazon list containers wrap entries in `member` elements
    pub fn members(&self) -> impl Iterator<Item = &XmlNode> {
        self.children_named("member")
    }

    /// Walk a path of child names
    pub fn path(&self, names: &[&str]) -> Option<&XmlNode> {
        let mut node = self;
        for name in names {
            node = node.child(name)?;
        }
        Some(node)
    }

    /// Depth-first search for the first descendant with the given
    /// name. Response payloads nest their interesting parts under
    /// wrapper elements that vary by operation.
    pub fn find_first(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(name))
    }

    /// Parse an XML document into a tree
    pub fn from_xml(input: &str) -> Result<XmlNode, MwsError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let node = node_from_start(&start)?;
                    stack.push(node);
                }
                Ok(Event::Empty(start)) => {
                    let node = node_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Ok(Event::Text(text)) => {
                    let value = text
                        .unescape()
                        .map_err(|e| MwsError::Parse(e.to_string()))?
                        .to_string();
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(top) = stack.last_mut() {
                        match top.text.as_mut() {
                            Some(existing) => existing.push_str(&value),
                            None => top.text = Some(value),
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    let node = match stack.pop() {
                        Some(node) => node,
                        None => return Err(MwsError::Parse("unbalanced end tag".into())),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Ok(Event::Eof) => {
                    return Err(MwsError::Parse("document has no root element".into()))
                }
                Err(e) => return Err(MwsError::Parse(e.to_string())),
                Ok(_) => {}
            }
        }
    }

    /// Render the tree as a UTF-8 document with an XML declaration.
    /// Pretty printing is cosmetic only, used for dry-run output.
    pub fn to_xml(&self, pretty: bool) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
        if pretty {
            out.push('\n');
        }
        self.write(&mut out, 0, pretty);
        out
    }

    fn write(&self, out: &mut String, depth: usize, pretty: bool) {
        if pretty && depth > 0 {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_text(text));
        }
        for child in &self.children {
            child.write(out, depth + 1, pretty);
        }
        if pretty && !self.children.is_empty() {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn node_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode, MwsError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut node = XmlNode::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MwsError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| MwsError::Parse(e.to_string()))?
            .to_string();
        node.attrs.push((key, value));
    }
    Ok(node)
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
