use std::collections::BTreeMap;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One node of an owned markup tree.
///
/// `Literal` nodes are produced by the normalizer passes and are emitted
/// verbatim by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Element(Element),
    Text(String),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Stands on its own lines, separated from surrounding blocks.
    Block(String),
    /// Flows with the surrounding text.
    Inline(String),
}

impl Literal {
    pub fn as_str(&self) -> &str {
        match self {
            Literal::Block(text) | Literal::Inline(text) => text,
        }
    }
}

/// Element with its attributes kept in sorted order, so source attribute
/// order never reaches the output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Markup>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Concatenated text of every descendant, untouched.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.name.as_str()) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl Markup {
    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Markup::Element(element) => Some(element),
            _ => None,
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Markup::Text(text) => out.push_str(text),
            Markup::Literal(literal) => out.push_str(literal.as_str()),
            Markup::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Markup::Element(element) => element.write_html(out),
            Markup::Text(text) => push_escaped(out, text, false),
            Markup::Literal(literal) => push_escaped(out, literal.as_str(), false),
        }
    }

    /// Copies a parsed node into an owned tree. Comments, doctypes and
    /// processing instructions have no counterpart and yield `None`.
    fn from_node(node: NodeRef<'_, Node>) -> Option<Markup> {
        match node.value() {
            Node::Text(text) => Some(Markup::Text(String::from(&**text))),
            Node::Element(_) => ElementRef::wrap(node).map(|el| Markup::Element(element_from(el))),
            _ => None,
        }
    }
}

fn element_from(element: ElementRef<'_>) -> Element {
    let value = element.value();
    let attrs = value
        .attrs()
        .map(|(name, val)| (name.to_ascii_lowercase(), val.to_string()))
        .collect();
    let children = element.children().filter_map(Markup::from_node).collect();
    Element {
        name: value.name().to_ascii_lowercase(),
        attrs,
        children,
    }
}

fn push_escaped(out: &mut String, text: &str, in_attr: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// The primary-content subtree of a page, detached from the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRegion {
    root: Element,
}

impl ContentRegion {
    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self {
            root: element_from(element),
        }
    }

    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.root.write_html(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn region(html: &str) -> ContentRegion {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("section").unwrap();
        ContentRegion::from_element(doc.select(&sel).next().unwrap())
    }

    #[test]
    fn attribute_order_does_not_affect_serialization() {
        let a = region(r#"<section><p id="x" class="y">t</p></section>"#);
        let b = region(r#"<section><p class="y" id="x">t</p></section>"#);
        assert_eq!(a, b);
        assert_eq!(a.to_html(), r#"<section><p class="y" id="x">t</p></section>"#);
    }

    #[test]
    fn comments_are_dropped() {
        let r = region("<section><!-- build 42 --><p>a</p></section>");
        assert_eq!(r.root().children.len(), 1);
        assert_eq!(r.text_content(), "a");
    }

    #[test]
    fn void_elements_serialize_without_closing_tag() {
        let r = region(r#"<section><img src="a.png"><br></section>"#);
        assert_eq!(r.to_html(), r#"<section><img src="a.png"><br></section>"#);
    }
}
