// src/html/dom.rs
//! Owned, mutable HTML tree built from a `tl` parse.
//!
//! `tl` hands out a borrowed, read-mostly view of the source text. Documents
//! here are rewritten in place (image `src`, blanked menu links, unwrapped
//! anchors), so the parse is copied once into owned nodes and serialized back
//! at the end.
//!
//! Text nodes keep the source's entity encoding and are written back
//! verbatim. Attribute values are decoded on the way in and escaped on the
//! way out.

use super::escape::{escape_attr, is_void_element, unescape};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, Option<String>)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Value of attribute `name`; `None` when absent or valueless.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Sets `name` to `value`, appending the attribute when absent.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = Some(value),
            None => self.attrs.push((name.to_string(), Some(value))),
        }
    }

    /// Decoded text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(raw) => out.push_str(&unescape(raw)),
            HtmlNode::Element(element) => collect_text(&element.children, out),
            HtmlNode::Comment(_) => {}
        }
    }
}

/// A parsed HTML fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlDocument {
    pub nodes: Vec<HtmlNode>,
}

impl HtmlDocument {
    /// Parses an HTML fragment.
    pub fn parse(html: &str) -> Result<Self, String> {
        let dom = tl::parse(html, tl::ParserOptions::default())
            .map_err(|e| format!("HTML parse error: {:?}", e))?;
        let parser = dom.parser();
        let nodes = dom
            .children()
            .iter()
            .filter_map(|handle| convert_node(*handle, parser))
            .collect();
        Ok(Self { nodes })
    }

    /// Serializes the tree back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out
    }

    // --- Queries ---

    /// Every element in document order.
    pub fn elements(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_elements(&self.nodes, &mut found);
        found
    }

    /// First element named `name`.
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        self.elements().into_iter().find(|e| e.is(name))
    }

    /// Text of the first element named `name`, trimmed.
    pub fn first_text_of(&self, name: &str) -> Option<String> {
        self.find_first(name)
            .map(|e| e.text_content().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Text of the first `<p>` after the first `<h2>` mentioning `marker`,
    /// in document order.
    pub fn paragraph_after_heading(&self, marker: &str) -> Option<String> {
        let elements = self.elements();
        let heading = elements
            .iter()
            .position(|e| e.is("h2") && e.text_content().contains(marker))?;
        elements[heading + 1..]
            .iter()
            .find(|e| e.is("p"))
            .map(|p| p.text_content().trim().to_string())
    }

    // --- Rewrites ---

    /// Visits every element mutably, parents before children.
    pub fn for_each_element_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut Element),
    {
        visit_elements_mut(&mut self.nodes, &mut visit);
    }

    /// Visits every element nested inside an element named `container`.
    pub fn for_each_within_mut<F>(&mut self, container: &str, mut visit: F)
    where
        F: FnMut(&mut Element),
    {
        visit_within_mut(&mut self.nodes, container, false, &mut visit);
    }

    /// Replaces every element matching `predicate` with its children.
    pub fn unwrap_elements<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&Element) -> bool,
    {
        unwrap_in(&mut self.nodes, &predicate)
    }
}

fn convert_node(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<HtmlNode> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let mut element = Element::new(tag.name().as_utf8_str().to_lowercase());
            for (key, value) in tag.attributes().iter() {
                let key: &str = key.as_ref();
                element.attrs.push((
                    key.to_lowercase(),
                    value.map(|v| unescape(v.as_ref()).into_owned()),
                ));
            }
            element.children = tag
                .children()
                .top()
                .iter()
                .filter_map(|child| convert_node(*child, parser))
                .collect();
            Some(HtmlNode::Element(element))
        }
        tl::Node::Raw(bytes) => Some(HtmlNode::Text(bytes.as_utf8_str().into_owned())),
        tl::Node::Comment(bytes) => Some(HtmlNode::Comment(bytes.as_utf8_str().into_owned())),
    }
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(raw) => out.push_str(raw),
        HtmlNode::Comment(raw) => {
            // tl keeps the delimiters of a comment in its raw bytes
            if raw.starts_with("<!--") {
                out.push_str(raw);
            } else {
                let _ = write!(out, "<!--{}-->", raw);
            }
        }
        HtmlNode::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                match value {
                    Some(value) => {
                        let _ = write!(out, " {}=\"{}\"", key, escape_attr(value));
                    }
                    None => {
                        out.push(' ');
                        out.push_str(key);
                    }
                }
            }
            out.push('>');
            if is_void_element(&element.name) {
                return;
            }
            for child in &element.children {
                write_node(child, out);
            }
            let _ = write!(out, "</{}>", element.name);
        }
    }
}

fn collect_elements<'a>(nodes: &'a [HtmlNode], found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let HtmlNode::Element(element) = node {
            found.push(element);
            collect_elements(&element.children, found);
        }
    }
}

fn visit_elements_mut<F>(nodes: &mut [HtmlNode], visit: &mut F)
where
    F: FnMut(&mut Element),
{
    for node in nodes {
        if let HtmlNode::Element(element) = node {
            visit(element);
            visit_elements_mut(&mut element.children, visit);
        }
    }
}

fn visit_within_mut<F>(nodes: &mut [HtmlNode], container: &str, inside: bool, visit: &mut F)
where
    F: FnMut(&mut Element),
{
    for node in nodes {
        if let HtmlNode::Element(element) = node {
            if inside {
                visit(element);
            }
            let nested = inside || element.is(container);
            visit_within_mut(&mut element.children, container, nested, visit);
        }
    }
}

fn unwrap_in<P>(nodes: &mut Vec<HtmlNode>, predicate: &P) -> usize
where
    P: Fn(&Element) -> bool,
{
    let mut unwrapped = 0;
    let mut result = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            HtmlNode::Element(mut element) => {
                unwrapped += unwrap_in(&mut element.children, predicate);
                if predicate(&element) {
                    unwrapped += 1;
                    result.append(&mut element.children);
                } else {
                    result.push(HtmlNode::Element(element));
                }
            }
            other => result.push(other),
        }
    }
    *nodes = result;
    unwrapped
}
