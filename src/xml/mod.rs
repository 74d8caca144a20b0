//! Owned XML element tree used for templates and resolved definitions
//!
//! Parsing drops comments, processing instructions and whitespace-only text,
//! and records the namespace URI of every element so lookups can be done by
//! local name within a namespace.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt::Write;

use crate::error::{ErrorCode, Result, SubmitError};

/// Namespace of the SLA annotation block
pub const SLA_NAMESPACE_PREFIX: &str = "uri:oozie:sla:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

fn malformed(message: impl Into<String>) -> SubmitError {
    SubmitError::validation_with_code(ErrorCode::VALIDATION_MALFORMED_XML, message, None)
}

impl Element {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut scopes: Vec<HashMap<String, String>> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = open_element(&start, &mut scopes)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = open_element(&start, &mut scopes)?;
                    scopes.pop();
                    attach(element, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("Unexpected closing tag"))?;
                    scopes.pop();
                    attach(element, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| malformed(format!("Invalid text content: {}", e)))?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(&mut stack, &text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("Document ended before all elements were closed"));
        }
        root.ok_or_else(|| malformed("Document has no root element"))
    }

    /// Qualified name as written, including any prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attributes_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.attributes.iter_mut().map(|(_, v)| v)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    fn is_sibling_named(&self, parent_ns: Option<&str>, local: &str) -> bool {
        self.local_name() == local && self.namespace() == parent_ns
    }

    /// First child with this local name in the parent's namespace
    pub fn child(&self, local: &str) -> Option<&Element> {
        let ns = self.namespace.as_deref();
        self.elements().find(|e| e.is_sibling_named(ns, local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children_named_mut(local).next()
    }

    /// First child with this local name in a namespace starting with `ns_prefix`
    pub fn child_in_namespace(&self, local: &str, ns_prefix: &str) -> Option<&Element> {
        self.elements().find(|e| {
            e.local_name() == local && e.namespace().is_some_and(|ns| ns.starts_with(ns_prefix))
        })
    }

    pub fn children_named<'a>(&'a self, local: &str) -> impl Iterator<Item = &'a Element> + 'a {
        let ns = self.namespace.as_deref();
        let local = local.to_string();
        self.elements().filter(move |e| e.is_sibling_named(ns, &local))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        local: &str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        let ns = self.namespace.clone();
        let local = local.to_string();
        self.children.iter_mut().filter_map(move |node| match node {
            Node::Element(e) if e.is_sibling_named(ns.as_deref(), &local) => Some(e),
            _ => None,
        })
    }

    /// Remove every child with this local name; returns how many were removed
    pub fn remove_children(&mut self, local: &str) -> usize {
        let ns = self.namespace.clone();
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Element(e) => !e.is_sibling_named(ns.as_deref(), local),
            Node::Text(_) => true,
        });
        before - self.children.len()
    }

    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all content with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Copy that declares its own namespace, so it can be serialized alone
    pub fn detached(&self) -> Element {
        let mut copy = self.clone();
        if let Some(ns) = &self.namespace {
            let decl = match self.name.split_once(':') {
                Some((prefix, _)) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            if copy.attr(&decl).is_none() {
                copy.set_attr(&decl, ns.clone());
            }
        }
        copy
    }

    /// Move this element and its same-namespace descendants into `target`.
    ///
    /// Prefixes of the old namespace are dropped and the element declares
    /// `target` as its default namespace, so it keeps that namespace whatever
    /// prefix or default the element it is spliced under uses.
    pub fn normalize_namespace(&mut self, target: Option<&str>) {
        let previous = self.namespace.clone();
        self.rehome(previous.as_deref(), target);
        self.set_attr("xmlns", target.unwrap_or_default());
    }

    fn rehome(&mut self, previous: Option<&str>, target: Option<&str>) {
        if self.namespace.as_deref() != previous {
            return;
        }
        let prefix = self.name.split_once(':').map(|(p, _)| p.to_string());
        if let Some(prefix) = &prefix {
            let decl = format!("xmlns:{}", prefix);
            self.attributes.retain(|(k, _)| k != &decl);
            self.name = self.local_name().to_string();
        }
        self.attributes.retain(|(k, _)| k != "xmlns");
        self.namespace = target.map(str::to_string);
        for node in &mut self.children {
            if let Node::Element(child) = node {
                child.rehome(previous, target);
            }
        }
    }

    /// Serialize with two-space indentation
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, quick_xml::escape::escape(value.as_str()));
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        let only_text = self.children.iter().all(|n| matches!(n, Node::Text(_)));
        if only_text {
            let _ = writeln!(
                out,
                ">{}</{}>",
                quick_xml::escape::escape(self.text().as_str()),
                self.name
            );
            return;
        }
        out.push_str(">\n");
        for node in &self.children {
            match node {
                Node::Element(child) => child.write_into(out, depth + 1),
                Node::Text(text) => {
                    let _ = writeln!(
                        out,
                        "{}  {}",
                        indent,
                        quick_xml::escape::escape(text.as_str())
                    );
                }
            }
        }
        let _ = writeln!(out, "{}</{}>", indent, self.name);
    }
}

fn open_element(start: &BytesStart, scopes: &mut Vec<HashMap<String, String>>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    let mut scope = HashMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(format!("Invalid attribute in <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(format!("Invalid attribute value in <{}>: {}", name, e)))?
            .into_owned();
        if key == "xmlns" {
            scope.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.insert(prefix.to_string(), value.clone());
        }
        attributes.push((key, value));
    }
    scopes.push(scope);

    let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or("");
    let namespace = scopes
        .iter()
        .rev()
        .find_map(|s| s.get(prefix))
        .filter(|uri| !uri.is_empty())
        .cloned();

    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(malformed("Document has more than one root element")),
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(malformed("Text outside of the root element")),
    }
}
