// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mutable document tree.
//!
//! Nodes live in one arena and link to each other by index. Node 0 is the
//! document node; element nodes hang below it. Parsing goes through
//! `roxmltree`, emission through `quick-xml`.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

pub(crate) type NodeId = usize;

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Character content, whitespace between child elements excluded.
    pub text: Option<String>,
    pub cdata: bool,
    pub parent: Option<NodeId>,
    /// Index in the parent's child list.
    pub position: usize,
    pub children: Vec<NodeId>,
    /// Source line, 0 for created nodes.
    pub line: u32,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>, line: u32) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: None,
            cdata: false,
            parent,
            position: 0,
            children: Vec::new(),
            line,
        }
    }
}

/// Root namespace declaration of a parsed document: `(prefix, uri)`.
pub(crate) type Namespace = (String, String);

#[derive(Debug, Clone)]
pub(crate) struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub const NODE: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("", None, 0)],
        }
    }

    /// Parse `text` into a tree. Also returns the first namespace declared
    /// on the document element.
    pub fn parse(text: &str) -> Result<(Self, Namespace), roxmltree::Error> {
        let source = roxmltree::Document::parse(text)?;
        let mut document = Self::new();
        document.build(&source, source.root(), Self::NODE);

        let root = source.root_element();
        let namespace = root
            .namespaces()
            .find(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().unwrap_or_default().to_string(), ns.uri().to_string()))
            .unwrap_or_default();
        Ok((document, namespace))
    }

    fn build(&mut self, source: &roxmltree::Document, from: roxmltree::Node, into: NodeId) {
        let mut pieces = String::new();
        let mut has_text = false;
        let mut has_elements = false;
        for child in from.children() {
            if child.is_element() {
                has_elements = true;
                let line = source.text_pos_at(child.range().start).row;
                let id = self.push(Node::new(child.tag_name().name(), Some(into), line));
                self.nodes[id].attributes = child
                    .attributes()
                    .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                    .collect();
                self.build(source, child, id);
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    has_text = true;
                    pieces.push_str(text);
                }
            }
        }
        if has_text && !(has_elements && pieces.trim().is_empty()) {
            self.nodes[into].text = Some(pieces);
        }
    }

    fn push(&mut self, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            let children = &mut self.nodes[parent].children;
            node.position = children.len();
            children.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    /// First element below the document node.
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[Self::NODE].children.first().copied()
    }

    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(Node::new(name, Some(parent), 0))
    }

    pub fn rename(&mut self, id: NodeId, name: &str) {
        self.nodes[id].name = name.to_string();
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attributes = &mut self.nodes[id].attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: &str, cdata: bool) {
        let node = &mut self.nodes[id];
        node.text = Some(text.to_string());
        node.cdata = cdata;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Sibling following `id` in document order.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[id];
        self.nodes[node.parent?].children.get(node.position + 1).copied()
    }

    /// Slash separated element path, e.g. `/seiscomp/EventParameters`.
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.nodes[cursor].parent {
            names.push(self.nodes[cursor].name.as_str());
            cursor = parent;
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Serialize the tree with an XML declaration. `indent` enables
    /// formatted output with the given width.
    pub fn write<W: Write>(&self, out: W, indent: Option<usize>) -> Result<W, String> {
        let mut writer = match indent {
            Some(width) => Writer::new_with_indent(out, b' ', width),
            None => Writer::new(out),
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| e.to_string())?;
        for &child in self.children(Self::NODE) {
            self.write_element(&mut writer, child)?;
        }
        let mut out = writer.into_inner();
        out.write_all(b"\n").map_err(|e| e.to_string())?;
        Ok(out)
    }

    fn write_element<W: Write>(&self, writer: &mut Writer<W>, id: NodeId) -> Result<(), String> {
        let node = &self.nodes[id];
        let mut start = BytesStart::new(node.name.as_str());
        for (key, value) in &node.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if node.children.is_empty() && node.text.is_none() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| e.to_string());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| e.to_string())?;
        if let Some(text) = &node.text {
            let event = if node.cdata && !text.contains("]]>") {
                Event::CData(BytesCData::new(text.as_str()))
            } else {
                Event::Text(BytesText::new(text))
            };
            writer.write_event(event).map_err(|e| e.to_string())?;
        }
        for &child in &node.children {
            self.write_element(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(node.name.as_str())))
            .map_err(|e| e.to_string())
    }
}
