// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML document archive.
//!
//! The whole document is held in memory: reading parses it on open, writing
//! builds a tree and emits it on [`XmlArchive::close`].
//!
//! Mapping rules:
//!
//! - objects are elements named by their class, with a `role` attribute
//!   carrying the field name when the field type is polymorphic;
//! - statically typed members are elements named by the field;
//! - scalars are attributes unless the hint asks for a child element or the
//!   node content;
//! - empty values are omitted unless mandatory.
//!
//! # Example
//!
//! ```rust
//! use scarchive::archive::Archive;
//! use scarchive::datamodel::Pick;
//! use scarchive::object::{Object, ObjectRef, ObjectRegistry};
//! use scarchive::xml::{XmlArchive, XmlArchiveConfig};
//!
//! let registry = ObjectRegistry::new();
//! let pick = Pick::create_with_id(&registry, "Pick/1").unwrap();
//!
//! let mut ar = XmlArchive::with_registry(XmlArchiveConfig::default(), registry.clone());
//! ar.create_bytes();
//! ar.write_object(&ObjectRef::new(pick.clone()));
//! let bytes = ar.close_to_bytes().unwrap();
//! drop(pick);
//!
//! let mut ar = XmlArchive::with_registry(XmlArchiveConfig::default(), registry);
//! ar.open_bytes(&bytes).unwrap();
//! let copy = ar.read_object::<Pick>().unwrap();
//! assert_eq!(copy.read().public_id(), Some("Pick/1"));
//! ```

mod config;
mod dom;

pub use config::{Compression, XmlArchiveConfig, DEFAULT_NAMESPACE_BASE, DEFAULT_ROOT_NAME};

use crate::archive::{Archive, ArchiveState, Version};
use crate::meta::{Value, ValueKind, ValueType};
use crate::object::{ObjectRef, ObjectRegistry, ObjectType};
use dom::{Document, NodeId};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use parking_lot::RwLock;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// XML archive errors.
#[derive(Debug)]
pub enum XmlError {
    Io(io::Error),
    Parse(String),
    Write(String),
    NotOpen,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::Write(msg) => write!(f, "Write error: {}", msg),
            Self::NotOpen => write!(f, "Archive is not open"),
        }
    }
}

impl std::error::Error for XmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for XmlError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Archive backed by an XML document.
pub struct XmlArchive {
    state: ArchiveState,
    config: XmlArchiveConfig,
    document: Option<Document>,
    /// Node whose members are being (de)serialized.
    current: Option<NodeId>,
    /// Node found by the last locate call.
    location: Option<NodeId>,
    /// Read: text of the located value. Write: name of the pending field.
    property: String,
    /// Attribute the current value was read from.
    attrib_name: String,
    namespace: (String, String),
    sink: Option<Box<dyn Write>>,
}

impl XmlArchive {
    pub fn new(config: XmlArchiveConfig) -> Self {
        Self::with_state(config, ArchiveState::new(true))
    }

    /// Archive resolving public objects against `registry`.
    pub fn with_registry(config: XmlArchiveConfig, registry: Arc<ObjectRegistry>) -> Self {
        Self::with_state(config, ArchiveState::with_registry(true, registry))
    }

    fn with_state(config: XmlArchiveConfig, state: ArchiveState) -> Self {
        Self {
            state,
            config,
            document: None,
            current: None,
            location: None,
            property: String::new(),
            attrib_name: String::new(),
            namespace: (String::new(), String::new()),
            sink: None,
        }
    }

    pub fn config(&self) -> &XmlArchiveConfig {
        &self.config
    }

    pub fn root_name(&self) -> &str {
        &self.config.root_name
    }

    pub fn set_root_name(&mut self, name: &str) {
        self.config.root_name = name.to_string();
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.config.compression = compression;
    }

    pub fn set_formatted_output(&mut self, enable: bool) {
        self.config.formatted = enable;
    }

    pub fn set_list_delimiter(&mut self, delimiter: char) {
        self.config.list_delimiter = delimiter;
    }

    /// Namespace URI of the open document.
    pub fn namespace(&self) -> &str {
        &self.namespace.1
    }

    /// Namespace prefix of the open document, empty for the default namespace.
    pub fn namespace_prefix(&self) -> &str {
        &self.namespace.0
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// Open a document for reading. `"-"` reads standard input.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), XmlError> {
        let path = path.as_ref();
        if path.as_os_str() == "-" {
            return self.open_reader(io::stdin().lock());
        }
        let bytes = std::fs::read(path)?;
        self.open_bytes(&bytes)
    }

    pub fn open_reader(&mut self, mut reader: impl Read) -> Result<(), XmlError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.open_bytes(&bytes)
    }

    /// Parse an in-memory document.
    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<(), XmlError> {
        self.discard();
        let bytes = decompress(self.config.compression, bytes)?;
        let text = std::str::from_utf8(&bytes).map_err(|e| XmlError::Parse(e.to_string()))?;
        let text = text.trim_end_matches('\0');
        let (document, namespace) =
            Document::parse(text).map_err(|e| XmlError::Parse(e.to_string()))?;
        let root = document
            .root_element()
            .ok_or_else(|| XmlError::Parse("no root element".to_string()))?;

        let current = if document.name(root) == self.config.root_name {
            root
        } else {
            Document::NODE
        };
        let version = document
            .attribute(current, "version")
            .map(Version::parse)
            .unwrap_or_default();

        self.state.reset(true, version);
        self.namespace = namespace;
        self.document = Some(document);
        self.current = Some(current);
        self.location = None;
        Ok(())
    }

    /// Create a document written to `path` on close. `"-"` writes standard
    /// output.
    pub fn create(&mut self, path: impl AsRef<Path>) -> Result<(), XmlError> {
        let path = path.as_ref();
        let sink: Box<dyn Write> = if path.as_os_str() == "-" {
            Box::new(io::stdout())
        } else {
            Box::new(BufWriter::new(File::create(path)?))
        };
        self.begin_document(Some(sink));
        Ok(())
    }

    /// Create a document written to `writer` on close.
    pub fn create_writer(&mut self, writer: impl Write + 'static) {
        self.begin_document(Some(Box::new(writer)));
    }

    /// Create a document kept in memory, see [`close_to_bytes`](Self::close_to_bytes).
    pub fn create_bytes(&mut self) {
        self.begin_document(None);
    }

    fn begin_document(&mut self, sink: Option<Box<dyn Write>>) {
        self.discard();
        let version = self
            .config
            .version
            .unwrap_or(crate::datamodel::VERSION);
        self.state.reset(false, version);
        self.namespace = (
            String::new(),
            format!("{}{}", self.config.namespace_base, version),
        );
        self.document = Some(Document::new());
        self.sink = sink;
        self.current = if self.config.header {
            let name = self.config.root_name.clone();
            Some(self.add_root_node(&name))
        } else {
            None
        };
        self.location = self.current;
    }

    /// Finish the archive. In write mode the document is flushed to its
    /// destination.
    pub fn close(&mut self) -> Result<(), XmlError> {
        let result = match (self.document.take(), self.sink.take()) {
            (Some(document), Some(mut sink)) if !self.state.reading => {
                let bytes = self.render(&document)?;
                sink.write_all(&bytes)?;
                sink.flush().map_err(XmlError::from)
            }
            _ => Ok(()),
        };
        self.discard();
        result
    }

    /// Finish an archive created with [`create_bytes`](Self::create_bytes)
    /// and return the encoded document.
    pub fn close_to_bytes(&mut self) -> Result<Vec<u8>, XmlError> {
        if self.state.reading {
            return Err(XmlError::NotOpen);
        }
        let document = self.document.take().ok_or(XmlError::NotOpen)?;
        let bytes = self.render(&document);
        self.discard();
        bytes
    }

    fn discard(&mut self) {
        self.document = None;
        self.sink = None;
        self.current = None;
        self.location = None;
        self.property.clear();
        self.attrib_name.clear();
        self.namespace = (String::new(), String::new());
        self.state.version = Version::default();
    }

    fn render(&self, document: &Document) -> Result<Vec<u8>, XmlError> {
        let indent = self.config.formatted.then_some(2);
        let text = document.write(Vec::new(), indent).map_err(XmlError::Write)?;
        compress(self.config.compression, text)
    }

    /// Read the first root object of type `T`.
    pub fn read_object<T: ObjectType>(&mut self) -> Option<Arc<RwLock<T>>> {
        let ar: &mut dyn Archive = self;
        ar.read_object::<T>()
    }

    pub fn write_object(&mut self, object: &ObjectRef) {
        let ar: &mut dyn Archive = self;
        ar.write_object(object);
    }

    fn add_root_node(&mut self, name: &str) -> NodeId {
        let version = self.state.version;
        let (prefix, uri) = self.namespace.clone();
        let Some(document) = self.document.as_mut() else {
            return Document::NODE;
        };
        let root = document.append_element(Document::NODE, name);
        if version != Version::default() {
            document.set_attribute(root, "version", &version.to_string());
        }
        if !uri.is_empty() {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            document.set_attribute(root, &key, &uri);
        }
        root
    }

    /// New element below the current node, the document element when there
    /// is none yet.
    fn append(&mut self, name: &str) -> Option<NodeId> {
        match self.current {
            Some(current) => self
                .document
                .as_mut()
                .map(|document| document.append_element(current, name)),
            None if self.document.is_some() => Some(self.add_root_node(name)),
            None => None,
        }
    }

    /// Element for a polymorphic object: named by class, tagged with the
    /// field name as role.
    fn add_child(&mut self, name: &str, class_name: &str) {
        self.location = self.append(class_name);
        if let (Some(location), Some(document)) = (self.location, self.document.as_mut()) {
            if !name.is_empty() {
                document.set_attribute(location, "role", name);
            }
        }
    }

    fn is_valid_tag(
        &self,
        document: &Document,
        node: NodeId,
        name: &str,
        target: Option<&str>,
    ) -> bool {
        let tag = document.name(node);
        let role = document.attribute(node, "role");
        if role == Some(name) || (role.is_none() && name.is_empty()) {
            return target.map_or(true, |target| self.state.factory.is_type_of(target, tag));
        }
        if role.is_some_and(|role| !role.is_empty()) {
            return false;
        }
        tag == name || self.state.factory.is_type_of(name, tag)
    }

    fn find_tag(&self, parent: NodeId, name: &str, target: Option<&str>) -> Option<NodeId> {
        let document = self.document.as_ref()?;
        document
            .children(parent)
            .iter()
            .copied()
            .find(|&child| self.is_valid_tag(document, child, name, target))
    }

    fn find_next_tag(&self, node: NodeId, name: &str, target: Option<&str>) -> Option<NodeId> {
        let document = self.document.as_ref()?;
        let mut cursor = document.next_sibling(node);
        while let Some(sibling) = cursor {
            if self.is_valid_tag(document, sibling, name, target) {
                return Some(sibling);
            }
            cursor = document.next_sibling(sibling);
        }
        None
    }

    fn write_text(&mut self, value: &str) {
        let hint = self.state.hint;
        if value.is_empty() && !hint.mandatory {
            self.property.clear();
            return;
        }
        let Some(current) = self.current else {
            self.property.clear();
            return;
        };
        let Some(document) = self.document.as_mut() else {
            return;
        };
        if !self.property.is_empty() && !hint.xml_cdata {
            if hint.xml_element {
                let element = document.append_element(current, &self.property);
                if !value.is_empty() {
                    document.set_text(element, value, false);
                }
            } else {
                document.set_attribute(current, &self.property, value);
            }
        } else if !value.is_empty() {
            document.set_text(current, value, hint.xml_cdata);
        }
        self.property.clear();
    }

    fn report(&self, kind: &str, node: Option<NodeId>, attribute: bool) {
        match (self.document.as_ref(), node) {
            (Some(document), Some(node)) => {
                let mut path = document.path(node);
                if attribute && !self.attrib_name.is_empty() {
                    path.push('.');
                    path.push_str(&self.attrib_name);
                }
                log::warn!(
                    "Invalid {} content:{}: {}={}",
                    kind,
                    document.node(node).line,
                    path,
                    self.property
                );
            }
            _ => log::warn!("Invalid {} content: {}", kind, self.property),
        }
    }
}

impl Drop for XmlArchive {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("[xml] close failed: {}", e);
        }
    }
}

impl fmt::Debug for XmlArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlArchive")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("open", &self.document.is_some())
            .finish()
    }
}

impl Archive for XmlArchive {
    fn state(&self) -> &ArchiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArchiveState {
        &mut self.state
    }

    fn set_validity(&mut self, valid: bool) {
        if !valid {
            let hint = self.state.hint;
            if hint.xml_element {
                self.report("element", self.location, false);
            } else if hint.xml_cdata {
                self.report("CDATA", self.current, false);
            } else {
                self.report("attribute", self.current, true);
            }
        }
        self.state.valid = valid;
    }

    fn locate_object_by_name(
        &mut self,
        name: &str,
        target_class: Option<&str>,
        _nullable: bool,
    ) -> bool {
        let reading = self.state.reading;
        let hint = self.state.hint;
        let Some(current) = self.current else {
            if reading {
                return false;
            }
            return match target_class {
                Some(target) if !hint.static_type => {
                    self.add_child(name, target);
                    self.location.is_some()
                }
                Some(_) => {
                    self.location = self.append(name);
                    self.location.is_some()
                }
                None => false,
            };
        };

        if let Some(target) = target_class {
            if reading {
                let target = if hint.static_type { None } else { Some(target) };
                self.location = self.find_tag(current, name, target);
            } else {
                self.property.clear();
                if hint.static_type {
                    self.location = self.append(name);
                } else {
                    self.add_child(name, target);
                }
            }
            return self.location.is_some();
        }

        if !reading {
            self.location = Some(current);
            self.property = name.to_string();
            return true;
        }

        self.attrib_name.clear();
        let Some(document) = self.document.as_ref() else {
            return false;
        };
        if name.is_empty() {
            self.property = document.text(current).unwrap_or_default().to_string();
            return true;
        }
        if hint.xml_element {
            let element = document
                .children(current)
                .iter()
                .copied()
                .find(|&child| document.name(child) == name);
            return match element {
                Some(element) => {
                    self.property = document.text(element).unwrap_or_default().to_string();
                    self.location = Some(element);
                    true
                }
                None => {
                    self.property.clear();
                    false
                }
            };
        }
        let content = if hint.xml_cdata {
            document.text(current)
        } else {
            document.attribute(current, name)
        };
        match content {
            Some(content) => {
                self.property = content.to_string();
                if !hint.xml_cdata {
                    self.attrib_name = name.to_string();
                }
                true
            }
            None => {
                self.property.clear();
                false
            }
        }
    }

    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool {
        let Some(location) = self.location else {
            return false;
        };
        let Some(target) = target_class else {
            return false;
        };
        let static_type = self.state.hint.static_type;
        if self.state.reading {
            let target = if static_type { None } else { Some(target) };
            self.location = self.find_next_tag(location, name, target);
        } else if static_type {
            self.location = self.append(name);
        } else {
            self.add_child(name, target);
        }
        self.location.is_some()
    }

    fn determine_class_name(&mut self) -> Option<String> {
        let location = self.location?;
        self.document
            .as_ref()
            .map(|document| document.name(location).to_string())
    }

    fn set_class_name(&mut self, class_name: Option<&str>) {
        if let (Some(name), Some(location), Some(document)) =
            (class_name, self.location, self.document.as_mut())
        {
            document.rename(location, name);
        }
    }

    fn serialize_nested(&mut self, body: &mut dyn FnMut(&mut dyn Archive)) {
        if !self.state.reading && self.state.hint.xml_element && !self.property.is_empty() {
            let name = std::mem::take(&mut self.property);
            self.location = self.append(&name);
            let hint = &mut self.state.hint;
            hint.xml_element = false;
            hint.xml_cdata = true;
        }
        let current = self.current;
        let location = self.location;
        self.current = self.location;
        body(self);
        self.current = current;
        self.location = location;
    }

    fn read_value(&mut self, ty: ValueType) -> Option<Value> {
        if !ty.list && ty.kind == ValueKind::String {
            return Some(Value::String(self.property.clone()));
        }
        let value = Value::parse(ty, &self.property, self.config.list_delimiter);
        if value.is_none() {
            self.set_validity(false);
        }
        value
    }

    fn write_value(&mut self, value: &Value) {
        let text = value.to_text(self.config.list_delimiter);
        self.write_text(&text);
    }
}

fn decompress(compression: Compression, bytes: &[u8]) -> Result<Vec<u8>, XmlError> {
    if compression == Compression::None {
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::new();
    match bytes {
        [0x1f, 0x8b, ..] => {
            GzDecoder::new(bytes).read_to_end(&mut out)?;
        }
        [0x78, _, ..] => {
            ZlibDecoder::new(bytes).read_to_end(&mut out)?;
        }
        _ => out.extend_from_slice(bytes),
    }
    Ok(out)
}

fn compress(compression: Compression, text: Vec<u8>) -> Result<Vec<u8>, XmlError> {
    let level = flate2::Compression::default();
    match compression {
        Compression::None => Ok(text),
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(&text)?;
            Ok(encoder.finish()?)
        }
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(&text)?;
            Ok(encoder.finish()?)
        }
    }
}
