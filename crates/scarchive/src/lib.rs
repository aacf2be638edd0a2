// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # scarchive - bidirectional object archives
//!
//! A serialization framework for graphs of domain objects: every class writes
//! a single `serialize` body against an abstract [`Archive`](archive::Archive),
//! and the same body reads and writes XML documents or relational rows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scarchive::datamodel::{EventParameters, Pick};
//! use scarchive::object::{ObjectRef, ObjectRegistry};
//! use scarchive::xml::{XmlArchive, XmlArchiveConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ObjectRegistry::global();
//!     let ep = EventParameters::create(&registry).expect("event parameters");
//!     ep.write().add_pick(Pick::create(&registry).expect("pick"));
//!
//!     let mut ar = XmlArchive::new(XmlArchiveConfig::default());
//!     ar.create("catalog.xml")?;
//!     ar.write_object(&ObjectRef::new(ep));
//!     ar.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------------------+
//! |  datamodel   Pick | Origin | Arrival | Comment | EventParameters |
//! +-----------------------------------------------------------------+
//! |  object      identity, ownership, registry, notifiers, visitors  |
//! +-----------------------------------------------------------------+
//! |  archive     traversal engine, hints, versions, validity         |
//! +-----------------------------------------------------------------+
//! |  meta        reflective properties and values                    |
//! |  factory     class names -> constructors, type checks            |
//! |  rtti        static type descriptors                             |
//! +-----------------------------------------------------------------+
//! |  backends    xml (this crate), database (scarchive-database)     |
//! +-----------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`archive`] - format-agnostic traversal (start here)
//! - [`object`] - object graph, ownership and change notification
//! - [`meta`] - property reflection
//! - [`xml`] - XML document backend
//! - [`datamodel`] - reference data model

/// Static type descriptors and inheritance checks.
pub mod rtti;
/// Class registry mapping names to constructors.
pub mod factory;
/// Reflective property descriptions and dynamic values.
pub mod meta;
/// Archive traversal engine and backend hooks.
pub mod archive;
/// Object identity, ownership, registry and notifiers.
pub mod object;
/// XML archive backend.
#[cfg(feature = "xml")]
pub mod xml;
/// Reference seismological data model.
pub mod datamodel;

/// Commonly used traits and types.
pub mod prelude {
    pub use crate::archive::{Archive, Hint, Version};
    pub use crate::meta::{EnumType, Value};
    pub use crate::object::{BaseObject, Class, Object, ObjectRef, ObjectRegistry, ObjectType};
}
