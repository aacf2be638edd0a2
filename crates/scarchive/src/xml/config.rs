// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML archive configuration.

use crate::archive::Version;
use serde::{Deserialize, Serialize};

/// Default root element of archive documents.
pub const DEFAULT_ROOT_NAME: &str = "seiscomp";

/// Namespace URI prefix; the schema version `M.m` is appended on write.
pub const DEFAULT_NAMESPACE_BASE: &str = "http://geofon.gfz-potsdam.de/ns/seiscomp3-schema/";

/// Stream codec wrapped around the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
    Gzip,
}

/// XML archive configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlArchiveConfig {
    /// Name of the enclosing root element (default: seiscomp)
    #[serde(default = "default_root_name")]
    pub root_name: String,

    /// Namespace base URI
    #[serde(default = "default_namespace_base")]
    pub namespace_base: String,

    /// Codec applied on write. On read any codec enables magic byte detection.
    #[serde(default)]
    pub compression: Compression,

    /// Indent the written document
    #[serde(default)]
    pub formatted: bool,

    /// Separator of list items (default: space)
    #[serde(default = "default_list_delimiter")]
    pub list_delimiter: char,

    /// Write the root element. Without it the first object becomes the
    /// document element.
    #[serde(default = "default_true")]
    pub header: bool,

    /// Schema version written instead of the data model version
    #[serde(default)]
    pub version: Option<Version>,
}

fn default_root_name() -> String {
    DEFAULT_ROOT_NAME.to_string()
}

fn default_namespace_base() -> String {
    DEFAULT_NAMESPACE_BASE.to_string()
}

fn default_list_delimiter() -> char {
    ' '
}

fn default_true() -> bool {
    true
}

impl Default for XmlArchiveConfig {
    fn default() -> Self {
        Self {
            root_name: default_root_name(),
            namespace_base: default_namespace_base(),
            compression: Compression::None,
            formatted: false,
            list_delimiter: default_list_delimiter(),
            header: true,
            version: None,
        }
    }
}

impl XmlArchiveConfig {
    pub fn with_root_name(mut self, name: &str) -> Self {
        self.root_name = name.to_string();
        self
    }

    pub fn with_namespace_base(mut self, base: &str) -> Self {
        self.namespace_base = base.to_string();
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn formatted(mut self, enable: bool) -> Self {
        self.formatted = enable;
        self
    }

    pub fn with_list_delimiter(mut self, delimiter: char) -> Self {
        self.list_delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Force the schema version written to new documents.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = XmlArchiveConfig::default();
        assert_eq!(config.root_name, "seiscomp");
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.list_delimiter, ' ');
        assert!(config.header && !config.formatted);
        assert!(config.version.is_none());
    }

    #[test]
    fn test_builder() {
        let config = XmlArchiveConfig::default()
            .with_root_name("catalog")
            .with_compression(Compression::Gzip)
            .formatted(true)
            .with_version(Version::new(0, 10));
        assert_eq!(config.root_name, "catalog");
        assert_eq!(config.compression, Compression::Gzip);
        assert!(config.formatted);
        assert_eq!(config.version, Some(Version::new(0, 10)));
    }
}
