// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database archive configuration

use serde::{Deserialize, Serialize};

/// Data source naming an in-memory SQLite database.
pub const MEMORY_SOURCE: &str = ":memory:";

/// Database archive configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub source: String,

    /// Prefix added to every attribute column name
    pub column_prefix: String,

    /// Rows fetched per page by keyset-paged cursors
    pub page_size: usize,

    /// Create the schema when opening (default: true)
    pub create_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            source: MEMORY_SOURCE.to_string(),
            column_prefix: String::new(),
            page_size: 64,
            create_schema: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new config builder
    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }

    /// True when the source names an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.source.is_empty() || self.source == MEMORY_SOURCE
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct DatabaseConfigBuilder {
    source: Option<String>,
    column_prefix: Option<String>,
    page_size: Option<usize>,
    create_schema: Option<bool>,
}

impl DatabaseConfigBuilder {
    /// Set the SQLite file path
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the attribute column prefix
    pub fn column_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_prefix = Some(prefix.into());
        self
    }

    /// Set the cursor page size (0 is raised to 1)
    pub fn page_size(mut self, rows: usize) -> Self {
        self.page_size = Some(rows.max(1));
        self
    }

    /// Create the schema on open
    pub fn create_schema(mut self, create: bool) -> Self {
        self.create_schema = Some(create);
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatabaseConfig {
        let defaults = DatabaseConfig::default();

        DatabaseConfig {
            source: self.source.unwrap_or(defaults.source),
            column_prefix: self.column_prefix.unwrap_or(defaults.column_prefix),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            create_schema: self.create_schema.unwrap_or(defaults.create_schema),
        }
    }
}
