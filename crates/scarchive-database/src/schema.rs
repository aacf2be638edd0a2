// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Relational schema of the reference data model
//!
//! Every stored object owns a row in `Object`; public objects also own a
//! row in `PublicObject` mapping their publicID. Each concrete class has a
//! table keyed by the same `_oid` with a `_parent_oid` link to its owner.
//! Embedded value objects are flattened into `<field>_<member>` columns,
//! optional ones with an extra `<field>_used` flag.
//!
//! ```sql
//! CREATE TABLE Meta (name TEXT PRIMARY KEY, value TEXT NOT NULL);
//! CREATE TABLE Object (_oid INTEGER PRIMARY KEY AUTOINCREMENT, _timestamp TEXT);
//! CREATE TABLE PublicObject (_oid INTEGER PRIMARY KEY, publicID TEXT NOT NULL UNIQUE);
//! CREATE TABLE Arrival (
//!     _oid INTEGER PRIMARY KEY,
//!     _parent_oid INTEGER,
//!     _last_modified TEXT DEFAULT CURRENT_TIMESTAMP,
//!     pickID TEXT NOT NULL,
//!     phase TEXT NOT NULL,
//!     ...
//! );
//! ```

use scarchive::datamodel;

/// Meta table key of the stored schema version.
pub const SCHEMA_VERSION_KEY: &str = "Schema-Version";

struct Table {
    name: &'static str,
    columns: Vec<(String, &'static str)>,
    unique: &'static [&'static str],
}

impl Table {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: Vec::new(),
            unique: &[],
        }
    }

    fn column(mut self, name: &str, ty: &'static str) -> Self {
        self.columns.push((name.to_string(), ty));
        self
    }

    fn unique(mut self, columns: &'static [&'static str]) -> Self {
        self.unique = columns;
        self
    }

    fn time(self, name: &str, ty: &'static str) -> Self {
        let ms = format!("{}_ms", name);
        let ms_ty = if ty.ends_with("NOT NULL") {
            "INTEGER NOT NULL"
        } else {
            "INTEGER"
        };
        self.column(name, ty).column(&ms, ms_ty)
    }

    fn uncertainties(self, name: &str) -> Self {
        ["uncertainty", "lowerUncertainty", "upperUncertainty", "confidenceLevel"]
            .iter()
            .fold(self, |table, member| {
                table.column(&format!("{}_{}", name, member), "REAL")
            })
    }

    fn real_quantity(self, name: &str, optional: bool) -> Self {
        let value = format!("{}_value", name);
        let table = if optional {
            self.column(&value, "REAL")
        } else {
            self.column(&value, "REAL NOT NULL")
        };
        table.uncertainties(name).used(name, optional)
    }

    fn time_quantity(self, name: &str) -> Self {
        let value = format!("{}_value", name);
        self.time(&value, "TEXT NOT NULL").uncertainties(name)
    }

    fn creation_info(self) -> Self {
        let table = ["agencyID", "agencyURI", "author", "authorURI"]
            .iter()
            .fold(self, |table, member| {
                table.column(&format!("creationInfo_{}", member), "TEXT")
            });
        table
            .time("creationInfo_creationTime", "TEXT")
            .time("creationInfo_modificationTime", "TEXT")
            .column("creationInfo_version", "TEXT")
            .used("creationInfo", true)
    }

    fn used(self, name: &str, optional: bool) -> Self {
        if optional {
            self.column(&format!("{}_used", name), "INTEGER NOT NULL DEFAULT 0")
        } else {
            self
        }
    }

    fn statements(&self, prefix: &str) -> Vec<String> {
        let mut columns = vec![
            "_oid INTEGER PRIMARY KEY".to_string(),
            "_parent_oid INTEGER".to_string(),
            "_last_modified TEXT DEFAULT CURRENT_TIMESTAMP".to_string(),
        ];
        columns.extend(
            self.columns
                .iter()
                .map(|(name, ty)| format!("\"{}{}\" {}", prefix, name, ty)),
        );
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.name,
            columns.join(", ")
        )];
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS \"{0}_parent\" ON \"{0}\"(_parent_oid)",
            self.name
        ));
        if !self.unique.is_empty() {
            let keys: Vec<String> = self
                .unique
                .iter()
                .map(|c| format!("\"{}{}\"", prefix, c))
                .collect();
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{0}_index\" ON \"{0}\"(_parent_oid, {1})",
                self.name,
                keys.join(", ")
            ));
        }
        statements
    }
}

fn tables() -> Vec<Table> {
    vec![
        Table::new("EventParameters"),
        Table::new("Comment")
            .column("text", "TEXT NOT NULL")
            .column("id", "TEXT")
            .time("start", "TEXT")
            .time("end", "TEXT")
            .creation_info()
            .unique(&["id"]),
        Table::new("Pick")
            .time_quantity("time")
            .column("filterID", "TEXT")
            .column("methodID", "TEXT")
            .real_quantity("backazimuth", true)
            .column("onset", "TEXT")
            .column("phaseHint", "TEXT")
            .column("evaluationMode", "TEXT")
            .creation_info(),
        Table::new("Arrival")
            .column("pickID", "TEXT NOT NULL")
            .column("phase", "TEXT NOT NULL")
            .column("timeResidual", "REAL")
            .column("distance", "REAL")
            .column("azimuth", "REAL")
            .column("weight", "REAL")
            .creation_info()
            .unique(&["pickID"]),
        Table::new("Origin")
            .time_quantity("time")
            .real_quantity("latitude", false)
            .real_quantity("longitude", false)
            .real_quantity("depth", true)
            .column("methodID", "TEXT")
            .column("earthModelID", "TEXT")
            .column("evaluationMode", "TEXT")
            .creation_info(),
    ]
}

/// Statements creating the complete schema, in execution order.
pub fn statements(column_prefix: &str) -> Vec<String> {
    let mut statements = vec![
        "CREATE TABLE IF NOT EXISTS Meta (name TEXT PRIMARY KEY, value TEXT NOT NULL)".to_string(),
        "CREATE TABLE IF NOT EXISTS Object (\
            _oid INTEGER PRIMARY KEY AUTOINCREMENT, \
            _timestamp TEXT DEFAULT CURRENT_TIMESTAMP)"
            .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS PublicObject (\
                _oid INTEGER PRIMARY KEY, \
                \"{}publicID\" TEXT NOT NULL UNIQUE)",
            column_prefix
        ),
    ];
    for table in tables() {
        statements.extend(table.statements(column_prefix));
    }
    statements.push(format!(
        "INSERT OR IGNORE INTO Meta (name, value) VALUES ('{}', '{}')",
        SCHEMA_VERSION_KEY,
        datamodel::VERSION
    ));
    statements
}
