//! Base tables and functions of the simulated engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{FunctionCatalog, FunctionSignature};
use crate::error::{Result, SimError};

/// Integer-only table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<i64>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimDatabase {
    tables: BTreeMap<String, Table>,
    functions: FunctionCatalog,
}

impl SimDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: impl Into<String>, table: Table) -> Result<()> {
        let name = name.into().to_ascii_lowercase();
        if self.tables.contains_key(&name) {
            return Err(SimError::DuplicateTable(name));
        }
        let width = table.columns.len();
        if let Some(bad) = table.rows.iter().find(|r| r.len() != width) {
            return Err(SimError::Arity {
                table: name,
                expected: width,
                got: bad.len(),
            });
        }
        self.tables.insert(name, table);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        self.tables
            .remove(&name.to_ascii_lowercase())
            .ok_or_else(|| SimError::UnknownTable(name.to_string()))
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| SimError::UnknownTable(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn register_function(&mut self, name: impl Into<String>, signature: FunctionSignature) {
        self.functions.register(name, signature);
    }

    pub fn functions(&self) -> &FunctionCatalog {
        &self.functions
    }
}
