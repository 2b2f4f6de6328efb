//! Kind → table generator lookup.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::enrich::error::EnrichError;
use crate::printers::pod::{pod_table, Pod};
use crate::printers::Table;

/// Converts one generic document to its typed form and prints it.
pub type TableFn = fn(&Value) -> Result<Table, EnrichError>;

/// Read-only mapping from object kind (exact, case-sensitive) to a generator.
///
/// Built once before serving and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct EnrichmentRegistry {
    entries: HashMap<String, TableFn>,
}

impl EnrichmentRegistry {
    /// Build from explicit pairs. A repeated kind keeps the last generator.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, TableFn)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(kind, f)| (kind.to_string(), f))
                .collect(),
        }
    }

    /// The kinds this proxy knows how to print.
    pub fn builtin() -> Self {
        Self::new([("Pod", pod_rows as TableFn)])
    }

    pub fn lookup(&self, kind: &str) -> Option<TableFn> {
        self.entries.get(kind).copied()
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for EnrichmentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn pod_rows(doc: &Value) -> Result<Table, EnrichError> {
    let pod = Pod::deserialize(doc)?;
    Ok(pod_table(&pod, Utc::now()))
}
