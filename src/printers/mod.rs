//! Human-readable table generation for API objects.
//!
//! Produces the same columns `kubectl get -o wide` shows. Each printer takes
//! a typed resource and returns a [`Table`] with one [`TableRow`] per object.

pub mod duration;
pub mod pod;

use serde_json::Value;

/// Placeholder shown for absent values.
pub const NONE: &str = "<none>";

/// A column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: &'static str,
    /// 0 = always shown, 1 = wide output only.
    pub priority: u8,
}

/// One cell value, a bare JSON string or number on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Integer(i64),
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Integer(n)
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Text(s) => Value::String(s),
            Cell::Integer(n) => Value::from(n),
        }
    }
}

/// A condition attached to a row, e.g. a completed pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCondition {
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub cells: Vec<Cell>,
    pub conditions: Vec<RowCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub column_definitions: &'static [ColumnDefinition],
    pub rows: Vec<TableRow>,
}
