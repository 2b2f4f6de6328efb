//! Display row assembly.
//!
//! Turns one generated table row into the flat map stored under the
//! reserved `kubectl` key. Keys are column names in upper snake case.

use serde_json::{Map, Value};

use crate::enrich::error::EnrichError;
use crate::printers::{RowCondition, Table, NONE};

/// Reserved top-level key holding the display row.
pub const DISPLAY_FIELD: &str = "kubectl";

/// Key of the derived conditions entry, before formatting.
const CONDITIONS_COLUMN: &str = "Conditions";

/// "Restart Count" → "RESTART_COUNT".
pub fn format_column(name: &str) -> String {
    name.to_uppercase().replace(' ', "_")
}

/// Join `(reason, message)` pairs as "reason, message; ...", or `<none>`.
pub fn join_conditions(conditions: &[RowCondition]) -> String {
    if conditions.is_empty() {
        return NONE.to_string();
    }
    conditions
        .iter()
        .map(|c| format!("{}, {}", c.reason, c.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build the display map from a table that must hold exactly one row.
pub fn display_row(table: Table) -> Result<Map<String, Value>, EnrichError> {
    let mut rows = table.rows;
    let row = match rows.len() {
        0 => return Err(EnrichError::NoRowProduced),
        1 => rows.remove(0),
        n => return Err(EnrichError::AmbiguousRowProduced(n)),
    };
    if row.cells.len() != table.column_definitions.len() {
        return Err(EnrichError::ColumnMismatch {
            columns: table.column_definitions.len(),
            cells: row.cells.len(),
        });
    }

    let mut values = Map::new();
    values.insert(
        format_column(CONDITIONS_COLUMN),
        Value::String(join_conditions(&row.conditions)),
    );
    for (column, cell) in table.column_definitions.iter().zip(row.cells) {
        values.insert(format_column(column.name), Value::from(cell));
    }

    Ok(values)
}
