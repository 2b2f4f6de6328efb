//! Per-object enrichment.

use serde_json::Value;

use crate::enrich::columns::{display_row, DISPLAY_FIELD};
use crate::enrich::error::EnrichError;
use crate::enrich::registry::EnrichmentRegistry;

/// The `kind` of a document, if it has a non-empty one.
pub fn kind_of(doc: &Value) -> Option<&str> {
    doc.get("kind")
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())
}

/// Add the display row of `doc` under [`DISPLAY_FIELD`].
///
/// Unregistered kinds are left alone. On error the document is unchanged.
pub fn enrich_object(registry: &EnrichmentRegistry, doc: &mut Value) -> Result<(), EnrichError> {
    let Some(generate) = kind_of(&*doc).and_then(|kind| registry.lookup(kind)) else {
        return Ok(());
    };

    let values = display_row(generate(&*doc)?)?;

    if let Value::Object(fields) = doc {
        fields.insert(DISPLAY_FIELD.to_string(), Value::Object(values));
    }
    Ok(())
}
