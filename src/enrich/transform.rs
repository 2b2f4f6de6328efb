//! Whole-body transform.
//!
//! # Classification
//! ```text
//! JSON object with `kind` and a non-empty `items` array of objects → collection
//! JSON object with `kind`                                         → single object
//! anything else (empty list, scalar, invalid JSON)                → NotApplicable
//! ```
//!
//! # Design Decisions
//! - A collection is dispatched on its first item's kind
//! - All-or-nothing: one failing item discards the whole transformed list
//! - The caller keeps the original bytes for every error outcome

use serde_json::{Map, Value};

use crate::enrich::error::TransformError;
use crate::enrich::object::{enrich_object, kind_of};
use crate::enrich::registry::EnrichmentRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Collection,
    Single,
    Unrecognized,
}

fn classify(root: &Value) -> Shape {
    if kind_of(root).is_none() {
        return Shape::Unrecognized;
    }
    match root.get("items") {
        Some(Value::Array(items)) if items.is_empty() => Shape::Unrecognized,
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => Shape::Collection,
        Some(Value::Array(_)) => Shape::Unrecognized,
        _ => Shape::Single,
    }
}

/// Enrich every recognized object in `raw` and serialize the result.
pub fn transform_body(registry: &EnrichmentRegistry, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
    let mut root: Value = serde_json::from_slice(raw).map_err(|_| TransformError::NotApplicable)?;

    match classify(&root) {
        Shape::Collection => enrich_collection(registry, &mut root)?,
        Shape::Single => enrich_single(registry, &mut root)?,
        Shape::Unrecognized => return Err(TransformError::NotApplicable),
    }

    serde_json::to_vec(&root).map_err(TransformError::Serialization)
}

fn enrich_single(registry: &EnrichmentRegistry, doc: &mut Value) -> Result<(), TransformError> {
    let kind = kind_of(&*doc).unwrap_or_default().to_string();
    if !registry.is_registered(&kind) {
        return Err(TransformError::NotApplicable);
    }
    enrich_object(registry, doc).map_err(|source| TransformError::PartialFailure { kind, source })
}

fn enrich_collection(registry: &EnrichmentRegistry, root: &mut Value) -> Result<(), TransformError> {
    let Value::Object(list) = root else {
        return Err(TransformError::NotApplicable);
    };
    let item_kind = list
        .get("kind")
        .and_then(Value::as_str)
        .map(|kind| kind.strip_suffix("List").unwrap_or(kind).to_string())
        .unwrap_or_default();
    let api_version = list.get("apiVersion").cloned();

    let Some(Value::Array(items)) = list.get_mut("items") else {
        return Err(TransformError::NotApplicable);
    };

    for item in items.iter_mut() {
        if let Value::Object(fields) = item {
            inherit_list_kind(fields, &item_kind, api_version.as_ref());
        }
    }

    let dispatch_kind = items.first().and_then(kind_of).unwrap_or_default();
    if !registry.is_registered(dispatch_kind) {
        return Err(TransformError::NotApplicable);
    }

    for item in items.iter_mut() {
        if let Err(source) = enrich_object(registry, item) {
            return Err(TransformError::PartialFailure {
                kind: kind_of(&*item).unwrap_or_default().to_string(),
                source,
            });
        }
    }

    Ok(())
}

/// Items served inside a typed list usually omit `kind` and `apiVersion`.
fn inherit_list_kind(item: &mut Map<String, Value>, item_kind: &str, api_version: Option<&Value>) {
    let has = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty())
    };
    if has("kind") || has("apiVersion") || item_kind.is_empty() {
        return;
    }

    item.insert("kind".to_string(), Value::String(item_kind.to_string()));
    if let Some(version) = api_version {
        item.insert("apiVersion".to_string(), version.clone());
    }
}
