//! Enrichment and transform error definitions.

use thiserror::Error;

/// Why a single object could not be enriched.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The generic document does not fit the typed resource.
    #[error("convert to typed resource: {0}")]
    Conversion(#[from] serde_json::Error),

    /// The table generator produced no row for the object.
    #[error("generate table: no row")]
    NoRowProduced,

    /// The table generator produced more than one row for one object.
    #[error("generate table: {0} rows for one object")]
    AmbiguousRowProduced(usize),

    /// Cells and column definitions disagree.
    #[error("generate table: {cells} cells for {columns} columns")]
    ColumnMismatch { columns: usize, cells: usize },
}

/// Outcome of a body transform other than success.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Not an enrichable shape, or the kind is not registered.
    #[error("body not enrichable")]
    NotApplicable,

    /// One object failed; nothing of the transformed body may be used.
    #[error("enrich {kind}: {source}")]
    PartialFailure {
        kind: String,
        #[source]
        source: EnrichError,
    },

    /// The enriched structure could not be encoded again.
    #[error("serialize enriched body: {0}")]
    Serialization(#[source] serde_json::Error),
}
