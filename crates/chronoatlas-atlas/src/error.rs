//! Error types for the `chronoatlas-atlas` crate.
//!
//! Lookups never fail: a missing match is `None`. Only dataset loading
//! returns [`AtlasError`].

use std::path::PathBuf;

/// Errors that can occur while loading reference datasets.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The dataset was not valid JSON of the expected shape.
    #[error("failed to decode dataset: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON document was well-formed but not a feature collection.
    #[error("not a GeoJSON FeatureCollection: found type {0:?}")]
    NotFeatureCollection(String),
}
