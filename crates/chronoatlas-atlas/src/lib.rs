//! Temporal and spatial lookups for the Chronoatlas historical map.
//!
//! This crate holds the pure resolution primitives: which time-bounded
//! record is valid at a year, which region encloses a point, and which name
//! an entity carried when. All lookups are synchronous, side-effect free and
//! safe to call from any thread.
//!
//! # Modules
//!
//! - [`interval`] -- First-match lookup over time-bounded records.
//! - [`locator`] -- Ray-casting point-in-polygon against region datasets.
//! - [`names`] -- Period-appropriate names for entities and year listings.
//! - [`dataset`] -- `GeoJSON` and entity dataset loading with data-quality
//!   reporting.
//! - [`timeline`] -- Piecewise-linear year/slider scale.
//! - [`error`] -- Error types for dataset loading.

pub mod dataset;
pub mod error;
pub mod interval;
pub mod locator;
pub mod names;
pub mod timeline;

// Re-export primary entry points at crate root.
pub use dataset::{DataQualityIssue, load_entities, load_regions, validate_entities, validate_regions};
pub use error::AtlasError;
pub use locator::{locate_district, locate_region};
pub use names::{find_entity, list_entities_active_in_year, resolve_historical_name};
