//! Shared type definitions for the Chronoatlas historical map engine.
//!
//! This crate is the single source of truth for the data model shared by
//! the lookup primitives, the analysis runner and the HTTP facade. Types the
//! map UI consumes flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`geo`] -- Coordinates, polygon rings and named regions
//! - [`temporal`] -- Time-bounded records, historical entities and resolved names
//! - [`analysis`] -- Analysis requests, contexts and the parsed artifact

pub mod analysis;
pub mod geo;
pub mod temporal;

// Re-export all public types at crate root for convenience.
pub use analysis::{
    AnalysisArtifact, AnalysisContext, AnalysisRequest, Demographics, DynastyRequest,
    EventAnalysisRequest, PlaceNameEntry, SubjectMetadata,
};
pub use geo::{Coordinates, GeoRegion, Geometry, Polygon, Position, Ring};
pub use temporal::{
    ActiveEntity, EntityKind, EpochName, HistoricalEntity, ResolvedName, TimeBoundedRecord,
};

#[cfg(test)]
mod tests {
    //! Export checks for `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Calling export_all writes the bindings into `bindings/`
        // relative to the crate root.
        use ts_rs::TS;

        let _ = crate::geo::Coordinates::export_all();
        let _ = crate::temporal::EntityKind::export_all();
        let _ = crate::temporal::EpochName::export_all();
        let _ = crate::temporal::ResolvedName::export_all();
        let _ = crate::temporal::ActiveEntity::export_all();
        let _ = crate::analysis::Demographics::export_all();
        let _ = crate::analysis::AnalysisArtifact::export_all();
        let _ = crate::analysis::AnalysisRequest::export_all();
        let _ = crate::analysis::AnalysisContext::export_all();
        let _ = crate::analysis::PlaceNameEntry::export_all();
        let _ = crate::analysis::SubjectMetadata::export_all();
        let _ = crate::analysis::DynastyRequest::export_all();
        let _ = crate::analysis::EventAnalysisRequest::export_all();
    }
}
