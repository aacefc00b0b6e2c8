//! Shared application state for the API server.
//!
//! Datasets are loaded once at startup and never mutated, so handlers read
//! them without locking. The only mutable part is the per-client analysis
//! sessions inside the orchestrator.

use chronoatlas_runner::{AnalysisOrchestrator, TextGenerator};
use chronoatlas_types::{GeoRegion, HistoricalEntity};

/// Shared state for the Axum application, injected as `Arc<AppState<G>>`.
///
/// Generic over the text generator so tests can run the full router
/// against scripted responses.
pub struct AppState<G> {
    /// Datasets, generator and analysis sessions.
    pub orchestrator: AnalysisOrchestrator<G>,
}

impl<G: TextGenerator> AppState<G> {
    /// Create the state from loaded datasets and a generator.
    pub fn new(generator: G, districts: Vec<GeoRegion>, entities: Vec<HistoricalEntity>) -> Self {
        Self {
            orchestrator: AnalysisOrchestrator::new(generator, districts, entities),
        }
    }

    /// District polygons.
    pub fn districts(&self) -> &[GeoRegion] {
        self.orchestrator.districts()
    }

    /// Historical entities.
    pub fn entities(&self) -> &[HistoricalEntity] {
        self.orchestrator.entities()
    }
}
