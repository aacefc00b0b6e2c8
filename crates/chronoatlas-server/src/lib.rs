//! HTTP API for the Chronoatlas historical map.
//!
//! An Axum server exposing the temporal and spatial lookups from
//! `chronoatlas-atlas` and the LLM-backed analyses from
//! `chronoatlas-runner` to the map UI.
//!
//! # Architecture
//!
//! Datasets are loaded once at startup into [`AppState`] and shared
//! read-only. Analysis requests go through a single
//! [`AnalysisOrchestrator`](chronoatlas_runner::AnalysisOrchestrator); when
//! a client fires a new request under the same `sessionId` before the
//! previous one answered, the older one is answered with `409 Conflict`
//! and its result discarded. Other clients' requests are unaffected.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use config::{AppConfig, ConfigError, DatasetsConfig, LoggingConfig, ServerConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
