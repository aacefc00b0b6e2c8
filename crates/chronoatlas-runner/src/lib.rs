//! LLM-backed historical analysis for the Chronoatlas engine.
//!
//! The runner turns "tell me about this place in this year" into a
//! structured [`AnalysisArtifact`](chronoatlas_types::AnalysisArtifact):
//! it enriches the request with lookups from `chronoatlas-atlas`, renders a
//! prompt, calls the configured LLM backend and parses the tagged answer.
//!
//! # Modules
//!
//! - [`config`] -- Backend selection and sampling settings.
//! - [`llm`] -- OpenAI-compatible and Gemini HTTP backends.
//! - [`prompt`] -- `minijinja` prompt templates.
//! - [`parse`] -- Tagged-section parser with a demographics recovery ladder.
//! - [`place_history`] -- Place-name etymology parsing.
//! - [`orchestrator`] -- Request enrichment, generation, per-client
//!   supersession and the ruler and event lookups.
//! - [`error`] -- Error types.

pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod parse;
pub mod place_history;
pub mod prompt;

pub use config::{BackendType, LlmConfig};
pub use error::RunnerError;
pub use orchestrator::{
    AnalysisOrchestrator, AnalysisOutcome, AnalysisSession, EVENT_FAILED_PREFIX, LlmGenerator,
    TextGenerator, resolve_searched_name,
};
pub use parse::parse_artifact;
pub use place_history::parse_place_name_history;
pub use prompt::PromptEngine;
