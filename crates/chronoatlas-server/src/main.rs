//! Chronoatlas server entry point.
//!
//! Loads `chronoatlas-config.yaml` (or the file named by
//! `CHRONOATLAS_CONFIG`), the district and entity datasets, and the LLM
//! backend, then serves the HTTP API until `Ctrl-C`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chronoatlas_atlas::{AtlasError, load_entities, load_regions};
use chronoatlas_runner::LlmGenerator;
use chronoatlas_server::{AppConfig, AppState, LoggingConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "chronoatlas-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CHRONOATLAS_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_logging(&config.logging);
    info!(
        config = %config_path.display(),
        found = config_path.exists(),
        "chronoatlas-server starting"
    );

    let districts = load_optional(&config.datasets.districts, load_regions)
        .context("loading district dataset")?;
    let entities = load_optional(&config.datasets.entities, load_entities)
        .context("loading entity dataset")?;

    let generator = LlmGenerator::from_config(&config.llm)
        .context("initialising text generator (set LLM_API_KEY or GEMINI_API_KEY)")?;

    let state = Arc::new(AppState::new(generator, districts, entities));
    start_server(&config.server, state).await?;
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load a dataset, treating a missing file as an empty dataset.
fn load_optional<T>(
    path: &Path,
    load: fn(&Path) -> Result<Vec<T>, AtlasError>,
) -> Result<Vec<T>, AtlasError> {
    if path.exists() {
        return load(path);
    }
    warn!(path = %path.display(), "dataset file not found, starting with an empty dataset");
    Ok(Vec::new())
}
