//! REST API endpoint handlers.
//!
//! Lookup endpoints answer synchronously from the datasets held in
//! [`AppState`]. The analysis endpoints await the text generator.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/api/districts/locate` | District enclosing a point |
//! | `GET` | `/api/entities` | Entities existing in a year |
//! | `GET` | `/api/entities/search` | One entity's name at a year |
//! | `GET` | `/api/timeline/percent` | Year to slider position |
//! | `GET` | `/api/timeline/year` | Slider position to year |
//! | `POST` | `/api/analysis` | Run a historical analysis |
//! | `POST` | `/api/place-history` | A place's name history |
//! | `POST` | `/api/dynasty-info` | Ruler and succession at a year |
//! | `POST` | `/api/event-analysis` | Battle or treaty analysis |

use std::fmt::Display;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chronoatlas_atlas::timeline::{percent_to_year, year_to_percent};
use chronoatlas_atlas::{find_entity, list_entities_active_in_year, locate_district};
use chronoatlas_runner::{AnalysisOutcome, TextGenerator, resolve_searched_name};
use chronoatlas_types::{AnalysisRequest, DynastyRequest, EventAnalysisRequest};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter and body structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/districts/locate`.
#[derive(Debug, serde::Deserialize)]
pub struct LocateQuery {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Query parameters carrying only a year.
#[derive(Debug, serde::Deserialize)]
pub struct YearQuery {
    /// The timeline year (negative for BCE).
    pub year: i32,
}

/// Query parameters for `GET /api/entities/search`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    /// Modern or historical name to look for.
    pub q: String,
    /// The timeline year.
    pub year: i32,
}

/// Query parameters for `GET /api/timeline/year`.
#[derive(Debug, serde::Deserialize)]
pub struct PercentQuery {
    /// Slider position in percent.
    pub percent: f64,
}

/// Body of `POST /api/place-history`.
#[derive(Debug, serde::Deserialize)]
pub struct PlaceHistoryRequest {
    /// The place whose names are requested.
    pub place: String,
}

fn invalid(e: impl Display) -> ApiError {
    ApiError::InvalidQuery(e.to_string())
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Return the district enclosing a point, or `null`.
pub async fn locate<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    query: Result<Query<LocateQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(invalid)?;
    if !params.lat.is_finite() || !params.lng.is_finite() {
        return Err(ApiError::InvalidQuery(
            "lat and lng must be finite numbers".to_owned(),
        ));
    }

    let district = locate_district(params.lat, params.lng, state.districts());
    Ok(Json(serde_json::json!({ "district": district })))
}

/// List the entities that existed in a year under their names of the time.
pub async fn list_entities<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    query: Result<Query<YearQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(invalid)?;
    let entities = list_entities_active_in_year(state.entities(), params.year);

    Ok(Json(serde_json::json!({
        "year": params.year,
        "count": entities.len(),
        "entities": entities,
    })))
}

/// Find one entity and resolve its name at a year.
///
/// Falls back to the nearest epoch when none covers the year.
pub async fn search_entity<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(invalid)?;
    if params.q.trim().is_empty() {
        return Err(ApiError::InvalidQuery("q must not be empty".to_owned()));
    }

    let entity = find_entity(state.entities(), &params.q)
        .ok_or_else(|| ApiError::NotFound(format!("entity {}", params.q.trim())))?;

    Ok(Json(serde_json::json!({
        "key": entity.canonical_key,
        "location": entity.location,
        "resolved": resolve_searched_name(entity, params.year),
    })))
}

/// Convert a year to a slider position.
pub async fn timeline_percent(
    query: Result<Query<YearQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(invalid)?;
    Ok(Json(serde_json::json!({
        "year": params.year,
        "percent": year_to_percent(params.year),
    })))
}

/// Convert a slider position to a year.
pub async fn timeline_year(
    query: Result<Query<PercentQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(invalid)?;
    if !params.percent.is_finite() {
        return Err(ApiError::InvalidQuery("percent must be a finite number".to_owned()));
    }
    Ok(Json(serde_json::json!({
        "percent": params.percent,
        "year": percent_to_year(params.percent),
    })))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Run an analysis and return the applied artifact.
///
/// Generation failures are returned as a `200` artifact with `error` set.
/// A request overtaken by a newer one from the same session answers `409`.
pub async fn run_analysis<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(invalid)?;

    match state.orchestrator.run_analysis(&request).await {
        AnalysisOutcome::Applied { artifact, .. } => Ok(Json(artifact)),
        AnalysisOutcome::Superseded { token, latest } => {
            Err(ApiError::Superseded { token, latest })
        }
    }
}

/// Return a place's name history, oldest first.
pub async fn place_history<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Result<Json<PlaceHistoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(invalid)?;
    if request.place.trim().is_empty() {
        return Err(ApiError::InvalidQuery("place must not be empty".to_owned()));
    }

    let history = state.orchestrator.place_name_history(&request.place).await;
    Ok(Json(history))
}

/// Return who ruled a polity in a year, or an empty `result`.
pub async fn dynasty_info<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Result<Json<DynastyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(invalid)?;
    if request.polity_name.trim().is_empty() {
        return Err(ApiError::InvalidQuery("polityName must not be empty".to_owned()));
    }

    let result = state.orchestrator.dynasty_info(&request).await;
    Ok(Json(serde_json::json!({ "result": result })))
}

/// Return the analysis of a battle or treaty.
///
/// A failed generation is reported inside `result` as a warning line.
pub async fn event_analysis<G: TextGenerator>(
    State(state): State<Arc<AppState<G>>>,
    body: Result<Json<EventAnalysisRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(invalid)?;
    if request.event_name.trim().is_empty() {
        return Err(ApiError::InvalidQuery("eventName must not be empty".to_owned()));
    }

    let result = state.orchestrator.event_analysis(&request).await;
    Ok(Json(serde_json::json!({ "result": result })))
}
