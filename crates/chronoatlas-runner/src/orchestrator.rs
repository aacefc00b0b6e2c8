//! Analysis orchestration: from a UI request to an applied artifact.
//!
//! One analysis runs through these steps:
//! 1. Resolve the searched entity's name for the year (closest epoch when
//!    no epoch covers it)
//! 2. Locate the district enclosing the clicked point
//! 3. Build the [`AnalysisContext`] and call the text generator
//! 4. Parse the response into an [`AnalysisArtifact`]
//! 5. Apply the artifact only if no newer request from the same client
//!    session was issued meanwhile
//!
//! Generation failures never escape as errors: they become an artifact
//! whose `error` field carries a message for the user. The ruler and event
//! lookups degrade the same way, to an empty text or a warning line.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chronoatlas_atlas::{find_entity, interval, locate_region, resolve_historical_name};
use chronoatlas_types::{
    AnalysisArtifact, AnalysisContext, AnalysisRequest, DynastyRequest, EventAnalysisRequest,
    GeoRegion, HistoricalEntity, PlaceNameEntry, ResolvedName,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, create_backend};
use crate::parse::parse_artifact;
use crate::place_history::parse_place_name_history;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Message shown when the backend reports its quota exhausted.
pub const RATE_LIMITED_MESSAGE: &str =
    "⚠️ Sistem şu an çok yoğun. Lütfen 10-15 saniye bekleyip tekrar deneyin.";

/// Prefix of the text returned when an event analysis fails.
pub const EVENT_FAILED_PREFIX: &str = "⚠️ Analiz yapılamadı: ";

/// Client sessions kept before idle ones are dropped.
const MAX_SESSIONS: usize = 1024;

// ---------------------------------------------------------------------------
// Text generation seam
// ---------------------------------------------------------------------------

/// Something that turns an analysis context into free text.
///
/// Production uses [`LlmGenerator`]; tests script their own responses.
pub trait TextGenerator: Send + Sync {
    /// Produce the tagged analysis text for a context.
    fn generate(
        &self,
        context: &AnalysisContext,
    ) -> impl Future<Output = Result<String, RunnerError>> + Send;

    /// Produce the JSON etymology text for a place name.
    fn generate_place_history(
        &self,
        place: &str,
    ) -> impl Future<Output = Result<String, RunnerError>> + Send;

    /// Produce the ruler and succession summary for a polity at a year.
    fn generate_dynasty_info(
        &self,
        polity: &str,
        year: i32,
    ) -> impl Future<Output = Result<String, RunnerError>> + Send;

    /// Produce the military or diplomatic analysis of an event.
    fn generate_event_analysis(
        &self,
        event: &EventAnalysisRequest,
    ) -> impl Future<Output = Result<String, RunnerError>> + Send;
}

/// Text generator backed by a prompt template and an LLM API.
pub struct LlmGenerator {
    prompts: PromptEngine,
    backend: LlmBackend,
}

impl LlmGenerator {
    /// Create a generator from its parts.
    pub const fn new(prompts: PromptEngine, backend: LlmBackend) -> Self {
        Self { prompts, backend }
    }

    /// Build the prompt engine and backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] when a template override cannot be
    /// loaded and [`RunnerError::Config`] when the backend lacks a key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RunnerError> {
        let prompts = match &config.templates_dir {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::new()?,
        };
        let backend = create_backend(config)?;
        info!(
            backend = backend.name(),
            model = %config.model,
            "text generator ready"
        );
        Ok(Self::new(prompts, backend))
    }

    async fn complete(&self, task: &str, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let started = Instant::now();
        let result = self.backend.complete(prompt).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            task,
            backend = self.backend.name(),
            latency_ms,
            ok = result.is_ok(),
            "LLM call finished"
        );
        result
    }
}

impl TextGenerator for LlmGenerator {
    async fn generate(&self, context: &AnalysisContext) -> Result<String, RunnerError> {
        let prompt = self.prompts.render_analysis(context)?;
        self.complete("analysis", &prompt).await
    }

    async fn generate_place_history(&self, place: &str) -> Result<String, RunnerError> {
        let prompt = self.prompts.render_place_history(place)?;
        self.complete("place_history", &prompt).await
    }

    async fn generate_dynasty_info(&self, polity: &str, year: i32) -> Result<String, RunnerError> {
        let prompt = self.prompts.render_dynasty(polity, year)?;
        self.complete("dynasty", &prompt).await
    }

    async fn generate_event_analysis(
        &self,
        event: &EventAnalysisRequest,
    ) -> Result<String, RunnerError> {
        let prompt = self.prompts.render_event(event)?;
        self.complete("event", &prompt).await
    }
}

// ---------------------------------------------------------------------------
// Superseding requests
// ---------------------------------------------------------------------------

/// The result of one [`AnalysisOrchestrator::run_analysis`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The artifact became the session's current artifact.
    Applied {
        /// The request's generation token.
        token: u64,
        /// The applied artifact.
        artifact: AnalysisArtifact,
    },
    /// A newer request from the same session was issued before this one
    /// finished; its artifact was discarded.
    Superseded {
        /// The request's generation token.
        token: u64,
        /// The session's newest token when this one settled.
        latest: u64,
    },
}

/// Tracks one client's latest issued request and the artifact it shows.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    latest: AtomicU64,
    applied: RwLock<Option<(u64, AnalysisArtifact)>>,
}

impl AnalysisSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new generation token. Every earlier token becomes stale.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// The most recently issued token, `0` before any request.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Replace the current artifact if `token` is still the latest.
    ///
    /// Returns whether the artifact was applied.
    pub async fn settle(&self, token: u64, artifact: AnalysisArtifact) -> bool {
        let mut applied = self.applied.write().await;
        if token != self.latest() {
            return false;
        }
        *applied = Some((token, artifact));
        true
    }

    /// The currently applied artifact, if any.
    pub async fn current(&self) -> Option<AnalysisArtifact> {
        self.applied
            .read()
            .await
            .as_ref()
            .map(|(_, artifact)| artifact.clone())
    }

    /// Whether the latest issued request has not settled yet.
    pub async fn is_pending(&self) -> bool {
        let latest = self.latest();
        let applied = self.applied.read().await;
        latest != 0 && applied.as_ref().map(|(token, _)| *token) != Some(latest)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Resolve a searched entity's name at `year`.
///
/// Uses the epoch covering `year`; if there is none, the chronologically
/// nearest epoch marked as approximate. `None` only for an entity without
/// epochs.
pub fn resolve_searched_name(entity: &HistoricalEntity, year: i32) -> Option<ResolvedName> {
    if let Some(epoch) = resolve_historical_name(entity, year) {
        return Some(ResolvedName {
            name: epoch.name.clone(),
            civilization: epoch.civilization.clone(),
            approximate: false,
        });
    }
    interval::nearest(&entity.epochs, year).map(|record| ResolvedName {
        name: record.payload.name.clone(),
        civilization: record.payload.civilization.clone(),
        approximate: true,
    })
}

/// The user-visible message for a generation failure.
pub fn failure_message(error: &RunnerError) -> String {
    match error {
        RunnerError::RateLimited(_) => RATE_LIMITED_MESSAGE.to_owned(),
        other => format!("⚠️ Hata: {other}."),
    }
}

/// Runs analyses against the loaded datasets.
pub struct AnalysisOrchestrator<G> {
    generator: G,
    districts: Vec<GeoRegion>,
    entities: Vec<HistoricalEntity>,
    sessions: RwLock<HashMap<String, Arc<AnalysisSession>>>,
}

impl<G: TextGenerator> AnalysisOrchestrator<G> {
    /// Create an orchestrator over read-only datasets.
    pub fn new(generator: G, districts: Vec<GeoRegion>, entities: Vec<HistoricalEntity>) -> Self {
        Self {
            generator,
            districts,
            entities,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The district polygons.
    pub fn districts(&self) -> &[GeoRegion] {
        &self.districts
    }

    /// The historical entities.
    pub fn entities(&self) -> &[HistoricalEntity] {
        &self.entities
    }

    /// The session for a client id, created on first use.
    ///
    /// Once 1024 sessions are held, those with no request in flight
    /// are dropped before a new one is added.
    pub async fn session(&self, id: &str) -> Arc<AnalysisSession> {
        let existing = self.sessions.read().await.get(id).cloned();
        if let Some(session) = existing {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(id) && sessions.len() >= MAX_SESSIONS {
            let before = sessions.len();
            sessions.retain(|_, session| Arc::strong_count(session) > 1);
            debug!(dropped = before.saturating_sub(sessions.len()), "idle sessions dropped");
        }
        Arc::clone(sessions.entry(id.to_owned()).or_default())
    }

    /// The text generator.
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Enrich a request with the searched name and the district.
    ///
    /// When the request names an entity but carries no point, the entity's
    /// own location is used for the district lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidRequest`] when the coordinates are not
    /// finite numbers.
    pub fn prepare_context(&self, request: &AnalysisRequest) -> Result<AnalysisContext, RunnerError> {
        if let Some(point) = request.coordinates.filter(|p| !p.is_finite()) {
            return Err(RunnerError::InvalidRequest(format!(
                "coordinates ({}, {}) are not finite",
                point.lat, point.lng
            )));
        }

        let entity = request
            .entity_key
            .as_deref()
            .and_then(|key| find_entity(&self.entities, key));
        let resolved = entity.and_then(|e| resolve_searched_name(e, request.year));
        let coordinates = request.coordinates.or_else(|| entity.map(|e| e.location));
        let district = coordinates
            .and_then(|point| locate_region(point, &self.districts))
            .map(|region| region.label.clone());

        Ok(AnalysisContext {
            subject_name: request.subject_name.clone(),
            year: request.year,
            coordinates,
            district,
            known_name_approximate: resolved.as_ref().is_some_and(|r| r.approximate),
            known_historical_name: resolved.map(|r| r.name),
            extra_metadata: request.extra_metadata.clone(),
        })
    }

    /// Generate and parse an artifact for a prepared context.
    ///
    /// Never fails: generator errors become a failure artifact.
    pub async fn analyze(&self, context: &AnalysisContext) -> AnalysisArtifact {
        match self.generator.generate(context).await {
            Ok(raw) => parse_artifact(&raw),
            Err(e) => {
                warn!(
                    subject = %context.subject_name,
                    year = context.year,
                    error = %e,
                    "analysis generation failed"
                );
                AnalysisArtifact::failure(failure_message(&e))
            }
        }
    }

    /// Run one analysis request and apply its artifact unless superseded.
    ///
    /// Only a newer request carrying the same `session_id` supersedes this
    /// one. A request without a session id runs in a session of its own.
    pub async fn run_analysis(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let session = match request.session_id.as_deref() {
            Some(id) => self.session(id).await,
            None => Arc::new(AnalysisSession::new()),
        };
        let token = session.begin();
        let artifact = match self.prepare_context(request) {
            Ok(context) => self.analyze(&context).await,
            Err(e) => {
                warn!(token, error = %e, "analysis request rejected");
                AnalysisArtifact::failure(failure_message(&e))
            }
        };

        if session.settle(token, artifact.clone()).await {
            info!(
                token,
                session = request.session_id.as_deref().unwrap_or("-"),
                subject = %request.subject_name,
                year = request.year,
                failed = artifact.is_failure(),
                sources = artifact.sources.len(),
                "analysis applied"
            );
            AnalysisOutcome::Applied { token, artifact }
        } else {
            let latest = session.latest();
            debug!(token, latest, "analysis superseded");
            AnalysisOutcome::Superseded { token, latest }
        }
    }

    /// Ask for a place's name history, oldest first.
    ///
    /// An empty place or a failed generation yields an empty list.
    pub async fn place_name_history(&self, place: &str) -> Vec<PlaceNameEntry> {
        let place = place.trim();
        if place.is_empty() {
            return Vec::new();
        }
        match self.generator.generate_place_history(place).await {
            Ok(raw) => parse_place_name_history(&raw),
            Err(e) => {
                warn!(place, error = %e, "place history generation failed");
                Vec::new()
            }
        }
    }

    /// Ask who ruled a polity in a year and the surrounding succession.
    ///
    /// A blank polity or a failed generation yields an empty text.
    pub async fn dynasty_info(&self, request: &DynastyRequest) -> String {
        let polity = request.polity_name.trim();
        if polity.is_empty() {
            return String::new();
        }
        match self.generator.generate_dynasty_info(polity, request.year).await {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!(polity, year = request.year, error = %e, "dynasty info generation failed");
                String::new()
            }
        }
    }

    /// Analyse a battle or treaty.
    ///
    /// A failed generation yields a warning line starting with
    /// [`EVENT_FAILED_PREFIX`].
    pub async fn event_analysis(&self, event: &EventAnalysisRequest) -> String {
        match self.generator.generate_event_analysis(event).await {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!(
                    event = %event.event_name,
                    year = event.year,
                    error = %e,
                    "event analysis generation failed"
                );
                format!("{EVENT_FAILED_PREFIX}{e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use chronoatlas_types::{
        Coordinates, EpochName, Geometry, Polygon, Position, TimeBoundedRecord,
    };
    use tokio::sync::Notify;

    use super::*;

    /// Scripted responses for the generator.
    enum Script {
        Reply(&'static str),
        RateLimited,
        Broken,
    }

    struct ScriptedGenerator {
        script: Script,
        seen: std::sync::Mutex<Vec<AnalysisContext>>,
    }

    impl ScriptedGenerator {
        fn new(script: Script) -> Self {
            Self {
                script,
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn respond(&self) -> Result<String, RunnerError> {
            match self.script {
                Script::Reply(text) => Ok(text.to_owned()),
                Script::RateLimited => Err(RunnerError::RateLimited("429".to_owned())),
                Script::Broken => Err(RunnerError::LlmBackend("connection reset".to_owned())),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, context: &AnalysisContext) -> Result<String, RunnerError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(context.clone());
            }
            self.respond()
        }

        async fn generate_place_history(&self, _place: &str) -> Result<String, RunnerError> {
            self.respond()
        }

        async fn generate_dynasty_info(
            &self,
            _polity: &str,
            _year: i32,
        ) -> Result<String, RunnerError> {
            self.respond()
        }

        async fn generate_event_analysis(
            &self,
            _event: &EventAnalysisRequest,
        ) -> Result<String, RunnerError> {
            self.respond()
        }
    }

    /// Holds its first call until released; later calls answer at once.
    #[derive(Default)]
    struct GatedGenerator {
        calls: AtomicUsize,
        gate: Notify,
    }

    impl TextGenerator for GatedGenerator {
        async fn generate(&self, context: &AnalysisContext) -> Result<String, RunnerError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
            }
            Ok(format!("<ANALIZ>{}</ANALIZ>", context.subject_name))
        }

        async fn generate_place_history(&self, _place: &str) -> Result<String, RunnerError> {
            Ok("[]".to_owned())
        }

        async fn generate_dynasty_info(
            &self,
            _polity: &str,
            _year: i32,
        ) -> Result<String, RunnerError> {
            Ok(String::new())
        }

        async fn generate_event_analysis(
            &self,
            _event: &EventAnalysisRequest,
        ) -> Result<String, RunnerError> {
            Ok(String::new())
        }
    }

    fn rect(label: &str, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> GeoRegion {
        let ring = vec![
            Position::new(x0, y0),
            Position::new(x0, y1),
            Position::new(x1, y1),
            Position::new(x1, y0),
        ];
        GeoRegion::new(label, Geometry::Polygon(Polygon::new(vec![ring])))
    }

    fn istanbul() -> HistoricalEntity {
        HistoricalEntity::new(
            "İstanbul",
            Coordinates::new(41.0082, 28.9784),
            vec![
                TimeBoundedRecord::new(EpochName::new("Byzantion", "Megara"), -667, 329),
                TimeBoundedRecord::new(EpochName::new("Konstantinopolis", "Roma"), 330, 1453),
                TimeBoundedRecord::new(EpochName::new("Kostantiniyye", "Osmanlı"), 1453, 1923),
            ],
        )
    }

    fn request(subject: &str, year: i32) -> AnalysisRequest {
        AnalysisRequest {
            subject_name: subject.to_owned(),
            year,
            coordinates: None,
            entity_key: None,
            extra_metadata: None,
            session_id: None,
        }
    }

    fn session_request(subject: &str, year: i32, session: &str) -> AnalysisRequest {
        AnalysisRequest {
            session_id: Some(session.to_owned()),
            ..request(subject, year)
        }
    }

    fn gated_orchestrator() -> Arc<AnalysisOrchestrator<GatedGenerator>> {
        Arc::new(AnalysisOrchestrator::new(
            GatedGenerator::default(),
            Vec::new(),
            Vec::new(),
        ))
    }

    /// Start a request whose generation stays blocked until the gate opens.
    async fn start_gated(
        orch: &Arc<AnalysisOrchestrator<GatedGenerator>>,
        req: AnalysisRequest,
    ) -> tokio::task::JoinHandle<AnalysisOutcome> {
        let handle = tokio::spawn({
            let orch = Arc::clone(orch);
            async move { orch.run_analysis(&req).await }
        });
        while orch.generator().calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        handle
    }

    fn orchestrator(script: Script) -> AnalysisOrchestrator<ScriptedGenerator> {
        AnalysisOrchestrator::new(
            ScriptedGenerator::new(script),
            vec![rect("Fatih", (28.9, 40.9), (29.1, 41.1))],
            vec![istanbul()],
        )
    }

    #[test]
    fn searched_name_exact_and_closest() {
        let entity = istanbul();
        let exact = resolve_searched_name(&entity, 1500);
        assert_eq!(exact.as_ref().map(|r| r.name.as_str()), Some("Kostantiniyye"));
        assert_eq!(exact.map(|r| r.approximate), Some(false));

        let before = resolve_searched_name(&entity, -1000);
        assert_eq!(before.as_ref().map(|r| r.name.as_str()), Some("Byzantion"));
        assert_eq!(before.map(|r| r.approximate), Some(true));

        let after = resolve_searched_name(&entity, 2000);
        assert_eq!(after.map(|r| r.name), Some("Kostantiniyye".to_owned()));

        let empty = HistoricalEntity::new("X", Coordinates::new(0.0, 0.0), Vec::new());
        assert!(resolve_searched_name(&empty, 1500).is_none());
    }

    #[test]
    fn context_resolves_name_and_district_from_entity() {
        let orch = orchestrator(Script::Reply(""));
        let mut req = request("İstanbul", 1500);
        req.entity_key = Some("İstanbul".to_owned());

        let ctx = orch.prepare_context(&req);
        assert!(ctx.is_ok());
        let Ok(ctx) = ctx else { return };
        assert_eq!(ctx.known_historical_name.as_deref(), Some("Kostantiniyye"));
        assert!(!ctx.known_name_approximate);
        assert_eq!(ctx.district.as_deref(), Some("Fatih"));
        assert_eq!(ctx.coordinates, Some(Coordinates::new(41.0082, 28.9784)));
    }

    #[test]
    fn context_marks_approximate_names() {
        let orch = orchestrator(Script::Reply(""));
        let mut req = request("İstanbul", -1000);
        req.entity_key = Some("Byzantion".to_owned());
        let ctx = orch.prepare_context(&req);
        assert!(ctx.is_ok());
        let Ok(ctx) = ctx else { return };
        assert_eq!(ctx.known_historical_name.as_deref(), Some("Byzantion"));
        assert!(ctx.known_name_approximate);
    }

    #[test]
    fn context_without_entity_or_point_is_bare() {
        let orch = orchestrator(Script::Reply(""));
        let ctx = orch.prepare_context(&request("Roma İmparatorluğu", 100));
        assert_eq!(ctx.ok(), Some(AnalysisContext::new("Roma İmparatorluğu", 100)));
    }

    #[test]
    fn point_outside_districts_has_no_district() {
        let orch = orchestrator(Script::Reply(""));
        let mut req = request("Ankara", 1500);
        req.coordinates = Some(Coordinates::new(39.93, 32.85));
        let ctx = orch.prepare_context(&req);
        assert!(ctx.is_ok());
        let Ok(ctx) = ctx else { return };
        assert!(ctx.district.is_none());
        assert!(ctx.known_historical_name.is_none());
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let orch = orchestrator(Script::Reply(""));
        let mut req = request("Nowhere", 1500);
        req.coordinates = Some(Coordinates::new(f64::NAN, 28.0));
        assert!(matches!(
            orch.prepare_context(&req),
            Err(RunnerError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn successful_analysis_is_applied() {
        let orch = orchestrator(Script::Reply(
            r#"<ANALIZ>Hello</ANALIZ><DEMOGRAFI>{"population":{"1500":50000}}</DEMOGRAFI>"#,
        ));
        let outcome = orch.run_analysis(&session_request("Konya", 1500, "tab")).await;

        assert!(matches!(outcome, AnalysisOutcome::Applied { .. }));
        let AnalysisOutcome::Applied { token, artifact } = outcome else { return };
        assert_eq!(token, 1);
        assert_eq!(artifact.narrative, "Hello");
        assert!(artifact.sources.is_empty());
        let session = orch.session("tab").await;
        assert_eq!(session.current().await, Some(artifact));
        assert!(!session.is_pending().await);

        let seen = orch.generator().seen.lock().map(|s| s.len()).unwrap_or_default();
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn rate_limit_becomes_busy_message() {
        let orch = orchestrator(Script::RateLimited);
        let outcome = orch.run_analysis(&request("Konya", 1500)).await;
        assert!(matches!(outcome, AnalysisOutcome::Applied { .. }));
        let AnalysisOutcome::Applied { artifact, .. } = outcome else { return };
        assert!(artifact.narrative.is_empty());
        assert_eq!(artifact.error.as_deref(), Some(RATE_LIMITED_MESSAGE));
    }

    #[tokio::test]
    async fn other_failures_carry_error_text() {
        let orch = orchestrator(Script::Broken);
        let artifact = orch.analyze(&AnalysisContext::new("Konya", 1500)).await;
        assert!(artifact.is_failure());
        assert!(artifact.error.unwrap_or_default().contains("connection reset"));
        assert!(artifact.demographics.is_none());
    }

    #[tokio::test]
    async fn invalid_request_skips_generation() {
        let orch = orchestrator(Script::Reply("<ANALIZ>unused</ANALIZ>"));
        let mut req = request("Nowhere", 1500);
        req.coordinates = Some(Coordinates::new(41.0, f64::INFINITY));
        let outcome = orch.run_analysis(&req).await;

        assert!(matches!(outcome, AnalysisOutcome::Applied { .. }));
        let AnalysisOutcome::Applied { artifact, .. } = outcome else { return };
        assert!(artifact.is_failure());
        let seen = orch.generator().seen.lock().map(|s| s.len()).unwrap_or(usize::MAX);
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn newer_request_supersedes_pending_one() {
        let orch = gated_orchestrator();
        let first = start_gated(&orch, session_request("Eski", 1500, "tab")).await;
        assert!(orch.session("tab").await.is_pending().await);

        let second = orch.run_analysis(&session_request("Yeni", 1600, "tab")).await;
        assert!(matches!(second, AnalysisOutcome::Applied { token: 2, .. }));

        orch.generator().gate.notify_one();
        let first = first.await;
        assert!(matches!(
            first,
            Ok(AnalysisOutcome::Superseded { token: 1, latest: 2 })
        ));

        let current = orch.session("tab").await.current().await;
        assert_eq!(current.map(|a| a.narrative), Some("Yeni".to_owned()));
    }

    #[tokio::test]
    async fn other_sessions_do_not_supersede() {
        let orch = gated_orchestrator();
        let alice = start_gated(&orch, session_request("Sivas", 1500, "alice")).await;

        let bob = orch.run_analysis(&session_request("Konya", 1500, "bob")).await;
        assert!(matches!(bob, AnalysisOutcome::Applied { token: 1, .. }));

        orch.generator().gate.notify_one();
        let alice = alice.await;
        assert!(matches!(alice, Ok(AnalysisOutcome::Applied { token: 1, .. })));
        let shown = orch.session("alice").await.current().await;
        assert_eq!(shown.map(|a| a.narrative), Some("Sivas".to_owned()));
    }

    #[tokio::test]
    async fn requests_without_session_never_supersede() {
        let orch = gated_orchestrator();
        let first = start_gated(&orch, request("Sivas", 1500)).await;

        let second = orch.run_analysis(&request("Konya", 1500)).await;
        assert!(matches!(second, AnalysisOutcome::Applied { .. }));

        orch.generator().gate.notify_one();
        let first = first.await;
        assert!(matches!(first, Ok(AnalysisOutcome::Applied { .. })));
    }

    #[tokio::test]
    async fn same_id_returns_same_session() {
        let orch = orchestrator(Script::Reply(""));
        let a = orch.session("tab").await;
        let b = orch.session("tab").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &orch.session("other").await));
    }

    #[tokio::test]
    async fn session_rejects_stale_tokens() {
        let session = AnalysisSession::new();
        assert!(!session.is_pending().await);
        let old = session.begin();
        let new = session.begin();
        assert!(!session.settle(old, AnalysisArtifact::failure("old")).await);
        assert!(session.current().await.is_none());
        assert!(session.settle(new, AnalysisArtifact::failure("new")).await);
        assert_eq!(
            session.current().await.and_then(|a| a.error),
            Some("new".to_owned())
        );
    }

    #[tokio::test]
    async fn place_history_is_parsed_or_empty() {
        let orch = orchestrator(Script::Reply(
            r#"[{"name": "Sebasteia", "startYear": 0, "endYear": 1071, "language": "Yunanca", "meaning": "Augustus'a adanmış"}]"#,
        ));
        let history = orch.place_name_history("Sivas").await;
        assert_eq!(history.first().map(|e| e.name.as_str()), Some("Sebasteia"));
        assert!(orch.place_name_history("   ").await.is_empty());

        let failing = orchestrator(Script::Broken);
        assert!(failing.place_name_history("Sivas").await.is_empty());
    }

    fn dynasty(polity: &str, year: i32) -> DynastyRequest {
        DynastyRequest {
            polity_name: polity.to_owned(),
            year,
        }
    }

    fn malazgirt() -> EventAnalysisRequest {
        EventAnalysisRequest {
            event_name: "Malazgirt Meydan Muharebesi".to_owned(),
            year: 1071,
            parties: Some(vec!["Büyük Selçuklu".to_owned(), "Bizans".to_owned()]),
            result: None,
        }
    }

    #[tokio::test]
    async fn dynasty_info_is_trimmed_or_empty() {
        let orch = orchestrator(Script::Reply("\n**Hükümdar (1071):** Alp Arslan\n"));
        let text = orch.dynasty_info(&dynasty("Büyük Selçuklu Devleti", 1071)).await;
        assert_eq!(text, "**Hükümdar (1071):** Alp Arslan");
        assert!(orch.dynasty_info(&dynasty("  ", 1071)).await.is_empty());

        let failing = orchestrator(Script::RateLimited);
        assert!(failing.dynasty_info(&dynasty("Büyük Selçuklu Devleti", 1071)).await.is_empty());
    }

    #[tokio::test]
    async fn event_analysis_failure_becomes_warning_text() {
        let orch = orchestrator(Script::Reply("## Malazgirt\nSelçuklu zaferi."));
        assert_eq!(orch.event_analysis(&malazgirt()).await, "## Malazgirt\nSelçuklu zaferi.");

        let failing = orchestrator(Script::Broken);
        let text = failing.event_analysis(&malazgirt()).await;
        assert!(text.starts_with(EVENT_FAILED_PREFIX));
        assert!(text.contains("connection reset"));
    }
}
