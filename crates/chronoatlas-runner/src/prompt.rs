//! Prompt template loading and rendering via `minijinja`.
//!
//! The default templates are compiled into the binary. Operators can point
//! `llm.templates_dir` at a directory holding replacements; any template
//! missing there falls back to the built-in version.

use chronoatlas_types::{AnalysisContext, EventAnalysisRequest, SubjectMetadata};
use minijinja::{Environment, context};

use crate::error::RunnerError;

/// Year from which the prompt frames the analysis as modern history.
const MODERN_ERA_START: i32 = 1923;

/// Built-in templates, in (name, file, source) form.
const BUILTIN_TEMPLATES: [(&str, &str, &str); 5] = [
    ("system", "system.j2", include_str!("../templates/system.j2")),
    ("analysis", "analysis.j2", include_str!("../templates/analysis.j2")),
    (
        "place_history",
        "place_history.j2",
        include_str!("../templates/place_history.j2"),
    ),
    ("dynasty", "dynasty.j2", include_str!("../templates/dynasty.j2")),
    ("event", "event.j2", include_str!("../templates/event.j2")),
];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the historian persona.
    pub system: String,
    /// User message with the task and the required answer format.
    pub user: String,
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if a built-in template fails to
    /// compile.
    pub fn new() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, _, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Create a prompt engine, overriding built-ins with files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if an override exists but cannot
    /// be read or compiled.
    pub fn from_dir(dir: &str) -> Result<Self, RunnerError> {
        let mut engine = Self::new()?;
        for (name, file, _) in BUILTIN_TEMPLATES {
            let path = std::path::Path::new(dir).join(file);
            if !path.exists() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                RunnerError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            engine
                .env
                .add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(engine)
    }

    /// Render the analysis prompt for a request context.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if rendering fails.
    pub fn render_analysis(&self, ctx: &AnalysisContext) -> Result<RenderedPrompt, RunnerError> {
        let modern_era = ctx.year >= MODERN_ERA_START;
        let comparison_year = if modern_era { 2000 } else { 1900 };
        let coordinates = ctx
            .coordinates
            .map(|c| format!("({:.4}, {:.4})", c.lat, c.lng));
        let metadata = ctx.extra_metadata.as_ref();
        let tribe = metadata
            .filter(|m| m.kind == SubjectMetadata::TURKIC_TRIBE)
            .and_then(|m| m.tribe.as_deref());
        let figure = metadata.filter(|m| m.kind == SubjectMetadata::HISTORICAL_FIGURE);

        let user = self.render(
            "analysis",
            context! {
                subject => ctx.subject_name,
                year => ctx.year,
                modern_era => modern_era,
                comparison_year => comparison_year,
                coordinates => coordinates,
                district => ctx.district,
                known_name => ctx.known_historical_name,
                known_name_approximate => ctx.known_name_approximate,
                tribe => tribe,
                branch => metadata.and_then(|m| m.branch.as_deref()),
                figure => figure.is_some(),
                figure_title => figure.and_then(|m| m.title.as_deref()),
            },
        )?;

        Ok(RenderedPrompt {
            system: self.render("system", context! {})?,
            user,
        })
    }

    /// Render the etymology prompt for a place name.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if rendering fails.
    pub fn render_place_history(&self, place: &str) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render("system", context! {})?,
            user: self.render("place_history", context! { place => place })?,
        })
    }

    /// Render the ruler and succession prompt for a polity.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if rendering fails.
    pub fn render_dynasty(&self, polity: &str, year: i32) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render("system", context! {})?,
            user: self.render("dynasty", context! { polity => polity, year => year })?,
        })
    }

    /// Render the battle or treaty analysis prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if rendering fails.
    pub fn render_event(&self, event: &EventAnalysisRequest) -> Result<RenderedPrompt, RunnerError> {
        let user = self.render(
            "event",
            context! {
                event => event.event_name,
                year => event.year,
                parties => event.parties.as_deref().unwrap_or_default(),
                outcome => event.result,
            },
        )?;
        Ok(RenderedPrompt {
            system: self.render("system", context! {})?,
            user,
        })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}
