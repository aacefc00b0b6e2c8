//! Configuration types for the analysis runner.
//!
//! [`LlmConfig`] is embedded in the application's YAML configuration under
//! the `llm` key. Secrets never need to live in the file: the API key and
//! endpoint can be supplied through the environment.

use serde::Deserialize;

use crate::error::RunnerError;

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API (`OpenAI`, `DeepSeek`, Ollama).
    #[serde(alias = "openai-compatible")]
    OpenAi,
    /// Google Gemini `generateContent` API.
    #[default]
    Gemini,
}

/// Configuration for the text-generation backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    /// The backend type.
    #[serde(default)]
    pub backend: BackendType,
    /// Base API URL (e.g. `https://generativelanguage.googleapis.com/v1beta`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key. Usually supplied via `LLM_API_KEY` or `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound on generated tokens per call.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Directory with template overrides (`analysis.j2`, `place_history.j2`).
    #[serde(default)]
    pub templates_dir: Option<String>,
}

fn default_api_url() -> String {
    String::from("https://generativelanguage.googleapis.com/v1beta")
}

fn default_model() -> String {
    String::from("gemini-2.0-flash")
}

const fn default_max_output_tokens() -> u32 {
    2048
}

const fn default_temperature() -> f32 {
    0.5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            templates_dir: None,
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// - `LLM_API_KEY` (or `GEMINI_API_KEY`) overrides `api_key`
    /// - `LLM_API_URL` overrides `api_url`
    /// - `LLM_MODEL` overrides `model`
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = env_nonempty("LLM_API_KEY").or_else(|| env_nonempty("GEMINI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = env_nonempty("LLM_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = env_nonempty("LLM_MODEL") {
            self.model = model;
        }
    }

    /// Return the API key or a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] when no key was configured.
    pub fn require_api_key(&self) -> Result<&str, RunnerError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RunnerError::Config("LLM API key missing".to_owned()))
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
