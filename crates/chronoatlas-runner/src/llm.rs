//! LLM backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs and the Google Gemini
//! `generateContent` API. All backends communicate over HTTP via `reqwest`.
//!
//! The runner does not care which model is behind the API -- it sends a
//! prompt and expects tagged text back.

use reqwest::StatusCode;

use crate::config::{BackendType, LlmConfig};
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Google Gemini API.
    Gemini(GeminiBackend),
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::RateLimited`] on HTTP 429 and
    /// [`RunnerError::LlmBackend`] for any other failure.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Gemini(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Gemini(_) => "gemini",
        }
    }
}

/// Shared generation limits copied out of [`LlmConfig`].
#[derive(Debug, Clone, Copy)]
struct Sampling {
    max_output_tokens: u32,
    temperature: f32,
}

impl Sampling {
    const fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }
}

/// Turn a non-success HTTP status and body into a runner error.
fn status_error(provider: &str, status: StatusCode, body: &str) -> RunnerError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        RunnerError::RateLimited(format!("{provider} returned {status}: {body}"))
    } else {
        RunnerError::LlmBackend(format!("{provider} returned {status}: {body}"))
    }
}

/// Post a JSON body and return the decoded JSON response.
async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, RunnerError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(status_error(provider, status, &error_body));
    }

    response
        .json()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{provider} response parse failed: {e}")))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    sampling: Sampling,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    ///
    /// Local endpoints such as Ollama accept any key, so a missing key is
    /// sent as an empty bearer token.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            sampling: Sampling::from_config(config),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_output_tokens
        });

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = post_json("OpenAI", request, &body).await?;
        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Gemini backend
// ---------------------------------------------------------------------------

/// Backend for the Google Gemini `generateContent` API.
///
/// Differs from the OpenAI format in three ways:
/// - the key travels as the `key` query parameter
/// - the system prompt is a separate `systemInstruction` object
/// - the text lives in `candidates[0].content.parts[*].text`
pub struct GeminiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    sampling: Sampling,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, RunnerError> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.require_api_key()?.to_owned(),
            model: config.model.clone(),
            sampling: Sampling::from_config(config),
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);

        let body = serde_json::json!({
            "systemInstruction": {"parts": [{"text": prompt.system}]},
            "contents": [
                {"role": "user", "parts": [{"text": prompt.user}]}
            ],
            "generationConfig": {
                "maxOutputTokens": self.sampling.max_output_tokens,
                "temperature": self.sampling.temperature
            }
        });

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())]);
        let json = post_json("Gemini", request, &body).await?;
        extract_gemini_content(&json)
    }
}

/// Extract and join the text parts of the first Gemini candidate.
fn extract_gemini_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            RunnerError::LlmBackend("Gemini response missing candidates[0].content.parts".to_owned())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(serde_json::Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(RunnerError::LlmBackend("Gemini response has no text parts".to_owned()));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
///
/// # Errors
///
/// Returns [`RunnerError::Config`] when the selected backend requires an
/// API key and none is configured.
pub fn create_backend(config: &LlmConfig) -> Result<LlmBackend, RunnerError> {
    Ok(match config.backend {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Gemini => LlmBackend::Gemini(GeminiBackend::new(config)?),
    })
}
