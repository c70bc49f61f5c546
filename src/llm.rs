//! Cloud generation backend with offline fallback behavior.
//!
//! The router talks to generation through the [`Generator`] trait and the
//! trait never fails: every degraded case (no credential, transport failure,
//! empty output) is reported as a normal reply tagged `provider=offline`
//! with a distinct reason, so an unreachable backend can never crash a turn.

use std::collections::BTreeMap;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmSettings;

/// Errors from the generation transport.
///
/// Internal to this module: `generate` converts each variant into a degraded
/// reply before it can reach the router.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("no cloud API key configured")]
    #[diagnostic(
        code(rafiq::llm::missing_api_key),
        help("Set OPENAI_API_KEY to enable cloud responses.")
    )]
    MissingApiKey,

    #[error("generation request failed: {message}")]
    #[diagnostic(
        code(rafiq::llm::request_failed),
        help("Check network connectivity and the configured base_url; the request timed out or the transport failed.")
    )]
    Request { message: String },

    #[error("generation response carried no usable text")]
    #[diagnostic(
        code(rafiq::llm::empty_output),
        help("The remote call succeeded but returned no output_text field.")
    )]
    EmptyOutput,
}

impl LlmError {
    /// Stable reason tag carried in degraded-reply metadata.
    fn reason_tag(&self) -> &'static str {
        match self {
            LlmError::MissingApiKey => "missing_api_key",
            LlmError::Request { .. } => "network_error",
            LlmError::EmptyOutput => "empty_output",
        }
    }

    fn fallback_text(&self) -> &'static str {
        match self {
            LlmError::MissingApiKey => {
                "Offline fallback: no cloud API key configured. \
                 Set OPENAI_API_KEY to enable cloud responses."
            }
            LlmError::Request { .. } => {
                "Offline fallback: cloud call failed, so local response mode is active."
            }
            LlmError::EmptyOutput => "Cloud response unavailable; using offline fallback.",
        }
    }
}

/// One generation result: response text plus backend metadata.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// The generation collaborator seam.
///
/// Implementations must always return a reply; degraded outcomes are
/// ordinary replies with `provider=offline` metadata.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, mode_hint: &str) -> LlmReply;
}

/// Client for an OpenAI-compatible responses endpoint.
pub struct CloudLlm {
    settings: LlmSettings,
    api_key: Option<String>,
}

impl CloudLlm {
    /// Create a client with an explicit credential (or none).
    pub fn new(settings: LlmSettings, api_key: Option<String>) -> Self {
        Self { settings, api_key }
    }

    /// Create a client reading the credential from `OPENAI_API_KEY`.
    pub fn from_env(settings: LlmSettings) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(settings, api_key)
    }

    /// Whether a credential is configured.
    pub fn available(&self) -> bool {
        self.api_key.is_some()
    }

    /// The model name sent with every request.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn call_api(&self, api_key: &str, prompt: &str, mode_hint: &str) -> Result<String, LlmError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.settings.model,
            "input": format!("Mode hint: {mode_hint}\nUser: {prompt}"),
        });
        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::Request {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&self.settings.base_url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| LlmError::Request {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| LlmError::Request {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| LlmError::Request {
                message: format!("JSON parse error: {e}"),
            })?;

        match json["output_text"].as_str() {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(LlmError::EmptyOutput),
        }
    }

    fn degraded(error: &LlmError) -> LlmReply {
        warn!(reason = error.reason_tag(), "generation degraded to offline fallback");
        LlmReply {
            text: error.fallback_text().to_string(),
            metadata: BTreeMap::from([
                ("provider".to_string(), "offline".to_string()),
                ("reason".to_string(), error.reason_tag().to_string()),
            ]),
        }
    }
}

impl Generator for CloudLlm {
    fn generate(&self, prompt: &str, mode_hint: &str) -> LlmReply {
        let Some(api_key) = self.api_key.as_deref() else {
            return Self::degraded(&LlmError::MissingApiKey);
        };

        match self.call_api(api_key, prompt, mode_hint) {
            Ok(text) => {
                debug!(model = %self.settings.model, "generation succeeded");
                LlmReply {
                    text,
                    metadata: BTreeMap::from([
                        ("provider".to_string(), "openai".to_string()),
                        ("model".to_string(), self.settings.model.clone()),
                    ]),
                }
            }
            Err(e) => Self::degraded(&e),
        }
    }
}

impl std::fmt::Debug for CloudLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudLlm")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_degrades_with_reason() {
        let llm = CloudLlm::new(LlmSettings::default(), None);
        let reply = llm.generate("hello", "tone=neutral; verbosity=balanced");
        assert!(reply.text.contains("Offline fallback"));
        assert_eq!(reply.metadata["provider"], "offline");
        assert_eq!(reply.metadata["reason"], "missing_api_key");
    }

    #[test]
    fn transport_failure_degrades_with_network_reason() {
        let settings = LlmSettings {
            base_url: "http://127.0.0.1:1/v1/responses".into(), // unreachable port
            timeout_secs: 1,
            ..Default::default()
        };
        let llm = CloudLlm::new(settings, Some("test-key".into()));
        let reply = llm.generate("hello", "tone=neutral; verbosity=balanced");
        assert_eq!(reply.metadata["provider"], "offline");
        assert_eq!(reply.metadata["reason"], "network_error");
    }

    #[test]
    fn empty_env_key_counts_as_missing() {
        let settings = LlmSettings::default();
        let llm = CloudLlm::new(settings, Some(String::new()).filter(|k| !k.is_empty()));
        assert!(!llm.available());
    }

    #[test]
    fn default_settings_values() {
        let settings = LlmSettings::default();
        assert_eq!(settings.model, "gpt-4.1-mini");
        assert_eq!(settings.timeout_secs, 20);
        assert!(settings.base_url.contains("/responses"));
    }
}
