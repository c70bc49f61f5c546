//! TOML-backed settings with serde defaults.
//!
//! A missing settings file yields pure defaults so a fresh checkout runs
//! without any setup; a malformed file is a startup diagnostic, not a
//! silent fallback.

use std::collections::BTreeMap;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from settings loading.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read settings file: {path}")]
    #[diagnostic(
        code(rafiq::config::io),
        help("Ensure the file exists and is readable, or delete it to use defaults.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file: {path}")]
    #[diagnostic(
        code(rafiq::config::parse),
        help("Check the TOML syntax. Delete the file to fall back to defaults.")
    )]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible responses endpoint.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Request timeout in seconds. The generation call is the only blocking
    /// operation in a turn and must never hang it indefinitely.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/responses".into(),
            model: "gpt-4.1-mini".into(),
            timeout_secs: 20,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Normalized search score at or above which a knowledge hit answers the
    /// turn directly instead of falling through to generation.
    pub kb_strong_match_threshold: f32,
    /// Capacity of the short-term history log.
    pub max_short_term_memory: usize,
    /// Maximum hits returned by a knowledge search.
    pub search_limit: usize,
    /// Domain vocabulary for the precision guard: a query containing any of
    /// these terms with no strong knowledge match gets a sourced-entry miss
    /// reply instead of a generated answer.
    pub kb_trigger_terms: Vec<String>,
    /// Capability flags rendered by the `status` command.
    pub capabilities: BTreeMap<String, bool>,
    /// Generation backend settings.
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kb_strong_match_threshold: 0.72,
            max_short_term_memory: 20,
            search_limit: 5,
            kb_trigger_terms: default_trigger_terms(),
            capabilities: default_capabilities(),
            llm: LlmSettings::default(),
        }
    }
}

fn default_trigger_terms() -> Vec<String> {
    [
        "quran", "qur'an", "ayah", "surah", "tafsir", "hadith", "sunnah", "fiqh", "halal",
        "haram", "sharia", "shariah", "dua", "dhikr", "salah", "wudu", "zakat", "ramadan",
        "sawm", "hajj",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_capabilities() -> BTreeMap<String, bool> {
    [
        ("commands", true),
        ("safety", true),
        ("knowledge", true),
        ("cloud_llm", true),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert!((settings.kb_strong_match_threshold - 0.72).abs() < f32::EPSILON);
        assert_eq!(settings.max_short_term_memory, 20);
        assert_eq!(settings.search_limit, 5);
        assert_eq!(settings.capabilities.len(), 4);
        assert!(settings.capabilities["cloud_llm"]);
        assert!(settings.kb_trigger_terms.iter().any(|t| t == "fiqh"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.max_short_term_memory, 20);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "kb_strong_match_threshold = 0.8\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!((settings.kb_strong_match_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(settings.search_limit, 5);
        assert_eq!(settings.llm.timeout_secs, 20);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "kb_strong_match_threshold = [oops\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
