//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Iteration budget and model choice for the boss/intern loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationConfig {
    /// Maximum intern consultations per question. Must be at least 1.
    pub max_iterations: usize,
    /// Maximum nesting depth accepted by the boss.
    pub max_depth: usize,
    /// Model identifier for the boss role.
    pub boss_model: String,
    /// Model identifier for the intern role.
    pub intern_model: String,
    /// Append a qualifier hint to intern questions for ranking questions.
    pub qualifier_hints: bool,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_depth: 1,
            boss_model: "gpt-4".to_string(),
            intern_model: "gpt-4o-mini".to_string(),
            qualifier_hints: false,
        }
    }
}

/// Configuration for the OpenAI-compatible endpoint shared by both roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable name for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Maximum tokens in each response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature for the boss.
    #[serde(default = "default_boss_temperature")]
    pub boss_temperature: f32,
    /// Sampling temperature for the intern.
    #[serde(default = "default_intern_temperature")]
    pub intern_temperature: f32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_boss_temperature() -> f32 {
    0.7
}

fn default_intern_temperature() -> f32 {
    0.3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            boss_temperature: default_boss_temperature(),
            intern_temperature: default_intern_temperature(),
        }
    }
}

/// Where resolution transcripts go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Master switch for transcript recording.
    pub enabled: bool,
    /// Render exchanges to the terminal.
    pub console: bool,
    /// Persist events to the `SQLite` store.
    pub store: bool,
    /// Store location.
    pub path: PathBuf,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            store: true,
            path: default_transcript_path(),
        }
    }
}

/// Returns the default path for the transcript database.
///
/// This is `~/.local/share/boss-intern/transcripts.db` on Unix systems.
#[must_use]
pub fn default_transcript_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("boss-intern")
        .join("transcripts.db")
}

/// Top-level configuration, read once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub delegation: DelegationConfig,
    pub ai: AiConfig,
    pub transcript: TranscriptConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_config_defaults() {
        let config = DelegationConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.boss_model, "gpt-4");
        assert_eq!(config.intern_model, "gpt-4o-mini");
        assert!(!config.qualifier_hints);
    }

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_tokens, 500);
        assert!((config.boss_temperature - 0.7).abs() < f32::EPSILON);
        assert!((config.intern_temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ai_config_partial_table_keeps_defaults() {
        let toml = r#"
            max_tokens = 2048
        "#;
        let config: AiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_ai_config_keeps_explicit_base_url() {
        let toml = r#"
            base_url = "http://localhost:8045/v1"
            api_key_env = "LOCAL_LLM_KEY"
        "#;
        let config: AiConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "http://localhost:8045/v1");
        assert_eq!(config.api_key_env, "LOCAL_LLM_KEY");
    }

    #[test]
    fn test_app_config_partial_sections() {
        let toml = r#"
            [delegation]
            max_iterations = 3

            [transcript]
            console = false
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.delegation.max_iterations, 3);
        assert_eq!(config.delegation.max_depth, 1);
        assert!(config.transcript.enabled);
        assert!(!config.transcript.console);
        assert_eq!(config.ai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_default_transcript_path() {
        let path = default_transcript_path();
        assert!(path.ends_with("boss-intern/transcripts.db"));
    }
}
