//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::AppConfig;

/// Environment variable overriding the boss model.
pub const ENV_BOSS_MODEL: &str = "BOSS_MODEL";
/// Environment variable overriding the intern model.
pub const ENV_INTERN_MODEL: &str = "INTERN_MODEL";
/// Environment variable overriding the iteration budget.
pub const ENV_MAX_ITERATIONS: &str = "MAX_ITERATIONS";
/// Environment variable overriding the maximum depth.
pub const ENV_MAX_DEPTH: &str = "MAX_DEPTH";
/// Environment variable toggling transcript recording.
pub const ENV_ENABLE_LOGGING: &str = "ENABLE_LOGGING";

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
    /// The first search path must exist.
    required: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .boss-intern.toml
        search_paths.push(PathBuf::from(".boss-intern.toml"));

        // 2. User config directory: ~/.config/boss-intern/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("boss-intern").join("config.toml"));
        }

        Self {
            search_paths,
            required: false,
        }
    }

    /// Create a config loader for an explicit config file.
    ///
    /// Unlike the default search, a missing file is an error.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
            required: true,
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// Environment overrides are applied on top of the file contents. The
    /// result is not validated; call [`AppConfig::validate`] once any command
    /// line overrides have been applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, if an
    /// explicit config file cannot be read, or if an override variable holds
    /// an unparsable value.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let path = if self.required {
            self.search_paths.first().cloned()
        } else {
            self.find_config_file()
        };
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_path(&path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool_env(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Apply environment overrides using `lookup` to read variables.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnv` for values that do not parse.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = lookup(ENV_BOSS_MODEL) {
        config.delegation.boss_model = model;
    }
    if let Some(model) = lookup(ENV_INTERN_MODEL) {
        config.delegation.intern_model = model;
    }
    if let Some(value) = lookup(ENV_MAX_ITERATIONS) {
        config.delegation.max_iterations = parse_env(ENV_MAX_ITERATIONS, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_DEPTH) {
        config.delegation.max_depth = parse_env(ENV_MAX_DEPTH, &value)?;
    }
    if let Some(value) = lookup(ENV_ENABLE_LOGGING) {
        config.transcript.enabled = parse_bool_env(ENV_ENABLE_LOGGING, &value)?;
    }
    Ok(())
}

impl AppConfig {
    /// Check the invariants the delegation loop relies on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the iteration budget is zero or a
    /// model identifier is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delegation.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.delegation.boss_model.trim().is_empty() {
            return Err(ConfigError::Invalid("boss_model must not be empty".to_string()));
        }
        if self.delegation.intern_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "intern_model must not be empty".to_string(),
            ));
        }
        if self.ai.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("Missing credentials: set the {0} environment variable")]
    MissingCredentials(String),
}
