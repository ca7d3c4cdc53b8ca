//! Configuration loading, validation, and management for MediBook.
//!
//! Loads configuration from `~/.medibook/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.medibook/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent completion service settings
    #[serde(default)]
    pub agent: AgentServiceConfig,

    /// Orchestration loop and prompt context settings
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// The assistant's identity on the chat transport
    #[serde(default)]
    pub bot: BotConfig,

    /// Clinic directory backing the domain tools
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AgentServiceConfig {
    /// Base URL; requests go to `<endpoint>/api/v1/chat/completions`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model override (the service default is used when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Send tool definitions with each request
    #[serde(default)]
    pub advertise_tools: bool,
}

fn default_endpoint() -> String {
    "http://localhost:8000".into()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            advertise_tools: false,
        }
    }
}

impl std::fmt::Debug for AgentServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .field("advertise_tools", &self.advertise_tools)
            .finish()
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Maximum tool round-trips per inbound message
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// How many transport messages to load as prompt history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Clinic local time offset from UTC, in hours
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Days before today shown in the prompt calendar
    #[serde(default = "default_days_back")]
    pub calendar_days_back: u32,

    /// Days after today shown in the prompt calendar
    #[serde(default = "default_days_forward")]
    pub calendar_days_forward: u32,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_history_limit() -> usize {
    10
}
fn default_utc_offset_hours() -> i32 {
    7
}
fn default_days_back() -> u32 {
    2
}
fn default_days_forward() -> u32 {
    12
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_limit: default_history_limit(),
            utc_offset_hours: default_utc_offset_hours(),
            calendar_days_back: default_days_back(),
            calendar_days_forward: default_days_forward(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Sender id the assistant posts as; messages from it are ignored
    #[serde(default = "default_bot_id")]
    pub bot_id: String,

    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_bot_id() -> String {
    "medibook-bot".into()
}
fn default_display_name() -> String {
    "MediBook".into()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_id: default_bot_id(),
            display_name: default_display_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// JSON file with clinics, services and doctors; built-in sample if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.medibook/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `MEDIBOOK_API_KEY`
    /// - `MEDIBOOK_AGENT_URL`
    /// - `MEDIBOOK_MODEL`
    /// - `MEDIBOOK_BOT_ID`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("MEDIBOOK_API_KEY") {
            self.agent.api_key = Some(key);
        }
        if let Some(url) = lookup("MEDIBOOK_AGENT_URL") {
            self.agent.endpoint = url;
        }
        if let Some(model) = lookup("MEDIBOOK_MODEL") {
            self.agent.model = Some(model);
        }
        if let Some(bot_id) = lookup("MEDIBOOK_BOT_ID") {
            self.bot.bot_id = bot_id;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".medibook")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.endpoint must not be empty".into(),
            ));
        }

        if self.agent.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "agent.timeout_ms must be > 0".into(),
            ));
        }

        if self.orchestration.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_iterations must be > 0".into(),
            ));
        }

        if !(-12..=14).contains(&self.orchestration.utc_offset_hours) {
            return Err(ConfigError::ValidationError(
                "orchestration.utc_offset_hours must be between -12 and 14".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.agent.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_tokens, 1000);
        assert_eq!(config.agent.timeout_ms, 60_000);
        assert_eq!(config.orchestration.max_iterations, 5);
        assert_eq!(config.orchestration.calendar_days_back, 2);
        assert_eq!(config.orchestration.calendar_days_forward, 12);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.endpoint, config.agent.endpoint);
        assert_eq!(parsed.bot.bot_id, config.bot.bot_id);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.orchestration.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.agent.endpoint, "http://localhost:8000");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent]
endpoint = "https://agent.clinic.vn"
api_key = "sk-test"

[orchestration]
max_iterations = 3
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.endpoint, "https://agent.clinic.vn");
        assert_eq!(config.orchestration.max_iterations, 3);
        assert_eq!(config.orchestration.history_limit, 10);
        assert!((config.agent.temperature - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent\nendpoint = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEDIBOOK_API_KEY", "sk-env"),
            ("MEDIBOOK_BOT_ID", "bot-42"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.agent.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.bot.bot_id, "bot-42");
        assert_eq!(config.agent.endpoint, "http://localhost:8000");
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.agent.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("[agent]"));
        assert!(toml_str.contains("max_iterations = 5"));
    }
}
