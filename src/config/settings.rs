use super::{default_state_root, ConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub state_root: Option<PathBuf>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_identifier_prefix")]
    pub identifier_prefix: String,
    #[serde(default = "default_max_installations")]
    pub max_installations: usize,
    #[serde(default)]
    pub rubric_path: Option<PathBuf>,
    #[serde(default = "default_passing_score_threshold")]
    pub passing_score_threshold: f32,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default = "default_escalation_failure_threshold")]
    pub escalation_failure_threshold: u32,
    #[serde(default = "default_idempotency_window")]
    pub idempotency_window: usize,
    #[serde(default = "default_session_timeout_hours")]
    pub session_timeout_hours: u64,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default = "default_dispatch_max_concurrency")]
    pub dispatch_max_concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_evaluator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_evaluator_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_evaluator_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_evaluator_endpoint(),
            model: default_evaluator_model(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_evaluator_timeout_seconds(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_download_timeout_seconds")]
    pub download_timeout_seconds: u64,
    /// Directories local `file://` or absolute-path media may be read from.
    /// Empty means only HTTP(S) media is accepted.
    #[serde(default)]
    pub local_roots: Vec<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_media_max_bytes(),
            download_timeout_seconds: default_download_timeout_seconds(),
            local_roots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_agents: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_root: None,
            environment: Environment::default(),
            identifier_prefix: default_identifier_prefix(),
            max_installations: default_max_installations(),
            rubric_path: None,
            passing_score_threshold: default_passing_score_threshold(),
            evaluator: EvaluatorConfig::default(),
            media: MediaConfig::default(),
            escalation_failure_threshold: default_escalation_failure_threshold(),
            idempotency_window: default_idempotency_window(),
            session_timeout_hours: default_session_timeout_hours(),
            admin: AdminConfig::default(),
            dispatch_max_concurrency: default_dispatch_max_concurrency(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier_prefix.len() != 2
            || !self
                .identifier_prefix
                .chars()
                .all(|ch| ch.is_ascii_alphabetic())
        {
            return Err(ConfigError::Settings(format!(
                "identifier_prefix must be exactly two ASCII letters, got `{}`",
                self.identifier_prefix
            )));
        }
        if self.max_installations == 0 {
            return Err(ConfigError::Settings(
                "max_installations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.passing_score_threshold) {
            return Err(ConfigError::Settings(format!(
                "passing_score_threshold must be within 0..=10, got {}",
                self.passing_score_threshold
            )));
        }
        if self.evaluator.endpoint.trim().is_empty() {
            return Err(ConfigError::Settings(
                "evaluator.endpoint must be non-empty".to_string(),
            ));
        }
        if self.evaluator.timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "evaluator.timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.media.max_bytes == 0 {
            return Err(ConfigError::Settings(
                "media.max_bytes must be at least 1".to_string(),
            ));
        }
        if self.escalation_failure_threshold == 0 {
            return Err(ConfigError::Settings(
                "escalation_failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.dispatch_max_concurrency == 0 {
            return Err(ConfigError::Settings(
                "dispatch_max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.admin.enabled && self.environment == Environment::Production {
            return Err(ConfigError::Settings(
                "admin.enabled requires environment: development".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve_state_root(&self) -> Result<PathBuf, ConfigError> {
        match self.state_root.as_ref() {
            Some(root) => Ok(root.clone()),
            None => default_state_root(),
        }
    }

    /// Admin surfaces exist only outside production and only when explicitly enabled.
    pub fn admin_enabled(&self) -> bool {
        self.admin.enabled && self.environment == Environment::Development
    }

    pub fn session_timeout_secs(&self) -> i64 {
        i64::try_from(self.session_timeout_hours.saturating_mul(3600)).unwrap_or(i64::MAX)
    }
}

fn default_identifier_prefix() -> String {
    "DR".to_string()
}

fn default_max_installations() -> usize {
    10
}

fn default_passing_score_threshold() -> f32 {
    8.0
}

fn default_evaluator_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_evaluator_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_evaluator_timeout_seconds() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    500
}

fn default_media_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_download_timeout_seconds() -> u64 {
    30
}

fn default_escalation_failure_threshold() -> u32 {
    3
}

fn default_idempotency_window() -> usize {
    32
}

fn default_session_timeout_hours() -> u64 {
    24
}

fn default_dispatch_max_concurrency() -> usize {
    4
}
