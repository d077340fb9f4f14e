//! Configuration loading, validation, and management for Digm.
//!
//! Loads configuration from `~/.digm/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use digm_core::MAX_RELEVANT_ITEMS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.digm/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Language-model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Auth collaborator settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Relevance selection settings
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Embedding generation settings
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("store", &self.store)
            .field("auth", &self.auth)
            .field("selection", &self.selection)
            .field("gateway", &self.gateway)
            .field("embeddings", &self.embeddings)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Override the provider's base URL (defaults per well-known provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "supabase", "postgres", or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_store_backend() -> String {
    "supabase".into()
}
fn default_store_timeout() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            supabase_url: None,
            supabase_anon_key: None,
            database_url: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &redact(&self.supabase_anon_key))
            .field("database_url", &redact(&self.database_url))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// "supabase", "jwt", or "static"
    #[serde(default = "default_auth_mode")]
    pub mode: String,

    /// HS256 secret used to verify access tokens locally (mode = "jwt")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Fixed token → user id map (mode = "static", development only)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub static_tokens: HashMap<String, String>,

    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

fn default_auth_mode() -> String {
    "supabase".into()
}
fn default_auth_timeout() -> u64 {
    5
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            jwt_secret: None,
            static_tokens: HashMap::new(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("static_tokens", &self.static_tokens.len())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// "default" (category-priority truncation) or "search" (substring match)
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default = "default_selection_limit")]
    pub limit: usize,
}

fn default_strategy() -> String {
    "default".into()
}
fn default_selection_limit() -> usize {
    MAX_RELEVANT_ITEMS
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            limit: default_selection_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Requests per minute per credential. 0 disables rate limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}
fn default_rate_limit() -> usize {
    60
}
fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.digm/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment variable overrides.
    ///
    /// Recognized variables:
    /// - `DIGM_API_KEY` (highest priority), `OPENAI_API_KEY`
    /// - `DIGM_MODEL`, `DIGM_PORT`
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `SUPABASE_JWT_SECRET`
    /// - `DATABASE_URL`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Apply overrides from an environment lookup. Set values win over the file.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(key) = env("DIGM_API_KEY").or_else(|| env("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = env("DIGM_MODEL") {
            self.provider.model = model;
        }
        if let Some(port) = env("DIGM_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(url) = env("SUPABASE_URL") {
            self.store.supabase_url = Some(url);
        }
        if let Some(key) = env("SUPABASE_ANON_KEY") {
            self.store.supabase_anon_key = Some(key);
        }
        if let Some(secret) = env("SUPABASE_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(url) = env("DATABASE_URL") {
            self.store.database_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".digm")
    }

    /// Validate value ranges and enumerations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be > 0".into(),
            ));
        }

        if !(1..=MAX_RELEVANT_ITEMS).contains(&self.selection.limit) {
            return Err(ConfigError::ValidationError(format!(
                "selection.limit must be between 1 and {MAX_RELEVANT_ITEMS}"
            )));
        }

        if !matches!(self.selection.strategy.as_str(), "default" | "search") {
            return Err(ConfigError::ValidationError(format!(
                "unknown selection.strategy '{}' (expected \"default\" or \"search\")",
                self.selection.strategy
            )));
        }

        if !matches!(self.store.backend.as_str(), "supabase" | "postgres" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown store.backend '{}'",
                self.store.backend
            )));
        }

        if !matches!(self.auth.mode.as_str(), "supabase" | "jwt" | "static") {
            return Err(ConfigError::ValidationError(format!(
                "unknown auth.mode '{}'",
                self.auth.mode
            )));
        }

        if self.provider.timeout_secs == 0
            || self.store.timeout_secs == 0
            || self.auth.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "collaborator timeouts must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Settings that must be present before the service can talk to its
    /// collaborators. Empty means ready.
    pub fn readiness_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.api_key.is_none() && self.provider.name != "ollama" {
            issues.push("No language-model API key (set OPENAI_API_KEY or api_key)".to_string());
        }

        let needs_supabase = self.store.backend == "supabase" || self.auth.mode == "supabase";
        if needs_supabase {
            if self.store.supabase_url.is_none() {
                issues.push("SUPABASE_URL is not set".to_string());
            }
            if self.store.supabase_anon_key.is_none() {
                issues.push("SUPABASE_ANON_KEY is not set".to_string());
            }
        }

        if self.store.backend == "postgres" && self.store.database_url.is_none() {
            issues.push("store.backend = \"postgres\" but DATABASE_URL is not set".to_string());
        }

        if self.auth.mode == "jwt" && self.auth.jwt_secret.is_none() {
            issues.push("auth.mode = \"jwt\" but SUPABASE_JWT_SECRET is not set".to_string());
        }

        if self.auth.mode == "static" && self.auth.static_tokens.is_empty() {
            issues.push("auth.mode = \"static\" but no static_tokens are configured".to_string());
        }

        issues
    }

    /// Render the configuration as TOML with secrets removed.
    pub fn redacted_toml(&self) -> String {
        let mut copy = self.clone();
        let mask = |s: &mut Option<String>| {
            if s.is_some() {
                *s = Some("[REDACTED]".into());
            }
        };
        mask(&mut copy.api_key);
        mask(&mut copy.store.supabase_anon_key);
        mask(&mut copy.store.database_url);
        mask(&mut copy.auth.jwt_secret);
        // Tokens are the map keys; keep only the user ids.
        copy.auth.static_tokens = self
            .auth
            .static_tokens
            .values()
            .enumerate()
            .map(|(i, user)| (format!("[REDACTED {}]", i + 1), user.clone()))
            .collect();
        toml::to_string_pretty(&copy).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
            selection: SelectionConfig::default(),
            gateway: GatewayConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            logging: LoggingConfig::default(),
        }
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
