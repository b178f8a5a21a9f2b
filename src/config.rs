//! Configuration loading and validation.
//!
//! Loads `config.toml` from `--config`, `$GHOSTLINE_CONFIG_PATH`, or
//! `~/.ghostline/config.toml`. A missing file yields defaults.
//!
//! Precedence: env vars > config file > defaults. Only unreadable or
//! malformed files are errors; unusable model settings disable the model.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::conversation::DEFAULT_CONTEXT_LIMIT;
use crate::dispatch::DEFAULT_REQUEST_TIMEOUT;
use crate::features::chat::CHAT_CONTEXT_LIMIT;
use crate::providers::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};

/// Environment variable naming an explicit config path.
pub const CONFIG_PATH_ENV: &str = "GHOSTLINE_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative-text API settings.
    pub model: ModelConfig,
    /// Context window sizes per feature.
    pub context: ContextConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Generative-text API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API base URL, without the `/models/...` suffix.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Environment variable (or `.env` key) holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_owned(),
            model: DEFAULT_GEMINI_MODEL.to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
            request_timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    /// Per-request timeout. Zero falls back to [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => DEFAULT_REQUEST_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    /// Why the model cannot be called with these settings, if anything is
    /// missing. The API key itself is checked separately.
    pub fn missing_setting(&self) -> Option<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Some("model endpoint is not set".to_owned());
        }
        match url::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Some(format!(
                    "model endpoint must use http or https, got {:?}",
                    url.scheme()
                ))
            }
            Err(e) => return Some(format!("model endpoint {endpoint:?} is invalid: {e}")),
        }
        if self.model.trim().is_empty() {
            return Some("model name is not set".to_owned());
        }
        if self.api_key_env.trim().is_empty() {
            return Some("api_key_env is not set".to_owned());
        }
        None
    }
}

/// Context window sizes, in turns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Advisor chat.
    pub chat: usize,
    /// Live tactics.
    pub live: usize,
    /// Persona forge.
    pub forge: usize,
    /// Training simulator.
    pub training: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            chat: CHAT_CONTEXT_LIMIT,
            live: DEFAULT_CONTEXT_LIMIT,
            forge: DEFAULT_CONTEXT_LIMIT,
            training: DEFAULT_CONTEXT_LIMIT,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for JSON log files. Console-only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            dir: None,
        }
    }
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Missing or unusable model settings are not an error here; they are
    /// reported by [`ModelConfig::missing_setting`] and disable the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => config_path_with(|key| std::env::var(key).ok())?,
        };
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed values.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("GHOSTLINE_ENDPOINT") {
            self.model.endpoint = v;
        }
        if let Some(v) = env("GHOSTLINE_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = env("GHOSTLINE_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.model.request_timeout_secs = n,
                Err(_) => tracing::warn!(
                    var = "GHOSTLINE_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("GHOSTLINE_LOG_LEVEL") {
            self.logging.level = v;
        }
    }
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if no explicit path is set and the home directory cannot
/// be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve the default config directory (`~/.ghostline/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".ghostline"))
}
