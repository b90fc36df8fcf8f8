//! Configuration system for kb-chat
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/kb-chat/config.{KB_CHAT_ENV}.json
//! 3. Default values
//!
//! Where KB_CHAT_ENV can be: development (default), production, docker_deploy
//!
//! # Examples
//!
//! ```no_run
//! use kb_chat::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Chat endpoint: {}", config.api.url(kb_chat::config::endpoints::CHAT));
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - KB_CHAT_ENV
//! - KB_CHAT_API_HOST
//! - KB_CHAT_API_PORT
//! - KB_CHAT_LANG

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// API paths, relative to the environment's base path
pub mod endpoints {
    pub const LOGIN: &str = "/token";
    pub const LOGOUT: &str = "/logout";
    pub const CHAT: &str = "/chat";
}

/// Deployment environments the backend is known to run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    DockerDeploy,
}

impl Environment {
    /// Default API location for this environment
    pub fn api_config(&self) -> ApiConfig {
        match self {
            Environment::Development => ApiConfig::new("http", "bibot", Some(80), "/api"),
            Environment::Production => ApiConfig::new("http", "localhost", Some(80), "/api"),
            Environment::DockerDeploy => ApiConfig::new("http", "localhost", Some(8088), "/api"),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::DockerDeploy => write!(f, "docker_deploy"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "docker_deploy" | "docker" => Ok(Self::DockerDeploy),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown environment: {}",
                s
            ))),
        }
    }
}

/// Location of the backend API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub protocol: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub base_path: String,
}

impl ApiConfig {
    pub fn new(protocol: &str, host: &str, port: Option<u16>, base_path: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
            base_path: base_path.to_string(),
        }
    }

    /// Base URL without a trailing path, e.g. `http://localhost:8088/api`
    pub fn base_url(&self) -> String {
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();
        format!("{}://{}{}{}", self.protocol, self.host, port, self.base_path)
    }

    /// Full URL for an endpoint path; a missing leading slash is added
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}/{}", self.base_url(), path)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::ValidationError(format!(
                "Protocol must be http or https, got {}",
                self.protocol
            )));
        }

        if self.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "API host cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Environment::default().api_config()
    }
}

/// Request timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_request_timeout")]
    pub default_secs: u64,

    /// Whole chat session: request plus the streamed response
    #[serde(default = "default_chat_timeout")]
    pub chat_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_chat_timeout() -> u64 {
    5 * 60
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_secs: default_request_timeout(),
            chat_secs: default_chat_timeout(),
        }
    }
}

impl Timeouts {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_secs)
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Overrides the environment's default API location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_override: Option<ApiConfig>,

    /// Resolved API location (environment default or override)
    #[serde(skip)]
    pub api: ApiConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    /// Pause between the progress bar reaching 100% and the answer replacing it
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Preferred UI language ("en" or "ja", defaults to system locale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Where login credentials are stored (default: ~/.config/kb-chat/credentials.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_settle_delay() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            api_override: None,
            api: Environment::default().api_config(),
            timeouts: Timeouts::default(),
            settle_delay_ms: default_settle_delay(),
            language: None,
            credentials_path: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.resolve_api();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/kb-chat/config.{KB_CHAT_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("KB_CHAT_ENV").unwrap_or_else(|_| "development".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.resolve_api();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(env) = std::env::var("KB_CHAT_ENV") {
            match env.parse() {
                Ok(env) => self.environment = env,
                Err(e) => tracing::warn!("Ignoring KB_CHAT_ENV: {}", e),
            }
        }

        if let Ok(host) = std::env::var("KB_CHAT_API_HOST") {
            let api = self
                .api_override
                .get_or_insert_with(|| self.environment.api_config());
            api.host = host;
        }

        if let Ok(port) = std::env::var("KB_CHAT_API_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    let api = self
                        .api_override
                        .get_or_insert_with(|| self.environment.api_config());
                    api.port = Some(port);
                }
                Err(_) => tracing::warn!("Ignoring invalid KB_CHAT_API_PORT: {}", port),
            }
        }

        if let Ok(lang) = std::env::var("KB_CHAT_LANG") {
            self.language = Some(lang);
        }
    }

    fn resolve_api(&mut self) {
        self.api = self
            .api_override
            .clone()
            .unwrap_or_else(|| self.environment.api_config());
    }

    /// Switch environment, dropping any explicit API override
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
        self.api_override = None;
        self.resolve_api();
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;

        if self.timeouts.chat_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts.chat_secs must be greater than 0".to_string(),
            ));
        }

        if self.timeouts.default_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts.default_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(lang) = &self.language {
            if Locale::from_code(lang).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "Unsupported language: {}",
                    lang
                )));
            }
        }

        Ok(())
    }

    /// UI locale: configured language, else system locale
    pub fn locale(&self) -> Locale {
        self.language
            .as_deref()
            .and_then(Locale::from_code)
            .unwrap_or_else(Locale::detect)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Credentials file: configured path or `{config_dir}/credentials.json`
    pub fn credentials_file(&self) -> PathBuf {
        self.credentials_path.clone().unwrap_or_else(|| {
            Self::config_dir()
                .map(|d| d.join("credentials.json"))
                .unwrap_or_else(|| PathBuf::from("kb-chat-credentials.json"))
        })
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kb-chat"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
