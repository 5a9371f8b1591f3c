//! Configuration management for the templating engine
//!
//! TOML file support, environment variable overrides and defaults for the
//! values the engine would otherwise read from ambient page state: the
//! display language, the default emission syntax and the link roots.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::templating::Syntax;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Display language
    #[serde(default)]
    pub language: Language,

    /// Emission syntax for raw query text
    #[serde(default)]
    pub default_syntax: Syntax,

    /// Label prefixed to the metric identifier query, overrides the language default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_id_label: Option<String>,

    /// Destination link roots
    #[serde(default)]
    pub links: LinkConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Display language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese
    #[default]
    Zh,
    /// English
    En,
}

impl Language {
    /// Default metric identifier label
    pub fn metric_id_label(&self) -> &'static str {
        match self {
            Language::Zh => "指标ID",
            Language::En => "Metric ID",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh-hans" => Ok(Language::Zh),
            "en" | "en-us" => Ok(Language::En),
            other => Err(Error::Configuration(format!("Unknown language: {}", other))),
        }
    }
}

/// Destination link configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Monitoring site root, e.g. `https://monitor.example.com`
    #[serde(default)]
    pub base_url: String,

    /// Business id appended as `bizId`
    #[serde(default)]
    pub biz_id: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Label prefixed to the metric identifier query
    pub fn metric_id_label(&self) -> String {
        match &self.metric_id_label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => self.language.metric_id_label().to_string(),
        }
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(language) = std::env::var("TARGET_TEMPLATING_LANGUAGE") {
            if let Ok(l) = language.parse() {
                self.language = l;
            }
        }
        if let Ok(syntax) = std::env::var("TARGET_TEMPLATING_DEFAULT_SYNTAX") {
            if let Some(s) = Syntax::from_format(syntax.trim()) {
                self.default_syntax = s;
            }
        }

        // Links
        if let Ok(base_url) = std::env::var("TARGET_TEMPLATING_BASE_URL") {
            self.links.base_url = base_url;
        }
        if let Ok(biz_id) = std::env::var("TARGET_TEMPLATING_BIZ_ID") {
            self.links.biz_id = biz_id;
        }

        // Logging
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.links.base_url.is_empty() {
            url::Url::parse(&self.links.base_url).map_err(|e| {
                Error::Configuration(format!("Invalid base url {}: {}", self.links.base_url, e))
            })?;
        }
        if self.links.biz_id.chars().any(char::is_whitespace) {
            return Err(Error::Configuration("Business id cannot contain whitespace".to_string()));
        }
        if self.logging.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
