//! Configuration management for docshell
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Prefix of the environment variables read by [`Config::apply_env`]
pub const ENV_PREFIX: &str = "DOCSHELL_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// Completion configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Schema inference configuration
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database queries run against
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

/// Display and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Output format (json, json-pretty, table)
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Enable colored output
    #[serde(default = "default_color_output")]
    pub color_output: bool,

    /// Show execution time
    #[serde(default = "default_show_timing")]
    pub show_timing: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Compact JSON format (single-line)
    ///
    /// Example: `{"_id":"123","name":"John"}`
    Json,

    /// Pretty-printed JSON format (multi-line)
    ///
    /// Human-readable JSON with indentation, colored when enabled.
    JsonPretty,

    /// Table format (ASCII table layout)
    Table,
}

/// Completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Maximum number of suggestions per request
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Collection names offered when the store is not consulted
    #[serde(default)]
    pub collections: Vec<String>,
}

/// Schema inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Number of documents sampled per collection
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_format() -> OutputFormat {
    OutputFormat::JsonPretty
}

fn default_color_output() -> bool {
    true
}

fn default_show_timing() -> bool {
    true
}

fn default_max_suggestions() -> usize {
    crate::completion::DEFAULT_MAX_SUGGESTIONS
}

fn default_sample_size() -> usize {
    1
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color_output: default_color_output(),
            show_timing: default_show_timing(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            collections: Vec::new(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from the file and the environment
    ///
    /// An explicit `path` must exist. Without one the default path is used
    /// when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Override values from `DOCSHELL_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Override values using `lookup` to read variables by full name
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(uri) = var("URI") {
            self.connection.uri = uri;
        }
        if let Some(database) = var("DATABASE") {
            self.connection.database = database;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level.parse()?;
        }
        if let Some(format) = var("FORMAT") {
            self.display.format = format.parse()?;
        }

        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docshell")
            .join("config.toml")
    }

    /// Save configuration to a file
    ///
    /// # Arguments
    /// * `path` - Path where to save the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate_uri()?;

        if self.connection.timeout == 0 {
            return Err(invalid("connection.timeout", "0"));
        }
        if self.completion.max_suggestions == 0 {
            return Err(invalid("completion.max_suggestions", "0"));
        }
        if self.schema.sample_size == 0 {
            return Err(invalid("schema.sample_size", "0"));
        }

        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

fn invalid(field: &str, value: &str) -> crate::error::DocshellError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl ConnectionConfig {
    /// Check that the URI is non-empty and uses a MongoDB scheme
    pub fn validate_uri(&self) -> Result<()> {
        let uri = self.uri.trim();
        if uri.is_empty() || !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://"))
        {
            return Err(invalid("connection.uri", &self.uri));
        }
        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = crate::error::DocshellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(invalid("logging.level", s)),
        }
    }
}

impl OutputFormat {
    /// Check if format requires pretty printing
    pub fn is_pretty(&self) -> bool {
        matches!(self, OutputFormat::JsonPretty | OutputFormat::Table)
    }

    /// Check if format is JSON-based
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

impl FromStr for OutputFormat {
    type Err = crate::error::DocshellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" | "pretty" => Ok(OutputFormat::JsonPretty),
            "table" => Ok(OutputFormat::Table),
            _ => Err(invalid("display.format", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.uri, "mongodb://localhost:27017");
        assert_eq!(config.connection.database, "test");
        assert_eq!(config.display.format, OutputFormat::JsonPretty);
        assert_eq!(config.schema.sample_size, 1);
        assert!(config.display.color_output);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [connection]
            database = "shop"

            [completion]
            collections = ["orders", "users"]
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.database, "shop");
        assert_eq!(config.connection.uri, "mongodb://localhost:27017");
        assert_eq!(config.completion.collections, vec!["orders", "users"]);
        assert_eq!(config.completion.max_suggestions, 50);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[connection\nuri = 1").unwrap_err();
        assert!(matches!(
            err,
            crate::error::DocshellError::Config(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/docshell.toml"))).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DocshellError::Config(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("docshell-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.display.format = OutputFormat::Table;
        config.schema.sample_size = 5;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.display.format, OutputFormat::Table);
        assert_eq!(loaded.schema.sample_size, 5);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DOCSHELL_URI", "mongodb://db.internal:27017"),
            ("DOCSHELL_DATABASE", "analytics"),
            ("DOCSHELL_LOG_LEVEL", "debug"),
            ("DOCSHELL_FORMAT", "table"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_with(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.connection.uri, "mongodb://db.internal:27017");
        assert_eq!(config.connection.database, "analytics");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.display.format, OutputFormat::Table);
    }

    #[test]
    fn test_env_invalid_value() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|name| (name == "DOCSHELL_FORMAT").then(|| "xml".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("display.format"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.connection.uri = "http://localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.uri = "mongodb+srv://cluster.example.net".to_string();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.completion.max_suggestions = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schema.sample_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_checks() {
        assert!(OutputFormat::JsonPretty.is_pretty());
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(!OutputFormat::Json.is_pretty());
        assert!(OutputFormat::Table.is_pretty());
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
    }
}
