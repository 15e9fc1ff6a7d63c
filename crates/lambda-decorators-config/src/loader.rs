//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` files and environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    BodyFormat, ConfigError, DecoratorsConfig, LogFormat, SerializeMode, ValidationTarget,
};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables, optionally seeded from a `.env` file
///
/// # Example
///
/// ```no_run
/// use lambda_decorators_config::ConfigLoader;
///
/// # fn main() -> Result<(), lambda_decorators_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("decorators.toml")?
///     .with_dotenv()?
///     .with_env_prefix("DECORATORS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: DecoratorsConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DecoratorsConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = DecoratorsConfig::default();
        self
    }

    /// Start with development preset configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use lambda_decorators_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DecoratorsConfig::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DecoratorsConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats, chosen by extension.
    /// The file replaces the current configuration; sections it omits take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields (strict mode)
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or `format` is not "toml" or "json".
    ///
    /// # Example
    ///
    /// ```
    /// use lambda_decorators_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [cors]
    ///     origin = "https://app.example.com"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.cors.origin, "https://app.example.com");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "DECORATORS":
    /// - `DECORATORS__CORS__ORIGIN=https://app.example.com`
    /// - `DECORATORS__NO_RETRY__ENABLED=true`
    /// - `DECORATORS__PARAMETERS__NAMES=/app/db_url,/app/api_key`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory or its parents.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file(self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.into())?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - Configuration validation fails
    pub fn load(mut self) -> Result<DecoratorsConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without applying overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DecoratorsConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<DecoratorsConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let env_vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            // Logging
            ["LOGGING", "ENABLED"] => config.logging.enabled = bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => config.logging.ansi_enabled = bool_var(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = bool_var(key, value)?;
            }
            ["LOGGING", "TIMESTAMPS"] => config.logging.timestamps = bool_var(key, value)?,
            ["LOGGING", "SERVICE_NAME"] => config.logging.service_name = value.to_string(),

            // CORS
            ["CORS", "ENABLED"] => config.cors.enabled = bool_var(key, value)?,
            ["CORS", "ORIGIN"] => config.cors.origin = value.to_string(),
            ["CORS", "ALLOW_CREDENTIALS"] => config.cors.allow_credentials = bool_var(key, value)?,

            // Body
            ["BODY", "ENABLED"] => config.body.enabled = bool_var(key, value)?,
            ["BODY", "FORMAT"] => {
                config.body.format = match value.to_lowercase().as_str() {
                    "json" => BodyFormat::Json,
                    "form" => BodyFormat::Form,
                    "negotiated" => BodyFormat::Negotiated,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'form' or 'negotiated'",
                        ))
                    }
                };
            }
            ["BODY", "JSON_QUERY_STRING"] => config.body.json_query_string = bool_var(key, value)?,
            ["BODY", "SERIALIZE"] => {
                config.body.serialize = match value.to_lowercase().as_str() {
                    "json_http" => SerializeMode::JsonHttp,
                    "dump_body" => SerializeMode::DumpBody,
                    "off" => SerializeMode::Off,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json_http', 'dump_body' or 'off'",
                        ))
                    }
                };
            }

            // Duplicate suppression
            ["NO_RETRY", "ENABLED"] => config.no_retry.enabled = bool_var(key, value)?,

            // Parameters
            ["PARAMETERS", "NAMES"] => {
                config.parameters.names = value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["PARAMETERS", "WITH_DECRYPTION"] => {
                config.parameters.with_decryption = bool_var(key, value)?;
            }

            // Validation
            ["VALIDATION", "REQUEST_SCHEMA"] => {
                config.validation.request_schema = optional_path(value);
            }
            ["VALIDATION", "RESPONSE_SCHEMA"] => {
                config.validation.response_schema = optional_path(value);
            }
            ["VALIDATION", "TARGET"] => {
                config.validation.target = match value.to_lowercase().as_str() {
                    "body" => ValidationTarget::Body,
                    "event" => ValidationTarget::Event,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'body' or 'event'")),
                };
            }

            // Unknown keys are ignored
            _ => {}
        }

        Ok(())
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
