//! Main configuration types.
//!
//! This module provides the top-level [`DecoratorsConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    BodyConfig, ConfigError, CorsConfig, LogFormat, LoggingConfig, NoRetryConfig, ParametersConfig,
    ValidationConfig,
};

/// Complete decorator stack configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use lambda_decorators_config::DecoratorsConfig;
///
/// let config = DecoratorsConfig::default();
/// assert_eq!(config.cors.origin, "*");
/// assert!(!config.no_retry.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DecoratorsConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CORS header configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Body parsing and response serialization.
    #[serde(default)]
    pub body: BodyConfig,

    /// Duplicate invocation suppression.
    #[serde(default)]
    pub no_retry: NoRetryConfig,

    /// Parameter store fetching.
    #[serde(default)]
    pub parameters: ParametersConfig,

    /// Schema validation.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl DecoratorsConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> DecoratorsConfigBuilder {
        DecoratorsConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The log level or CORS origin is empty
    /// - Credentials are allowed for the wildcard origin
    /// - A parameter name is empty or listed twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        if self.cors.enabled {
            if self.cors.origin.trim().is_empty() {
                return Err(ConfigError::invalid_value("cors.origin", "must not be empty"));
            }
            if self.cors.allow_credentials && self.cors.origin == "*" {
                return Err(ConfigError::invalid_value(
                    "cors.allow_credentials",
                    "credentials cannot be allowed for the wildcard origin",
                ));
            }
        }

        let mut seen = HashSet::new();
        for name in &self.parameters.names {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "parameters.names",
                    "parameter names must not be empty",
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "parameter '{name}' is listed more than once"
                )));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored debug logs with source locations.
    ///
    /// # Example
    ///
    /// ```
    /// use lambda_decorators_config::DecoratorsConfig;
    ///
    /// let config = DecoratorsConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs without timestamps (the function runtime's log sink adds
    /// them) and duplicate suppression turned on.
    ///
    /// # Example
    ///
    /// ```
    /// use lambda_decorators_config::{DecoratorsConfig, LogFormat};
    ///
    /// let config = DecoratorsConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(config.no_retry.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config.logging.timestamps = false;

        config.no_retry.enabled = true;

        config
    }
}

/// Builder for [`DecoratorsConfig`].
#[derive(Debug, Default)]
pub struct DecoratorsConfigBuilder {
    logging: Option<LoggingConfig>,
    cors: Option<CorsConfig>,
    body: Option<BodyConfig>,
    no_retry: Option<NoRetryConfig>,
    parameters: Option<ParametersConfig>,
    validation: Option<ValidationConfig>,
}

impl DecoratorsConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the CORS configuration.
    #[must_use]
    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Set the body configuration.
    #[must_use]
    pub fn body(mut self, body: BodyConfig) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the duplicate suppression configuration.
    #[must_use]
    pub fn no_retry(mut self, no_retry: NoRetryConfig) -> Self {
        self.no_retry = Some(no_retry);
        self
    }

    /// Set the parameter store configuration.
    #[must_use]
    pub fn parameters(mut self, parameters: ParametersConfig) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the validation configuration.
    #[must_use]
    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> DecoratorsConfig {
        DecoratorsConfig {
            logging: self.logging.unwrap_or_default(),
            cors: self.cors.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
            no_retry: self.no_retry.unwrap_or_default(),
            parameters: self.parameters.unwrap_or_default(),
            validation: self.validation.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<DecoratorsConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
