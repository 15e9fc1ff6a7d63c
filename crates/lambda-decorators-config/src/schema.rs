//! Configuration schema types.
//!
//! One section per configurable decorator, plus logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
    /// Single-line human-readable format.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Prefix each line with a timestamp.
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Service name attached to every invocation span.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
            timestamps: true,
            service_name: default_service_name(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "lambda".to_string()
}

/// CORS header configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Add CORS headers to responses.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Value of `Access-Control-Allow-Origin`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Send `Access-Control-Allow-Credentials: true`.
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: default_origin(),
            allow_credentials: false,
        }
    }
}

fn default_origin() -> String {
    "*".to_string()
}

/// How request bodies are parsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    /// JSON bodies.
    #[default]
    Json,
    /// `application/x-www-form-urlencoded` bodies.
    Form,
    /// Chosen per request from `Content-Type`.
    Negotiated,
}

/// How handler return values are serialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SerializeMode {
    /// Wrap the return value into a `200` response with a JSON body.
    #[default]
    JsonHttp,
    /// Serialize the `body` of a response the handler built itself.
    DumpBody,
    /// Return handler values untouched.
    Off,
}

/// Request and response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    /// Parse request bodies.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Body format.
    #[serde(default)]
    pub format: BodyFormat,

    /// Parse `queryStringParameters` when it arrives as a JSON string.
    #[serde(default)]
    pub json_query_string: bool,

    /// Response serialization.
    #[serde(default)]
    pub serialize: SerializeMode,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: BodyFormat::default(),
            json_query_string: false,
            serialize: SerializeMode::default(),
        }
    }
}

/// Duplicate invocation suppression.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NoRetryConfig {
    /// Refuse request ids this process has already seen.
    #[serde(default)]
    pub enabled: bool,
}

/// Parameter store fetching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    /// Parameter names fetched before every invocation. Empty disables it.
    #[serde(default)]
    pub names: Vec<String>,

    /// Decrypt secure values.
    #[serde(default = "default_true")]
    pub with_decryption: bool,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            with_decryption: true,
        }
    }
}

/// Which part of the event the request schema applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTarget {
    /// The (parsed) body.
    #[default]
    Body,
    /// The whole event.
    Event,
}

/// Schema validation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// JSON Schema file checked against requests.
    #[serde(default)]
    pub request_schema: Option<PathBuf>,

    /// JSON Schema file checked against responses.
    #[serde(default)]
    pub response_schema: Option<PathBuf>,

    /// Part of the event the request schema applies to.
    #[serde(default)]
    pub target: ValidationTarget,
}

impl ValidationConfig {
    /// Returns `true` if either schema is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.request_schema.is_some() || self.response_schema.is_some()
    }
}

fn default_true() -> bool {
    true
}
