//! Structured logging for decorated handlers.
//!
//! Installs a global `tracing-subscriber` registry with one formatting
//! layer (JSON, pretty or compact) behind an [`EnvFilter`]. The decorators
//! in `lambda-decorators-middleware` log through `tracing` macros, so
//! nothing is emitted until a subscriber is installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use lambda_decorators_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::lambda())?;
//!
//! tracing::info!(request_id = "abc", "Processing invocation");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format of the formatting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "lambda_decorators_middleware=debug").
    pub level: String,

    /// Let a `RUST_LOG` environment variable take precedence over `level`.
    pub respect_rust_log: bool,

    /// Output format.
    pub format: LogFormat,

    /// Whether to log span open and close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to emit ANSI colors.
    pub ansi: bool,

    /// Whether to prefix lines with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            respect_rust_log: true,
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
            ansi: true,
            timestamps: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            respect_rust_log: true,
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
            ansi: false,
            timestamps: true,
        }
    }

    /// Creates a configuration for a function runtime whose log sink
    /// timestamps each line itself.
    #[must_use]
    pub fn lambda() -> Self {
        Self {
            timestamps: false,
            include_target: false,
            ..Self::production()
        }
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad filter directive and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = env_filter(config)?;

    tracing_subscriber::registry()
        .with(fmt_layer::<Registry>(config).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        directive: filter.to_string(),
        message: e.to_string(),
    })
}

fn env_filter(config: &LogConfig) -> TelemetryResult<EnvFilter> {
    if config.respect_rust_log {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
    }
    create_env_filter(&config.level)
}

/// Builds the formatting layer described by `config`, writing to stdout.
pub fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target)
        .with_ansi(config.ansi);

    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
    }
}

/// Standard log field names used by the decorators.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// Function name field name.
    pub const FUNCTION_NAME: &str = "function_name";

    /// Service name field name.
    pub const SERVICE: &str = "service";

    /// Name of the decorator that logged.
    pub const DECORATOR: &str = "decorator";

    /// Response status code field name.
    pub const STATUS_CODE: &str = "status_code";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error field name.
    pub const ERROR: &str = "error";

    /// Error category field name.
    pub const CATEGORY: &str = "category";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(config.timestamps);
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert!(config.ansi);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_lambda_config() {
        let config = LogConfig::lambda();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.timestamps);
        assert!(!config.ansi);
        assert!(!config.include_target);
    }

    #[test]
    fn test_builder_methods() {
        let config = LogConfig::production()
            .with_level("warn,lambda_decorators_middleware=debug")
            .with_format(LogFormat::Compact);
        assert_eq!(config.level, "warn,lambda_decorators_middleware=debug");
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("lambda_decorators_middleware=debug").is_ok());

        let err = create_env_filter("lambda_decorators=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            for timestamps in [true, false] {
                let config = LogConfig {
                    format,
                    timestamps,
                    ..LogConfig::default()
                };
                let subscriber = tracing_subscriber::registry().with(fmt_layer::<Registry>(&config));
                tracing::subscriber::with_default(subscriber, || {
                    tracing::info!(request_id = "abc", "format check");
                });
            }
        }
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            level: "not a [valid filter".to_string(),
            ..Default::default()
        };

        // Disabled logging never parses the filter
        assert!(init_logging(&config).is_ok());
    }
}
