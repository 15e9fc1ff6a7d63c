//! Building stacks and logging from [`DecoratorsConfig`].

use std::path::Path;
use std::sync::Arc;

use lambda_decorators_config::{
    BodyFormat as ConfigBodyFormat, ConfigError, DecoratorsConfig, LogFormat as ConfigLogFormat,
    LoggingConfig, SerializeMode, ValidationConfig, ValidationTarget as ConfigValidationTarget,
};
use lambda_decorators_core::StoreError;
use lambda_decorators_middleware::stages::{
    BodyFormat, CorsHeaders, DumpJsonBody, JsonHttpResponse, JsonSchemaValidator, LoadBody,
    LoadJsonQueryStringParameters, LogInvocation, NoRetryOnFailure, ParameterStore,
    ParameterStoreDecorator, ValidationTarget,
};
use lambda_decorators_middleware::{JsonSchema, SchemaError, Stack};
use lambda_decorators_telemetry::error::TelemetryError;
use lambda_decorators_telemetry::{init_logging, LogConfig, LogFormat};
use thiserror::Error;

/// Errors raised while turning configuration into a running stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured schema file could not be loaded or compiled.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The parameter store could not be created.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds a [`Stack`] from configuration.
///
/// Layers are added outermost first in a fixed order, skipping disabled
/// sections:
///
/// ```text
/// log_invocation → cors_headers → json_http_resp | dump_json_body
///   → no_retry_on_failure → parameter_store → load_body
///   → load_json_query_string_parameters → json_schema_validator → handler
/// ```
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lambda_decorators::prelude::*;
///
/// let config = DecoratorsConfig::production();
/// let stack = Stack::from_config(&config, Arc::new(MemoryParameterStore::new())).unwrap();
/// assert_eq!(stack.layer_names()[0], "log_invocation");
/// ```
pub trait StackConfigExt: Sized {
    /// Builds the stack described by `config`, fetching parameters from `store`.
    fn from_config(config: &DecoratorsConfig, store: Arc<dyn ParameterStore>) -> Result<Self, Error>;
}

impl StackConfigExt for Stack {
    fn from_config(config: &DecoratorsConfig, store: Arc<dyn ParameterStore>) -> Result<Self, Error> {
        config.validate()?;

        let logging = config
            .logging
            .enabled
            .then(|| LogInvocation::new(config.logging.service_name.as_str()));

        let cors = config.cors.enabled.then(|| {
            CorsHeaders::new()
                .origin(config.cors.origin.as_str())
                .credentials(config.cors.allow_credentials)
        });

        let mut builder = Stack::builder().optional_layer(logging).optional_layer(cors);

        builder = match config.body.serialize {
            SerializeMode::JsonHttp => builder.layer(JsonHttpResponse::new()),
            SerializeMode::DumpBody => builder.layer(DumpJsonBody::new()),
            SerializeMode::Off => builder,
        };

        let parameters = (!config.parameters.names.is_empty())
            .then(|| ParameterStoreDecorator::from_shared(store, config.parameters.names.iter().cloned()));

        builder = builder
            .optional_layer(config.no_retry.enabled.then(NoRetryOnFailure::new))
            .optional_layer(parameters)
            .optional_layer(config.body.enabled.then(|| LoadBody::new(body_format(config.body.format))))
            .optional_layer(config.body.json_query_string.then_some(LoadJsonQueryStringParameters))
            .optional_layer(validator(&config.validation)?);

        let stack = builder.build();
        tracing::debug!(layers = ?stack.layer_names(), "built decorator stack from configuration");
        Ok(stack)
    }
}

/// Loads the configured schema files into a validator.
///
/// Returns `None` when no schema is configured.
pub fn validator(config: &ValidationConfig) -> Result<Option<JsonSchemaValidator>, Error> {
    if !config.is_enabled() {
        return Ok(None);
    }

    let mut validator = JsonSchemaValidator::new().target(match config.target {
        ConfigValidationTarget::Body => ValidationTarget::Body,
        ConfigValidationTarget::Event => ValidationTarget::Event,
    });

    if let Some(path) = &config.request_schema {
        validator = validator.request_schema(load_schema(path)?);
    }
    if let Some(path) = &config.response_schema {
        validator = validator.response_schema(load_schema(path)?);
    }

    Ok(Some(validator))
}

fn load_schema(path: &Path) -> Result<JsonSchema, Error> {
    let schema = JsonSchema::from_file(path)?;
    tracing::debug!(path = %path.display(), "loaded schema");
    Ok(schema)
}

fn body_format(format: ConfigBodyFormat) -> BodyFormat {
    match format {
        ConfigBodyFormat::Json => BodyFormat::Json,
        ConfigBodyFormat::Form => BodyFormat::Form,
        ConfigBodyFormat::Negotiated => BodyFormat::Negotiated,
    }
}

/// Translates the logging section into a telemetry [`LogConfig`].
#[must_use]
pub fn log_config(config: &LoggingConfig) -> LogConfig {
    LogConfig {
        enabled: config.enabled,
        level: config.level.clone(),
        format: match config.format {
            ConfigLogFormat::Json => LogFormat::Json,
            ConfigLogFormat::Pretty => LogFormat::Pretty,
            ConfigLogFormat::Compact => LogFormat::Compact,
        },
        file_line_info: config.include_location,
        ansi: config.ansi_enabled,
        timestamps: config.timestamps,
        ..LogConfig::production()
    }
}

/// Installs the global subscriber described by the logging section.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<(), Error> {
    init_logging(&log_config(config))?;
    Ok(())
}

/// Creates an SSM parameter store honoring `with_decryption`.
#[cfg(feature = "ssm")]
pub fn ssm_store(
    config: &lambda_decorators_config::ParametersConfig,
) -> Result<lambda_decorators_middleware::stages::SsmParameterStore, Error> {
    Ok(lambda_decorators_middleware::stages::SsmParameterStore::from_env()?.decrypt(config.with_decryption))
}
