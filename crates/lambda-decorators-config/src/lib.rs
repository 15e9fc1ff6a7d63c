//! Typed configuration for lambda-decorators stacks.
//!
//! Decorators that take construction-time parameters (CORS origin, body
//! format, parameter names, schema files, ...) can be configured from:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - `.env` files
//!
//! Unknown fields are rejected, and every section has defaults.
//!
//! # Overview
//!
//! [`DecoratorsConfig`] holds one section per concern:
//!
//! - [`LoggingConfig`] - Log level, format and service name
//! - [`CorsConfig`] - CORS origin and credentials
//! - [`BodyConfig`] - Body parsing and response serialization
//! - [`NoRetryConfig`] - Duplicate invocation suppression
//! - [`ParametersConfig`] - Parameter names to fetch
//! - [`ValidationConfig`] - Request/response schema files
//!
//! # Configuration File Format
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "orders"
//!
//! [cors]
//! origin = "https://shop.example.com"
//! allow_credentials = true
//!
//! [body]
//! format = "json"
//! serialize = "json_http"
//!
//! [no_retry]
//! enabled = true
//!
//! [parameters]
//! names = ["/orders/db_url"]
//!
//! [validation]
//! request_schema = "schemas/order.json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`, for example:
//!
//! - `DECORATORS__LOGGING__LEVEL=debug`
//! - `DECORATORS__NO_RETRY__ENABLED=true`
//! - `DECORATORS__PARAMETERS__NAMES=/orders/db_url,/orders/api_key`

#![doc(html_root_url = "https://docs.rs/lambda-decorators-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
