//! Logging setup for lambda-decorators.
//!
//! The decorators emit `tracing` events (short-circuits, duplicate
//! invocations, validation failures, store failures, invocation summaries).
//! This crate installs the subscriber that turns them into output:
//!
//! - **JSON** lines for production and function runtimes
//! - **Pretty** or **compact** text for local development
//!
//! # Example
//!
//! ```rust,ignore
//! use lambda_decorators_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::lambda())?;
//!     // run the handler loop...
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/lambda-decorators-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
