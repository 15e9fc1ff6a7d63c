//! # Lambda Decorators
//!
//! **Composable transforms around serverless function handlers**
//!
//! A handler is a function from an event and an invocation context to a
//! response. A decorator wraps it with up to three steps:
//!
//! - **before** - rewrite the event, or answer immediately without calling the handler
//! - **after** - rewrite whatever the handler returned
//! - **on_exception** - turn a failure into a response, or let it propagate
//!
//! Decorators compose in nesting order. The outermost one's `before` runs
//! first and its `after` runs last.
//!
//! ## Quick Start
//!
//! ```
//! use lambda_decorators::prelude::*;
//! use serde_json::json;
//!
//! let handler = Stack::builder()
//!     .layer(CorsHeaders::new())
//!     .layer(JsonHttpResponse::new())
//!     .layer(LoadBody::json())
//!     .build()
//!     .wrap(handler_fn(|event: Event, _ctx: &mut Context| {
//!         Ok(json!({"echo": event.body().cloned()}))
//!     }));
//!
//! let event = Event::from_value(json!({"body": "{\"x\": 1}"})).unwrap();
//! let response = handler.call(event, &mut Context::new("req-1")).unwrap();
//!
//! assert_eq!(response["statusCode"], 200);
//! assert_eq!(response["body"], r#"{"echo":{"x":1}}"#);
//! assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
//! ```
//!
//! ## From Configuration
//!
//! ```no_run
//! use std::sync::Arc;
//! use lambda_decorators::prelude::*;
//! use lambda_decorators::init_logging_from_config;
//!
//! # fn main() -> Result<(), lambda_decorators::Error> {
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_optional_file("decorators.toml")?
//!     .with_env_prefix("DECORATORS")
//!     .load()?;
//!
//! init_logging_from_config(&config.logging)?;
//! let stack = Stack::from_config(&config, Arc::new(MemoryParameterStore::new()))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`core`] | `Event`, `Context`, `Response`, `Handler`, `InvocationError` |
//! | [`middleware`] | `Decorator`, `Stack`, and the transforms in `middleware::stages` |
//! | [`telemetry`] | Logging initialization |
//! | [`config`] | `DecoratorsConfig` and `ConfigLoader` |

#![doc(html_root_url = "https://docs.rs/lambda-decorators/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod configured;

// Re-export core types
pub use lambda_decorators_core as core;

// Re-export decorators and transforms
pub use lambda_decorators_middleware as middleware;

// Re-export logging setup
pub use lambda_decorators_telemetry as telemetry;

// Re-export configuration
pub use lambda_decorators_config as config;

#[cfg(feature = "ssm")]
pub use configured::ssm_store;
pub use configured::{init_logging_from_config, log_config, validator, Error, StackConfigExt};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use lambda_decorators::prelude::*;
/// ```
pub mod prelude {
    pub use lambda_decorators_core::{
        handler_fn, Context, Event, Handler, HttpResponse, InvocationError, InvocationResult,
        Response, ResponseExt, StoreError,
    };

    pub use lambda_decorators_middleware::{
        after, async_handler, before, on_exception, Before, Decorator, HandlerExt, JsonSchema,
        Next, Stack,
    };

    // Transforms
    pub use lambda_decorators_middleware::stages::{
        CorsHeaders, DumpJsonBody, JsonHttpResponse, JsonSchemaValidator, LoadBody,
        LoadJsonQueryStringParameters, LogInvocation, MemoryParameterStore, NoRetryOnFailure,
        ParameterStore, ParameterStoreDecorator, Parameters, ScopedResource,
    };

    #[cfg(feature = "ssm")]
    pub use lambda_decorators_middleware::stages::SsmParameterStore;

    pub use lambda_decorators_config::{ConfigLoader, DecoratorsConfig};

    pub use crate::StackConfigExt;
}
