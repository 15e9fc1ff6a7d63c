//! # Lambda Decorators Middleware
//!
//! Composable before/after/on-exception transforms for serverless handlers.
//!
//! A [`Decorator`] wraps a [`Handler`](lambda_decorators_core::Handler) and
//! may rewrite the event before it runs, rewrite the response after it
//! returns, or turn a failure into a response. Decorators compose: the
//! outermost one sees the raw event first and the final response last.
//!
//! ```text
//! event ─▶ A.before ─▶ B.before ─▶ C.before ─▶ handler
//!                                                 │
//! response ◀─ A.after ◀─ B.after ◀─ C.after ◀─────┘
//! ```
//!
//! ## Built-in Stages
//!
//! | Stage | Step | Purpose |
//! |-------|------|---------|
//! | [`LoadBody`](stages::LoadBody) | before | Parse a JSON or form-encoded body |
//! | [`LoadJsonQueryStringParameters`](stages::LoadJsonQueryStringParameters) | before | Parse JSON query values |
//! | [`DumpJsonBody`](stages::DumpJsonBody) | after | Serialize the response body |
//! | [`JsonHttpResponse`](stages::JsonHttpResponse) | after | Wrap a value in a 200 response |
//! | [`CorsHeaders`](stages::CorsHeaders) | after | Add CORS headers |
//! | [`JsonSchemaValidator`](stages::JsonSchemaValidator) | both | Validate request and response |
//! | [`NoRetryOnFailure`](stages::NoRetryOnFailure) | before | Refuse repeated request ids |
//! | [`ParameterStoreDecorator`](stages::ParameterStoreDecorator) | before | Fetch parameters and secrets |
//! | [`ScopedResource`](stages::ScopedResource) | both | Open and release a per-invocation resource |
//! | [`LogInvocation`](stages::LogInvocation) | both | Structured invocation logs |
//!
//! ## Example
//!
//! ```
//! use lambda_decorators_core::{handler_fn, Context, Event, Handler};
//! use lambda_decorators_middleware::stages::{CorsHeaders, JsonHttpResponse, LoadBody};
//! use lambda_decorators_middleware::Stack;
//! use serde_json::json;
//!
//! let handler = Stack::builder()
//!     .layer(CorsHeaders::new())
//!     .layer(JsonHttpResponse::new())
//!     .layer(LoadBody::json())
//!     .build()
//!     .wrap(handler_fn(|event: Event, _ctx: &mut Context| {
//!         Ok(json!({"echo": event.body()}))
//!     }));
//!
//! let event = Event::from_value(json!({"body": "{\"a\": 1}"})).unwrap();
//! let response = handler.call(event, &mut Context::new("req-1")).unwrap();
//! assert_eq!(response["statusCode"], 200);
//! assert_eq!(response["body"], "{\"echo\":{\"a\":1}}");
//! ```

#![doc(html_root_url = "https://docs.rs/lambda-decorators-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod async_handler;
pub mod decorator;
pub mod schema;
pub mod stack;
pub mod stages;

// Re-export main types at crate root
pub use async_handler::{async_handler, AsyncHandler, BoxFuture};
pub use decorator::{after, before, on_exception, Before, Decorator, FnAfter, FnBefore, FnOnException, Next};
pub use schema::{JsonSchema, SchemaError, ValidationError};
pub use stack::{BoxedDecorator, Decorated, HandlerExt, Stack, StackBuilder, Wrapped};
