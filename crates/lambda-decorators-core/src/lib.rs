//! # Lambda Decorators Core
//!
//! Core types for the lambda-decorators handler transforms.
//!
//! This crate models the single contract every transform works against: a
//! handler receives an [`Event`] and a [`Context`] and produces a
//! [`Response`].
//!
//! - [`Event`] - Inbound request record (`body`, `headers`, ...)
//! - [`Context`] - Invocation metadata plus a typed extension side-table
//! - [`Response`] - Whatever the handler returned; conventionally
//!   `{statusCode, body, headers}`
//! - [`Handler`] - The invocation contract
//! - [`InvocationError`] - Error taxonomy shared by all transforms

#![doc(html_root_url = "https://docs.rs/lambda-decorators-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod event;
mod handler;
pub mod response;

pub use context::Context;
pub use error::{ErrorCategory, InvocationError, InvocationResult, StoreError};
pub use event::Event;
pub use handler::{handler_fn, Handler, HandlerFn};
pub use response::{HttpResponse, Response, ResponseExt};
