//! Built-in decorators.
//!
//! ## Request Side
//!
//! - [`body`] - Body and query string parsing
//! - [`no_retry`] - Duplicate invocation suppression
//! - [`parameters`] - Parameter and secret fetching
//!
//! ## Response Side
//!
//! - [`serialize`] - JSON serialization of responses, error conversion
//! - [`cors`] - CORS headers
//!
//! ## Both
//!
//! - [`validation`] - Request and response schema validation
//! - [`resource`] - Per-invocation resources
//! - [`logging`] - Invocation logs

pub mod body;
pub mod cors;
pub mod logging;
pub mod no_retry;
pub mod parameters;
pub mod resource;
pub mod serialize;
#[cfg(feature = "ssm")]
pub mod ssm;
pub mod validation;

// Re-export main types
pub use body::{BodyFormat, LoadBody, LoadJsonQueryStringParameters};
pub use cors::CorsHeaders;
pub use logging::{InvocationRecord, LogInvocation, Outcome};
pub use no_retry::NoRetryOnFailure;
pub use parameters::{MemoryParameterStore, ParameterStore, ParameterStoreDecorator, Parameters};
pub use resource::ScopedResource;
pub use serialize::{DumpJsonBody, JsonHttpResponse, Serializer};
#[cfg(feature = "ssm")]
pub use ssm::SsmParameterStore;
pub use validation::{JsonSchemaValidator, ValidationTarget};
