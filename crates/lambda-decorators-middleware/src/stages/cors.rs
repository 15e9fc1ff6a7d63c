//! CORS header injection.
//!
//! [`CorsHeaders`] adds `Access-Control-Allow-Origin` (and, optionally,
//! `Access-Control-Allow-Credentials`) to the response after the handler
//! ran. Headers the handler already set are left untouched; the comparison
//! is case-insensitive, so a handler-provided `access-control-allow-origin`
//! also counts.
//!
//! ## Example
//!
//! ```
//! use lambda_decorators_core::{handler_fn, Context, Event, Handler};
//! use lambda_decorators_middleware::stages::CorsHeaders;
//! use lambda_decorators_middleware::HandlerExt;
//! use serde_json::json;
//!
//! let handler = handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!({"statusCode": 200})))
//!     .decorate(CorsHeaders::new().origin("https://app.example.com").credentials(true));
//!
//! let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
//! assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "https://app.example.com");
//! assert_eq!(response["headers"]["Access-Control-Allow-Credentials"], true);
//! ```

use crate::decorator::Decorator;
use lambda_decorators_core::response::HEADERS;
use lambda_decorators_core::{Context, InvocationResult, Response};
use serde_json::{Map, Value};

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
}

/// Origin granted when none is configured.
pub const ANY_ORIGIN: &str = "*";

/// Adds CORS headers to every successful response.
///
/// A `null` response becomes `{"headers": {...}}`. Responses that are not
/// JSON objects (a bare string, say) are returned unchanged, since there is
/// nowhere to put a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    /// Value of `Access-Control-Allow-Origin`.
    origin: String,
    /// Whether to send `Access-Control-Allow-Credentials: true`.
    credentials: bool,
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self {
            origin: ANY_ORIGIN.to_string(),
            credentials: false,
        }
    }
}

impl CorsHeaders {
    /// Creates the decorator granting any origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the granted origin.
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Enables or disables `Access-Control-Allow-Credentials`.
    #[must_use]
    pub fn credentials(mut self, allow: bool) -> Self {
        self.credentials = allow;
        self
    }

    /// Returns the granted origin.
    #[must_use]
    pub fn granted_origin(&self) -> &str {
        &self.origin
    }

    fn add_cors_headers(&self, headers: &mut Map<String, Value>) {
        insert_absent(headers, headers::ALLOW_ORIGIN, Value::String(self.origin.clone()));
        if self.credentials {
            insert_absent(headers, headers::ALLOW_CREDENTIALS, Value::Bool(true));
        }
    }
}

/// Inserts `name` unless a header with the same name in any case exists.
fn insert_absent(headers: &mut Map<String, Value>, name: &str, value: Value) {
    if !headers.keys().any(|key| key.eq_ignore_ascii_case(name)) {
        headers.insert(name.to_string(), value);
    }
}

impl Decorator for CorsHeaders {
    fn name(&self) -> &'static str {
        "cors_headers"
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        let mut map = match response {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                tracing::warn!(
                    request_id = ctx.request_id(),
                    "Response is not an object; CORS headers not added"
                );
                return Ok(other);
            }
        };

        let headers = map
            .entry(HEADERS)
            .or_insert_with(|| Value::Object(Map::new()));
        if headers.is_null() {
            *headers = Value::Object(Map::new());
        }

        match headers.as_object_mut() {
            Some(headers) => self.add_cors_headers(headers),
            None => tracing::warn!(
                request_id = ctx.request_id(),
                "Response headers are not an object; CORS headers not added"
            ),
        }

        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(cors: &CorsHeaders, response: Response) -> Response {
        cors.after(response, &mut Context::new("r")).unwrap()
    }

    #[test]
    fn test_default_origin() {
        let cors = CorsHeaders::new();
        assert_eq!(cors.granted_origin(), "*");

        let response = apply(&cors, json!({"statusCode": 200, "body": "hello"}));
        assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
        assert_eq!(response["body"], "hello");
    }

    #[test]
    fn test_custom_origin_with_credentials() {
        let cors = CorsHeaders::new().origin("https://example.com").credentials(true);
        let response = apply(&cors, json!({"statusCode": 200}));

        assert_eq!(
            response["headers"],
            json!({
                "Access-Control-Allow-Origin": "https://example.com",
                "Access-Control-Allow-Credentials": true
            })
        );
    }

    #[test]
    fn test_existing_headers_are_kept() {
        let cors = CorsHeaders::new();
        let response = apply(
            &cors,
            json!({"statusCode": 200, "headers": {"Content-Type": "text/plain"}}),
        );

        assert_eq!(response["headers"]["Content-Type"], "text/plain");
        assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
    }

    #[test]
    fn test_does_not_overwrite_origin_in_any_case() {
        let cors = CorsHeaders::new().origin("https://example.com");
        let response = apply(
            &cors,
            json!({"statusCode": 200, "headers": {"access-control-allow-origin": "https://other.com"}}),
        );

        let headers = response["headers"].as_object().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["access-control-allow-origin"], "https://other.com");
    }

    #[test]
    fn test_applying_twice_does_not_duplicate() {
        let cors = CorsHeaders::new().credentials(true);
        let once = apply(&cors, json!({"statusCode": 200}));
        let twice = apply(&cors, once.clone());

        assert_eq!(once, twice);
        assert_eq!(twice["headers"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_null_response_becomes_headers_only() {
        let response = apply(&CorsHeaders::new(), Value::Null);
        assert_eq!(
            response,
            json!({"headers": {"Access-Control-Allow-Origin": "*"}})
        );
    }

    #[test]
    fn test_null_headers_replaced() {
        let response = apply(&CorsHeaders::new(), json!({"statusCode": 204, "headers": null}));
        assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
    }

    #[test]
    fn test_non_object_response_unchanged() {
        let response = apply(&CorsHeaders::new(), json!("plain"));
        assert_eq!(response, json!("plain"));
    }

    #[test]
    fn test_decorator_name() {
        assert_eq!(CorsHeaders::new().name(), "cors_headers");
    }
}
