//! Response record helpers.
//!
//! A handler may return any JSON value: transforms such as
//! `JsonHttpResponse` wrap a raw payload into the response shape only
//! after the handler ran. [`Response`] is therefore plain
//! [`serde_json::Value`], and [`ResponseExt`] adds the accessors and
//! constructors for the `{statusCode, body, headers}` shape the invoking
//! runtime expects.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The value returned by a handler.
pub type Response = Value;

/// Response field holding the integer status code.
pub const STATUS_CODE: &str = "statusCode";
/// Response field holding the body.
pub const BODY: &str = "body";
/// Response field holding the headers map.
pub const HEADERS: &str = "headers";

/// Extension trait for building and inspecting response records.
pub trait ResponseExt {
    /// Creates a response with the given status code and body.
    fn with_status(status: StatusCode, body: Value) -> Response;

    /// Creates an error response whose body is a plain message.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Returns the `statusCode` field, if present and an integer.
    fn status_code(&self) -> Option<u16>;

    /// Returns `true` if this value is an object carrying a `statusCode`.
    fn is_response_shaped(&self) -> bool;
}

impl ResponseExt for Response {
    fn with_status(status: StatusCode, body: Value) -> Response {
        let mut map = Map::new();
        map.insert(STATUS_CODE.to_string(), Value::from(status.as_u16()));
        map.insert(BODY.to_string(), body);
        Value::Object(map)
    }

    fn error(status: StatusCode, message: &str) -> Response {
        Self::with_status(status, Value::String(message.to_string()))
    }

    fn status_code(&self) -> Option<u16> {
        self.get(STATUS_CODE)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }

    fn is_response_shaped(&self) -> bool {
        self.as_object()
            .is_some_and(|map| map.contains_key(STATUS_CODE))
    }
}

/// A typed HTTP-style response record.
///
/// Handlers that prefer types over ad-hoc JSON can build one of these and
/// convert it into a [`Response`].
///
/// ```
/// use lambda_decorators_core::{HttpResponse, Response, ResponseExt};
/// use serde_json::json;
///
/// let response: Response = HttpResponse::ok(json!("hi")).header("X-Trace", "1").into();
/// assert_eq!(response.status_code(), Some(200));
/// assert_eq!(response["headers"]["X-Trace"], "1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    /// Response body, either a wire string or a structured value awaiting
    /// serialization.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,

    /// Response headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status_code: status.as_u16(),
            body,
            headers: None,
        }
    }

    /// Creates a `200 OK` response.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }
}

impl From<HttpResponse> for Value {
    fn from(response: HttpResponse) -> Self {
        let mut map = Map::new();
        map.insert(STATUS_CODE.to_string(), Value::from(response.status_code));
        if !response.body.is_null() {
            map.insert(BODY.to_string(), response.body);
        }
        if let Some(headers) = response.headers {
            map.insert(HEADERS.to_string(), Value::Object(headers));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response() {
        let response = Response::error(StatusCode::BAD_REQUEST, "BAD REQUEST");
        assert_eq!(response, json!({"statusCode": 400, "body": "BAD REQUEST"}));
        assert_eq!(response.status_code(), Some(400));
    }

    #[test]
    fn test_with_status_structured_body() {
        let response = Response::with_status(StatusCode::OK, json!({"a": 1}));
        assert_eq!(response["body"]["a"], 1);
        assert!(response.is_response_shaped());
    }

    #[test]
    fn test_status_code_absent() {
        assert_eq!(json!({"body": "x"}).status_code(), None);
        assert_eq!(Value::Null.status_code(), None);
        assert!(!json!([1]).is_response_shaped());
    }

    #[test]
    fn test_http_response_round_trips_through_serde() {
        let response = HttpResponse::new(StatusCode::CREATED, json!({"id": 3}))
            .header("Location", "/orders/3");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 201);

        let back: HttpResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_http_response_into_value_skips_null_body() {
        let value: Value = HttpResponse::new(StatusCode::NO_CONTENT, Value::Null).into();
        assert_eq!(value, json!({"statusCode": 204}));
    }
}
