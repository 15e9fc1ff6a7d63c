//! Response body serialization.
//!
//! - [`DumpJsonBody`] serializes `response.body` in place for handlers that
//!   already build `{statusCode, body}` themselves.
//! - [`JsonHttpResponse`] treats the handler's return value as the payload
//!   and wraps it into a `200` response.
//!
//! Both answer handler failures with a response carrying the error message
//! (500 for internal failures, 400 for validation failures). Duplicate
//! signals and parameter-store failures keep propagating.
//!
//! Both accept a custom [`Serializer`]. A serializer that fails produces a
//! `500` response carrying its error message.

use crate::decorator::Decorator;
use lambda_decorators_core::response::{BODY, HEADERS, STATUS_CODE};
use lambda_decorators_core::{Context, ErrorCategory, InvocationError, InvocationResult, Response, ResponseExt};
use http::StatusCode;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Turns a body value into the string sent to the client.
pub type Serializer = Arc<dyn Fn(&Value) -> Result<String, String> + Send + Sync>;

fn serializer<F, E>(f: F) -> Serializer
where
    F: Fn(&Value) -> Result<String, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    Arc::new(move |value| f(value).map_err(|e| e.to_string()))
}

fn serialize(serializer: Option<&Serializer>, value: &Value) -> Result<String, String> {
    match serializer {
        Some(serializer) => serializer(value),
        None => serde_json::to_string(value).map_err(|e| e.to_string()),
    }
}

/// Serializes the `body` of the handler's response to a JSON string.
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::DumpJsonBody;
/// use lambda_decorators_middleware::HandlerExt;
/// use serde_json::json;
///
/// let handler = handler_fn(|_event: Event, _ctx: &mut Context| {
///     Ok(json!({"statusCode": 200, "body": {"hello": "world"}}))
/// })
/// .decorate(DumpJsonBody::new());
///
/// let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
/// assert_eq!(response, json!({"statusCode": 200, "body": "{\"hello\":\"world\"}"}));
/// ```
#[derive(Clone, Default)]
pub struct DumpJsonBody {
    serializer: Option<Serializer>,
}

impl DumpJsonBody {
    /// Creates a stage using compact JSON.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces compact JSON with a custom serializer.
    #[must_use]
    pub fn with_serializer<F, E>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<String, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.serializer = Some(serializer(f));
        self
    }
}

impl fmt::Debug for DumpJsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpJsonBody")
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

impl Decorator for DumpJsonBody {
    fn name(&self) -> &'static str {
        "dump_json_body"
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        let mut map = match response {
            Value::Object(map) => map,
            other => return Ok(other),
        };

        if let Some(body) = map.get_mut(BODY) {
            match serialize(self.serializer.as_ref(), body) {
                Ok(serialized) => *body = Value::String(serialized),
                Err(e) => return Ok(serialization_failure(self.name(), ctx, &e)),
            }
        }

        Ok(Value::Object(map))
    }

    fn on_exception(&self, error: InvocationError, ctx: &mut Context) -> InvocationResult<Response> {
        error_response(self.name(), error, ctx)
    }
}

/// Wraps the handler's return value into `{statusCode: 200, body: <json>}`.
///
/// An object payload may pick its own status by carrying an integer
/// `statusCode`; the key is removed from the serialized body. A value that
/// is already a formed response (only `statusCode`, a string `body` and
/// `headers`) passes through, so short-circuit responses from inner
/// decorators are not wrapped a second time.
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::JsonHttpResponse;
/// use lambda_decorators_middleware::HandlerExt;
/// use serde_json::json;
///
/// let handler = handler_fn(|_event: Event, _ctx: &mut Context| {
///     Ok(json!({"foo": "bar", "statusCode": 403}))
/// })
/// .decorate(JsonHttpResponse::new());
///
/// let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
/// assert_eq!(response, json!({"statusCode": 403, "body": "{\"foo\":\"bar\"}"}));
/// ```
#[derive(Clone, Default)]
pub struct JsonHttpResponse {
    serializer: Option<Serializer>,
}

impl JsonHttpResponse {
    /// Creates a stage using compact JSON.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces compact JSON with a custom serializer.
    #[must_use]
    pub fn with_serializer<F, E>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<String, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.serializer = Some(serializer(f));
        self
    }

    fn is_formed(payload: &Value) -> bool {
        let Some(map) = payload.as_object() else {
            return false;
        };
        payload.status_code().is_some()
            && map.get(BODY).map_or(true, Value::is_string)
            && map.keys().all(|key| [STATUS_CODE, BODY, HEADERS].contains(&key.as_str()))
    }

    /// Splits a donated status code off the payload.
    fn take_status(payload: Value) -> (StatusCode, Value) {
        let mut map = match payload {
            Value::Object(map) => map,
            other => return (StatusCode::OK, other),
        };

        let status = map
            .get(STATUS_CODE)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok());

        match status {
            Some(status) => {
                map.remove(STATUS_CODE);
                (status, Value::Object(map))
            }
            None => (StatusCode::OK, Value::Object(map)),
        }
    }
}

impl fmt::Debug for JsonHttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonHttpResponse")
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

impl Decorator for JsonHttpResponse {
    fn name(&self) -> &'static str {
        "json_http_resp"
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        if Self::is_formed(&response) {
            return Ok(response);
        }

        let (status, payload) = Self::take_status(response);
        match serialize(self.serializer.as_ref(), &payload) {
            Ok(body) => Ok(Response::with_status(status, Value::String(body))),
            Err(e) => Ok(serialization_failure(self.name(), ctx, &e)),
        }
    }

    fn on_exception(&self, error: InvocationError, ctx: &mut Context) -> InvocationResult<Response> {
        error_response(self.name(), error, ctx)
    }
}

fn serialization_failure(stage: &'static str, ctx: &Context, error: &str) -> Response {
    tracing::error!(
        decorator = stage,
        request_id = ctx.request_id(),
        error = %error,
        "Response body could not be serialized"
    );
    Response::error(StatusCode::INTERNAL_SERVER_ERROR, error)
}

/// Answers validation and internal failures with an error response.
///
/// Duplicate signals and upstream failures are returned unchanged so they
/// reach the hosting runtime (or an explicit `on_exception` further out).
pub(crate) fn error_response(
    stage: &'static str,
    error: InvocationError,
    ctx: &Context,
) -> InvocationResult<Response> {
    match error.category() {
        ErrorCategory::Validation | ErrorCategory::Internal => {
            tracing::error!(
                decorator = stage,
                request_id = ctx.request_id(),
                error = %error,
                "Handler failed"
            );
            Ok(Response::error(error.status_code(), &error.to_string()))
        }
        ErrorCategory::Duplicate | ErrorCategory::Upstream => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_decorators_core::StoreError;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new("r")
    }

    #[test]
    fn test_dump_json_body() {
        let response = DumpJsonBody::new()
            .after(json!({"statusCode": 200, "body": {"hello": "world"}}), &mut ctx())
            .unwrap();
        assert_eq!(response["body"], "{\"hello\":\"world\"}");
        assert_eq!(response["statusCode"], 200);
    }

    #[test]
    fn test_dump_json_body_string_body_is_encoded() {
        let response = DumpJsonBody::new()
            .after(json!({"statusCode": 200, "body": "hi"}), &mut ctx())
            .unwrap();
        assert_eq!(response["body"], "\"hi\"");
    }

    #[test]
    fn test_dump_json_body_passes_through_bodyless_and_null() {
        let response = DumpJsonBody::new().after(json!({"statusCode": 204}), &mut ctx()).unwrap();
        assert_eq!(response, json!({"statusCode": 204}));

        let response = DumpJsonBody::new().after(Value::Null, &mut ctx()).unwrap();
        assert_eq!(response, Value::Null);
    }

    #[test]
    fn test_dump_json_body_handler_error() {
        let response = DumpJsonBody::new()
            .on_exception(InvocationError::handler("barf"), &mut ctx())
            .unwrap();
        assert_eq!(response, json!({"statusCode": 500, "body": "barf"}));
    }

    #[test]
    fn test_store_and_duplicate_errors_propagate() {
        let error = DumpJsonBody::new()
            .on_exception(StoreError::not_found("/x").into(), &mut ctx())
            .unwrap_err();
        assert!(matches!(error, InvocationError::Store(_)));

        let error = JsonHttpResponse::new()
            .on_exception(InvocationError::duplicate("a"), &mut ctx())
            .unwrap_err();
        assert!(error.is_duplicate());
    }

    #[test]
    fn test_json_http_response() {
        let response = JsonHttpResponse::new()
            .after(json!({"hello": "world"}), &mut ctx())
            .unwrap();
        assert_eq!(response, json!({"statusCode": 200, "body": "{\"hello\":\"world\"}"}));
    }

    #[test]
    fn test_json_http_response_donated_status() {
        let response = JsonHttpResponse::new()
            .after(json!({"foo": "bar", "statusCode": 403}), &mut ctx())
            .unwrap();
        assert_eq!(response, json!({"statusCode": 403, "body": "{\"foo\":\"bar\"}"}));
    }

    #[test]
    fn test_json_http_response_invalid_status_stays_in_body() {
        let response = JsonHttpResponse::new()
            .after(json!({"statusCode": "teapot"}), &mut ctx())
            .unwrap();
        assert_eq!(response["statusCode"], 200);
        assert_eq!(response["body"], "{\"statusCode\":\"teapot\"}");
    }

    #[test]
    fn test_json_http_response_formed_response_passes_through() {
        let formed = json!({"statusCode": 400, "body": "BAD REQUEST: eof"});
        let response = JsonHttpResponse::new().after(formed.clone(), &mut ctx()).unwrap();
        assert_eq!(response, formed);

        let payload = json!({"statusCode": 201, "body": {"id": 1}});
        let response = JsonHttpResponse::new().after(payload, &mut ctx()).unwrap();
        assert_eq!(response, json!({"statusCode": 201, "body": "{\"body\":{\"id\":1}}"}));
    }

    #[test]
    fn test_json_http_response_formed_success_passes_through() {
        let formed = json!({"statusCode": 201, "body": "created"});
        let response = JsonHttpResponse::new().after(formed.clone(), &mut ctx()).unwrap();
        assert_eq!(response, formed);

        let formed = json!({"statusCode": 201, "body": "created", "headers": {"Location": "/orders/1"}});
        let response = JsonHttpResponse::new().after(formed.clone(), &mut ctx()).unwrap();
        assert_eq!(response, formed);
    }

    #[test]
    fn test_custom_serializer_is_used() {
        let pretty = |value: &Value| serde_json::to_string_pretty(value);

        let response = DumpJsonBody::new()
            .with_serializer(pretty)
            .after(json!({"statusCode": 200, "body": {"a": 1}}), &mut ctx())
            .unwrap();
        assert_eq!(response["body"], "{\n  \"a\": 1\n}");

        let response = JsonHttpResponse::new()
            .with_serializer(pretty)
            .after(json!({"a": 1}), &mut ctx())
            .unwrap();
        assert_eq!(response, json!({"statusCode": 200, "body": "{\n  \"a\": 1\n}"}));
    }

    #[test]
    fn test_failing_serializer_is_500() {
        let strict = |value: &Value| {
            if value.get("when").is_some_and(Value::is_number) {
                Err("Object of type datetime is not JSON serializable")
            } else {
                serde_json::to_string(value).map_err(|_| "unreachable")
            }
        };

        let response = DumpJsonBody::new()
            .with_serializer(strict)
            .after(json!({"statusCode": 200, "body": {"when": 1}}), &mut ctx())
            .unwrap();
        assert_eq!(
            response,
            json!({"statusCode": 500, "body": "Object of type datetime is not JSON serializable"})
        );

        let response = JsonHttpResponse::new()
            .with_serializer(strict)
            .after(json!({"when": 1}), &mut ctx())
            .unwrap();
        assert_eq!(response.status_code(), Some(500));

        let response = JsonHttpResponse::new()
            .with_serializer(strict)
            .after(json!({"when": "today"}), &mut ctx())
            .unwrap();
        assert_eq!(response, json!({"statusCode": 200, "body": "{\"when\":\"today\"}"}));
    }

    #[test]
    fn test_debug_shows_serializer() {
        assert!(format!("{:?}", DumpJsonBody::new()).contains("serializer: false"));
        let stage = JsonHttpResponse::new().with_serializer(|v: &Value| serde_json::to_string(v));
        assert!(format!("{stage:?}").contains("serializer: true"));
    }

    #[test]
    fn test_json_http_response_null_payload() {
        let response = JsonHttpResponse::new().after(Value::Null, &mut ctx()).unwrap();
        assert_eq!(response, json!({"statusCode": 200, "body": "null"}));
    }

    #[test]
    fn test_json_http_response_validation_error_is_400() {
        let response = JsonHttpResponse::new()
            .on_exception(InvocationError::validation("bad id"), &mut ctx())
            .unwrap();
        assert_eq!(response.status_code(), Some(400));
        assert_eq!(response["body"], "Validation error: bad id");
    }
}
