//! Request body and query string parsing.
//!
//! [`LoadBody`] replaces a raw string `body` with its parsed value before
//! the handler runs. A body that does not parse never reaches the handler:
//! the invocation is answered with `400 BAD REQUEST: <detail>` instead.
//! Bodies that are already structured (or absent) are left alone, so the
//! stage can sit in a stack more than once without harm.
//!
//! ## Formats
//!
//! | Constructor | Parses |
//! |-------------|--------|
//! | [`LoadBody::json`] | JSON |
//! | [`LoadBody::form`] | `application/x-www-form-urlencoded` |
//! | [`LoadBody::negotiated`] | form when the `Content-Type` header says so, JSON otherwise |

use crate::decorator::{Before, Decorator};
use lambda_decorators_core::{Context, Event, InvocationResult, Response, ResponseExt};
use http::StatusCode;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Prefix of every parse-failure response body.
pub const BAD_REQUEST: &str = "BAD REQUEST";

/// MIME type of URL-encoded form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Post-processing applied to every successfully parsed body.
pub type BodyHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Body encodings understood by [`LoadBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// JSON text.
    Json,
    /// URL-encoded form fields.
    Form,
    /// Chosen per request from the `Content-Type` header.
    Negotiated,
}

/// Parses the event's string `body` in place.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::LoadBody;
/// use lambda_decorators_middleware::HandlerExt;
/// use serde_json::json;
///
/// let handler = handler_fn(|event: Event, _ctx: &mut Context| Ok(event.body().unwrap()["foobar"].clone()))
///     .decorate(LoadBody::json());
///
/// let event = Event::from_value(json!({"body": "{\"foobar\": \"baz\"}"})).unwrap();
/// assert_eq!(handler.call(event, &mut Context::new("r")).unwrap(), json!("baz"));
///
/// let event = Event::from_value(json!({"body": "{\"foobar\":"})).unwrap();
/// let response = handler.call(event, &mut Context::new("r")).unwrap();
/// assert_eq!(response["statusCode"], 400);
/// ```
#[derive(Clone)]
pub struct LoadBody {
    format: BodyFormat,
    hook: Option<BodyHook>,
}

impl LoadBody {
    /// Creates a stage parsing bodies in the given format.
    #[must_use]
    pub fn new(format: BodyFormat) -> Self {
        Self { format, hook: None }
    }

    /// Parses JSON bodies.
    #[must_use]
    pub fn json() -> Self {
        Self::new(BodyFormat::Json)
    }

    /// Parses URL-encoded form bodies.
    #[must_use]
    pub fn form() -> Self {
        Self::new(BodyFormat::Form)
    }

    /// Picks the format from the request's `Content-Type` header.
    #[must_use]
    pub fn negotiated() -> Self {
        Self::new(BodyFormat::Negotiated)
    }

    /// Applies `hook` to every parsed body before the handler sees it.
    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Returns the configured format.
    #[must_use]
    pub fn format(&self) -> BodyFormat {
        self.format
    }

    fn resolve_format(&self, event: &Event) -> BodyFormat {
        match self.format {
            BodyFormat::Negotiated => {
                let is_form = event
                    .header(http::header::CONTENT_TYPE.as_str())
                    .and_then(|value| value.split(';').next())
                    .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
                if is_form {
                    BodyFormat::Form
                } else {
                    BodyFormat::Json
                }
            }
            format => format,
        }
    }

    fn parse(&self, raw: &str, format: BodyFormat) -> Result<Value, String> {
        let parsed = match format {
            BodyFormat::Form => parse_form(raw)?,
            BodyFormat::Json | BodyFormat::Negotiated => {
                serde_json::from_str(raw).map_err(|e| e.to_string())?
            }
        };

        Ok(match &self.hook {
            Some(hook) => hook(parsed),
            None => parsed,
        })
    }
}

impl Default for LoadBody {
    fn default() -> Self {
        Self::json()
    }
}

impl std::fmt::Debug for LoadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBody")
            .field("format", &self.format)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Decorator for LoadBody {
    fn name(&self) -> &'static str {
        "load_body"
    }

    fn before(&self, mut event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let Some(Value::String(raw)) = event.body() else {
            return Ok(Before::Continue(event));
        };

        let format = self.resolve_format(&event);
        match self.parse(raw, format) {
            Ok(parsed) => {
                event.set_body(parsed);
                Ok(Before::Continue(event))
            }
            Err(detail) => {
                tracing::info!(
                    request_id = ctx.request_id(),
                    format = ?format,
                    error = %detail,
                    "Request body could not be parsed"
                );
                Ok(Before::Respond(bad_request(&detail)))
            }
        }
    }
}

/// Parses `queryStringParameters` when it arrives as a JSON string.
///
/// Some invokers pass query parameters as a serialized JSON object. Objects
/// and `null` pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadJsonQueryStringParameters;

impl Decorator for LoadJsonQueryStringParameters {
    fn name(&self) -> &'static str {
        "load_json_query_string_parameters"
    }

    fn before(&self, mut event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let Some(Value::String(raw)) = event.get(Event::QUERY_STRING_PARAMETERS) else {
            return Ok(Before::Continue(event));
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => {
                event.insert(Event::QUERY_STRING_PARAMETERS, parsed);
                Ok(Before::Continue(event))
            }
            Err(e) => {
                tracing::info!(
                    request_id = ctx.request_id(),
                    error = %e,
                    "Query string parameters could not be parsed"
                );
                Ok(Before::Respond(bad_request(&e.to_string())))
            }
        }
    }
}

fn bad_request(detail: &str) -> Response {
    Response::error(StatusCode::BAD_REQUEST, &format!("{BAD_REQUEST}: {detail}"))
}

/// Decodes form fields into an object; repeated keys collect into arrays.
fn parse_form(raw: &str) -> Result<Value, String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).map_err(|e| e.to_string())?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        match fields.get_mut(&key) {
            None => {
                fields.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }

    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(stage: &impl Decorator, event: Value) -> Before {
        stage
            .before(Event::from_value(event).unwrap(), &mut Context::new("r"))
            .unwrap()
    }

    fn continued(before: Before) -> Event {
        match before {
            Before::Continue(event) => event,
            Before::Respond(response) => panic!("unexpected short-circuit: {response}"),
        }
    }

    fn responded(before: Before) -> Response {
        match before {
            Before::Respond(response) => response,
            Before::Continue(event) => panic!("expected short-circuit, got {event:?}"),
        }
    }

    #[test]
    fn test_json_body_parsed_in_place() {
        let event = continued(run(
            &LoadBody::json(),
            json!({"body": "{\"foo\": [1, 2]}", "path": "/x"}),
        ));
        assert_eq!(event.body(), Some(&json!({"foo": [1, 2]})));
        assert_eq!(event.get("path"), Some(&json!("/x")));
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let response = responded(run(&LoadBody::json(), json!({"body": "{\"foo\":"})));
        assert_eq!(response.status_code(), Some(400));
        assert!(response["body"].as_str().unwrap().starts_with("BAD REQUEST: "));
    }

    #[test]
    fn test_empty_json_body_is_bad_request() {
        let response = responded(run(&LoadBody::json(), json!({"body": ""})));
        assert_eq!(response.status_code(), Some(400));
    }

    #[test]
    fn test_structured_or_missing_body_untouched() {
        let event = continued(run(&LoadBody::json(), json!({"body": {"already": true}})));
        assert_eq!(event.body(), Some(&json!({"already": true})));

        let event = continued(run(&LoadBody::json(), json!({"path": "/"})));
        assert!(event.body().is_none());
    }

    #[test]
    fn test_hook_applied() {
        let stage = LoadBody::json().with_hook(|value| json!({ "wrapped": value }));
        let event = continued(run(&stage, json!({"body": "[1]"})));
        assert_eq!(event.body(), Some(&json!({"wrapped": [1]})));
    }

    #[test]
    fn test_form_body() {
        let event = continued(run(
            &LoadBody::form(),
            json!({"body": "name=Ada+Lovelace&tag=a&tag=b&tag=c&empty="}),
        ));
        assert_eq!(
            event.body(),
            Some(&json!({"name": "Ada Lovelace", "tag": ["a", "b", "c"], "empty": ""}))
        );
    }

    #[test]
    fn test_empty_form_body_is_empty_object() {
        let event = continued(run(&LoadBody::form(), json!({"body": ""})));
        assert_eq!(event.body(), Some(&json!({})));
    }

    #[test]
    fn test_negotiated_uses_content_type() {
        let event = continued(run(
            &LoadBody::negotiated(),
            json!({
                "headers": {"content-type": "application/x-www-form-urlencoded; charset=utf-8"},
                "body": "a=1"
            }),
        ));
        assert_eq!(event.body(), Some(&json!({"a": "1"})));

        let event = continued(run(
            &LoadBody::negotiated(),
            json!({"headers": {"Content-Type": "application/json"}, "body": "{\"a\": 1}"}),
        ));
        assert_eq!(event.body(), Some(&json!({"a": 1})));

        let response = responded(run(&LoadBody::negotiated(), json!({"body": "a=1"})));
        assert_eq!(response.status_code(), Some(400));
    }

    #[test]
    fn test_query_string_parameters() {
        let stage = LoadJsonQueryStringParameters;

        let event = continued(run(&stage, json!({"queryStringParameters": "{\"page\": 2}"})));
        assert_eq!(event.get("queryStringParameters"), Some(&json!({"page": 2})));

        let event = continued(run(&stage, json!({"queryStringParameters": null})));
        assert_eq!(event.get("queryStringParameters"), Some(&Value::Null));

        let response = responded(run(&stage, json!({"queryStringParameters": "{"})));
        assert_eq!(response.status_code(), Some(400));
    }

    #[test]
    fn test_names_and_defaults() {
        assert_eq!(LoadBody::default().format(), BodyFormat::Json);
        assert_eq!(LoadBody::form().name(), "load_body");
        assert!(format!("{:?}", LoadBody::json().with_hook(|v| v)).contains("hook: true"));
    }
}
