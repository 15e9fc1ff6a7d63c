//! Request and response schema validation.
//!
//! [`JsonSchemaValidator`] checks the inbound payload against a request
//! schema before the handler runs, and the handler's return value against
//! a response schema afterwards. Either schema is optional.
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | request | `400`, body `RequestValidationError: <message>`, handler not invoked |
//! | response | `500`, body `ResponseValidationError: <message>`, return value discarded |
//!
//! Place it inside [`LoadBody`](crate::stages::LoadBody) so the request
//! schema sees the parsed body rather than the raw string.

use crate::decorator::{Before, Decorator};
use crate::schema::JsonSchema;
use lambda_decorators_core::{Context, Event, InvocationResult, Response, ResponseExt};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of request failure bodies.
pub const REQUEST_VALIDATION_ERROR: &str = "RequestValidationError";
/// Prefix of response failure bodies.
pub const RESPONSE_VALIDATION_ERROR: &str = "ResponseValidationError";

/// Which part of the event the request schema applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTarget {
    /// The (parsed) `body` field. A missing body validates as `null`.
    #[default]
    Body,
    /// The whole event record.
    Event,
}

/// Validates requests and responses against JSON schemas.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::JsonSchemaValidator;
/// use lambda_decorators_middleware::{HandlerExt, JsonSchema};
/// use serde_json::json;
///
/// let schema = JsonSchema::compile(&json!({
///     "type": "object",
///     "properties": {"price": {"type": "number"}}
/// }))
/// .unwrap();
///
/// let handler = handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!({"statusCode": 200})))
///     .decorate(JsonSchemaValidator::new().request_schema(schema));
///
/// let event = Event::from_value(json!({"body": {"price": "bar"}})).unwrap();
/// let response = handler.call(event, &mut Context::new("r")).unwrap();
/// assert_eq!(response["statusCode"], 400);
/// assert_eq!(response["body"], "RequestValidationError: 'bar' is not of type 'number'");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaValidator {
    request: Option<JsonSchema>,
    response: Option<JsonSchema>,
    target: ValidationTarget,
}

impl JsonSchemaValidator {
    /// Creates a validator with no schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request schema.
    #[must_use]
    pub fn request_schema(mut self, schema: JsonSchema) -> Self {
        self.request = Some(schema);
        self
    }

    /// Sets the response schema.
    #[must_use]
    pub fn response_schema(mut self, schema: JsonSchema) -> Self {
        self.response = Some(schema);
        self
    }

    /// Sets what the request schema is applied to.
    #[must_use]
    pub fn target(mut self, target: ValidationTarget) -> Self {
        self.target = target;
        self
    }

    /// Returns `true` if neither schema is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.response.is_none()
    }
}

impl Decorator for JsonSchemaValidator {
    fn name(&self) -> &'static str {
        "json_schema_validator"
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let Some(schema) = &self.request else {
            return Ok(Before::Continue(event));
        };

        let result = match self.target {
            ValidationTarget::Body => schema.validate(event.body().unwrap_or(&Value::Null)),
            ValidationTarget::Event => schema.validate(&Value::Object(event.as_map().clone())),
        };

        match result {
            Ok(()) => Ok(Before::Continue(event)),
            Err(error) => {
                tracing::info!(
                    request_id = ctx.request_id(),
                    path = %error.path,
                    error = %error.message,
                    "Request failed schema validation"
                );
                Ok(Before::Respond(Response::error(
                    StatusCode::BAD_REQUEST,
                    &format!("{REQUEST_VALIDATION_ERROR}: {error}"),
                )))
            }
        }
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        let Some(schema) = &self.response else {
            return Ok(response);
        };

        match schema.validate(&response) {
            Ok(()) => Ok(response),
            Err(error) => {
                tracing::error!(
                    request_id = ctx.request_id(),
                    path = %error.path,
                    error = %error.message,
                    "Response failed schema validation"
                );
                Ok(Response::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("{RESPONSE_VALIDATION_ERROR}: {error}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn price_schema() -> JsonSchema {
        JsonSchema::compile(&json!({
            "type": "object",
            "properties": {"price": {"type": "number"}},
            "required": ["price"]
        }))
        .unwrap()
    }

    fn event(value: Value) -> Event {
        Event::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_request_continues() {
        let validator = JsonSchemaValidator::new().request_schema(price_schema());
        let before = validator
            .before(event(json!({"body": {"price": 2}})), &mut Context::new("r"))
            .unwrap();
        assert!(matches!(before, Before::Continue(_)));
    }

    #[test]
    fn test_invalid_request_is_400() {
        let validator = JsonSchemaValidator::new().request_schema(price_schema());
        let before = validator
            .before(event(json!({"body": {"price": "bar"}})), &mut Context::new("r"))
            .unwrap();

        let Before::Respond(response) = before else {
            panic!("expected a short-circuit");
        };
        assert_eq!(
            response,
            json!({"statusCode": 400, "body": "RequestValidationError: 'bar' is not of type 'number'"})
        );
    }

    #[test]
    fn test_referenced_definition_is_enforced() {
        let schema = JsonSchema::compile(&json!({
            "type": "object",
            "properties": {"price": {"$ref": "#/definitions/price"}},
            "definitions": {"price": {"type": "number"}}
        }))
        .unwrap();
        let validator = JsonSchemaValidator::new().request_schema(schema);

        let before = validator
            .before(event(json!({"body": {"price": "foo"}})), &mut Context::new("r"))
            .unwrap();
        let Before::Respond(response) = before else {
            panic!("expected a short-circuit");
        };
        assert_eq!(
            response,
            json!({"statusCode": 400, "body": "RequestValidationError: 'foo' is not of type 'number'"})
        );
    }

    #[test]
    fn test_missing_body_validates_as_null() {
        let validator = JsonSchemaValidator::new().request_schema(price_schema());
        let before = validator.before(Event::new(), &mut Context::new("r")).unwrap();

        let Before::Respond(response) = before else {
            panic!("expected a short-circuit");
        };
        assert_eq!(response["body"], "RequestValidationError: None is not of type 'object'");
    }

    #[test]
    fn test_event_target() {
        let validator = JsonSchemaValidator::new()
            .request_schema(price_schema())
            .target(ValidationTarget::Event);

        let before = validator
            .before(event(json!({"price": 3})), &mut Context::new("r"))
            .unwrap();
        assert!(matches!(before, Before::Continue(_)));

        let before = validator
            .before(event(json!({"price": "bar"})), &mut Context::new("r"))
            .unwrap();
        assert!(matches!(before, Before::Respond(_)));
    }

    #[test]
    fn test_invalid_response_is_500() {
        let validator = JsonSchemaValidator::new().response_schema(
            JsonSchema::compile(&json!({
                "type": "object",
                "properties": {"body": {"type": "string"}}
            }))
            .unwrap(),
        );

        let response = validator
            .after(json!({"statusCode": 200, "body": 5}), &mut Context::new("r"))
            .unwrap();
        assert_eq!(response.status_code(), Some(500));
        assert_eq!(
            response["body"],
            "ResponseValidationError: 5 is not of type 'string'"
        );

        let response = validator
            .after(json!({"statusCode": 200, "body": "ok"}), &mut Context::new("r"))
            .unwrap();
        assert_eq!(response.status_code(), Some(200));
    }

    #[test]
    fn test_no_schemas_pass_through() {
        let validator = JsonSchemaValidator::new();
        assert!(validator.is_empty());

        let before = validator.before(Event::new(), &mut Context::new("r")).unwrap();
        assert!(matches!(before, Before::Continue(_)));
        let response = validator.after(json!("x"), &mut Context::new("r")).unwrap();
        assert_eq!(response, json!("x"));
    }

    #[test]
    fn test_target_deserializes_snake_case() {
        let target: ValidationTarget = serde_json::from_value(json!("event")).unwrap();
        assert_eq!(target, ValidationTarget::Event);
        assert_eq!(ValidationTarget::default(), ValidationTarget::Body);
    }
}
