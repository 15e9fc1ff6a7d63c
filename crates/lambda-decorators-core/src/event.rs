//! Inbound event record.

use crate::error::{InvocationError, InvocationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound request record passed to a handler.
///
/// An event is a mapping from string keys to arbitrary JSON values. By
/// convention it carries a raw `body` string and optional `headers`;
/// "before" transforms replace values in place (for example swapping the
/// raw body for its parsed form).
///
/// # Example
///
/// ```
/// use lambda_decorators_core::Event;
/// use serde_json::json;
///
/// let mut event = Event::from_value(json!({"body": "{\"name\": \"world\"}"})).unwrap();
/// assert_eq!(event.body(), Some(&json!("{\"name\": \"world\"}")));
///
/// event.set_body(json!({"name": "world"}));
/// assert_eq!(event.body().unwrap()["name"], "world");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Field holding the raw (or parsed) request body.
    pub const BODY: &'static str = "body";
    /// Field holding the request headers.
    pub const HEADERS: &'static str = "headers";
    /// Field holding the query string parameters.
    pub const QUERY_STRING_PARAMETERS: &'static str = "queryStringParameters";

    /// Creates an empty event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event from a JSON value.
    ///
    /// Fails with [`InvocationError::Validation`] if the value is not an object.
    pub fn from_value(value: Value) -> InvocationResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(InvocationError::validation(format!(
                "event must be a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts a value, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns `true` if the event has a value under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the body, if present.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.get(Self::BODY)
    }

    /// Returns a mutable reference to the body, if present.
    pub fn body_mut(&mut self) -> Option<&mut Value> {
        self.get_mut(Self::BODY)
    }

    /// Replaces the body in place.
    pub fn set_body(&mut self, body: Value) {
        self.insert(Self::BODY, body);
    }

    /// Returns the headers map, if present and an object.
    #[must_use]
    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.get(Self::HEADERS).and_then(Value::as_object)
    }

    /// Looks up a header case-insensitively and returns it as a string.
    ///
    /// ```
    /// use lambda_decorators_core::Event;
    /// use serde_json::json;
    ///
    /// let event = Event::from_value(json!({"headers": {"Content-Type": "text/plain"}})).unwrap();
    /// assert_eq!(event.header("content-type"), Some("text/plain"));
    /// ```
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_str())
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the event into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Event {
    type Error = InvocationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Event::from_value(json!([1, 2])).is_err());
        assert!(Event::from_value(json!("body")).is_err());
        assert!(Event::from_value(json!({})).is_ok());
    }

    #[test]
    fn test_body_replaced_in_place() {
        let mut event = Event::from_value(json!({"body": "[1,2]", "path": "/"})).unwrap();
        event.set_body(json!([1, 2]));

        assert_eq!(event.body(), Some(&json!([1, 2])));
        assert_eq!(event.get("path"), Some(&json!("/")));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let event = Event::from_value(json!({
            "headers": {"X-Request-ID": "abc"}
        }))
        .unwrap();

        assert_eq!(event.header("x-request-id"), Some("abc"));
        assert_eq!(event.header("missing"), None);
    }

    #[test]
    fn test_missing_headers() {
        let event = Event::new();
        assert!(event.headers().is_none());
        assert!(event.header("content-type").is_none());
    }

    #[test]
    fn test_serde_is_transparent() {
        let event: Event = serde_json::from_str(r#"{"body":"x"}"#).unwrap();
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"body":"x"}"#);
    }
}
