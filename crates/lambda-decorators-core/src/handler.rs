//! Handler trait for invocation processing.
//!
//! The [`Handler`] trait is the sole invocation contract: a handler takes
//! ownership of the [`Event`], borrows the [`Context`] mutably (so
//! transforms can attach extensions to it), and returns a [`Response`] or
//! raises an [`InvocationError`].

use crate::{Context, Event, InvocationError, Response};
use std::sync::Arc;

/// A function of `(Event, Context) -> Response`.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use serde_json::json;
///
/// let hello = handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!({"hello": "world"})));
///
/// let response = hello.call(Event::new(), &mut Context::new("req-1")).unwrap();
/// assert_eq!(response["hello"], "world");
/// ```
pub trait Handler: Send + Sync {
    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError`] if the handler fails; decorators wrapping
    /// this handler may convert the error into a response.
    fn call(&self, event: Event, ctx: &mut Context) -> Result<Response, InvocationError>;
}

/// A function-based handler wrapper. Created with [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F> {
    func: F,
}

/// Adapts a closure into a [`Handler`].
pub fn handler_fn<F>(func: F) -> HandlerFn<F>
where
    F: Fn(Event, &mut Context) -> Result<Response, InvocationError> + Send + Sync,
{
    HandlerFn { func }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Event, &mut Context) -> Result<Response, InvocationError> + Send + Sync,
{
    fn call(&self, event: Event, ctx: &mut Context) -> Result<Response, InvocationError> {
        (self.func)(event, ctx)
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, event: Event, ctx: &mut Context) -> Result<Response, InvocationError> {
        (**self).call(event, ctx)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn call(&self, event: Event, ctx: &mut Context) -> Result<Response, InvocationError> {
        (**self).call(event, ctx)
    }
}

impl<H: Handler + ?Sized> Handler for &H {
    fn call(&self, event: Event, ctx: &mut Context) -> Result<Response, InvocationError> {
        (**self).call(event, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct EchoBody;

    impl Handler for EchoBody {
        fn call(&self, event: Event, _ctx: &mut Context) -> Result<Response, InvocationError> {
            Ok(event.body().cloned().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn test_handler_impl() {
        let event = Event::from_value(json!({"body": "ping"})).unwrap();
        let response = EchoBody.call(event, &mut Context::new("r")).unwrap();
        assert_eq!(response, json!("ping"));
    }

    #[test]
    fn test_handler_fn_error() {
        let failing = handler_fn(|_event, _ctx| Err(InvocationError::handler("barf")));
        let error = failing.call(Event::new(), &mut Context::new("r")).unwrap_err();
        assert_eq!(error.to_string(), "barf");
    }

    #[test]
    fn test_handler_fn_sees_context() {
        let handler = handler_fn(|_event, ctx| Ok(json!(ctx.request_id())));
        let response = handler.call(Event::new(), &mut Context::new("abc")).unwrap();
        assert_eq!(response, json!("abc"));
    }

    #[test]
    fn test_boxed_and_shared_handlers() {
        let boxed: Box<dyn Handler> = Box::new(EchoBody);
        let shared = Arc::new(EchoBody);

        let event = Event::from_value(json!({"body": 1})).unwrap();
        assert_eq!(boxed.call(event.clone(), &mut Context::new("r")).unwrap(), json!(1));
        assert_eq!(shared.call(event, &mut Context::new("r")).unwrap(), json!(1));
    }
}
