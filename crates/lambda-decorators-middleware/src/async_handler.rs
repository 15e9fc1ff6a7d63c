//! Adapter running async handlers through the synchronous contract.
//!
//! [`AsyncHandler`] owns a single-threaded tokio runtime. Each call attaches
//! the runtime's [`Handle`] to the [`Context`] (so the handler can spawn
//! helper tasks) and blocks until the handler's future resolves. The
//! result, or error, is returned exactly as a synchronous handler would
//! return it.
//!
//! Blocking from inside another runtime would panic, so such a call fails
//! with [`InvocationError::Internal`] instead. For the same reason the
//! adapter must be dropped outside of any async context.

use lambda_decorators_core::{Context, Event, Handler, InvocationError, InvocationResult, Response};
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::{Builder, Handle, Runtime};

/// A boxed future borrowing the invocation context.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler driving an async function to completion on each call.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{Context, Event, Handler};
/// use lambda_decorators_middleware::async_handler;
/// use serde_json::json;
///
/// let handler = async_handler(|event: Event, ctx: &mut Context| {
///     Box::pin(async move {
///         tokio::task::yield_now().await;
///         Ok(json!({"id": ctx.request_id(), "body": event.body()}))
///     })
/// })
/// .unwrap();
///
/// let event = Event::from_value(json!({"body": "hi"})).unwrap();
/// let response = handler.call(event, &mut Context::new("req-1")).unwrap();
/// assert_eq!(response, json!({"id": "req-1", "body": "hi"}));
/// ```
pub struct AsyncHandler<F> {
    func: F,
    runtime: Runtime,
}

/// Wraps an async function, creating a dedicated current-thread runtime.
pub fn async_handler<F>(func: F) -> InvocationResult<AsyncHandler<F>>
where
    F: for<'a> Fn(Event, &'a mut Context) -> BoxFuture<'a, InvocationResult<Response>> + Send + Sync,
{
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| InvocationError::internal_with_source("failed to start async runtime", e))?;
    Ok(AsyncHandler::with_runtime(func, runtime))
}

impl<F> AsyncHandler<F>
where
    F: for<'a> Fn(Event, &'a mut Context) -> BoxFuture<'a, InvocationResult<Response>> + Send + Sync,
{
    /// Wraps an async function, driving it on the given runtime.
    pub fn with_runtime(func: F, runtime: Runtime) -> Self {
        Self { func, runtime }
    }

    /// Returns a handle to the runtime driving the handler.
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }
}

impl<F> Handler for AsyncHandler<F>
where
    F: for<'a> Fn(Event, &'a mut Context) -> BoxFuture<'a, InvocationResult<Response>> + Send + Sync,
{
    fn call(&self, event: Event, ctx: &mut Context) -> InvocationResult<Response> {
        if Handle::try_current().is_ok() {
            tracing::error!(
                request_id = ctx.request_id(),
                "Async handler invoked from inside an async runtime"
            );
            return Err(InvocationError::internal(
                "async handler cannot block inside an async runtime",
            ));
        }

        ctx.set_extension(self.runtime.handle().clone());
        self.runtime.block_on((self.func)(event, ctx))
    }
}

impl<F> std::fmt::Debug for AsyncHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::HandlerExt;
    use crate::stages::LoadBody;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_future_driven_to_completion() {
        let handler = async_handler(|_event: Event, _ctx: &mut Context| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(json!("slept"))
            })
        })
        .unwrap();

        let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
        assert_eq!(response, json!("slept"));
    }

    #[test]
    fn test_error_returned_unchanged() {
        let handler = async_handler(|_event: Event, _ctx: &mut Context| {
            Box::pin(async move { Err(InvocationError::handler("async boom")) })
        })
        .unwrap();

        let error = handler.call(Event::new(), &mut Context::new("r")).unwrap_err();
        assert_eq!(error.to_string(), "async boom");
    }

    #[test]
    fn test_runtime_handle_attached() {
        let handler = async_handler(|_event: Event, ctx: &mut Context| {
            Box::pin(async move {
                let handle = ctx
                    .get_extension::<Handle>()
                    .cloned()
                    .ok_or_else(|| InvocationError::internal("no handle"))?;
                let spawned = handle.spawn(async { 21 * 2 });
                let value = spawned
                    .await
                    .map_err(|e| InvocationError::internal_with_source("join failed", e))?;
                Ok(json!(value))
            })
        })
        .unwrap();

        let mut ctx = Context::new("r");
        let response = handler.call(Event::new(), &mut ctx).unwrap();
        assert_eq!(response, json!(42));
        assert!(ctx.has_extension::<Handle>());
    }

    #[test]
    fn test_refuses_to_block_inside_runtime() {
        let outer = tokio::runtime::Runtime::new().unwrap();
        let handler = async_handler(|_event: Event, _ctx: &mut Context| {
            Box::pin(async move { Ok(json!(null)) })
        })
        .unwrap();

        let result = outer.block_on(async { handler.call(Event::new(), &mut Context::new("r")) });
        assert!(matches!(result, Err(InvocationError::Internal { .. })));
    }

    #[test]
    fn test_decorated_async_handler() {
        let handler = async_handler(|event: Event, _ctx: &mut Context| {
            Box::pin(async move { Ok(event.body().cloned().unwrap_or_default()) })
        })
        .unwrap()
        .decorate(LoadBody::json());

        let event = Event::from_value(json!({"body": "{\"a\": 1}"})).unwrap();
        let response = handler.call(event, &mut Context::new("r")).unwrap();
        assert_eq!(response, json!({"a": 1}));
    }
}
