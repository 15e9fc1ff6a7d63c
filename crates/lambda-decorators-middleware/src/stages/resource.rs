//! Per-invocation resources.
//!
//! [`ScopedResource`] opens a resource in `before`, exposes it to the
//! handler through the [`Context`] side-table, and releases it after the
//! handler finished, whichever way it finished. Release happens exactly
//! once: the resource is moved out of the context before the release
//! function sees it, and nothing is released if opening failed.

use crate::decorator::{Before, Decorator};
use lambda_decorators_core::{Context, Event, InvocationError, InvocationResult, Response};
use std::marker::PhantomData;

/// Opens a resource of type `R` around each invocation.
///
/// The handler finds the resource with `ctx.get_extension::<R>()` (or
/// `get_extension_mut`). Only one resource of a given type can be attached
/// at a time; nest distinct wrapper types for several of the same kind.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::ScopedResource;
/// use lambda_decorators_middleware::HandlerExt;
/// use serde_json::json;
///
/// struct Connection {
///     dsn: String,
/// }
///
/// let handler = handler_fn(|_event: Event, ctx: &mut Context| {
///     let conn = ctx.get_extension::<Connection>().unwrap();
///     Ok(json!(conn.dsn))
/// })
/// .decorate(ScopedResource::new(
///     "db_connection",
///     |_ctx: &Context| Ok(Connection { dsn: "postgres://db".into() }),
///     |conn: Connection| drop(conn),
/// ));
///
/// let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
/// assert_eq!(response, json!("postgres://db"));
/// ```
pub struct ScopedResource<R, O, C> {
    name: &'static str,
    open: O,
    close: C,
    _resource: PhantomData<fn() -> R>,
}

impl<R, O, C> ScopedResource<R, O, C>
where
    R: Send + Sync + 'static,
    O: Fn(&Context) -> InvocationResult<R> + Send + Sync + 'static,
    C: Fn(R) + Send + Sync + 'static,
{
    /// Creates the decorator from an open and a release function.
    pub fn new(name: &'static str, open: O, close: C) -> Self {
        Self {
            name,
            open,
            close,
            _resource: PhantomData,
        }
    }

    fn release(&self, ctx: &mut Context) {
        if let Some(resource) = ctx.remove_extension::<R>() {
            tracing::debug!(
                decorator = self.name,
                request_id = ctx.request_id(),
                "Releasing resource"
            );
            (self.close)(resource);
        }
    }
}

impl<R, O, C> std::fmt::Debug for ScopedResource<R, O, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedResource")
            .field("name", &self.name)
            .field("resource", &std::any::type_name::<R>())
            .finish_non_exhaustive()
    }
}

impl<R, O, C> Decorator for ScopedResource<R, O, C>
where
    R: Send + Sync + 'static,
    O: Fn(&Context) -> InvocationResult<R> + Send + Sync + 'static,
    C: Fn(R) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let resource = (self.open)(ctx)?;
        ctx.set_extension(resource);
        Ok(Before::Continue(event))
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        self.release(ctx);
        Ok(response)
    }

    fn on_exception(&self, error: InvocationError, ctx: &mut Context) -> InvocationResult<Response> {
        self.release(ctx);
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::Next;
    use crate::stack::HandlerExt;
    use lambda_decorators_core::{handler_fn, Handler};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Conn(u32);

    type Log = Arc<Mutex<Vec<String>>>;

    fn resource(
        log: &Log,
        fail_open: bool,
    ) -> ScopedResource<
        Conn,
        impl Fn(&Context) -> InvocationResult<Conn> + Send + Sync + 'static,
        impl Fn(Conn) + Send + Sync + 'static,
    > {
        let open_log = Arc::clone(log);
        let close_log = Arc::clone(log);
        ScopedResource::new(
            "conn",
            move |_ctx: &Context| {
                if fail_open {
                    return Err(InvocationError::internal("cannot connect"));
                }
                open_log.lock().push("open".to_string());
                Ok(Conn(7))
            },
            move |conn: Conn| close_log.lock().push(format!("close:{}", conn.0)),
        )
    }

    #[test]
    fn test_released_after_success() {
        let log = Log::default();
        let stage = resource(&log, false);
        let handler = handler_fn(|_event: Event, ctx: &mut Context| {
            Ok(json!(ctx.get_extension::<Conn>().map(|c| c.0)))
        });

        let mut ctx = Context::new("r");
        let response = Next::new(&stage, Next::handler(&handler))
            .run(Event::new(), &mut ctx)
            .unwrap();

        assert_eq!(response, json!(7));
        assert_eq!(*log.lock(), vec!["open", "close:7"]);
        assert!(!ctx.has_extension::<Conn>());
    }

    #[test]
    fn test_released_after_failure() {
        let log = Log::default();
        let stage = resource(&log, false);
        let handler = handler_fn(|_event: Event, _ctx: &mut Context| Err(InvocationError::handler("boom")));

        let error = Next::new(&stage, Next::handler(&handler))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap_err();

        assert_eq!(error.to_string(), "boom");
        assert_eq!(*log.lock(), vec!["open", "close:7"]);
    }

    #[test]
    fn test_nothing_released_when_open_fails() {
        let log = Log::default();
        let stage = resource(&log, true);
        let handler = handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!(null)));

        let error = Next::new(&stage, Next::handler(&handler))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap_err();

        assert!(error.to_string().contains("cannot connect"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_released_once_even_if_steps_repeat() {
        let log = Log::default();
        let stage = resource(&log, false);
        let mut ctx = Context::new("r");

        stage.before(Event::new(), &mut ctx).unwrap();
        stage.after(json!(null), &mut ctx).unwrap();
        let _ = stage.on_exception(InvocationError::handler("late"), &mut ctx);

        assert_eq!(*log.lock(), vec!["open", "close:7"]);
    }

    #[test]
    fn test_handler_can_mutate_resource() {
        let log = Log::default();
        let handler = handler_fn(|_event: Event, ctx: &mut Context| {
            if let Some(conn) = ctx.get_extension_mut::<Conn>() {
                conn.0 += 1;
            }
            Ok(json!(null))
        })
        .decorate(resource(&log, false));

        handler.call(Event::new(), &mut Context::new("r")).unwrap();
        assert_eq!(*log.lock(), vec!["open", "close:8"]);
    }
}
