//! Core decorator trait and chain types.
//!
//! This module defines the [`Decorator`] trait every transform implements.
//! A decorator has three optional composition points: `before` adapts the
//! event (or short-circuits with a response), `after` adapts the value the
//! inner handler returned, and `on_exception` intercepts an error raised by
//! any level strictly inside it.
//!
//! # Example
//!
//! ```
//! use lambda_decorators_core::{handler_fn, Context, Event, Handler, InvocationResult, Response};
//! use lambda_decorators_middleware::{Before, Decorator, HandlerExt};
//! use serde_json::json;
//!
//! struct Stamp;
//!
//! impl Decorator for Stamp {
//!     fn name(&self) -> &'static str {
//!         "stamp"
//!     }
//!
//!     fn before(&self, mut event: Event, _ctx: &mut Context) -> InvocationResult<Before> {
//!         event.insert("stamped", json!(true));
//!         Ok(Before::Continue(event))
//!     }
//! }
//!
//! let handler = handler_fn(|event: Event, _ctx: &mut Context| Ok(json!(event.get("stamped"))))
//!     .decorate(Stamp);
//!
//! let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
//! assert_eq!(response, json!(true));
//! ```

use lambda_decorators_core::{Context, Event, Handler, InvocationError, InvocationResult, Response};
use tracing::Span;

/// Outcome of a decorator's `before` step.
#[derive(Debug, Clone, PartialEq)]
pub enum Before {
    /// Continue inward with the (possibly replaced) event.
    Continue(Event),
    /// Stop here and answer with this response.
    ///
    /// No inner decorator and no handler runs, and this decorator's own
    /// `after` step is skipped. Decorators further out still see the
    /// response in their `after` steps.
    Respond(Response),
}

/// The core decorator trait.
///
/// All transforms implement this trait. Each of the three composition
/// points has a pass-through default, so an implementor overrides only the
/// steps it needs.
///
/// # Invariants
///
/// - `before` runs before anything inside this decorator
/// - `after` runs only when everything inside returned `Ok`
/// - `on_exception` runs only when something inside returned `Err`, never
///   for errors raised by this decorator's own `before` or `after`
/// - State opened in `before` is visible in `after` and `on_exception`
///   through the [`Context`] side-table
pub trait Decorator: Send + Sync + 'static {
    /// Returns the name of this decorator.
    ///
    /// This name is used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Adapts the event before the inner levels run.
    fn before(&self, event: Event, _ctx: &mut Context) -> InvocationResult<Before> {
        Ok(Before::Continue(event))
    }

    /// Adapts whatever the inner levels returned.
    fn after(&self, response: Response, _ctx: &mut Context) -> InvocationResult<Response> {
        Ok(response)
    }

    /// Handles an error raised by the inner levels.
    ///
    /// Returning `Ok` substitutes a response; returning `Err` (the default)
    /// lets the error continue outward.
    fn on_exception(&self, error: InvocationError, _ctx: &mut Context) -> InvocationResult<Response> {
        Err(error)
    }

    /// Span entered once `before` has continued, covering the inner levels
    /// and this decorator's own `after` or `on_exception`.
    fn span(&self, _ctx: &Context) -> Option<Span> {
        None
    }
}

/// Callback to invoke the next level in the chain.
///
/// A `Next` is consumed by [`Next::run`], so each link executes once per
/// invocation and the handler at the end of the chain is reached at most
/// once.
pub struct Next<'a> {
    /// The remaining chain
    inner: NextInner<'a>,
}

/// Internal representation of the remaining chain.
enum NextInner<'a> {
    /// More decorators to run
    Chain {
        decorator: &'a dyn Decorator,
        next: Box<Next<'a>>,
    },
    /// End of chain - invoke the handler
    Handler(&'a dyn Handler),
}

impl<'a> Next<'a> {
    /// Creates a link that runs `decorator` around `next`.
    pub fn new(decorator: &'a dyn Decorator, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                decorator,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal link that invokes the handler.
    pub fn handler(handler: &'a dyn Handler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Runs the remaining chain.
    pub fn run(self, event: Event, ctx: &mut Context) -> InvocationResult<Response> {
        match self.inner {
            NextInner::Handler(handler) => handler.call(event, ctx),
            NextInner::Chain { decorator, next } => {
                let event = match decorator.before(event, ctx)? {
                    Before::Continue(event) => event,
                    Before::Respond(response) => {
                        tracing::debug!(
                            decorator = decorator.name(),
                            request_id = ctx.request_id(),
                            "Invocation short-circuited"
                        );
                        return Ok(response);
                    }
                };

                let span = decorator.span(ctx);
                let _entered = span.as_ref().map(Span::enter);

                match next.run(event, ctx) {
                    Ok(response) => decorator.after(response, ctx),
                    Err(error) => decorator.on_exception(error, ctx),
                }
            }
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Chain { decorator, next } => f
                .debug_struct("Next")
                .field("decorator", &decorator.name())
                .field("next", next)
                .finish(),
            NextInner::Handler(_) => f.write_str("Handler"),
        }
    }
}

/// A decorator built from a `before` function. Created with [`before`].
pub struct FnBefore<F> {
    name: &'static str,
    func: F,
}

/// Creates a decorator that runs `func` on the event before the handler.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::{before, HandlerExt};
/// use serde_json::json;
///
/// let handler = handler_fn(|event: Event, _ctx: &mut Context| Ok(event.body().cloned().into()))
///     .decorate(before("default_body", |mut event, _ctx| {
///         if event.body().is_none() {
///             event.set_body(json!("empty"));
///         }
///         Ok(event)
///     }));
///
/// let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
/// assert_eq!(response, json!("empty"));
/// ```
pub fn before<F>(name: &'static str, func: F) -> FnBefore<F>
where
    F: Fn(Event, &mut Context) -> InvocationResult<Event> + Send + Sync + 'static,
{
    FnBefore { name, func }
}

impl<F> Decorator for FnBefore<F>
where
    F: Fn(Event, &mut Context) -> InvocationResult<Event> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        (self.func)(event, ctx).map(Before::Continue)
    }
}

/// A decorator built from an `after` function. Created with [`after`].
pub struct FnAfter<F> {
    name: &'static str,
    func: F,
}

/// Creates a decorator that passes the handler's return value through `func`.
pub fn after<F>(name: &'static str, func: F) -> FnAfter<F>
where
    F: Fn(Response) -> InvocationResult<Response> + Send + Sync + 'static,
{
    FnAfter { name, func }
}

impl<F> Decorator for FnAfter<F>
where
    F: Fn(Response) -> InvocationResult<Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn after(&self, response: Response, _ctx: &mut Context) -> InvocationResult<Response> {
        (self.func)(response)
    }
}

/// A decorator built from an error handler. Created with [`on_exception`].
pub struct FnOnException<F> {
    name: &'static str,
    func: F,
}

/// Creates a decorator that hands inner errors to `func`.
///
/// `func` either converts the error into a response or returns it (or
/// another error) to let it propagate further out.
pub fn on_exception<F>(name: &'static str, func: F) -> FnOnException<F>
where
    F: Fn(InvocationError) -> InvocationResult<Response> + Send + Sync + 'static,
{
    FnOnException { name, func }
}

impl<F> Decorator for FnOnException<F>
where
    F: Fn(InvocationError) -> InvocationResult<Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_exception(&self, error: InvocationError, _ctx: &mut Context) -> InvocationResult<Response> {
        (self.func)(error)
    }
}

macro_rules! impl_debug_named {
    ($($ty:ident),*) => {
        $(
            impl<F> std::fmt::Debug for $ty<F> {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_struct(stringify!($ty)).field("name", &self.name).finish_non_exhaustive()
                }
            }
        )*
    };
}

impl_debug_named!(FnBefore, FnAfter, FnOnException);

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_decorators_core::{handler_fn, ResponseExt};
    use http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Marker {
        name: &'static str,
    }

    impl Decorator for Marker {
        fn name(&self) -> &'static str {
            self.name
        }

        fn before(&self, mut event: Event, _ctx: &mut Context) -> InvocationResult<Before> {
            let mut seen = event.get("seen").cloned().unwrap_or_else(|| json!([]));
            if let Some(list) = seen.as_array_mut() {
                list.push(json!(self.name));
            }
            event.insert("seen", seen);
            Ok(Before::Continue(event))
        }
    }

    struct Gate;

    impl Decorator for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn before(&self, _event: Event, _ctx: &mut Context) -> InvocationResult<Before> {
            Ok(Before::Respond(Response::error(StatusCode::FORBIDDEN, "closed")))
        }

        fn after(&self, _response: Response, _ctx: &mut Context) -> InvocationResult<Response> {
            Ok(json!("gate after must not run"))
        }
    }

    fn echo_seen() -> impl Handler {
        handler_fn(|event: Event, _ctx: &mut Context| {
            Ok(event.get("seen").cloned().unwrap_or(Response::Null))
        })
    }

    #[test]
    fn test_decorator_name() {
        let marker = Marker { name: "test" };
        assert_eq!(marker.name(), "test");
    }

    #[test]
    fn test_next_handler() {
        let handler = echo_seen();
        let response = Next::handler(&handler)
            .run(Event::new(), &mut Context::new("r"))
            .unwrap();
        assert_eq!(response, Response::Null);
    }

    #[test]
    fn test_decorator_chain() {
        let first = Marker { name: "first" };
        let second = Marker { name: "second" };
        let handler = echo_seen();

        // Build chain: first -> second -> handler
        let next = Next::new(&first, Next::new(&second, Next::handler(&handler)));

        let response = next.run(Event::new(), &mut Context::new("r")).unwrap();
        assert_eq!(response, json!(["first", "second"]));
    }

    #[test]
    fn test_respond_skips_inner_levels_and_own_after() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move |_event: Event, _ctx: &mut Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!("handled"))
        });

        let response = Next::new(&Gate, Next::handler(&handler))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap();

        assert_eq!(response.status_code(), Some(403));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_on_exception_does_not_see_own_before_error() {
        struct FailingBefore;

        impl Decorator for FailingBefore {
            fn name(&self) -> &'static str {
                "failing_before"
            }

            fn before(&self, _event: Event, _ctx: &mut Context) -> InvocationResult<Before> {
                Err(InvocationError::handler("before failed"))
            }

            fn on_exception(&self, _error: InvocationError, _ctx: &mut Context) -> InvocationResult<Response> {
                Ok(json!("swallowed"))
            }
        }

        let handler = echo_seen();
        let error = Next::new(&FailingBefore, Next::handler(&handler))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap_err();
        assert_eq!(error.to_string(), "before failed");
    }

    #[test]
    fn test_fn_helpers() {
        let add = before("add", |mut event, _ctx| {
            event.insert("seen", json!(["fn"]));
            Ok(event)
        });
        let wrap = after("wrap", |response| Ok(json!({ "wrapped": response })));
        let rescue = on_exception("rescue", |error| {
            Ok(Response::error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()))
        });

        let handler = echo_seen();
        let response = Next::new(&wrap, Next::new(&add, Next::handler(&handler)))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap();
        assert_eq!(response, json!({"wrapped": ["fn"]}));

        let failing = handler_fn(|_event: Event, _ctx: &mut Context| Err(InvocationError::handler("x")));
        let response = Next::new(&rescue, Next::handler(&failing))
            .run(Event::new(), &mut Context::new("r"))
            .unwrap();
        assert_eq!(response, json!({"statusCode": 500, "body": "x"}));
    }

    #[test]
    fn test_debug_output_names_links() {
        let marker = Marker { name: "m" };
        let handler = echo_seen();
        let next = Next::new(&marker, Next::handler(&handler));
        let debug = format!("{next:?}");
        assert!(debug.contains("\"m\""));
        assert!(format!("{:?}", before("b", |e, _c| Ok(e))).contains("\"b\""));
    }
}
