//! Ordered decorator stacks.
//!
//! A [`Stack`] holds decorators outermost first, exactly as they would be
//! written above a handler: `Stack::builder().layer(A).layer(B).layer(C)`
//! wraps a handler the same way `@A @B @C handler` does. `before` steps run
//! A, B, C; `after` steps run C, B, A.
//!
//! For a single decorator, [`HandlerExt::decorate`] is the lighter option.

use crate::decorator::{Decorator, Next};
use lambda_decorators_core::{Context, Event, Handler, InvocationResult, Response};
use std::sync::Arc;

/// A type-erased decorator that can be stored in a vector.
pub type BoxedDecorator = Arc<dyn Decorator>;

/// An ordered, immutable sequence of decorators.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::{CorsHeaders, JsonHttpResponse};
/// use lambda_decorators_middleware::Stack;
/// use serde_json::json;
///
/// let handler = Stack::builder()
///     .layer(CorsHeaders::new())
///     .layer(JsonHttpResponse::new())
///     .build()
///     .wrap(handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!({"hello": "world"}))));
///
/// let response = handler.call(Event::new(), &mut Context::new("req-1")).unwrap();
/// assert_eq!(response["statusCode"], 200);
/// assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
/// ```
#[derive(Clone, Default)]
pub struct Stack {
    /// Decorators, outermost first
    layers: Vec<BoxedDecorator>,
}

impl Stack {
    /// Creates a new stack builder.
    #[must_use]
    pub fn builder() -> StackBuilder {
        StackBuilder::new()
    }

    /// Invokes `handler` through every decorator in this stack.
    pub fn invoke(
        &self,
        handler: &dyn Handler,
        event: Event,
        ctx: &mut Context,
    ) -> InvocationResult<Response> {
        self.build_chain(handler).run(event, ctx)
    }

    /// Builds the chain for one invocation.
    fn build_chain<'a>(&'a self, handler: &'a dyn Handler) -> Next<'a> {
        // Start with the handler as the terminal point
        let mut next = Next::handler(handler);

        for decorator in self.layers.iter().rev() {
            next = Next::new(decorator.as_ref(), next);
        }

        next
    }

    /// Binds this stack to a handler, producing a new handler.
    pub fn wrap<H: Handler>(self, handler: H) -> Wrapped<H> {
        Wrapped {
            stack: self,
            handler,
        }
    }

    /// Returns the names of all decorators, outermost first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Returns the number of decorators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the stack has no decorators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("layers", &self.layer_names())
            .finish()
    }
}

/// Builder for constructing a [`Stack`].
#[derive(Default)]
pub struct StackBuilder {
    layers: Vec<BoxedDecorator>,
}

impl StackBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decorator inside every decorator added so far.
    #[must_use]
    pub fn layer<D: Decorator>(mut self, decorator: D) -> Self {
        self.layers.push(Arc::new(decorator));
        self
    }

    /// Adds an already shared decorator.
    ///
    /// Useful when several stacks must observe the same stateful instance,
    /// such as one duplicate-suppression set for a whole process.
    #[must_use]
    pub fn shared_layer(mut self, decorator: BoxedDecorator) -> Self {
        self.layers.push(decorator);
        self
    }

    /// Adds a decorator only when `decorator` is `Some`.
    #[must_use]
    pub fn optional_layer<D: Decorator>(self, decorator: Option<D>) -> Self {
        match decorator {
            Some(decorator) => self.layer(decorator),
            None => self,
        }
    }

    /// Builds the stack.
    #[must_use]
    pub fn build(self) -> Stack {
        Stack {
            layers: self.layers,
        }
    }
}

/// A handler bound to a [`Stack`]. Created with [`Stack::wrap`].
#[derive(Debug)]
pub struct Wrapped<H> {
    stack: Stack,
    handler: H,
}

impl<H> Wrapped<H> {
    /// Returns the stack.
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Returns the inner handler.
    pub fn inner(&self) -> &H {
        &self.handler
    }
}

impl<H: Handler> Handler for Wrapped<H> {
    fn call(&self, event: Event, ctx: &mut Context) -> InvocationResult<Response> {
        self.stack.invoke(&self.handler, event, ctx)
    }
}

/// A handler wrapped by a single decorator. Created with
/// [`HandlerExt::decorate`].
#[derive(Debug)]
pub struct Decorated<D, H> {
    decorator: D,
    inner: H,
}

impl<D: Decorator, H: Handler> Handler for Decorated<D, H> {
    fn call(&self, event: Event, ctx: &mut Context) -> InvocationResult<Response> {
        Next::new(&self.decorator, Next::handler(&self.inner)).run(event, ctx)
    }
}

/// Extension trait applying decorators to any [`Handler`].
///
/// Decorators applied later sit further out, so
/// `h.decorate(C).decorate(B).decorate(A)` behaves like `@A @B @C h`.
pub trait HandlerExt: Handler + Sized {
    /// Wraps this handler in `decorator`.
    fn decorate<D: Decorator>(self, decorator: D) -> Decorated<D, Self> {
        Decorated {
            decorator,
            inner: self,
        }
    }
}

impl<H: Handler> HandlerExt for H {}
