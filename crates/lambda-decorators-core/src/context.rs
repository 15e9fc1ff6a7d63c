//! Invocation context.
//!
//! The [`Context`] carries invocation metadata alongside the event and
//! gives transforms an explicit side-table to attach values to (fetched
//! parameters, runtime handles, opened resources) instead of ad-hoc
//! attribute injection.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Invocation metadata passed to a handler alongside the [`Event`](crate::Event).
///
/// # Example
///
/// ```
/// use lambda_decorators_core::Context;
///
/// #[derive(Debug, PartialEq)]
/// struct DbHandle(u32);
///
/// let mut ctx = Context::new("req-1").with_function_name("orders");
/// ctx.set_extension(DbHandle(7));
///
/// assert_eq!(ctx.request_id(), "req-1");
/// assert_eq!(ctx.get_extension::<DbHandle>(), Some(&DbHandle(7)));
/// ```
#[derive(Debug)]
pub struct Context {
    /// Identifier assigned to this invocation by the runtime.
    request_id: String,

    /// Name of the function being invoked.
    function_name: Option<String>,

    /// Invocation deadline, in milliseconds since the Unix epoch.
    deadline_ms: Option<u64>,

    /// When the invocation started.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Context {
    /// Creates a context for the given request identifier.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            function_name: None,
            deadline_ms: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Sets the function name.
    #[must_use]
    pub fn with_function_name(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = Some(function_name.into());
        self
    }

    /// Sets the invocation deadline.
    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the function name, if known.
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    /// Returns the invocation deadline, if known.
    #[must_use]
    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Returns when the invocation started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the invocation started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous value of the
    /// same type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Retrieves a mutable typed extension value.
    pub fn get_extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        let ctx = Context::new("abc")
            .with_function_name("scheduled")
            .with_deadline_ms(1_700_000_000_000);

        assert_eq!(ctx.request_id(), "abc");
        assert_eq!(ctx.function_name(), Some("scheduled"));
        assert_eq!(ctx.deadline_ms(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct MyExtension {
            value: i32,
        }

        let mut ctx = Context::new("abc");

        assert!(!ctx.has_extension::<MyExtension>());
        assert!(ctx.get_extension::<MyExtension>().is_none());

        ctx.set_extension(MyExtension { value: 42 });
        assert!(ctx.has_extension::<MyExtension>());

        ctx.get_extension_mut::<MyExtension>().unwrap().value += 1;
        assert_eq!(ctx.get_extension::<MyExtension>(), Some(&MyExtension { value: 43 }));

        let removed = ctx.remove_extension::<MyExtension>();
        assert_eq!(removed, Some(MyExtension { value: 43 }));
        assert!(!ctx.has_extension::<MyExtension>());
        assert!(ctx.remove_extension::<MyExtension>().is_none());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = Context::new("abc");
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.elapsed() >= Duration::from_millis(10));
    }
}
