//! Duplicate invocation suppression.
//!
//! Schedulers that deliver at least once may retry an invocation whose
//! first attempt failed. [`NoRetryOnFailure`] remembers every request id it
//! has let through and refuses a second invocation with the same id by
//! raising [`InvocationError::DuplicateInvocation`].
//!
//! The set of seen ids lives as long as the decorator instance (normally
//! the whole process) and is never evicted. It is not persisted, so a
//! restarted process will accept a retry; this is best-effort protection.

use crate::decorator::{Before, Decorator};
use lambda_decorators_core::{Context, Event, InvocationError, InvocationResult};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Refuses repeated request ids.
///
/// Share one instance across threads (it is `Sync`) or stacks (via
/// [`StackBuilder::shared_layer`](crate::StackBuilder::shared_layer)) to
/// suppress duplicates process-wide.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{handler_fn, Context, Event, Handler};
/// use lambda_decorators_middleware::stages::NoRetryOnFailure;
/// use lambda_decorators_middleware::HandlerExt;
/// use serde_json::json;
///
/// let handler = handler_fn(|_event: Event, _ctx: &mut Context| Ok(json!("done")))
///     .decorate(NoRetryOnFailure::new());
///
/// assert!(handler.call(Event::new(), &mut Context::new("A")).is_ok());
///
/// let error = handler.call(Event::new(), &mut Context::new("A")).unwrap_err();
/// assert!(error.is_duplicate());
/// ```
#[derive(Debug, Default)]
pub struct NoRetryOnFailure {
    seen: Mutex<HashSet<String>>,
}

impl NoRetryOnFailure {
    /// Creates a decorator with an empty seen-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `request_id`, returning `false` if it was already present.
    fn record(&self, request_id: &str) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains(request_id) {
            return false;
        }
        seen.insert(request_id.to_string())
    }

    /// Returns `true` if `request_id` has been let through before.
    #[must_use]
    pub fn has_seen(&self, request_id: &str) -> bool {
        self.seen.lock().contains(request_id)
    }

    /// Returns how many distinct request ids have been let through.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Decorator for NoRetryOnFailure {
    fn name(&self) -> &'static str {
        "no_retry_on_failure"
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        if self.record(ctx.request_id()) {
            return Ok(Before::Continue(event));
        }

        tracing::warn!(
            request_id = ctx.request_id(),
            "Retry attempt detected; invocation suppressed"
        );
        Err(InvocationError::duplicate(ctx.request_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_decorators_core::{handler_fn, Handler};
    use crate::stack::HandlerExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_first_call_passes_second_is_refused() {
        let stage = NoRetryOnFailure::new();

        let before = stage.before(Event::new(), &mut Context::new("A")).unwrap();
        assert!(matches!(before, Before::Continue(_)));
        assert!(stage.has_seen("A"));

        let error = stage.before(Event::new(), &mut Context::new("A")).unwrap_err();
        assert_eq!(error.to_string(), "Retry attempt on request id A detected.");
    }

    #[test]
    fn test_distinct_ids_all_pass() {
        let stage = NoRetryOnFailure::new();
        for id in ["A", "B", "C"] {
            assert!(stage.before(Event::new(), &mut Context::new(id)).is_ok());
        }
        assert_eq!(stage.seen_count(), 3);
        assert!(!stage.has_seen("D"));
    }

    #[test]
    fn test_handler_reached_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move |_event: Event, _ctx: &mut Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        })
        .decorate(NoRetryOnFailure::new());

        handler.call(Event::new(), &mut Context::new("A")).unwrap();
        assert!(handler.call(Event::new(), &mut Context::new("A")).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_first_attempt_still_blocks_retry() {
        let handler = handler_fn(|_event: Event, _ctx: &mut Context| Err(InvocationError::handler("boom")))
            .decorate(NoRetryOnFailure::new());

        let first = handler.call(Event::new(), &mut Context::new("A")).unwrap_err();
        assert_eq!(first.to_string(), "boom");

        let second = handler.call(Event::new(), &mut Context::new("A")).unwrap_err();
        assert!(second.is_duplicate());
    }

    #[test]
    fn test_concurrent_duplicates_admit_exactly_one() {
        let stage = Arc::new(NoRetryOnFailure::new());
        let admitted = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let stage = Arc::clone(&stage);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if stage.before(Event::new(), &mut Context::new("same")).is_ok() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
