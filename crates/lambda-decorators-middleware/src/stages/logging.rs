//! Invocation logging.
//!
//! [`LogInvocation`] opens a `tracing` span per invocation and logs when it
//! starts, when it completes (with the response status and duration) and
//! when it fails. It never alters the outcome.
//!
//! The summary of each invocation is also stored in the [`Context`] as an
//! [`InvocationRecord`], so later steps (and tests) can inspect it.
//!
//! # Log Fields
//!
//! - `request_id` - Identifier of the invocation
//! - `function_name` - Name of the invoked function, if known
//! - `service` - Configured service name
//! - `status_code` - Status of the response, when response-shaped
//! - `duration_ms` - Time since the invocation started
//!
//! Decorators and the handler inside it run within the span, so their
//! events carry the invocation fields. Place it outermost so the span
//! covers every other decorator.

use crate::decorator::{Before, Decorator};
use lambda_decorators_core::{Context, Event, InvocationError, InvocationResult, Response, ResponseExt};
use tracing::Span;

/// Emits structured logs for every invocation.
#[derive(Debug, Clone)]
pub struct LogInvocation {
    service_name: String,
}

impl Default for LogInvocation {
    fn default() -> Self {
        Self::new("lambda")
    }
}

impl LogInvocation {
    /// Creates the decorator for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name attached to every span.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was produced.
    Completed,
    /// The invocation was refused as a retry.
    Duplicate,
    /// An error escaped every decorator inside this one.
    Failed,
}

/// Summary of one invocation, stored in the [`Context`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRecord {
    /// The request identifier.
    pub request_id: String,
    /// How the invocation ended.
    pub outcome: Outcome,
    /// Status of the response, when it carried one.
    pub status_code: Option<u16>,
    /// Duration in milliseconds.
    pub duration_ms: f64,
}

/// Span opened in `before`.
struct InvocationSpan(Span);

impl LogInvocation {
    /// Closes the invocation: stores its record and hands back the span.
    fn finish(&self, ctx: &mut Context, outcome: Outcome, status_code: Option<u16>) -> (Span, f64) {
        let span = ctx
            .remove_extension::<InvocationSpan>()
            .map_or_else(Span::none, |s| s.0);
        let duration_ms = ctx.elapsed().as_secs_f64() * 1000.0;

        let record = InvocationRecord {
            request_id: ctx.request_id().to_string(),
            outcome,
            status_code,
            duration_ms,
        };
        ctx.set_extension(record);

        (span, duration_ms)
    }
}

impl Decorator for LogInvocation {
    fn name(&self) -> &'static str {
        "log_invocation"
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let span = tracing::info_span!(
            "invocation",
            request_id = ctx.request_id(),
            function_name = ctx.function_name().unwrap_or("unknown"),
            service = %self.service_name,
        );

        span.in_scope(|| tracing::info!("Invocation started"));
        ctx.set_extension(InvocationSpan(span));
        Ok(Before::Continue(event))
    }

    fn span(&self, ctx: &Context) -> Option<Span> {
        ctx.get_extension::<InvocationSpan>().map(|s| s.0.clone())
    }

    fn after(&self, response: Response, ctx: &mut Context) -> InvocationResult<Response> {
        let status_code = response.status_code();
        let (span, duration_ms) = self.finish(ctx, Outcome::Completed, status_code);

        span.in_scope(|| match status_code {
            Some(status) => tracing::info!(status_code = status, duration_ms, "Invocation completed"),
            None => tracing::info!(duration_ms, "Invocation completed"),
        });
        Ok(response)
    }

    fn on_exception(&self, error: InvocationError, ctx: &mut Context) -> InvocationResult<Response> {
        let outcome = if error.is_duplicate() {
            Outcome::Duplicate
        } else {
            Outcome::Failed
        };
        let (span, duration_ms) = self.finish(ctx, outcome, None);

        span.in_scope(|| {
            if error.is_duplicate() {
                tracing::info!(duration_ms, "Duplicate invocation suppressed");
            } else {
                tracing::error!(
                    error = %error,
                    category = ?error.category(),
                    duration_ms,
                    "Invocation failed"
                );
            }
        });
        Err(error)
    }
}
